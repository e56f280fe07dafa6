//! Rasterizes one segment's overlay stills: the text blocks as glyph runs,
//! the panel as a filled rounded rectangle. Output is straight-alpha RGBA
//! written as PNG, which is what the compositor expects from image inputs.

use std::path::Path;

use anyhow::Context as _;
use vello_cpu::kurbo::Shape as _;

use crate::{
    error::{VersereelError, VersereelResult},
    fonts::FontAsset,
    model::Rgba8,
    shape::TextBlock,
    text::TextEngine,
};

/// Straight-alpha RGBA8 raster, row-major.
#[derive(Clone, Debug)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

fn pixmap_dims(width: f64, height: f64) -> VersereelResult<(u16, u16)> {
    let w = width.ceil().max(1.0);
    let h = height.ceil().max(1.0);
    if w > f64::from(u16::MAX) || h > f64::from(u16::MAX) {
        return Err(VersereelError::validation(format!(
            "overlay raster {w}x{h} exceeds the maximum pixmap size"
        )));
    }
    Ok((w as u16, h as u16))
}

/// Draw a wrapped block into a raster of exactly its own box. Each line is
/// laid out on its own and centered horizontally, so the drawn wrap is the
/// wrap the fit search measured.
pub fn render_text_block(
    block: &TextBlock,
    font: &FontAsset,
    color: Rgba8,
    engine: &mut TextEngine,
) -> VersereelResult<RenderedImage> {
    let (width, height) = pixmap_dims(
        f64::from(block.width_px),
        f64::from(block.height_px()),
    )?;

    let font_data = vello_cpu::peniko::FontData::new(
        vello_cpu::peniko::Blob::from(font.bytes.as_ref().clone()),
        0,
    );

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    for (i, line) in block.lines.iter().enumerate() {
        let layout = engine.layout(line, font, block.font_size_px as f32, color, None)?;
        let dx = (f32::from(width) - layout.width()) / 2.0;
        let dy = i as f32 * block.line_height_px
            + (block.line_height_px - layout.height()) / 2.0;
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(dx),
            f64::from(dy),
        )));

        for layout_line in layout.lines() {
            for item in layout_line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font_data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);

    let mut rgba8 = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_in_place(&mut rgba8);
    Ok(RenderedImage {
        width: u32::from(width),
        height: u32::from(height),
        rgba8,
    })
}

/// The translucent backdrop behind both text blocks.
pub fn render_panel(
    width_px: f64,
    height_px: f64,
    fill: Rgba8,
    corner_radius_px: f64,
) -> VersereelResult<RenderedImage> {
    let (width, height) = pixmap_dims(width_px, height_px)?;

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        fill.r, fill.g, fill.b, fill.a,
    ));
    let rounded = vello_cpu::kurbo::RoundedRect::new(
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
        corner_radius_px,
    );
    ctx.fill_path(&rounded.to_path(0.1));
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);

    let mut rgba8 = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_in_place(&mut rgba8);
    Ok(RenderedImage {
        width: u32::from(width),
        height: u32::from(height),
        rgba8,
    })
}

pub fn write_png(image: &RenderedImage, path: &Path) -> VersereelResult<()> {
    image::save_buffer_with_format(
        path,
        &image.rgba8,
        image.width,
        image.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// The raster pipeline produces premultiplied alpha; PNG carries straight
/// alpha.
fn unpremultiply_in_place(rgba8: &mut [u8]) {
    for px in rgba8.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
        } else if a < 255 {
            for c in px.iter_mut().take(3) {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
    }
}
