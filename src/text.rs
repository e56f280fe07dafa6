//! Parley-backed measurement and layout. The rest of the crate treats this
//! as an oracle: measure a string's advance width, or produce a positioned
//! layout for drawing. Bidi reordering and glyph shaping stay in here.

use crate::{
    error::{VersereelError, VersereelResult},
    fonts::FontAsset,
    model::Rgba8,
    shape::TextMeasurer,
};

/// Stateful helper owning the Parley font and layout contexts.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
}

impl Default for TextEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Register raw font bytes and report the primary family name, or a
    /// capability error when the bytes contain no usable face.
    pub fn register(&mut self, font_bytes: &[u8]) -> VersereelResult<String> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| VersereelError::font("no font families registered from font bytes"))?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| VersereelError::font("registered font family has no name"))?
            .to_string();
        Ok(family_name)
    }

    /// Shape and lay out plain text in the given font. With `max_width_px`
    /// set, Parley breaks lines itself; without it the text stays on one
    /// line, which is what width measurement wants.
    pub fn layout(
        &mut self,
        text: &str,
        font: &FontAsset,
        size_px: f32,
        brush: Rgba8,
        max_width_px: Option<f32>,
    ) -> VersereelResult<parley::Layout<Rgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(VersereelError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let family_name = self.register(&font.bytes)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<Rgba8> = builder.build(text);
        if let Some(w) = max_width_px {
            layout.break_all_lines(Some(w));
            layout.align(
                Some(w),
                parley::Alignment::Start,
                parley::AlignmentOptions::default(),
            );
        } else {
            layout.break_all_lines(None);
        }

        Ok(layout)
    }

    /// Advance width of `text` on a single line at `size_px`.
    pub fn measure_width(
        &mut self,
        text: &str,
        font: &FontAsset,
        size_px: f32,
    ) -> VersereelResult<f32> {
        let layout = self.layout(text, font, size_px, Rgba8::default(), None)?;
        Ok(layout.width())
    }
}

/// A [`TextMeasurer`] bound to one font, for feeding the fit search.
pub struct FontMeasurer<'a> {
    pub engine: &'a mut TextEngine,
    pub font: &'a FontAsset,
}

impl TextMeasurer for FontMeasurer<'_> {
    fn measure(&mut self, text: &str, font_size_px: u32) -> VersereelResult<f32> {
        self.engine
            .measure_width(text, self.font, font_size_px as f32)
    }
}
