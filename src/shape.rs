//! Fits a text string into a width/height box by shrinking the font size
//! before wrapping, then wrapping before shrinking further.

use crate::error::{VersereelError, VersereelResult};

/// Smallest size the fit search will try.
pub const MIN_FONT_SIZE_PX: u32 = 16;
/// Size decrement between candidate sizes.
pub const SIZE_STEP_PX: u32 = 2;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.3;

/// Width-measurement oracle, already bound to a concrete font. The shaper
/// never touches glyphs itself; visual (bidi) order is entirely the
/// rasterizer's business.
pub trait TextMeasurer {
    /// Advance width in pixels of `text` laid out as a single line at
    /// `font_size_px`.
    fn measure(&mut self, text: &str, font_size_px: u32) -> VersereelResult<f32>;
}

/// A wrapped, sized piece of text. Immutable once computed.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    /// Wrapped lines in logical order, never re-ordered or truncated.
    pub lines: Vec<String>,
    pub font_size_px: u32,
    pub line_height_px: f32,
    /// Widest measured line at `font_size_px`.
    pub width_px: f32,
}

impl TextBlock {
    pub fn height_px(&self) -> f32 {
        self.line_height_px * self.lines.len() as f32
    }
}

struct Wrapped {
    lines: Vec<String>,
    width_px: f32,
}

/// Find the largest font size at or below `base_size_px` at which `text`
/// fits `max_width_px` x `max_height_px`, wrapping on whitespace as needed.
///
/// If nothing fits even at [`MIN_FONT_SIZE_PX`], the floor size with the last
/// computed wrapping is returned and a warning is logged; overflow is
/// tolerated rather than truncated.
pub fn shape(
    text: &str,
    base_size_px: u32,
    max_width_px: f32,
    max_height_px: f32,
    measurer: &mut dyn TextMeasurer,
) -> VersereelResult<TextBlock> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VersereelError::validation("text must be non-empty"));
    }
    if base_size_px < MIN_FONT_SIZE_PX {
        return Err(VersereelError::validation(format!(
            "base font size {base_size_px}px is below the {MIN_FONT_SIZE_PX}px floor"
        )));
    }
    if max_width_px <= 0.0 || max_height_px <= 0.0 {
        return Err(VersereelError::validation(
            "max width/height must be > 0",
        ));
    }

    let mut last_attempt: Option<(u32, Wrapped)> = None;

    let mut size = base_size_px;
    loop {
        let line_height = size as f32 * LINE_HEIGHT_FACTOR;

        let single_width = measurer.measure(text, size)?;
        if single_width <= max_width_px && line_height <= max_height_px {
            return Ok(TextBlock {
                lines: vec![text.to_string()],
                font_size_px: size,
                line_height_px: line_height,
                width_px: single_width,
            });
        }

        let wrapped = wrap_greedy(text, size, max_width_px, measurer)?;
        let total_height = wrapped.lines.len() as f32 * line_height;
        if total_height <= max_height_px && wrapped.width_px <= max_width_px {
            return Ok(TextBlock {
                lines: wrapped.lines,
                font_size_px: size,
                line_height_px: line_height,
                width_px: wrapped.width_px,
            });
        }
        last_attempt = Some((size, wrapped));

        if size <= MIN_FONT_SIZE_PX {
            break;
        }
        size = size.saturating_sub(SIZE_STEP_PX).max(MIN_FONT_SIZE_PX);
    }

    // Nothing fit. Keep the floor-size wrapping rather than failing the
    // whole request; the overlay will overflow its box.
    let (size, wrapped) = match last_attempt {
        Some(attempt) => attempt,
        None => (
            MIN_FONT_SIZE_PX,
            wrap_greedy(text, MIN_FONT_SIZE_PX, max_width_px, measurer)?,
        ),
    };
    tracing::warn!(
        font_size_px = size,
        lines = wrapped.lines.len(),
        max_width_px,
        max_height_px,
        "text does not fit its box at the minimum font size; overflowing"
    );
    Ok(TextBlock {
        lines: wrapped.lines,
        font_size_px: size,
        line_height_px: size as f32 * LINE_HEIGHT_FACTOR,
        width_px: wrapped.width_px,
    })
}

/// Greedy whitespace wrap: accumulate words while the running measured width
/// stays within `max_width_px`; close the line on overflow. Language-agnostic
/// and order-preserving.
fn wrap_greedy(
    text: &str,
    font_size_px: u32,
    max_width_px: f32,
    measurer: &mut dyn TextMeasurer,
) -> VersereelResult<Wrapped> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut width_px = 0.0f32;
    let mut current_width = 0.0f32;

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        let candidate_width = measurer.measure(&candidate, font_size_px)?;

        if candidate_width <= max_width_px || current.is_empty() {
            // A single word wider than the box still becomes a line of its
            // own; overflow is tolerated, never clipped.
            current = candidate;
            current_width = candidate_width;
        } else {
            width_px = width_px.max(current_width);
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
            current_width = measurer.measure(word, font_size_px)?;
        }
    }

    if !current.is_empty() {
        width_px = width_px.max(current_width);
        lines.push(current);
    }

    Ok(Wrapped { lines, width_px })
}
