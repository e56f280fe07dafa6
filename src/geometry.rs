//! Pixel geometry for one segment's overlay: the Arabic block above, the
//! translation block below, and a panel containing both.

use kurbo::{Point, Rect};

use crate::{
    error::{VersereelError, VersereelResult},
    model::FrameSize,
    shape::TextBlock,
};

/// Spacing knobs for the overlay stack.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GapPolicy {
    /// Extra vertical gap between the Arabic and translation blocks.
    pub inter_block_gap_px: f64,
    /// Padding around both blocks when drawing the panel.
    pub panel_padding_px: f64,
    /// Fraction of the frame width the panel spans.
    pub panel_width_fraction: f64,
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self {
            inter_block_gap_px: 24.0,
            panel_padding_px: 32.0,
            panel_width_fraction: 0.9,
        }
    }
}

impl GapPolicy {
    pub fn validate(&self) -> VersereelResult<()> {
        if self.inter_block_gap_px < 0.0 || self.panel_padding_px < 0.0 {
            return Err(VersereelError::validation(
                "gap and padding must be >= 0",
            ));
        }
        if !(self.panel_width_fraction > 0.0 && self.panel_width_fraction <= 1.0) {
            return Err(VersereelError::validation(
                "panel_width_fraction must be in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Widest a text block may measure while still sitting inside the panel
    /// with padding on both sides.
    pub fn text_budget_px(&self, frame: FrameSize) -> f64 {
        f64::from(frame.width) * self.panel_width_fraction - 2.0 * self.panel_padding_px
    }
}

/// Where one segment's three overlay images land in the frame. A pure
/// function of its inputs, recomputed per segment; verses wrap to different
/// line counts, so nothing here may be cached across segments.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayGeometry {
    pub panel: Rect,
    pub arabic: Rect,
    pub translation: Rect,
}

impl OverlayGeometry {
    pub fn arabic_anchor(&self) -> Point {
        self.arabic.center()
    }

    pub fn translation_anchor(&self) -> Point {
        self.translation.center()
    }
}

/// Stack both blocks around the vertical center of the frame: Arabic above
/// center by `height/2 + gap`, translation below by the same rule, panel
/// spanning both plus padding. Single- and multi-verse ranges go through the
/// identical formula.
pub fn compute_geometry(
    arabic: &TextBlock,
    translation: &TextBlock,
    frame: FrameSize,
    policy: &GapPolicy,
) -> VersereelResult<OverlayGeometry> {
    if frame.width == 0 || frame.height == 0 {
        return Err(VersereelError::validation("frame must be non-empty"));
    }
    policy.validate()?;

    let frame_w = f64::from(frame.width);
    let center_x = frame_w / 2.0;
    let center_y = f64::from(frame.height) / 2.0;

    let arabic_h = f64::from(arabic.height_px());
    let translation_h = f64::from(translation.height_px());

    let arabic_center_y = center_y - (arabic_h / 2.0 + policy.inter_block_gap_px);
    let translation_center_y = center_y + (translation_h / 2.0 + policy.inter_block_gap_px);

    let arabic_rect = centered_rect(
        center_x,
        arabic_center_y,
        f64::from(arabic.width_px),
        arabic_h,
    );
    let translation_rect = centered_rect(
        center_x,
        translation_center_y,
        f64::from(translation.width_px),
        translation_h,
    );

    let panel_w = frame_w * policy.panel_width_fraction;
    let panel = Rect::new(
        center_x - panel_w / 2.0,
        arabic_rect.y0 - policy.panel_padding_px,
        center_x + panel_w / 2.0,
        translation_rect.y1 + policy.panel_padding_px,
    );

    Ok(OverlayGeometry {
        panel,
        arabic: arabic_rect,
        translation: translation_rect,
    })
}

fn centered_rect(cx: f64, cy: f64, w: f64, h: f64) -> Rect {
    Rect::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
}
