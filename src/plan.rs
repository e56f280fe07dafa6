//! Turns timed overlays + geometry into an ffmpeg input table and
//! `filter_complex` graph.
//!
//! Input index assignment is load-bearing: background=0, audio=1,
//! watermark=2, then three image inputs per verse segment in verse order
//! (panel, Arabic, translation). Every declared input is referenced exactly
//! once — the video inputs by graph index, the audio input by stream map.

use std::path::{Path, PathBuf};

use crate::{
    error::{VersereelError, VersereelResult},
    geometry::OverlayGeometry,
    model::FrameSize,
};

/// Distance of the watermark from the bottom-right frame corner.
const WATERMARK_MARGIN_PX: u32 = 24;

/// Tolerance when checking that overlay windows tile the timeline.
const WINDOW_EPSILON: f64 = 1e-6;

/// The audio side of the output: a concatenated recitation track, or a
/// silent source for previews (which keeps the input indices identical in
/// both modes).
#[derive(Clone, Debug)]
pub enum AudioTrack {
    File(PathBuf),
    Silence,
}

/// One verse segment's contribution to the composition: three rendered
/// images, where they land, and when they are visible.
#[derive(Clone, Debug)]
pub struct TimedOverlay {
    pub geometry: OverlayGeometry,
    pub panel_image: PathBuf,
    pub arabic_image: PathBuf,
    pub translation_image: PathBuf,
    pub start_secs: f64,
    pub end_secs: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlanInput {
    /// Looped so a short background survives a long recitation.
    BackgroundVideo(PathBuf),
    AudioFile(PathBuf),
    SilentAudio,
    OverlayImage(PathBuf),
}

/// A fully-resolved invocation of the external compositor: ordered inputs,
/// the filter graph, and the terminal video label.
#[derive(Clone, Debug)]
pub struct CompositionPlan {
    pub inputs: Vec<PlanInput>,
    pub filtergraph: String,
    pub video_label: String,
    pub frame: FrameSize,
    pub total_secs: f64,
}

/// Build the composition plan for one request.
///
/// The watermark is composed once, before any verse overlay, with no time
/// gate, so it persists for the whole duration. Each verse's three overlays
/// carry `enable='between(t,start,end)'` and consume the previous stage's
/// output as their base, so exactly one verse is visible at any instant.
pub fn emit_plan(
    background: &Path,
    audio: AudioTrack,
    watermark: &Path,
    overlays: &[TimedOverlay],
    frame: FrameSize,
    total_secs: f64,
) -> VersereelResult<CompositionPlan> {
    if overlays.is_empty() {
        return Err(VersereelError::validation(
            "composition requires at least one verse overlay",
        ));
    }
    if !(total_secs.is_finite() && total_secs > 0.0) {
        return Err(VersereelError::validation(
            "composition duration must be finite and > 0",
        ));
    }
    validate_windows(overlays, total_secs)?;

    let mut inputs = Vec::with_capacity(3 + overlays.len() * 3);
    inputs.push(PlanInput::BackgroundVideo(background.to_path_buf()));
    inputs.push(match audio {
        AudioTrack::File(path) => PlanInput::AudioFile(path),
        AudioTrack::Silence => PlanInput::SilentAudio,
    });
    inputs.push(PlanInput::OverlayImage(watermark.to_path_buf()));

    let mut parts: Vec<String> = Vec::new();
    parts.push(format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1[bg]",
        w = frame.width,
        h = frame.height,
    ));
    parts.push(format!(
        "[bg][2:v]overlay=x=main_w-overlay_w-{m}:y=main_h-overlay_h-{m}[base]",
        m = WATERMARK_MARGIN_PX,
    ));

    let mut prev = "base".to_string();
    for (seg, overlay) in overlays.iter().enumerate() {
        let first_input = 3 + seg * 3;
        let geo = &overlay.geometry;

        let stages = [
            (&overlay.panel_image, geo.panel.x0, geo.panel.y0, "p"),
            (&overlay.arabic_image, geo.arabic.x0, geo.arabic.y0, "a"),
            (
                &overlay.translation_image,
                geo.translation.x0,
                geo.translation.y0,
                "t",
            ),
        ];

        for (stage, (image, x, y, tag)) in stages.into_iter().enumerate() {
            inputs.push(PlanInput::OverlayImage(image.clone()));
            let input_index = first_input + stage;
            let is_last = seg + 1 == overlays.len() && stage == 2;
            let label = if is_last {
                "vout".to_string()
            } else {
                format!("v{seg}{tag}")
            };
            parts.push(format!(
                "[{prev}][{input_index}:v]overlay=x={x}:y={y}:enable='between(t,{start},{end})'[{label}]",
                x = x.round() as i64,
                y = y.round() as i64,
                start = format_secs(overlay.start_secs),
                end = format_secs(overlay.end_secs),
            ));
            prev = label;
        }
    }

    Ok(CompositionPlan {
        inputs,
        filtergraph: parts.join(";"),
        video_label: prev,
        frame,
        total_secs,
    })
}

fn validate_windows(overlays: &[TimedOverlay], total_secs: f64) -> VersereelResult<()> {
    if overlays[0].start_secs.abs() > WINDOW_EPSILON {
        return Err(VersereelError::validation(
            "first overlay window must start at 0",
        ));
    }
    for overlay in overlays {
        if overlay.end_secs - overlay.start_secs <= 0.0 {
            return Err(VersereelError::validation(
                "overlay windows must have positive length",
            ));
        }
    }
    for pair in overlays.windows(2) {
        if (pair[1].start_secs - pair[0].end_secs).abs() > WINDOW_EPSILON {
            return Err(VersereelError::validation(format!(
                "overlay windows must be contiguous, got end {} then start {}",
                pair[0].end_secs, pair[1].start_secs
            )));
        }
    }
    let last_end = overlays[overlays.len() - 1].end_secs;
    if (last_end - total_secs).abs() > WINDOW_EPSILON {
        return Err(VersereelError::validation(format!(
            "overlay windows cover [0, {last_end}) but the composition lasts {total_secs}"
        )));
    }
    Ok(())
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.3}")
}

fn path_arg(path: &Path) -> VersereelResult<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        VersereelError::validation(format!(
            "path '{}' is not valid UTF-8",
            path.display()
        ))
    })
}

impl CompositionPlan {
    /// Render the plan to a full ffmpeg argument vector writing `out_path`.
    /// Video maps from the terminal graph label, audio from input 1.
    pub fn ffmpeg_args(&self, out_path: &Path) -> VersereelResult<Vec<String>> {
        let mut args: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];

        for input in &self.inputs {
            match input {
                PlanInput::BackgroundVideo(path) => {
                    args.extend(["-stream_loop".into(), "-1".into(), "-i".into()]);
                    args.push(path_arg(path)?);
                }
                PlanInput::AudioFile(path) => {
                    args.push("-i".into());
                    args.push(path_arg(path)?);
                }
                PlanInput::SilentAudio => {
                    args.extend([
                        "-f".into(),
                        "lavfi".into(),
                        "-i".into(),
                        "anullsrc=r=44100:cl=stereo".into(),
                    ]);
                }
                PlanInput::OverlayImage(path) => {
                    args.push("-i".into());
                    args.push(path_arg(path)?);
                }
            }
        }

        args.extend(["-filter_complex".into(), self.filtergraph.clone()]);
        args.extend(["-map".into(), format!("[{}]", self.video_label)]);
        args.extend(["-map".into(), "1:a".into()]);
        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-preset".into(),
            "medium".into(),
            "-crf".into(),
            "23".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-t".into(),
            format_secs(self.total_secs),
            "-movflags".into(),
            "+faststart".into(),
        ]);
        args.push(path_arg(out_path)?);
        Ok(args)
    }
}
