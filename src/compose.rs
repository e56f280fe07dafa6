//! Everything that shells out to the transcoding engine: duration probing,
//! per-verse audio concatenation, and executing a composition plan. The
//! engine is a black box; all we see is exit status plus diagnostic text.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    error::{VersereelError, VersereelResult},
    model::AudioSegment,
    plan::CompositionPlan,
};

pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> VersereelResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

// -------------------------------------------------------------------------
// Duration probing

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    format: Option<ProbeFormat>,
}

fn parse_probe_duration(stdout: &[u8], source: &Path) -> VersereelResult<f64> {
    let parsed: ProbeOut = serde_json::from_slice(stdout).map_err(|e| {
        VersereelError::duration_probe(format!("ffprobe json parse failed: {e}"))
    })?;
    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            VersereelError::duration_probe(format!(
                "no duration reported for '{}'",
                source.display()
            ))
        })?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(VersereelError::duration_probe(format!(
            "'{}' reports unusable duration {duration}",
            source.display()
        )));
    }
    Ok(duration)
}

/// Probe a media file's duration in seconds via `ffprobe`.
pub async fn probe_duration_secs(source: &Path) -> VersereelResult<f64> {
    let out = tokio::process::Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(source)
        .output()
        .await
        .map_err(|e| VersereelError::duration_probe(format!("failed to run ffprobe: {e}")))?;

    if !out.status.success() {
        return Err(VersereelError::duration_probe(format!(
            "ffprobe failed for '{}': {}",
            source.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_duration(&out.stdout, source)
}

// -------------------------------------------------------------------------
// Audio concatenation

/// Escape a path for an ffmpeg concat list entry (`file '...'`).
fn concat_list_entry(path: &Path) -> VersereelResult<String> {
    let s = path.to_str().ok_or_else(|| {
        VersereelError::validation(format!("path '{}' is not valid UTF-8", path.display()))
    })?;
    Ok(format!("file '{}'", s.replace('\'', r"'\''")))
}

/// Join per-verse recitation files into one AAC track. List order is the
/// caller's segment order, which must already be verse order.
pub async fn concat_audio(
    segments: &[AudioSegment],
    list_path: &Path,
    out_path: &Path,
) -> VersereelResult<()> {
    if segments.is_empty() {
        return Err(VersereelError::validation(
            "audio concatenation requires at least one segment",
        ));
    }

    let mut list = String::new();
    for segment in segments {
        list.push_str(&concat_list_entry(&segment.path)?);
        list.push('\n');
    }
    tokio::fs::write(list_path, list)
        .await
        .with_context(|| format!("write concat list '{}'", list_path.display()))?;

    let out = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(list_path)
        .args(["-vn", "-c:a", "aac", "-b:a", "192k"])
        .arg(out_path)
        .output()
        .await
        .map_err(|e| VersereelError::composition(format!("failed to run ffmpeg: {e}")))?;

    if !out.status.success() {
        return Err(VersereelError::composition(format!(
            "audio concatenation failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

// -------------------------------------------------------------------------
// Plan execution

/// Run a composition plan to completion. Long-running; reports only terminal
/// success or failure, with the engine's stderr preserved for operators.
pub async fn run_plan(plan: &CompositionPlan, out_path: &Path) -> VersereelResult<()> {
    ensure_parent_dir(out_path)?;
    if !is_ffmpeg_on_path() {
        return Err(VersereelError::composition(
            "ffmpeg is required for composition, but was not found on PATH",
        ));
    }

    let args = plan.ffmpeg_args(out_path)?;
    tracing::debug!(args = ?args, "invoking ffmpeg");

    let out = tokio::process::Command::new("ffmpeg")
        .args(&args)
        .output()
        .await
        .map_err(|e| {
            VersereelError::composition(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(VersereelError::composition(format!(
            "ffmpeg exited with status {}: {}",
            out.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Convenience wrapper: probe a freshly fetched recitation file into an
/// [`AudioSegment`].
pub async fn probe_segment(
    verse: crate::model::VerseRef,
    path: PathBuf,
) -> VersereelResult<AudioSegment> {
    let duration_secs = probe_duration_secs(&path).await?;
    Ok(AudioSegment {
        verse,
        duration_secs,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_parse_reads_format_duration() {
        let json = br#"{ "format": { "filename": "a.mp3", "duration": "4.5" } }"#;
        let d = parse_probe_duration(json, Path::new("a.mp3")).unwrap();
        assert!((d - 4.5).abs() < 1e-9);
    }

    #[test]
    fn probe_parse_rejects_missing_duration() {
        let json = br#"{ "format": { "filename": "a.mp3" } }"#;
        let err = parse_probe_duration(json, Path::new("a.mp3")).unwrap_err();
        assert!(matches!(err, VersereelError::DurationProbe(_)));

        let json = br#"{ }"#;
        assert!(parse_probe_duration(json, Path::new("a.mp3")).is_err());
    }

    #[test]
    fn probe_parse_rejects_non_positive_duration() {
        let json = br#"{ "format": { "duration": "0.0" } }"#;
        assert!(parse_probe_duration(json, Path::new("a.mp3")).is_err());
        let json = br#"{ "format": { "duration": "-3" } }"#;
        assert!(parse_probe_duration(json, Path::new("a.mp3")).is_err());
    }

    #[test]
    fn concat_entries_quote_and_escape() {
        assert_eq!(
            concat_list_entry(Path::new("/tmp/work/001001.mp3")).unwrap(),
            "file '/tmp/work/001001.mp3'"
        );
        assert_eq!(
            concat_list_entry(Path::new("/tmp/it's here.mp3")).unwrap(),
            r"file '/tmp/it'\''s here.mp3'"
        );
    }
}
