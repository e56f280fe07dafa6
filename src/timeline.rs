//! Partitions a verse range into contiguous timed segments from per-verse
//! audio durations.

use crate::{
    error::{VersereelError, VersereelResult},
    model::{VerseContent, VerseRef},
};

/// One verse with the duration its recitation occupies in the final track.
#[derive(Clone, Debug)]
pub struct TimelineEntry {
    pub content: VerseContent,
    pub duration_secs: f64,
}

/// A verse paired with the half-open interval `[start, end)` during which
/// its overlay is visible.
#[derive(Clone, Debug)]
pub struct TimedSegment {
    pub verse: VerseRef,
    pub start_secs: f64,
    pub end_secs: f64,
    pub arabic: String,
    pub translation: String,
}

impl TimedSegment {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Lay the entries end to end from t=0. The result is gap-free and ordered:
/// `out[i+1].start_secs == out[i].end_secs`, and the last end equals the
/// duration sum. Any unusable duration fails the whole build; time-gated
/// overlays downstream need every boundary defined.
pub fn build_timeline(entries: Vec<TimelineEntry>) -> VersereelResult<Vec<TimedSegment>> {
    if entries.is_empty() {
        return Err(VersereelError::validation(
            "timeline requires at least one verse",
        ));
    }

    for pair in entries.windows(2) {
        let (a, b) = (pair[0].content.verse, pair[1].content.verse);
        if a.surah != b.surah || b.ayah != a.ayah + 1 {
            return Err(VersereelError::validation(format!(
                "verses must be contiguous within one surah, got {a} then {b}"
            )));
        }
    }

    let mut out = Vec::with_capacity(entries.len());
    let mut t = 0.0f64;
    for entry in entries {
        if !entry.duration_secs.is_finite() || entry.duration_secs <= 0.0 {
            return Err(VersereelError::duration_probe(format!(
                "verse {} has unusable duration {}",
                entry.content.verse, entry.duration_secs
            )));
        }
        let start = t;
        t += entry.duration_secs;
        out.push(TimedSegment {
            verse: entry.content.verse,
            start_secs: start,
            end_secs: t,
            arabic: entry.content.arabic,
            translation: entry.content.translation,
        });
    }
    Ok(out)
}
