use std::path::PathBuf;

use crate::error::{VersereelError, VersereelResult};

pub const SURAH_COUNT: u16 = 114;

/// Identity of a single verse: surah (chapter) and ayah (verse) number,
/// both 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct VerseRef {
    pub surah: u16,
    pub ayah: u16,
}

impl VerseRef {
    pub fn new(surah: u16, ayah: u16) -> VersereelResult<Self> {
        if surah == 0 || surah > SURAH_COUNT {
            return Err(VersereelError::validation(format!(
                "surah number must be in 1..={SURAH_COUNT}, got {surah}"
            )));
        }
        if ayah == 0 {
            return Err(VersereelError::validation("ayah number must be >= 1"));
        }
        Ok(Self { surah, ayah })
    }
}

impl std::fmt::Display for VerseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.surah, self.ayah)
    }
}

/// Contiguous run of ayahs within one surah. `ayah_end == None` means a
/// single-verse range.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct VerseRange {
    pub surah: u16,
    pub ayah_start: u16,
    pub ayah_end: Option<u16>,
}

impl VerseRange {
    /// Expand to the ordered sequence of verse refs the range covers.
    pub fn expand(&self) -> VersereelResult<Vec<VerseRef>> {
        let end = self.ayah_end.unwrap_or(self.ayah_start);
        if end < self.ayah_start {
            return Err(VersereelError::validation(format!(
                "ayah range end {} is before start {}",
                end, self.ayah_start
            )));
        }
        (self.ayah_start..=end)
            .map(|ayah| VerseRef::new(self.surah, ayah))
            .collect()
    }
}

/// Verse text ready for measurement and drawing. The Arabic string has
/// already been through canonical composition and the hamza/alif repairs.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VerseContent {
    pub verse: VerseRef,
    pub arabic: String,
    pub translation: String,
}

/// A fetched recitation file with its probed duration. Owned by the request;
/// dropped once the per-verse files are concatenated into one track.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    pub verse: VerseRef,
    pub duration_secs: f64,
    pub path: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    Square,
}

impl Orientation {
    pub fn frame(self) -> FrameSize {
        match self {
            Orientation::Landscape => FrameSize {
                width: 1920,
                height: 1080,
            },
            Orientation::Portrait => FrameSize {
                width: 1080,
                height: 1920,
            },
            Orientation::Square => FrameSize {
                width: 1080,
                height: 1080,
            },
        }
    }
}

/// Straight-alpha RGBA color, also used as the text brush during layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Rgba8 = Rgba8 {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(s: &str) -> VersereelResult<Self> {
        fn bad(s: &str) -> VersereelError {
            VersereelError::validation(format!(
                "invalid color '{s}', expected #rrggbb or #rrggbbaa"
            ))
        }
        fn byte(s: &str, hex: &str, range: std::ops::Range<usize>) -> VersereelResult<u8> {
            let pair = hex.get(range).ok_or_else(|| bad(s))?;
            u8::from_str_radix(pair, 16).map_err(|_| bad(s))
        }

        let hex = s.trim().trim_start_matches('#');
        match hex.len() {
            6 => Ok(Self::new(
                byte(s, hex, 0..2)?,
                byte(s, hex, 2..4)?,
                byte(s, hex, 4..6)?,
                255,
            )),
            8 => Ok(Self::new(
                byte(s, hex, 0..2)?,
                byte(s, hex, 2..4)?,
                byte(s, hex, 4..6)?,
                byte(s, hex, 6..8)?,
            )),
            _ => Err(bad(s)),
        }
    }
}

/// How the timeline gets its per-verse durations.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Fetch recitation audio per verse; segment lengths come from the
    /// probed durations.
    Full,
    /// No audio fetch; every verse is shown for a fixed number of seconds
    /// over a silent track.
    Preview { secs_per_verse: f64 },
}

/// One video-generation request. Built once, validated before any I/O,
/// immutable afterwards.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GenerateRequest {
    pub range: VerseRange,
    pub reciter: String,
    pub background: PathBuf,
    pub orientation: Orientation,
    pub mode: OutputMode,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub base_font_size_px: Option<u32>,
    #[serde(default)]
    pub arabic_font: Option<String>,
    #[serde(default)]
    pub translation_font: Option<String>,
}

impl GenerateRequest {
    pub fn validate(&self) -> VersereelResult<()> {
        self.range.expand()?;
        if self.reciter.trim().is_empty() {
            return Err(VersereelError::validation("reciter id must be non-empty"));
        }
        if !self.background.is_file() {
            return Err(VersereelError::validation(format!(
                "background video '{}' does not exist",
                self.background.display()
            )));
        }
        if let Some(color) = &self.text_color {
            Rgba8::from_hex(color)?;
        }
        if let OutputMode::Preview { secs_per_verse } = self.mode
            && (!secs_per_verse.is_finite() || secs_per_verse <= 0.0)
        {
            return Err(VersereelError::validation(
                "preview secs_per_verse must be finite and > 0",
            ));
        }
        Ok(())
    }

    pub fn resolved_text_color(&self) -> VersereelResult<Rgba8> {
        match &self.text_color {
            Some(hex) => Rgba8::from_hex(hex),
            None => Ok(Rgba8::WHITE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verse_ref_rejects_out_of_range_numbers() {
        assert!(VerseRef::new(0, 1).is_err());
        assert!(VerseRef::new(115, 1).is_err());
        assert!(VerseRef::new(2, 0).is_err());
        assert!(VerseRef::new(114, 6).is_ok());
    }

    #[test]
    fn range_expands_in_order() {
        let range = VerseRange {
            surah: 2,
            ayah_start: 255,
            ayah_end: Some(257),
        };
        let refs = range.expand().unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0], VerseRef { surah: 2, ayah: 255 });
        assert_eq!(refs[2], VerseRef { surah: 2, ayah: 257 });
    }

    #[test]
    fn range_without_end_is_single_verse() {
        let range = VerseRange {
            surah: 1,
            ayah_start: 1,
            ayah_end: None,
        };
        assert_eq!(range.expand().unwrap().len(), 1);
    }

    #[test]
    fn range_rejects_end_before_start() {
        let range = VerseRange {
            surah: 1,
            ayah_start: 5,
            ayah_end: Some(3),
        };
        assert!(range.expand().is_err());
    }

    #[test]
    fn orientation_frames_are_fixed() {
        assert_eq!(
            Orientation::Landscape.frame(),
            FrameSize {
                width: 1920,
                height: 1080
            }
        );
        assert_eq!(
            Orientation::Portrait.frame(),
            FrameSize {
                width: 1080,
                height: 1920
            }
        );
        assert_eq!(
            Orientation::Square.frame(),
            FrameSize {
                width: 1080,
                height: 1080
            }
        );
    }

    #[test]
    fn color_parses_hex_forms() {
        assert_eq!(Rgba8::from_hex("#ffffff").unwrap(), Rgba8::WHITE);
        assert_eq!(
            Rgba8::from_hex("10203040").unwrap(),
            Rgba8::new(0x10, 0x20, 0x30, 0x40)
        );
        assert!(Rgba8::from_hex("#fff").is_err());
        assert!(Rgba8::from_hex("zzzzzz").is_err());
    }
}
