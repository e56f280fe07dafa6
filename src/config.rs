use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    error::VersereelResult,
    geometry::GapPolicy,
};

/// Where a logical font name resolves to on disk.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FontSpec {
    pub name: String,
    pub path: PathBuf,
}

/// Everything a [`crate::pipeline::Generator`] needs that is not part of a
/// single request. Built once at startup and never mutated; font lookups go
/// through the registry constructed from `fonts`, not through any global
/// table.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Verse text API root, alquran.cloud layout.
    pub corpus_base_url: String,
    pub arabic_edition: String,
    pub translation_edition: String,
    /// Recitation CDN root, everyayah.com layout
    /// (`{base}/{reciter}/{SSS}{AAA}.mp3`).
    pub audio_base_url: String,
    /// Ceiling for each network fetch; one expiry fails the whole request.
    pub fetch_timeout_secs: u64,

    pub fonts: Vec<FontSpec>,
    pub arabic_font: String,
    pub translation_font: String,

    pub watermark: PathBuf,
    pub output_dir: PathBuf,
    pub retention_hours: i64,

    pub gap: GapPolicy,
    pub base_arabic_size_px: u32,
    pub base_translation_size_px: u32,
    /// Height budgets for the two text blocks, as fractions of frame height.
    pub arabic_max_height_frac: f64,
    pub translation_max_height_frac: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            corpus_base_url: "https://api.alquran.cloud/v1".to_string(),
            arabic_edition: "quran-uthmani".to_string(),
            translation_edition: "en.sahih".to_string(),
            audio_base_url: "https://everyayah.com/data".to_string(),
            fetch_timeout_secs: 30,
            fonts: vec![
                FontSpec {
                    name: "amiri".to_string(),
                    path: PathBuf::from("assets/fonts/Amiri-Regular.ttf"),
                },
                FontSpec {
                    name: "noto-sans".to_string(),
                    path: PathBuf::from("assets/fonts/NotoSans-Regular.ttf"),
                },
            ],
            arabic_font: "amiri".to_string(),
            translation_font: "noto-sans".to_string(),
            watermark: PathBuf::from("assets/watermark.png"),
            output_dir: PathBuf::from("output"),
            retention_hours: 24,
            gap: GapPolicy::default(),
            base_arabic_size_px: 72,
            base_translation_size_px: 40,
            arabic_max_height_frac: 0.35,
            translation_max_height_frac: 0.22,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_file(path: &Path) -> VersereelResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: GeneratorConfig = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let cfg = GeneratorConfig::default();
        let s = serde_json::to_string_pretty(&cfg).unwrap();
        let de: GeneratorConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.corpus_base_url, cfg.corpus_base_url);
        assert_eq!(de.retention_hours, 24);
        assert_eq!(de.fonts.len(), 2);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let de: GeneratorConfig =
            serde_json::from_str(r#"{ "retention_hours": 6 }"#).unwrap();
        assert_eq!(de.retention_hours, 6);
        assert_eq!(de.fetch_timeout_secs, 30);
        assert_eq!(de.arabic_font, "amiri");
    }
}
