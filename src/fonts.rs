//! Logical font names resolved to verified font bytes, once, at startup.
//! A name that cannot be resolved is a typed error at load or lookup time —
//! never a per-request fallback chain.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Context as _;

use crate::{
    config::FontSpec,
    error::{VersereelError, VersereelResult},
    text::TextEngine,
};

/// A loaded font: the logical name requests refer to, the family name the
/// face actually carries, and the raw bytes handed to layout and drawing.
#[derive(Clone, Debug)]
pub struct FontAsset {
    pub name: String,
    pub family: String,
    pub bytes: Arc<Vec<u8>>,
}

impl FontAsset {
    #[cfg(test)]
    pub(crate) fn for_tests(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            family: name.to_string(),
            bytes: Arc::new(bytes),
        }
    }
}

#[derive(Debug)]
pub struct FontRegistry {
    fonts: BTreeMap<String, FontAsset>,
}

impl FontRegistry {
    /// Read and verify every configured font. Verification registers the
    /// bytes with the layout engine, so a font that loads here is one the
    /// engine can measure and draw.
    pub fn load(specs: &[FontSpec]) -> VersereelResult<Self> {
        let mut engine = TextEngine::new();
        let mut fonts = BTreeMap::new();

        for spec in specs {
            let bytes = std::fs::read(&spec.path)
                .with_context(|| format!("read font '{}' from '{}'", spec.name, spec.path.display()))
                .map_err(|e| VersereelError::font(e.to_string()))?;
            let family = engine.register(&bytes).map_err(|e| {
                VersereelError::font(format!(
                    "font '{}' ('{}') is unusable: {e}",
                    spec.name,
                    spec.path.display()
                ))
            })?;

            tracing::debug!(name = %spec.name, family = %family, "registered font");
            fonts.insert(
                spec.name.clone(),
                FontAsset {
                    name: spec.name.clone(),
                    family,
                    bytes: Arc::new(bytes),
                },
            );
        }

        Ok(Self { fonts })
    }

    pub fn resolve(&self, name: &str) -> VersereelResult<&FontAsset> {
        self.fonts.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.fonts.keys().map(String::as_str).collect();
            VersereelError::font(format!(
                "unknown font '{name}', registered fonts: [{}]",
                known.join(", ")
            ))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn load_fails_on_missing_file() {
        let specs = [FontSpec {
            name: "ghost".to_string(),
            path: PathBuf::from("/nonexistent/ghost.ttf"),
        }];
        let err = FontRegistry::load(&specs).unwrap_err();
        assert!(matches!(err, VersereelError::FontCapability(_)));
    }

    #[test]
    fn load_fails_on_non_font_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_font.ttf");
        std::fs::write(&path, b"definitely not sfnt data").unwrap();

        let specs = [FontSpec {
            name: "bogus".to_string(),
            path,
        }];
        let err = FontRegistry::load(&specs).unwrap_err();
        assert!(err.to_string().contains("unusable"));
    }

    #[test]
    fn resolve_reports_known_names() {
        let registry = FontRegistry::load(&[]).unwrap();
        assert!(registry.is_empty());
        let err = registry.resolve("amiri").unwrap_err();
        assert!(err.to_string().contains("unknown font 'amiri'"));
    }
}
