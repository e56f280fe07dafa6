//! End-to-end request orchestration: fetch, time, shape, place, render,
//! compose. One request owns its intermediates; the scoped work directory
//! is released whether the pipeline succeeds or dies halfway.

use anyhow::Context as _;

use crate::{
    arabic,
    compose,
    config::GeneratorConfig,
    error::{VersereelError, VersereelResult},
    fonts::FontRegistry,
    geometry::compute_geometry,
    model::{AudioSegment, GenerateRequest, OutputMode, Rgba8, VerseContent},
    overlay,
    plan::{AudioTrack, TimedOverlay, emit_plan},
    shape::shape,
    sources::{HttpRecitationSource, HttpVerseCorpus, RecitationSource, VerseCorpus},
    store::{ArtifactMeta, OutputStore},
    text::{FontMeasurer, TextEngine},
    timeline::{TimedSegment, TimelineEntry, build_timeline},
};

/// Backdrop fill behind the text blocks.
const PANEL_FILL: Rgba8 = Rgba8::new(0, 0, 0, 160);
const PANEL_CORNER_RADIUS_PX: f64 = 24.0;

pub struct Generator {
    config: GeneratorConfig,
    corpus: Box<dyn VerseCorpus>,
    audio: Box<dyn RecitationSource>,
    fonts: FontRegistry,
    store: OutputStore,
}

impl Generator {
    /// Wire up the HTTP-backed sources from configuration.
    pub fn new(config: GeneratorConfig) -> VersereelResult<Self> {
        let corpus = HttpVerseCorpus::new(
            &config.corpus_base_url,
            &config.arabic_edition,
            &config.translation_edition,
            config.fetch_timeout_secs,
        )?;
        let audio = HttpRecitationSource::new(&config.audio_base_url, config.fetch_timeout_secs)?;
        Self::with_sources(config, Box::new(corpus), Box::new(audio))
    }

    /// Seam for driving the pipeline with fake sources.
    pub fn with_sources(
        config: GeneratorConfig,
        corpus: Box<dyn VerseCorpus>,
        audio: Box<dyn RecitationSource>,
    ) -> VersereelResult<Self> {
        let fonts = FontRegistry::load(&config.fonts)?;
        let store = OutputStore::new(&config.output_dir)?;
        Ok(Self {
            config,
            corpus,
            audio,
            fonts,
            store,
        })
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// Remove artifacts older than the configured retention window.
    pub fn sweep_expired(&self) -> VersereelResult<usize> {
        self.store
            .sweep_older_than(chrono::Duration::hours(self.config.retention_hours))
    }

    /// Generate one video. Validation and font resolution happen before any
    /// network or transcoder call; any later failure aborts the request and
    /// the work directory with all intermediates is dropped either way.
    #[tracing::instrument(skip_all)]
    pub async fn generate(&self, req: &GenerateRequest) -> VersereelResult<ArtifactMeta> {
        req.validate()?;
        if !self.config.watermark.is_file() {
            return Err(VersereelError::validation(format!(
                "watermark image '{}' does not exist",
                self.config.watermark.display()
            )));
        }
        let text_color = req.resolved_text_color()?;
        let arabic_font = self
            .fonts
            .resolve(req.arabic_font.as_deref().unwrap_or(&self.config.arabic_font))?;
        let translation_font = self.fonts.resolve(
            req.translation_font
                .as_deref()
                .unwrap_or(&self.config.translation_font),
        )?;

        let refs = req.range.expand()?;
        tracing::info!(
            surah = req.range.surah,
            verses = refs.len(),
            reciter = %req.reciter,
            "generating verse video"
        );

        let mut contents = Vec::with_capacity(refs.len());
        for verse in &refs {
            let fetched = self.corpus.verse(*verse).await?;
            tracing::debug!(verse = %verse, surah = %fetched.surah_name, "fetched verse text");
            contents.push(VerseContent {
                verse: *verse,
                arabic: arabic::normalize_quranic(&fetched.arabic),
                translation: fetched.translation,
            });
        }

        let work = tempfile::Builder::new()
            .prefix("versereel-")
            .tempdir()
            .with_context(|| "create request work directory")?;

        let (timeline, audio_track) = match req.mode {
            OutputMode::Full => {
                // One at a time, in verse order; concat order must equal
                // verse order, and one failed verse aborts the range.
                let mut segments: Vec<AudioSegment> = Vec::with_capacity(contents.len());
                for content in &contents {
                    let verse = content.verse;
                    let dest = work
                        .path()
                        .join(format!("{:03}{:03}.mp3", verse.surah, verse.ayah));
                    let path = self.audio.fetch(&req.reciter, verse, &dest).await?;
                    let segment = compose::probe_segment(verse, path).await?;
                    tracing::debug!(verse = %verse, duration = segment.duration_secs, "fetched recitation");
                    segments.push(segment);
                }

                let entries = contents
                    .iter()
                    .zip(&segments)
                    .map(|(content, segment)| TimelineEntry {
                        content: content.clone(),
                        duration_secs: segment.duration_secs,
                    })
                    .collect();
                let timeline = build_timeline(entries)?;

                let track = work.path().join("recitation.m4a");
                compose::concat_audio(&segments, &work.path().join("concat.txt"), &track).await?;
                (timeline, AudioTrack::File(track))
            }
            OutputMode::Preview { secs_per_verse } => {
                let entries = contents
                    .iter()
                    .map(|content| TimelineEntry {
                        content: content.clone(),
                        duration_secs: secs_per_verse,
                    })
                    .collect();
                (build_timeline(entries)?, AudioTrack::Silence)
            }
        };

        let overlays =
            self.render_overlays(&timeline, req, text_color, arabic_font, translation_font, work.path())?;

        let total_secs = timeline
            .last()
            .map(|s| s.end_secs)
            .ok_or_else(|| VersereelError::validation("timeline is empty"))?;
        let plan = emit_plan(
            &req.background,
            audio_track,
            &self.config.watermark,
            &overlays,
            req.orientation.frame(),
            total_secs,
        )?;

        let (id, out_path) = self.store.allocate();
        compose::run_plan(&plan, &out_path).await?;

        let meta = self.store.metadata(&id)?;
        tracing::info!(id = %meta.id, size_bytes = meta.size_bytes, "composition complete");
        Ok(meta)
    }

    /// Shape, place, and rasterize every segment's three overlay stills.
    /// Geometry is recomputed per segment; line counts differ verse to
    /// verse.
    fn render_overlays(
        &self,
        timeline: &[TimedSegment],
        req: &GenerateRequest,
        text_color: Rgba8,
        arabic_font: &crate::fonts::FontAsset,
        translation_font: &crate::fonts::FontAsset,
        work_dir: &std::path::Path,
    ) -> VersereelResult<Vec<TimedOverlay>> {
        let frame = req.orientation.frame();
        let width_budget = self.config.gap.text_budget_px(frame) as f32;
        let arabic_max_h = (f64::from(frame.height) * self.config.arabic_max_height_frac) as f32;
        let translation_max_h =
            (f64::from(frame.height) * self.config.translation_max_height_frac) as f32;
        let base_arabic = req
            .base_font_size_px
            .unwrap_or(self.config.base_arabic_size_px);

        let mut engine = TextEngine::new();
        let mut overlays = Vec::with_capacity(timeline.len());

        for segment in timeline {
            let arabic_block = {
                let mut measurer = FontMeasurer {
                    engine: &mut engine,
                    font: arabic_font,
                };
                shape(
                    &segment.arabic,
                    base_arabic,
                    width_budget,
                    arabic_max_h,
                    &mut measurer,
                )?
            };
            let translation_block = {
                let mut measurer = FontMeasurer {
                    engine: &mut engine,
                    font: translation_font,
                };
                shape(
                    &segment.translation,
                    self.config.base_translation_size_px,
                    width_budget,
                    translation_max_h,
                    &mut measurer,
                )?
            };

            let geometry =
                compute_geometry(&arabic_block, &translation_block, frame, &self.config.gap)?;

            let panel_image = overlay::render_panel(
                geometry.panel.width(),
                geometry.panel.height(),
                PANEL_FILL,
                PANEL_CORNER_RADIUS_PX,
            )?;
            let arabic_image =
                overlay::render_text_block(&arabic_block, arabic_font, text_color, &mut engine)?;
            let translation_image = overlay::render_text_block(
                &translation_block,
                translation_font,
                text_color,
                &mut engine,
            )?;

            let verse = segment.verse;
            let panel_path = work_dir.join(format!("panel_{:03}.png", verse.ayah));
            let arabic_path = work_dir.join(format!("arabic_{:03}.png", verse.ayah));
            let translation_path = work_dir.join(format!("translation_{:03}.png", verse.ayah));
            overlay::write_png(&panel_image, &panel_path)?;
            overlay::write_png(&arabic_image, &arabic_path)?;
            overlay::write_png(&translation_image, &translation_path)?;

            overlays.push(TimedOverlay {
                geometry,
                panel_image: panel_path,
                arabic_image: arabic_path,
                translation_image: translation_path,
                start_secs: segment.start_secs,
                end_secs: segment.end_secs,
            });
        }

        Ok(overlays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Orientation, VerseRange, VerseRef},
        sources::VerseText,
    };
    use async_trait::async_trait;
    use std::{
        path::{Path, PathBuf},
        sync::atomic::{AtomicUsize, Ordering},
        sync::Arc,
    };

    struct CountingCorpus {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl VerseCorpus for CountingCorpus {
        async fn verse(&self, _verse: VerseRef) -> VersereelResult<VerseText> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(VersereelError::content_lookup("fake corpus has no verses"))
        }
    }

    struct NoAudio;

    #[async_trait]
    impl RecitationSource for NoAudio {
        async fn fetch(
            &self,
            _reciter: &str,
            _verse: VerseRef,
            _dest: &Path,
        ) -> VersereelResult<PathBuf> {
            Err(VersereelError::asset_fetch("fake source has no audio"))
        }
    }

    fn test_generator(calls: Arc<AtomicUsize>) -> (Generator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig {
            fonts: vec![],
            output_dir: dir.path().join("out"),
            watermark: dir.path().join("wm.png"),
            ..GeneratorConfig::default()
        };
        std::fs::write(dir.path().join("wm.png"), b"png").unwrap();
        let generator =
            Generator::with_sources(config, Box::new(CountingCorpus { calls }), Box::new(NoAudio))
                .unwrap();
        (generator, dir)
    }

    fn request(background: PathBuf) -> GenerateRequest {
        GenerateRequest {
            range: VerseRange {
                surah: 1,
                ayah_start: 1,
                ayah_end: Some(3),
            },
            reciter: "Alafasy_128kbps".to_string(),
            background,
            orientation: Orientation::Landscape,
            mode: OutputMode::Preview { secs_per_verse: 3.0 },
            text_color: None,
            base_font_size_px: None,
            arabic_font: None,
            translation_font: None,
        }
    }

    #[tokio::test]
    async fn invalid_request_fails_before_any_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (generator, dir) = test_generator(calls.clone());

        // Background file does not exist.
        let req = request(dir.path().join("missing.mp4"));
        let err = generator.generate(&req).await.unwrap_err();
        assert!(matches!(err, VersereelError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_font_fails_before_any_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (generator, dir) = test_generator(calls.clone());

        let background = dir.path().join("bg.mp4");
        std::fs::write(&background, b"mp4").unwrap();
        let req = request(background);

        // Registry is empty, so the configured font cannot resolve.
        let err = generator.generate(&req).await.unwrap_err();
        assert!(matches!(err, VersereelError::FontCapability(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sweep_uses_the_configured_retention_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (generator, _dir) = test_generator(calls);

        let (_, path) = generator.store().allocate();
        std::fs::write(&path, b"artifact").unwrap();

        // Default retention is 24h; a fresh artifact survives.
        assert_eq!(generator.sweep_expired().unwrap(), 0);
        assert!(path.exists());
    }
}
