//! Drives the pure core end to end: fit search -> timeline -> geometry ->
//! composition plan, with a deterministic measurement oracle standing in for
//! the rasterizer. No network, no fonts, no transcoder.

use std::path::{Path, PathBuf};

use versereel::{
    AudioTrack, GapPolicy, TextMeasurer, TimelineEntry, VerseContent, VerseRef, VersereelResult,
    build_timeline, compute_geometry, emit_plan, shape,
};

/// Every char advances half an em.
struct HalfEm;

impl TextMeasurer for HalfEm {
    fn measure(&mut self, text: &str, font_size_px: u32) -> VersereelResult<f32> {
        Ok(text.chars().count() as f32 * font_size_px as f32 * 0.5)
    }
}

fn content(ayah: u16) -> VerseContent {
    VerseContent {
        verse: VerseRef { surah: 1, ayah },
        arabic: format!("آية رقم {ayah} من السورة الأولى"),
        translation: format!(
            "This is the translation of verse number {ayah}, long enough to wrap in a narrow panel"
        ),
    }
}

#[test]
fn verse_range_flows_into_a_gated_composition_plan() {
    let frame = versereel::Orientation::Landscape.frame();
    let policy = GapPolicy::default();
    let durations = [3.0, 4.2, 2.8];

    let entries = (1..=3)
        .map(|ayah| TimelineEntry {
            content: content(ayah),
            duration_secs: durations[usize::from(ayah) - 1],
        })
        .collect();
    let timeline = build_timeline(entries).unwrap();
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline[0].start_secs, 0.0);
    assert_eq!(timeline[2].end_secs, 10.0);

    let width_budget = policy.text_budget_px(frame) as f32;
    let mut overlays = Vec::new();
    for (i, segment) in timeline.iter().enumerate() {
        let arabic = shape(&segment.arabic, 72, width_budget, 378.0, &mut HalfEm).unwrap();
        let translation =
            shape(&segment.translation, 40, width_budget, 238.0, &mut HalfEm).unwrap();
        assert!(arabic.font_size_px <= 72);
        assert!(!arabic.lines.is_empty());

        let geometry = compute_geometry(&arabic, &translation, frame, &policy).unwrap();

        // Panel contains both blocks plus padding, every segment
        // independently.
        assert!(geometry.panel.y0 <= geometry.arabic.y0 - policy.panel_padding_px + 1e-9);
        assert!(geometry.panel.y1 >= geometry.translation.y1 + policy.panel_padding_px - 1e-9);
        assert!(geometry.panel.x0 <= geometry.arabic.x0);
        assert!(geometry.panel.x1 >= geometry.translation.x1);

        overlays.push(versereel::TimedOverlay {
            geometry,
            panel_image: PathBuf::from(format!("work/panel_{i}.png")),
            arabic_image: PathBuf::from(format!("work/arabic_{i}.png")),
            translation_image: PathBuf::from(format!("work/translation_{i}.png")),
            start_secs: segment.start_secs,
            end_secs: segment.end_secs,
        });
    }

    let plan = emit_plan(
        Path::new("bg.mp4"),
        AudioTrack::File(PathBuf::from("recitation.m4a")),
        Path::new("watermark.png"),
        &overlays,
        frame,
        10.0,
    )
    .unwrap();

    // base + audio + watermark + 3 images per verse.
    assert_eq!(plan.inputs.len(), 12);

    // Exactly one un-gated watermark overlay, applied before any of the
    // nine gated verse overlays.
    let stages: Vec<&str> = plan.filtergraph.split(';').collect();
    let watermark_stage = stages
        .iter()
        .position(|s| s.contains("[2:v]"))
        .expect("watermark stage present");
    assert!(!stages[watermark_stage].contains("enable="));
    let first_gated = stages
        .iter()
        .position(|s| s.contains("enable='between(t,"))
        .expect("gated stages present");
    assert!(watermark_stage < first_gated);

    let gated: Vec<&&str> = stages
        .iter()
        .filter(|s| s.contains("enable='between(t,"))
        .collect();
    assert_eq!(gated.len(), 9);

    // Windows are disjoint, contiguous, and cover the full timeline.
    assert_eq!(plan.filtergraph.matches("between(t,0.000,3.000)").count(), 3);
    assert_eq!(plan.filtergraph.matches("between(t,3.000,7.200)").count(), 3);
    assert_eq!(
        plan.filtergraph.matches("between(t,7.200,10.000)").count(),
        3
    );

    let args = plan.ffmpeg_args(Path::new("out/reel.mp4")).unwrap();
    assert!(args.contains(&"-filter_complex".to_string()));
    assert!(args.contains(&"[vout]".to_string()));
    assert!(args.contains(&"1:a".to_string()));
}

#[test]
fn single_verse_uses_the_same_formulas_as_a_range() {
    let frame = versereel::Orientation::Square.frame();
    let policy = GapPolicy::default();

    let timeline = build_timeline(vec![TimelineEntry {
        content: content(1),
        duration_secs: 4.5,
    }])
    .unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].start_secs, 0.0);
    assert_eq!(timeline[0].end_secs, 4.5);

    let width_budget = policy.text_budget_px(frame) as f32;
    let arabic = shape(&timeline[0].arabic, 64, width_budget, 350.0, &mut HalfEm).unwrap();
    let translation = shape(&timeline[0].translation, 36, width_budget, 230.0, &mut HalfEm).unwrap();
    let geometry = compute_geometry(&arabic, &translation, frame, &policy).unwrap();

    // Same stacking rule as multi-verse ranges: blocks straddle center.
    let center_y = f64::from(frame.height) / 2.0;
    assert!(geometry.arabic.y1 <= center_y);
    assert!(geometry.translation.y0 >= center_y);

    let overlays = [versereel::TimedOverlay {
        geometry,
        panel_image: PathBuf::from("panel.png"),
        arabic_image: PathBuf::from("arabic.png"),
        translation_image: PathBuf::from("translation.png"),
        start_secs: 0.0,
        end_secs: 4.5,
    }];

    let plan = emit_plan(
        Path::new("bg.mp4"),
        AudioTrack::Silence,
        Path::new("watermark.png"),
        &overlays,
        frame,
        4.5,
    )
    .unwrap();

    assert_eq!(plan.inputs.len(), 6);
    assert_eq!(plan.filtergraph.matches("enable='between(t,").count(), 3);
    assert!(plan.filtergraph.ends_with("[vout]"));
}
