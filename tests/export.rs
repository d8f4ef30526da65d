//! Loading, validation and export tests — JSON in and out, SVG preview.

use pretty_assertions::assert_eq;
use scorelayout::builder::ScoreBuilder;
use scorelayout::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample() -> Score {
    ScoreBuilder::new()
        .part("Piano", 2)
        .show_instrument_names(true)
        .measures(24, |i, m| {
            m.notes(0, &[480, 480, 480, 480]);
            m.notes(4, &[1920]);
            if i == 0 {
                m.annotate(0, Annotation::new(AnnotationKind::TempoText, 0, 40.0, 10.0));
            }
        })
        .spanner(Spanner::new(SpannerKind::Slur, 0, 0, 1440))
        .build()
}

// ═══════════════════════════════════════════════════════════════════════
// JSON
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn systems_export_as_json_array() {
    init_logger();
    let mut score = sample();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let json = layout_to_json(ctx.systems()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let systems = value.as_array().unwrap();
    assert_eq!(systems.len(), ctx.systems().len());
    assert_eq!(systems[0]["measures"].as_array().unwrap().len(), ctx.systems()[0].measures.len());
    assert_eq!(systems[0]["staves"].as_array().unwrap().len(), 2);
    assert!(!systems[0]["spanner_segments"].as_array().unwrap().is_empty());
}

#[test]
fn layout_json_matches_direct_layout() {
    init_logger();
    let score = sample();
    let input = score.to_json().unwrap();

    let output = layout_json(&input, LayoutOptions::default()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();

    let mut direct = score.clone();
    let ctx = layout_score(&mut direct, LayoutOptions::default());
    assert_eq!(value.as_array().unwrap().len(), ctx.systems().len());
}

#[test]
fn options_fill_in_defaults() {
    let options: LayoutOptions = serde_json::from_str(r#"{ "mode": "Line" }"#).unwrap();
    assert_eq!(options.mode, LayoutMode::Line);
    assert!(options.first_system_indent);
    assert_eq!(options.max_chord_shift_above, 0.0);
}

#[test]
fn style_json_keeps_missing_defaults() {
    let style = Style::from_json(r#"{ "spatium": 12.0 }"#).unwrap();
    assert_eq!(style.spatium, 12.0);
    assert_eq!(style.page_printable_width, Style::default().page_printable_width);

    let again = Style::from_json(&style.to_json().unwrap()).unwrap();
    assert_eq!(again, style);
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn invalid_style_is_rejected() {
    let err = Style::from_json(r#"{ "spatium": -1.0 }"#).unwrap_err();
    assert!(matches!(err, LayoutError::InvalidStyle(_)), "got {err}");

    let err = Style::from_json(r#"{ "squeezability": 1.5 }"#).unwrap_err();
    assert!(err.to_string().contains("squeezability"));
}

#[test]
fn inconsistent_score_is_rejected() {
    let mut score = sample();
    score.staves[1].part = 3;
    let err = Score::from_json(&score.to_json().unwrap()).unwrap_err();
    assert!(matches!(err, LayoutError::InvalidScore(_)), "got {err}");

    let mut score = sample();
    score.measures[5].tick += 1;
    assert!(matches!(score.validate(), Err(LayoutError::InvalidScore(_))));

    let mut score = sample();
    score.spanners[0].tick2 = -1;
    assert!(score.validate().is_err());
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = layout_json("{ not json", LayoutOptions::default()).unwrap_err();
    assert!(matches!(err, LayoutError::Json(_)));
}

// ═══════════════════════════════════════════════════════════════════════
// SVG preview
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn preview_draws_every_system() {
    init_logger();
    let mut score = sample();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let svg = render_layout_svg(&score, ctx.systems());

    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains("<line"));
    assert!(svg.contains("<path"), "slur drawn as a curve");
    for system in ctx.systems() {
        assert!(svg.contains(&format!("<!-- system {} -->", system.id.0)));
    }
    println!("✓ preview: {} bytes for {} systems", svg.len(), ctx.systems().len());
}

#[test]
fn preview_without_systems() {
    let score = sample();
    let svg = render_layout_svg(&score, &[]);
    assert!(svg.contains("No systems laid out"));
}
