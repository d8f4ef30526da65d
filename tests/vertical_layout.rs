//! Vertical layout tests — staff distances, hiding, brackets and
//! instrument names.

use pretty_assertions::assert_eq;
use scorelayout::builder::{MeasureBuilder, ScoreBuilder};
use scorelayout::layout::InstrumentNameKind;
use scorelayout::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two single-staff parts with quarter notes on both staves.
fn duet(n: usize) -> ScoreBuilder {
    ScoreBuilder::new()
        .part("Flute", 1)
        .part("Oboe", 1)
        .measures(n, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
            m.notes(4, &[480, 480, 480, 480]);
        })
}

fn show_flags(ctx: &LayoutContext, system: usize) -> Vec<bool> {
    ctx.systems()[system].staves.iter().map(|s| s.show).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Staff distances
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn staff_distance_from_style() {
    init_logger();
    let mut score = duet(4).build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let system = &ctx.systems()[0];

    // staff height 40 + staff distance 6.5sp
    assert_eq!(system.staff_y(0), 0.0);
    assert_eq!(system.staff_y(1), 105.0);
    assert_eq!(system.height, 145.0);
}

#[test]
fn skyline_pushes_staves_apart() {
    init_logger();
    let mut score = duet(4)
        .last(|mb| {
            let m = mb.as_measure_mut().unwrap();
            let seg = m.segments.iter_mut().find(|s| s.is_chord_rest()).unwrap();
            seg.annotations.push(Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 60.0));
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let system = &ctx.systems()[0];

    // dynamic reaches down to 110, the stem below reaches up to -15,
    // plus the minimum vertical distance
    assert!(
        (system.staff_y(1) - 130.0).abs() < 1e-9,
        "staff 1 at {} should clear the dynamic",
        system.staff_y(1)
    );
}

#[test]
fn user_distance_and_spacers() {
    init_logger();
    let mut score = duet(4).staff(1, |s| s.user_dist = 20.0).build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(ctx.systems()[0].staff_y(1), 125.0);

    let mut score = duet(4)
        .measure(|m| {
            m.notes(0, &[1920]).spacer(0, SpacerKind::Fixed, 30.0);
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(ctx.systems()[0].staff_y(1), 70.0, "fixed spacer overrides the distance");

    let mut score = duet(4)
        .measure(|m| {
            m.notes(0, &[1920]).spacer(0, SpacerKind::Down, 100.0);
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(ctx.systems()[0].staff_y(1), 140.0, "spacer down is a minimum");

    let mut score = duet(4)
        .measure(|m| {
            m.notes(0, &[1920]).spacer(1, SpacerKind::Up, 90.0);
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(ctx.systems()[0].staff_y(1), 130.0, "spacer up is a minimum");
}

#[test]
fn continuous_distance_never_shrinks_on_partial_relayout() {
    init_logger();
    let mut score = duet(30).build();
    if let Some(m) = score.measures[20].as_measure_mut() {
        let seg = m.segments.iter_mut().find(|s| s.is_chord_rest()).unwrap();
        seg.annotations.push(Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 60.0));
    }
    let options = LayoutOptions {
        mode: LayoutMode::Line,
        ..Default::default()
    };
    let mut ctx = layout_score(&mut score, options);
    assert_eq!(ctx.systems().len(), 1);
    let wide = ctx.systems()[0].staff_y(1);
    assert!((wide - 130.0).abs() < 1e-9, "got {wide}");

    if let Some(m) = score.measures[20].as_measure_mut() {
        for seg in &mut m.segments {
            seg.annotations.clear();
        }
    }
    let (stick, etick) = (score.measures[2].tick, score.measures[3].tick);
    ctx.layout_range(&mut score, stick, etick);
    assert_eq!(ctx.systems()[0].staff_y(1), wide, "partial relayout keeps the distance");

    ctx.layout_all(&mut score);
    assert_eq!(ctx.systems()[0].staff_y(1), 105.0, "full relayout starts over");
    println!("✓ continuous distance {wide} → 105 after full relayout");
}

// ═══════════════════════════════════════════════════════════════════════
// Hiding empty staves
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn empty_staff_is_hidden_after_first_system() {
    init_logger();
    let mut builder = ScoreBuilder::new()
        .part("Flute", 1)
        .part("Oboe", 1)
        .measures(40, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
        });
    builder.style_mut().hide_empty_staves = true;
    let mut score = builder.build();
    let ctx = layout_score(&mut score, LayoutOptions::default());

    assert!(ctx.systems().len() > 2);
    assert_eq!(show_flags(&ctx, 0), vec![true, true], "first system keeps every staff");
    assert_eq!(show_flags(&ctx, 1), vec![true, false]);
    assert_eq!(ctx.systems()[1].height, 40.0);
}

#[test]
fn instrument_mode_keeps_staff_of_busy_part() {
    init_logger();
    let build = |mode: HideMode| {
        let mut builder = ScoreBuilder::new()
            .part("Piano", 2)
            .staff(0, |s| s.hide_when_empty = mode)
            .staff(1, |s| s.hide_when_empty = mode)
            .measures(40, |_, m| {
                m.notes(0, &[480, 480, 480, 480]);
            });
        builder.style_mut().hide_empty_staves = true;
        builder.build()
    };

    let mut score = build(HideMode::Auto);
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(show_flags(&ctx, 1), vec![true, false]);

    let mut score = build(HideMode::Instrument);
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(show_flags(&ctx, 1), vec![true, true]);
}

#[test]
fn all_empty_system_keeps_one_staff() {
    init_logger();
    let build = |show_if_empty: bool| {
        let mut builder = ScoreBuilder::new()
            .part("Flute", 1)
            .part("Oboe", 1)
            .staff(1, |s| s.show_if_empty = show_if_empty)
            .measures(40, |_, _| {});
        builder.style_mut().hide_empty_staves = true;
        builder.build()
    };

    let mut score = build(false);
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert!(ctx.systems().len() > 1);
    assert_eq!(show_flags(&ctx, 1), vec![true, false], "falls back to the first staff");

    let mut score = build(true);
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(show_flags(&ctx, 1), vec![false, true], "show-if-empty staff wins");
}

#[test]
fn annotations_on_hidden_staff_are_not_placed() {
    init_logger();
    let mut score = duet(2)
        .staff(1, |s| s.show = false)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.notes(4, &[1920]);
            m.annotate(0, Annotation::new(AnnotationKind::StaffText, 4, 20.0, 10.0));
            m.annotate(0, Annotation::new(AnnotationKind::StaffText, 0, 20.0, 10.0));
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(show_flags(&ctx, 0), vec![true, false]);

    let m = score.measures[2].as_measure().unwrap();
    let seg = m.segments.iter().find(|s| s.is_chord_rest()).unwrap();
    let hidden = seg.annotations.iter().find(|a| a.track == 4).unwrap();
    let shown = seg.annotations.iter().find(|a| a.track == 0).unwrap();
    assert_eq!(hidden.pos, geometry::Point::default());
    assert!(shown.pos.y < 0.0, "staff text goes above its staff");
}

// ═══════════════════════════════════════════════════════════════════════
// Brackets
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn brace_spans_both_piano_staves() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Piano", 2)
        .measures(8, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
            m.notes(4, &[480, 480, 480, 480]);
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let system = &ctx.systems()[0];

    assert_eq!(system.brackets.len(), 1);
    let brace = &system.brackets[0];
    assert_eq!(brace.bracket_type(), BracketType::Brace);
    assert_eq!((brace.first_staff, brace.last_staff), (0, 1));
    assert_eq!(brace.y, 0.0);
    assert_eq!(brace.height, system.staff_y(1) + 40.0);
    // the indent already leaves room for the brace
    let indent = score.style.sp(score.style.first_system_indentation);
    assert!((system.left_margin - indent).abs() < 1e-9);
}

#[test]
fn bracket_identity_survives_relayout() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Piano", 2)
        .measures(40, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
            m.notes(4, &[480, 480, 480, 480]);
        })
        .build();
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    let serials = |ctx: &LayoutContext| -> Vec<(u32, Vec<u32>)> {
        ctx.systems()
            .iter()
            .map(|s| (s.id.0, s.brackets.iter().map(|b| b.serial).collect()))
            .collect()
    };
    let before = serials(&ctx);
    assert!(before.iter().all(|(_, b)| b.len() == 1));

    ctx.layout_all(&mut score);
    assert_eq!(serials(&ctx), before);
}

#[test]
fn bracket_after_frame_keeps_its_identity() {
    init_logger();
    let piano = |m: &mut MeasureBuilder| {
        m.notes(0, &[480, 480, 480, 480]);
        m.notes(4, &[1920]);
    };
    let mut score = ScoreBuilder::new()
        .part("Piano", 2)
        .measures(2, |_, m| piano(m))
        .hbox(50.0, true)
        .measures(2, |_, m| piano(m))
        .build();
    let mut ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(ctx.systems().len(), 1);

    let keyed = |ctx: &LayoutContext| -> Vec<(Option<usize>, u32)> {
        let mut v: Vec<_> = ctx.systems()[0].brackets.iter().map(|b| (b.key.measure, b.serial)).collect();
        v.sort();
        v
    };
    let before = keyed(&ctx);
    let measures: Vec<Option<usize>> = before.iter().map(|(m, _)| *m).collect();
    assert_eq!(measures, vec![Some(0), Some(3)], "one brace at the start, one after the frame");
    let frame_brace = ctx.systems()[0].brackets.iter().find(|b| b.key.measure == Some(3)).unwrap();
    assert!(frame_brace.x < score.measures[3].x);

    ctx.layout_all(&mut score);
    assert_eq!(keyed(&ctx), before);
    ctx.layout_all(&mut score);
    assert_eq!(keyed(&ctx), before);
    println!("✓ bracket serials after a frame: {before:?}");
}

#[test]
fn bracket_on_single_visible_staff_is_dropped() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Piano", 2)
        .staff(1, |s| s.show = false)
        .measures(4, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert!(ctx.systems()[0].brackets.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// Instrument names
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn long_names_first_then_short() {
    init_logger();
    let mut score = duet(40).show_instrument_names(true).build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let systems = ctx.systems();

    let first = &systems[0].staves[0].instrument_names;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].text, "Flute");
    assert_eq!(first[0].kind, InstrumentNameKind::Long);
    assert_eq!(first[0].pos.y, 20.0, "centred on the staff");

    let second = &systems[1].staves[1].instrument_names;
    assert_eq!(second[0].text, "Obo.");
    assert_eq!(second[0].kind, InstrumentNameKind::Short);
    assert_eq!(second[0].pos.y, systems[1].staff_y(1) + 20.0);

    // short names and no indentation
    assert!(systems[1].left_margin < systems[0].left_margin);
    assert!(systems[1].left_margin > 0.0);
}

#[test]
fn section_break_restarts_with_long_names() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .part("Oboe", 1)
        .show_instrument_names(true)
        .measures(30, |i, m| {
            m.notes(0, &[480, 480, 480, 480]);
            if i == 12 {
                m.section_break(SectionBreak::default());
            }
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());

    let after = ctx
        .systems()
        .iter()
        .find(|s| s.measures.first() == Some(&13))
        .expect("a system starts after the section break");
    assert_eq!(after.staves[0].instrument_names[0].kind, InstrumentNameKind::Long);
    assert!(after.left_margin >= score.style.sp(score.style.first_system_indentation));
}

#[test]
fn single_instrument_has_no_names() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .show_instrument_names(true)
        .measures(4, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert!(ctx.systems()[0].staves[0].instrument_names.is_empty());
}
