//! Annotation placement tests — slurs and ties, line spanners, chord
//! symbols, dynamics, lyrics, articulations and tuplets.

use pretty_assertions::assert_eq;
use scorelayout::builder::ScoreBuilder;
use scorelayout::geometry::{Point, Rect};
use scorelayout::layout::{SpannerSegment, SpannerSegmentType, System};
use scorelayout::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Chord/rest segment number `n` of measure `mi`.
fn chord_segment(score: &Score, mi: usize, n: usize) -> &Segment {
    score.measures[mi]
        .as_measure()
        .unwrap()
        .segments
        .iter()
        .filter(|s| s.is_chord_rest())
        .nth(n)
        .unwrap()
}

fn annotation(score: &Score, mi: usize, n: usize, kind: AnnotationKind) -> &Annotation {
    chord_segment(score, mi, n)
        .annotations
        .iter()
        .find(|a| a.kind == kind)
        .unwrap()
}

fn segments_of(system: &System, kind: SpannerKind) -> Vec<&SpannerSegment> {
    system.spanner_segments.iter().filter(|s| s.kind == kind).collect()
}

fn solo(n: usize) -> ScoreBuilder {
    ScoreBuilder::new().part("Flute", 1).measures(n, |_, m| {
        m.notes(0, &[480, 480, 480, 480]);
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Slurs and ties
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn slur_starting_on_tie_moves_outwards() {
    init_logger();
    let mut score = solo(2)
        .spanner(Spanner::new(SpannerKind::Tie, 0, 0, 480))
        .spanner(Spanner::new(SpannerKind::Slur, 0, 0, 960))
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let system = &ctx.systems()[0];

    let tie = segments_of(system, SpannerKind::Tie)[0];
    let slur = segments_of(system, SpannerKind::Slur)[0];
    // stem top at -15, tie endpoint offset 2.5
    assert!(approx(tie.start.y, -17.5), "tie start {}", tie.start.y);
    // slur endpoint offset 5, then one collision offset further up
    assert!(approx(slur.start.y, -26.5), "slur start {}", slur.start.y);
    assert!(approx(slur.end.y, -20.0), "slur end stays on its chord");
    assert!(slur.start.x < slur.end.x);
    println!("✓ slur lifted over tie: {} vs {}", slur.start.y, tie.start.y);
}

#[test]
fn handover_slurs_are_pulled_apart() {
    init_logger();
    let mut score = solo(2)
        .spanner(Spanner::new(SpannerKind::Slur, 0, 0, 480))
        .spanner(Spanner::new(SpannerKind::Slur, 0, 480, 960))
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let slurs = segments_of(&ctx.systems()[0], SpannerKind::Slur);
    assert_eq!(slurs.len(), 2);

    let (first, second) = if slurs[0].start.x < slurs[1].start.x {
        (slurs[0], slurs[1])
    } else {
        (slurs[1], slurs[0])
    };
    assert!(approx(second.start.x - first.end.x, 4.0), "gap {}", second.start.x - first.end.x);
    assert!(approx(first.end.y, second.start.y));
}

#[test]
fn slur_across_systems_is_split() {
    init_logger();
    let mut score = solo(40).build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let boundary = ctx.systems()[1].tick(&score);

    let mut score = solo(40)
        .spanner(Spanner::new(SpannerKind::Slur, 0, boundary - 480, boundary + 480))
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let types: Vec<SpannerSegmentType> = ctx.systems()[..2]
        .iter()
        .flat_map(|s| segments_of(s, SpannerKind::Slur))
        .map(|s| s.segment_type)
        .collect();
    assert_eq!(types, vec![SpannerSegmentType::Begin, SpannerSegmentType::End]);
}

#[test]
fn cross_staff_slur_reaches_lower_staff() {
    init_logger();
    let mut slur = Spanner::new(SpannerKind::Slur, 0, 0, 480);
    slur.track2 = 4;
    let mut score = ScoreBuilder::new()
        .part("Piano", 2)
        .measures(2, |_, m| {
            m.notes(0, &[480, 480, 480, 480]);
            m.notes(4, &[480, 480, 480, 480]);
        })
        .spanner(slur)
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let system = &ctx.systems()[0];

    let slurs = segments_of(system, SpannerKind::Slur);
    assert_eq!(slurs.len(), 1, "laid out once, after the staff distances");
    assert_eq!(slurs[0].staff, 0);
    assert!(approx(slurs[0].start.y, -20.0));
    assert!(approx(slurs[0].end.y, system.staff_y(1) - 20.0), "end {}", slurs[0].end.y);
}

// ═══════════════════════════════════════════════════════════════════════
// Line spanners
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn adjacent_voltas_share_a_height() {
    init_logger();
    let mut score = solo(4)
        .spanner(Spanner::new(SpannerKind::Volta, 0, 0, 1920))
        .spanner(Spanner::new(SpannerKind::Volta, 0, 1920, 3840))
        .build();
    score.measures[1]
        .as_measure_mut()
        .unwrap()
        .segments
        .iter_mut()
        .find(|s| s.is_chord_rest())
        .unwrap()
        .annotations
        .push(Annotation::new(AnnotationKind::StaffText, 0, 20.0, 40.0));
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let voltas = segments_of(&ctx.systems()[0], SpannerKind::Volta);

    assert_eq!(voltas.len(), 2);
    assert_eq!(voltas[0].pos.y, voltas[1].pos.y);
    // on its own the first volta only has to clear the stems
    assert!(voltas[0].pos.y < -35.0, "first volta at {}", voltas[0].pos.y);
    let text = annotation(&score, 1, 0, AnnotationKind::StaffText);
    assert!(voltas[1].pos.y + voltas[1].bbox.height <= text.pos.y + 1e-9);
}

#[test]
fn hairpin_below_clears_dynamic() {
    init_logger();
    let mut score = solo(2)
        .spanner(Spanner::new(SpannerKind::Hairpin, 0, 0, 960))
        .build();
    score.measures[0]
        .as_measure_mut()
        .unwrap()
        .segments
        .iter_mut()
        .find(|s| s.is_chord_rest())
        .unwrap()
        .annotations
        .push(Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 10.0));
    let ctx = layout_score(&mut score, LayoutOptions::default());

    let dynamic = annotation(&score, 0, 0, AnnotationKind::Dynamic);
    let hairpin = segments_of(&ctx.systems()[0], SpannerKind::Hairpin)[0];
    assert_eq!(hairpin.segment_type, SpannerSegmentType::Single);
    assert!(hairpin.pos.y >= dynamic.pos.y + dynamic.bbox.height + 5.0 - 1e-9);
}

#[test]
fn harmonic_mark_sits_on_vibrato() {
    init_logger();
    let mut score = solo(2)
        .spanner(Spanner::new(SpannerKind::HarmonicMark, 0, 0, 960))
        .spanner(Spanner::new(SpannerKind::Vibrato, 0, 0, 960))
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let system = &ctx.systems()[0];

    let vibrato = segments_of(system, SpannerKind::Vibrato)[0].shape();
    let mark = segments_of(system, SpannerKind::HarmonicMark)[0].shape();
    // both clear the stems at -15; then the mark moves on top of the vibrato
    assert!(approx(vibrato.top(), -35.0) && approx(vibrato.bottom(), -20.0), "vibrato {vibrato:?}");
    assert!(approx(mark.top(), -50.0) && approx(mark.bottom(), -35.0), "mark {mark:?}");
    println!("✓ harmonic mark {}..{} over vibrato", mark.top(), mark.bottom());
}

#[test]
fn pedal_lines_share_the_lowest_position() {
    init_logger();
    let mut unstyled = Spanner::new(SpannerKind::Pedal, 0, 1920, 2400);
    unstyled.styled_offset = false;
    let mut score = ScoreBuilder::new()
        .part("Piano", 1)
        .measures(2, |i, m| {
            m.notes(0, &[480, 480, 480, 480]);
            if i == 0 {
                m.annotate(0, Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 30.0));
            }
        })
        .spanner(Spanner::new(SpannerKind::Pedal, 0, 0, 480))
        .spanner(Spanner::new(SpannerKind::Pedal, 0, 960, 1440))
        .spanner(unstyled)
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());

    let dynamic = annotation(&score, 0, 0, AnnotationKind::Dynamic);
    assert!(approx(dynamic.pos.y, 50.0));
    let mut pedals = segments_of(&ctx.systems()[0], SpannerKind::Pedal);
    pedals.sort_by(|a, b| a.pos.x.total_cmp(&b.pos.x));
    let ys: Vec<f64> = pedals.iter().map(|p| p.pos.y).collect();
    // the first pedal clears the dynamic (50 + 30 + 5), the second follows it
    assert_eq!(ys, vec![85.0, 85.0, 50.0]);
}

#[test]
fn ottava_is_skipped_on_tablature() {
    init_logger();
    let build = |tab: bool| {
        ScoreBuilder::new()
            .part("Guitar", 1)
            .staff(0, |s| s.is_tab = tab)
            .measures(2, |_, m| {
                m.notes(0, &[480, 480, 480, 480]);
            })
            .spanner(Spanner::new(SpannerKind::Ottava, 0, 0, 960))
            .build()
    };

    let mut score = build(false);
    let ctx = layout_score(&mut score, LayoutOptions::default());
    let ottavas = segments_of(&ctx.systems()[0], SpannerKind::Ottava);
    assert_eq!(ottavas.len(), 1);
    assert!(approx(ottavas[0].pos.y, -35.0), "ottava at {}", ottavas[0].pos.y);

    let mut score = build(true);
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert!(segments_of(&ctx.systems()[0], SpannerKind::Ottava).is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// Chord symbols
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn chord_symbol_goes_above_fret_diagram() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Guitar", 1)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.annotate(0, Annotation::new(AnnotationKind::FretDiagram, 0, 30.0, 40.0));
            m.annotate(0, Annotation::new(AnnotationKind::Harmony, 0, 20.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let fret = annotation(&score, 0, 0, AnnotationKind::FretDiagram);
    let harmony = annotation(&score, 0, 0, AnnotationKind::Harmony);
    assert!(approx(fret.pos.y, -60.0), "fret diagram at {}", fret.pos.y);
    assert!(harmony.pos.y + harmony.bbox.height <= fret.pos.y - 5.0 + 1e-9);
}

#[test]
fn chord_symbols_line_up_within_max_shift() {
    init_logger();
    let build = || {
        ScoreBuilder::new()
            .part("Guitar", 1)
            .measure(|m| {
                m.notes(0, &[480]);
                m.chord_rest(0, 480, false, |cr| {
                    cr.articulations.push(Articulation {
                        kind: ArticulationKind::Articulation,
                        bbox: Rect::new(0.0, 0.0, 10.0, 10.0),
                        placement: Some(Placement::Above),
                        pos: Point::default(),
                    });
                });
                m.annotate(0, Annotation::new(AnnotationKind::Harmony, 0, 20.0, 10.0));
                m.annotate(480, Annotation::new(AnnotationKind::Harmony, 0, 20.0, 10.0));
            })
            .build()
    };

    let mut score = build();
    let options = LayoutOptions {
        max_chord_shift_above: 2.0,
        ..Default::default()
    };
    layout_score(&mut score, options);
    let first = annotation(&score, 0, 0, AnnotationKind::Harmony).pos.y;
    let second = annotation(&score, 0, 1, AnnotationKind::Harmony).pos.y;
    assert!(approx(second, -45.0), "second chord symbol at {second}");
    assert!(approx(first, second), "first {first} should line up with {second}");

    let mut score = build();
    layout_score(&mut score, LayoutOptions::default());
    let first = annotation(&score, 0, 0, AnnotationKind::Harmony).pos.y;
    assert!(approx(first, -30.0), "no shift allowed, got {first}");
}

// ═══════════════════════════════════════════════════════════════════════
// Dynamics, expressions, measure elements
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn expression_snaps_to_dynamic() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.annotate(0, Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 10.0));
            m.annotate(0, Annotation::new(AnnotationKind::Expression, 0, 30.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let dynamic = annotation(&score, 0, 0, AnnotationKind::Dynamic);
    let expression = annotation(&score, 0, 0, AnnotationKind::Expression);
    assert!(approx(dynamic.pos.y, 50.0));
    assert!(approx(expression.pos.x, 25.0), "expression x {}", expression.pos.x);
    assert!(approx(expression.pos.y, 50.0));
}

#[test]
fn stacked_annotations_do_not_overlap() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.annotate(0, Annotation::new(AnnotationKind::StaffText, 0, 20.0, 10.0));
            m.annotate(0, Annotation::new(AnnotationKind::TempoText, 0, 20.0, 10.0));
            m.annotate(0, Annotation::new(AnnotationKind::RehearsalMark, 0, 20.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let text = annotation(&score, 0, 0, AnnotationKind::StaffText);
    let tempo = annotation(&score, 0, 0, AnnotationKind::TempoText);
    let mark = annotation(&score, 0, 0, AnnotationKind::RehearsalMark);
    // later kinds stack further out, each at least the minimum distance apart
    assert!(tempo.pos.y + 10.0 + 5.0 <= text.pos.y + 1e-9);
    assert!(mark.pos.y + 10.0 + 5.0 <= tempo.pos.y + 1e-9);
}

#[test]
fn sticking_is_closer_to_the_staff_than_dynamics() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Snare", 1)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.annotate(0, Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 10.0));
            m.annotate(0, Annotation::new(AnnotationKind::Sticking, 0, 10.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let sticking = annotation(&score, 0, 0, AnnotationKind::Sticking);
    let dynamic = annotation(&score, 0, 0, AnnotationKind::Dynamic);
    assert!(approx(sticking.pos.y, 50.0), "sticking at {}", sticking.pos.y);
    assert!(approx(dynamic.pos.y, 65.0), "dynamic at {}", dynamic.pos.y);
}

#[test]
fn fermata_and_tremolo_bar_stack_over_slur() {
    init_logger();
    let mut score = solo(2)
        .spanner(Spanner::new(SpannerKind::Slur, 0, 0, 960))
        .build();
    {
        let seg = score.measures[0]
            .as_measure_mut()
            .unwrap()
            .segments
            .iter_mut()
            .find(|s| s.is_chord_rest())
            .unwrap();
        seg.annotations.push(Annotation::new(AnnotationKind::Fermata, 0, 30.0, 10.0));
        seg.annotations.push(Annotation::new(AnnotationKind::TremoloBar, 0, 30.0, 10.0));
    }
    let ctx = layout_score(&mut score, LayoutOptions::default());

    let slur_top = segments_of(&ctx.systems()[0], SpannerKind::Slur)[0].shape().top();
    assert!(slur_top <= -25.0, "slur arches over the stem, top {slur_top}");
    let fermata = annotation(&score, 0, 0, AnnotationKind::Fermata);
    let bar = annotation(&score, 0, 0, AnnotationKind::TremoloBar);
    assert!(approx(fermata.pos.y + 10.0, slur_top - 5.0), "fermata at {}", fermata.pos.y);
    assert!(approx(bar.pos.y + 10.0, fermata.pos.y - 5.0), "tremolo bar at {}", bar.pos.y);
}

#[test]
fn harp_pedal_diagram_goes_below_hairpin() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Harp", 1)
        .measures(2, |i, m| {
            m.notes(0, &[480, 480, 480, 480]);
            if i == 0 {
                m.annotate(0, Annotation::new(AnnotationKind::HarpPedalDiagram, 0, 20.0, 10.0));
            }
        })
        .spanner(Spanner::new(SpannerKind::Hairpin, 0, 0, 960))
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());

    let hairpin = segments_of(&ctx.systems()[0], SpannerKind::Hairpin)[0];
    assert!(approx(hairpin.pos.y, 50.0));
    let diagram = annotation(&score, 0, 0, AnnotationKind::HarpPedalDiagram);
    // hairpin 50..65, then the minimum distance
    assert!(approx(diagram.pos.y, 70.0), "diagram at {}", diagram.pos.y);
}

#[test]
fn system_text_goes_to_first_visible_staff() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .part("Oboe", 1)
        .staff(0, |s| s.show = false)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.notes(4, &[1920]);
            m.annotate(0, Annotation::new(AnnotationKind::TempoText, 0, 20.0, 10.0));
        })
        .build();
    let ctx = layout_score(&mut score, LayoutOptions::default());
    assert_eq!(ctx.systems()[0].first_visible_staff(), Some(1));

    let tempo = annotation(&score, 0, 0, AnnotationKind::TempoText);
    assert!(tempo.pos.y < 0.0, "placed above staff 1, got {}", tempo.pos.y);
}

#[test]
fn jump_ends_at_measure_end() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .measure(|m| {
            m.notes(0, &[1920]);
            m.element(Annotation::new(AnnotationKind::Marker, 0, 30.0, 10.0));
            m.element(Annotation::new(AnnotationKind::Jump, 0, 30.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let width = score.measures[0].width;
    let m = score.measures[0].as_measure().unwrap();
    assert_eq!(m.elements[0].pos.x, 0.0);
    assert!(approx(m.elements[1].pos.x, width - 30.0));
    assert!(m.elements[0].pos.y < 0.0 && m.elements[1].pos.y < 0.0);
}

// ═══════════════════════════════════════════════════════════════════════
// Lyrics, articulations, tuplets
// ═══════════════════════════════════════════════════════════════════════

fn lyric(verse: usize, text: &str) -> Lyric {
    Lyric {
        verse,
        text: text.to_string(),
        syllabic: Syllabic::Single,
        pos: Point::default(),
        width: 0.0,
    }
}

#[test]
fn verses_share_a_base_line() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Voice", 1)
        .measure(|m| {
            m.chord_rest(0, 0, false, |cr| {
                cr.lyrics.push(lyric(0, "la"));
                cr.lyrics.push(lyric(1, "lo"));
            });
            m.chord_rest(0, 960, false, |cr| cr.lyrics.push(lyric(0, "li")));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let first = &chord_segment(&score, 0, 0).chord_rests[0].lyrics;
    let second = &chord_segment(&score, 0, 1).chord_rests[0].lyrics;
    assert_eq!(first[0].pos.y, 50.0);
    assert_eq!(first[1].pos.y, 66.0);
    assert_eq!(second[0].pos.y, 50.0);
    assert!(approx(first[0].width, 11.0));
    // centred under the notehead
    assert!(approx(first[0].pos.x + first[0].width / 2.0, 6.0));
}

#[test]
fn lyrics_go_below_dynamics() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Voice", 1)
        .measure(|m| {
            m.chord_rest(0, 0, false, |cr| cr.lyrics.push(lyric(0, "la")));
            m.annotate(0, Annotation::new(AnnotationKind::Dynamic, 0, 20.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let lyrics = &chord_segment(&score, 0, 0).chord_rests[0].lyrics;
    assert_eq!(lyrics[0].pos.y, 70.0);
}

#[test]
fn lyrics_scale_with_staff_size() {
    init_logger();
    let style = Style {
        spatium: 20.0,
        ..Style::default()
    };
    let mut score = ScoreBuilder::new()
        .style(style)
        .part("Voice", 1)
        .measure(|m| {
            m.chord_rest(0, 0, false, |cr| cr.lyrics.push(lyric(0, "la")));
            m.annotate(0, Annotation::new(AnnotationKind::HarpPedalDiagram, 0, 20.0, 10.0));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let la = &chord_segment(&score, 0, 0).chord_rests[0].lyrics[0];
    // staff 80, then one spatium
    assert_eq!(la.pos.y, 100.0);
    assert!(approx(la.width, 22.0), "lyric width {}", la.width);
    // the lyric is 20 high at this size, then the minimum distance
    let diagram = annotation(&score, 0, 0, AnnotationKind::HarpPedalDiagram);
    assert!(approx(diagram.pos.y, 130.0), "diagram at {}", diagram.pos.y);
}

#[test]
fn articulation_goes_opposite_the_stem() {
    init_logger();
    let accent = |placement: Option<Placement>| Articulation {
        kind: ArticulationKind::Articulation,
        bbox: Rect::new(0.0, 0.0, 10.0, 5.0),
        placement,
        pos: Point::default(),
    };
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .measure(|m| {
            m.chord_rest(0, 0, false, |cr| {
                cr.articulations.push(accent(None));
                cr.articulations.push(accent(None));
            });
            m.chord_rest(0, 960, false, |cr| cr.articulations.push(accent(Some(Placement::Above))));
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let below = &chord_segment(&score, 0, 0).chord_rests[0].articulations;
    // notehead bottom 25, gap 5, then stacked
    assert_eq!(below[0].pos.y, 30.0);
    assert_eq!(below[1].pos.y, 40.0);
    assert_eq!(below[0].pos.x, 1.0);

    let above = &chord_segment(&score, 0, 1).chord_rests[0].articulations;
    assert_eq!(above[0].pos.y, -25.0);
}

#[test]
fn tuplet_bracket_clears_stems() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .measure(|m| {
            for rtick in [0, 320, 640] {
                m.chord_rest(0, rtick, false, |cr| cr.tuplet = Some(0));
            }
            m.chord_rest(0, 960, false, |_| {});
        })
        .tuplet(Tuplet {
            parent: None,
            track: 0,
            tick: 0,
            ticks: 960,
            placement: Placement::Above,
            bbox: Rect::default(),
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let bracket = score.tuplets[0].bbox;
    assert!(bracket.width > 0.0);
    assert!(bracket.bottom() <= -20.0 + 1e-9, "bracket bottom {}", bracket.bottom());
    assert_eq!(bracket.height, 10.0);
}

#[test]
fn nested_tuplet_sits_outside_inner() {
    init_logger();
    let mut score = ScoreBuilder::new()
        .part("Flute", 1)
        .measure(|m| {
            m.chord_rest(0, 0, false, |cr| cr.tuplet = Some(1));
            m.chord_rest(0, 160, false, |cr| cr.tuplet = Some(1));
            m.chord_rest(0, 320, false, |cr| cr.tuplet = Some(1));
            m.chord_rest(0, 480, false, |cr| cr.tuplet = Some(0));
            m.chord_rest(0, 960, false, |_| {});
        })
        .tuplet(Tuplet {
            parent: None,
            track: 0,
            tick: 0,
            ticks: 960,
            placement: Placement::Above,
            bbox: Rect::default(),
        })
        .tuplet(Tuplet {
            parent: Some(0),
            track: 0,
            tick: 0,
            ticks: 480,
            placement: Placement::Above,
            bbox: Rect::default(),
        })
        .build();
    layout_score(&mut score, LayoutOptions::default());

    let (outer, inner) = (score.tuplets[0].bbox, score.tuplets[1].bbox);
    assert!(outer.bottom() <= inner.top() + 1e-9, "outer {outer:?} inner {inner:?}");
    assert!(outer.width >= inner.width);
}
