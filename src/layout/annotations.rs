//! Placement of everything drawn around the staves of a system.
//!
//! Element kinds are placed one after the other, each against the skylines
//! left by the kinds before it, so the order below decides who gets the
//! spot closest to the staff.

use std::collections::HashMap;

use log::{debug, trace};

use super::autoplace;
use super::lines;
use super::lyrics::{self, SegRef};
use super::system::System;
use super::LayoutContext;
use crate::geometry::{Point, Rect};
use crate::model::*;

/// An annotation placed in this pass.
#[derive(Debug, Clone, Copy)]
struct Placed {
    seg: SegRef,
    index: usize,
    staff: usize,
    placement: Placement,
    /// Outline in system x and staff y.
    rect: Rect,
    /// The annotation goes into the skyline once placed.
    adds: bool,
}

/// Lay out beams, articulations, tuplets, spanners, lyrics and annotations
/// of `system` after its measures are positioned.
pub(super) fn layout_system_elements(score: &mut Score, ctx: &LayoutContext, system: &mut System) {
    if score.staves.is_empty() || system.is_vertical_frame(score) {
        return;
    }
    system.spanner_segments.clear();

    let measures = measures_in_range(score, ctx, system);
    let sl = segment_list(score, &measures);

    let beams = layout_beams(score, system, &sl);
    build_skylines(score, system, &measures, &beams);

    layout_articulations(score, system, &sl);
    layout_tuplets(score, system, &sl);
    place_kinds(score, system, &sl, &[AnnotationKind::Sticking], true);

    // ties and slurs
    let chords: Vec<(Ticks, usize)> = sl
        .iter()
        .filter_map(|&(mi, si)| {
            let mb = &score.measures[mi];
            let seg = mb.as_measure()?.segments.get(si)?;
            Some((mb.tick + seg.rtick, seg))
        })
        .flat_map(|(tick, seg)| {
            seg.chord_rests
                .iter()
                .filter(|cr| !cr.is_rest)
                .map(move |cr| (tick, cr.track))
        })
        .collect();
    lines::layout_ties(score, system, &chords);

    let (stick, etick) = (system.tick(score), system.end_tick(score));
    let spanners: Vec<usize> = score
        .spanners_overlapping(stick, etick)
        .into_iter()
        .filter(|&i| score.spanners[i].tick < etick)
        .collect();
    let slurs = spanners_where(score, &spanners, |i, sp| {
        sp.kind == SpannerKind::Slur && sp.tick2 >= stick && !lines::is_cross_staff(score, system, i)
    });
    // line spanners must reach past the system start
    let lines_where = |pred: &dyn Fn(&Spanner) -> bool| spanners_where(score, &spanners, |_, sp| sp.tick2 > stick && pred(sp));
    let hairpins = lines_where(&|sp| sp.kind == SpannerKind::Hairpin);
    let others = lines_where(&|sp| {
        !matches!(
            sp.kind,
            SpannerKind::Slur
                | SpannerKind::Tie
                | SpannerKind::Volta
                | SpannerKind::Hairpin
                | SpannerKind::Ottava
                | SpannerKind::Pedal
                | SpannerKind::GradualTempoChange
        )
    });
    let ottavas = lines_where(&|sp| {
        sp.kind == SpannerKind::Ottava && !score.staves.get(sp.staff()).is_some_and(|s| s.is_tab)
    });
    let pedals = lines_where(&|sp| sp.kind == SpannerKind::Pedal);
    let voltas = lines_where(&|sp| sp.kind == SpannerKind::Volta);
    let tempo_changes = lines_where(&|sp| sp.kind == SpannerKind::GradualTempoChange);

    lines::process_lines(score, system, &slurs, false);

    place_kinds(score, system, &sl, &[AnnotationKind::Fermata, AnnotationKind::TremoloBar], true);

    // dynamics are placed against the same skyline, then added together
    let dynamics = place_kinds(score, system, &sl, &[AnnotationKind::Dynamic], false);
    place_kinds(score, system, &sl, &[AnnotationKind::FiguredBass], true);
    add_placed(system, &dynamics);
    layout_expressions(score, system, &sl, &dynamics);

    lines::process_lines(score, system, &hairpins, false);
    lines::process_lines(score, system, &others, false);
    lines::process_lines(score, system, &ottavas, false);
    lines::process_lines(score, system, &pedals, true);

    lyrics::layout_lyrics(score, system, &sl);

    place_kinds(score, system, &sl, &[AnnotationKind::HarpPedalDiagram], true);

    let has_fret_diagrams = sl.iter().any(|&(mi, si)| {
        score.measures[mi]
            .as_measure()
            .and_then(|m| m.segments.get(si))
            .is_some_and(|s| s.annotations.iter().any(|a| a.kind == AnnotationKind::FretDiagram))
    });
    let opts = ctx.options();
    if !has_fret_diagrams {
        layout_harmonies(score, system, &sl, opts.max_chord_shift_above, opts.max_chord_shift_below);
    }

    place_kinds(score, system, &sl, &[AnnotationKind::StaffText, AnnotationKind::InstrumentChange], true);
    place_kinds(
        score,
        system,
        &sl,
        &[
            AnnotationKind::PlayTechAnnotation,
            AnnotationKind::SystemText,
            AnnotationKind::TripletFeel,
        ],
        true,
    );

    lines::process_lines(score, system, &voltas, false);
    lines::align_voltas(score, system);

    if has_fret_diagrams {
        place_kinds(score, system, &sl, &[AnnotationKind::FretDiagram], true);
        layout_harmonies(score, system, &sl, opts.max_fret_shift_above, opts.max_fret_shift_below);
    }

    place_kinds(score, system, &sl, &[AnnotationKind::TempoText], true);
    lines::process_lines(score, system, &tempo_changes, false);

    layout_markers_and_jumps(score, system, &measures);

    place_kinds(score, system, &sl, &[AnnotationKind::RehearsalMark], true);
    place_kinds(score, system, &sl, &[AnnotationKind::Image], true);

    trace!(
        "system {:?}: {} segments, {} spanner segments",
        system.id,
        sl.len(),
        system.spanner_segments.len()
    );
}

/// Measures of `system` taking part in this pass. In linear modes only the
/// measures of the relaid range are touched.
fn measures_in_range(score: &Score, ctx: &LayoutContext, system: &System) -> Vec<usize> {
    let linear = ctx.options().mode.is_linear();
    system
        .measures
        .iter()
        .copied()
        .filter(|&mi| {
            let mb = &score.measures[mi];
            mb.is_measure() && (!linear || (mb.tick >= ctx.start_tick && mb.tick <= ctx.end_tick))
        })
        .collect()
}

/// Segments carrying chords, rests or annotations.
fn segment_list(score: &Score, measures: &[usize]) -> Vec<SegRef> {
    let mut sl = Vec::new();
    for &mi in measures {
        let Some(m) = score.measures[mi].as_measure() else {
            continue;
        };
        for (si, s) in m.segments.iter().enumerate() {
            if s.enabled && (s.is_chord_rest() || !s.annotations.is_empty()) {
                sl.push((mi, si));
            }
        }
    }
    sl
}

fn spanners_where(score: &Score, candidates: &[usize], pred: impl Fn(usize, &Spanner) -> bool) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&i| pred(i, &score.spanners[i]))
        .collect()
}

fn annotation_staff(system: &System, a: &Annotation) -> Option<usize> {
    if a.kind.is_system_level() {
        system.first_visible_staff()
    } else {
        Some(a.staff()).filter(|&s| system.staves.get(s).is_some_and(|ss| ss.show))
    }
}

fn staff_shown(system: &System, staff: usize) -> bool {
    system.staves.get(staff).is_some_and(|s| s.show)
}

// ═══════════════════════════════════════════════════════════════════════
// Beams and skylines
// ═══════════════════════════════════════════════════════════════════════

/// Compute the outline of every beam with chords in `sl` and move beamed
/// rests out of the way. Returns the beams laid out.
fn layout_beams(score: &mut Score, system: &System, sl: &[SegRef]) -> Vec<usize> {
    let mut extents: HashMap<usize, (Rect, bool)> = HashMap::new();
    let mut order: Vec<usize> = Vec::new();
    for &(mi, si) in sl {
        let mb = &score.measures[mi];
        let Some(seg) = mb.as_measure().and_then(|m| m.segments.get(si)) else {
            continue;
        };
        for cr in seg.chord_rests.iter().filter(|cr| !cr.is_rest) {
            let Some(b) = cr.beam.filter(|&b| b < score.beams.len()) else {
                continue;
            };
            let beam_staff = track_to_staff(score.beams[b].track);
            let dy = system.staff_y(cr.vstaff()) - system.staff_y(beam_staff);
            let r = cr.shape.bbox().translated(mb.x + seg.x, dy);
            match extents.get_mut(&b) {
                Some(e) => e.0 = e.0.united(&r),
                None => {
                    order.push(b);
                    extents.insert(b, (r, cr.up));
                }
            }
        }
    }

    let beam_width = score.style.sp(score.style.beam_width);
    for &b in &order {
        let (r, up) = extents[&b];
        score.beams[b].bbox = if up {
            Rect::new(r.left(), r.top(), r.width, beam_width)
        } else {
            Rect::new(r.left(), r.bottom() - beam_width, r.width, beam_width)
        };
    }

    let gap = score.style.sp(score.style.autoplace_min_distance);
    let Score { measures, beams, .. } = score;
    for &(mi, si) in sl {
        let Some(seg) = measures[mi].as_measure_mut().and_then(|m| m.segments.get_mut(si)) else {
            continue;
        };
        for cr in seg.chord_rests.iter_mut().filter(|cr| cr.is_rest) {
            let Some((b, &(_, up))) = cr.beam.and_then(|b| extents.get(&b).map(|e| (b, e))) else {
                continue;
            };
            let beam = &beams[b];
            if beam.cross {
                continue;
            }
            let r = cr.shape.bbox();
            let dy = if up {
                (beam.bbox.bottom() + gap - r.top()).max(0.0)
            } else {
                (beam.bbox.top() - gap - r.bottom()).min(0.0)
            };
            if dy != 0.0 {
                trace!("rest in track {} moved by {dy} clear of beam {b}", cr.track);
                cr.shape.translate(0.0, dy);
            }
        }
    }
    order
}

/// Start the skylines over from staff lines, segment contents and beams.
fn build_skylines(score: &Score, system: &mut System, measures: &[usize], beams: &[usize]) {
    for ss in &mut system.staves {
        ss.skyline.clear();
    }
    let nstaves = system.staves.len().min(score.nstaves());
    let shown: Vec<usize> = (0..nstaves).filter(|&s| system.staves[s].show).collect();
    for &mi in measures {
        let mb = &score.measures[mi];
        let Some(m) = mb.as_measure() else {
            continue;
        };
        for &staff in &shown {
            let h = score.staff_height(staff);
            system.staves[staff].skyline.add(&Rect::new(mb.x, 0.0, mb.width, h));
        }
        for seg in m.segments.iter().filter(|s| s.enabled && s.kind != SegmentKind::TimeSig) {
            let x = mb.x + seg.x;
            if seg.visible {
                for (staff, shape) in seg.staff_shapes.iter().enumerate().take(nstaves) {
                    if system.staves[staff].show {
                        system.staves[staff].skyline.add_shape(&shape.translated(x, 0.0));
                    }
                }
            }
            for cr in seg.chord_rests.iter().filter(|cr| cr.visible) {
                let vstaff = cr.vstaff();
                if vstaff < nstaves && system.staves[vstaff].show {
                    system.staves[vstaff].skyline.add_shape(&cr.shape.translated(x, 0.0));
                }
            }
        }
    }
    for &b in beams {
        let beam = &score.beams[b];
        let staff = track_to_staff(beam.track);
        if staff < nstaves && system.staves[staff].show {
            system.staves[staff].skyline.add(&beam.bbox);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Articulations and tuplets
// ═══════════════════════════════════════════════════════════════════════

/// Stack articulations, fingerings and bends outwards from the chord, on
/// the side away from the stem unless placed explicitly.
fn layout_articulations(score: &mut Score, system: &mut System, sl: &[SegRef]) {
    let gap = score.style.sp(score.style.articulation_distance);
    for &(mi, si) in sl {
        let mb = &mut score.measures[mi];
        let mx = mb.x;
        let Some(seg) = mb.as_measure_mut().and_then(|m| m.segments.get_mut(si)) else {
            continue;
        };
        let x = mx + seg.x;
        for cr in seg.chord_rests.iter_mut() {
            if cr.is_rest || !cr.visible || cr.articulations.is_empty() || !staff_shown(system, cr.vstaff()) {
                continue;
            }
            let chord = cr.shape.bbox();
            let (mut top, mut bottom) = (chord.top(), chord.bottom());
            let default = if cr.up { Placement::Below } else { Placement::Above };
            let skyline = &mut system.staves[cr.vstaff()].skyline;
            for art in &mut cr.articulations {
                let ax = chord.center_x() - art.bbox.width / 2.0 - art.bbox.x;
                let ay = match art.placement.unwrap_or(default) {
                    Placement::Above => {
                        let ay = top - gap - art.bbox.bottom();
                        top = ay + art.bbox.top();
                        ay
                    }
                    Placement::Below => {
                        let ay = bottom + gap - art.bbox.top();
                        bottom = ay + art.bbox.bottom();
                        ay
                    }
                };
                art.pos = Point::new(ax, ay);
                skyline.add(&art.bbox.translated(x + ax, ay));
            }
        }
    }
}

/// Outermost tuplet containing `t`.
fn outermost_tuplet(tuplets: &[Tuplet], mut t: usize) -> usize {
    for _ in 0..tuplets.len() {
        match tuplets[t].parent.filter(|&p| p < tuplets.len()) {
            Some(p) => t = p,
            None => break,
        }
    }
    t
}

/// Nesting depth of `t` below `top`, or `None` if `t` is not inside it.
fn depth_below(tuplets: &[Tuplet], mut t: usize, top: usize) -> Option<usize> {
    for depth in 0..=tuplets.len() {
        if t == top {
            return Some(depth);
        }
        t = tuplets[t].parent.filter(|&p| p < tuplets.len())?;
    }
    None
}

/// Tuplet brackets, innermost first so an outer bracket clears the inner.
fn layout_tuplets(score: &mut Score, system: &mut System, sl: &[SegRef]) {
    if score.tuplets.is_empty() {
        return;
    }
    // chord outlines in the coordinates of their tuplet's staff
    let mut chords: Vec<(usize, Rect)> = Vec::new();
    let mut tops: Vec<usize> = Vec::new();
    for &(mi, si) in sl {
        let mb = &score.measures[mi];
        let Some(seg) = mb.as_measure().and_then(|m| m.segments.get(si)) else {
            continue;
        };
        for cr in &seg.chord_rests {
            let Some(t) = cr.tuplet.filter(|&t| t < score.tuplets.len()) else {
                continue;
            };
            if !staff_shown(system, cr.vstaff()) {
                continue;
            }
            let staff = track_to_staff(score.tuplets[t].track);
            let dy = system.staff_y(cr.vstaff()) - system.staff_y(staff);
            chords.push((t, cr.shape.bbox().translated(mb.x + seg.x, dy)));
            let top = outermost_tuplet(&score.tuplets, t);
            if !tops.contains(&top) {
                tops.push(top);
            }
        }
    }

    for top in tops {
        let mut tree: Vec<(usize, usize)> = (0..score.tuplets.len())
            .filter_map(|t| depth_below(&score.tuplets, t, top).map(|d| (d, t)))
            .collect();
        tree.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, t) in tree {
            layout_tuplet(score, system, t, &chords);
        }
    }
}

fn layout_tuplet(score: &mut Score, system: &mut System, t: usize, chords: &[(usize, Rect)]) {
    let staff = track_to_staff(score.tuplets[t].track);
    if !staff_shown(system, staff) {
        return;
    }
    let children = score
        .tuplets
        .iter()
        .filter(|c| c.parent == Some(t) && c.bbox.width > 0.0)
        .map(|c| c.bbox);
    let Some(extent) = chords
        .iter()
        .filter(|(ct, _)| *ct == t)
        .map(|(_, r)| *r)
        .chain(children)
        .reduce(|a, b| a.united(&b))
    else {
        return;
    };

    let style = &score.style;
    let dist = style.sp(style.tuplet_distance);
    let h = style.sp(style.tuplet_bracket_height);
    let placement = score.tuplets[t].placement;
    let bbox = match placement {
        Placement::Above => Rect::new(extent.left(), extent.top() - dist - h, extent.width, h),
        Placement::Below => Rect::new(extent.left(), extent.bottom() + dist, extent.width, h),
    };
    let skyline = &mut system.staves[staff].skyline;
    let dy = autoplace::clearance(skyline, &bbox, placement, style.sp(style.autoplace_min_distance));
    let bbox = bbox.translated(0.0, dy);
    skyline.add(&bbox);
    score.tuplets[t].bbox = bbox;
}

// ═══════════════════════════════════════════════════════════════════════
// Segment annotations
// ═══════════════════════════════════════════════════════════════════════

/// Place every annotation of one of `kinds`; with `add` each is added to
/// the skyline right after it is placed.
fn place_kinds(score: &mut Score, system: &mut System, sl: &[SegRef], kinds: &[AnnotationKind], add: bool) -> Vec<Placed> {
    let mut placed = Vec::new();
    let Score { style, staves, measures, .. } = score;
    for &(mi, si) in sl {
        let mb = &mut measures[mi];
        let mx = mb.x;
        let Some(seg) = mb.as_measure_mut().and_then(|m| m.segments.get_mut(si)) else {
            continue;
        };
        let x = mx + seg.x;
        for (index, a) in seg.annotations.iter_mut().enumerate() {
            if !kinds.contains(&a.kind) {
                continue;
            }
            let Some(staff) = annotation_staff(system, a) else {
                continue;
            };
            let h = staves.get(staff).map(|s| s.height(style)).unwrap_or(0.0);
            let skyline = &mut system.staves[staff].skyline;
            let rect = autoplace::place_annotation(style, skyline, h, x, a);
            if add {
                autoplace::add_to_skyline(skyline, a, &rect);
            }
            placed.push(Placed {
                seg: (mi, si),
                index,
                staff,
                placement: a.placement,
                rect,
                adds: a.add_to_skyline && a.visible,
            });
        }
    }
    placed
}

fn add_placed(system: &mut System, placed: &[Placed]) {
    for p in placed.iter().filter(|p| p.adds) {
        system.staves[p.staff].skyline.add(&p.rect);
    }
}

/// Expressions next to a dynamic in the same segment line up with it;
/// the rest are placed on their own.
fn layout_expressions(score: &mut Score, system: &mut System, sl: &[SegRef], dynamics: &[Placed]) {
    let gap = score.style.sp(score.style.expression_dynamic_gap);
    let Score { style, staves, measures, .. } = score;
    for &(mi, si) in sl {
        let mb = &mut measures[mi];
        let mx = mb.x;
        let Some(seg) = mb.as_measure_mut().and_then(|m| m.segments.get_mut(si)) else {
            continue;
        };
        let x = mx + seg.x;
        for a in seg.annotations.iter_mut().filter(|a| a.kind == AnnotationKind::Expression) {
            let Some(staff) = annotation_staff(system, a) else {
                continue;
            };
            let dynamic = dynamics
                .iter()
                .find(|d| d.seg == (mi, si) && d.staff == staff && d.placement == a.placement);
            let skyline = &mut system.staves[staff].skyline;
            let rect = match dynamic {
                Some(d) => {
                    a.pos = Point::new(
                        d.rect.right() + gap - x - a.bbox.left(),
                        d.rect.bottom() - a.bbox.bottom(),
                    );
                    autoplace::annotation_rect(a, x)
                }
                None => {
                    let h = staves.get(staff).map(|s| s.height(style)).unwrap_or(0.0);
                    autoplace::place_annotation(style, skyline, h, x, a)
                }
            };
            autoplace::add_to_skyline(skyline, a, &rect);
        }
    }
}

/// Chord symbols: place, pull each staff's symbols onto a common line when
/// they are within `max_above`/`max_below` spatium of it, then add them.
fn layout_harmonies(score: &mut Score, system: &mut System, sl: &[SegRef], max_above: f64, max_below: f64) {
    let mut placed = place_kinds(score, system, sl, &[AnnotationKind::Harmony], false);
    let max_above = score.style.sp(max_above);
    let max_below = score.style.sp(max_below);

    for staff in 0..system.staves.len() {
        for placement in [Placement::Above, Placement::Below] {
            let members: Vec<usize> = (0..placed.len())
                .filter(|&i| placed[i].staff == staff && placed[i].placement == placement)
                .collect();
            if members.len() < 2 {
                continue;
            }
            let shifts: Vec<(usize, f64)> = match placement {
                Placement::Above => {
                    let line = members.iter().map(|&i| placed[i].rect.bottom()).fold(f64::INFINITY, f64::min);
                    members
                        .iter()
                        .map(|&i| (i, line - placed[i].rect.bottom()))
                        .filter(|&(_, dy)| -dy <= max_above)
                        .collect()
                }
                Placement::Below => {
                    let line = members.iter().map(|&i| placed[i].rect.top()).fold(f64::NEG_INFINITY, f64::max);
                    members
                        .iter()
                        .map(|&i| (i, line - placed[i].rect.top()))
                        .filter(|&(_, dy)| dy <= max_below)
                        .collect()
                }
            };
            for (i, dy) in shifts {
                let p = &mut placed[i];
                p.rect = p.rect.translated(0.0, dy);
                let (mi, si) = p.seg;
                if let Some(a) = score.measures[mi]
                    .as_measure_mut()
                    .and_then(|m| m.segments.get_mut(si))
                    .and_then(|s| s.annotations.get_mut(p.index))
                {
                    a.pos.y += dy;
                }
            }
        }
    }
    add_placed(system, &placed);
}

/// Markers sit at the start of their measure, jumps end at its right edge.
fn layout_markers_and_jumps(score: &mut Score, system: &mut System, measures: &[usize]) {
    let Score { style, staves, measures: all, .. } = score;
    for &mi in measures {
        let mb = &mut all[mi];
        let (mx, mw) = (mb.x, mb.width);
        let Some(m) = mb.as_measure_mut() else {
            continue;
        };
        for a in &mut m.elements {
            let shift = match a.kind {
                AnnotationKind::Marker => 0.0,
                AnnotationKind::Jump => mw - a.bbox.width,
                _ => {
                    debug!("measure element {:?} in measure {mi} is not laid out", a.kind);
                    continue;
                }
            };
            let Some(staff) = annotation_staff(system, a) else {
                continue;
            };
            let h = staves.get(staff).map(|s| s.height(style)).unwrap_or(0.0);
            let skyline = &mut system.staves[staff].skyline;
            let rect = autoplace::place_annotation(style, skyline, h, mx + shift, a);
            a.pos.x += shift;
            autoplace::add_to_skyline(skyline, a, &rect);
        }
    }
}
