//! Spanner segments of one system: ties, slurs and line spanners.
//!
//! Slur and tie segments carry absolute grips in system x and staff y with
//! `pos` at zero. Line segments keep their outline in `bbox` and are moved
//! by `pos`, whose x is the start of the line.

use std::collections::HashMap;

use log::trace;

use super::autoplace;
use super::constants::{EPSILON, SKYLINE_NO_OVERLAP, SLUR_HEIGHT_FACTOR};
use super::system::{SpannerSegment, SpannerSegmentType, System};
use crate::geometry::{Point, Rect};
use crate::model::*;

/// Where a chord or rest sits in a system.
#[derive(Debug, Clone, Copy)]
pub(super) struct ChordAnchor {
    /// System x of the segment origin.
    pub(super) x: f64,
    /// Outline relative to the segment origin and the top of `vstaff`.
    pub(super) bbox: Rect,
    pub(super) vstaff: usize,
}

impl ChordAnchor {
    fn grip(&self, up: bool, offset: f64) -> Point {
        let y = if up { self.bbox.top() - offset } else { self.bbox.bottom() + offset };
        Point::new(self.x + self.bbox.center_x(), y)
    }
}

/// The chord or rest of `track` at `tick`, if it lies in `system`.
pub(super) fn find_chord(score: &Score, system: &System, tick: Ticks, track: usize) -> Option<ChordAnchor> {
    system.measures.iter().find_map(|&mi| {
        let mb = &score.measures[mi];
        if tick < mb.tick || tick >= mb.end_tick() {
            return None;
        }
        let m = mb.as_measure()?;
        m.segments
            .iter()
            .filter(|s| s.enabled && s.is_chord_rest() && mb.tick + s.rtick == tick)
            .find_map(|s| {
                let cr = s.chord_rests.iter().find(|cr| cr.track == track)?;
                Some(ChordAnchor {
                    x: mb.x + s.x,
                    bbox: cr.shape.bbox(),
                    vstaff: cr.vstaff(),
                })
            })
    })
}

/// System x of the first chord/rest at or after `tick`.
pub(super) fn x_at_tick(score: &Score, system: &System, tick: Ticks) -> Option<f64> {
    system.measures.iter().find_map(|&mi| {
        let mb = &score.measures[mi];
        if tick < mb.tick || tick > mb.end_tick() {
            return None;
        }
        let seg_x = mb.as_measure().and_then(|m| {
            m.segments
                .iter()
                .find(|s| s.enabled && s.is_chord_rest() && mb.tick + s.rtick >= tick)
                .map(|s| s.x)
        });
        Some(mb.x + seg_x.unwrap_or(mb.width))
    })
}

fn system_end_x(score: &Score, system: &System) -> f64 {
    system
        .last_measure_base()
        .map(|i| score.measures[i].x + score.measures[i].width)
        .unwrap_or(system.width)
}

// ═══════════════════════════════════════════════════════════════════════
// Slurs and ties
// ═══════════════════════════════════════════════════════════════════════

/// True when either end chord is drawn on another staff than the slur.
pub(super) fn is_cross_staff(score: &Score, system: &System, idx: usize) -> bool {
    let sp = &score.spanners[idx];
    let start = find_chord(score, system, sp.tick, sp.track);
    let end = find_chord(score, system, sp.tick2, sp.track2);
    match (start, end) {
        (Some(s), Some(e)) => s.vstaff != sp.staff() || e.vstaff != sp.staff(),
        _ => sp.is_cross_staff(),
    }
}

/// Segment of slur or tie `idx` on `system`; `staff_dy` maps the y of a
/// chord on another staff into the coordinates of the slur's staff.
fn slur_tie_segment(score: &Score, system: &System, idx: usize, staff_dy: impl Fn(usize, usize) -> f64) -> Option<SpannerSegment> {
    let sp = &score.spanners[idx];
    let (stick, etick) = (system.tick(score), system.end_tick(score));
    if sp.tick >= etick || sp.tick2 < stick {
        return None;
    }
    let style = &score.style;
    let offset = style.sp(if sp.kind == SpannerKind::Tie {
        style.tie_endpoint_offset
    } else {
        style.slur_endpoint_offset
    });

    let start = find_chord(score, system, sp.tick, sp.track);
    let end = find_chord(score, system, sp.tick2, sp.track2);
    let staff = start.or(end).map(|a| a.vstaff).unwrap_or_else(|| sp.staff());
    let up = sp.up;

    let start_grip = start.map(|a| {
        let mut p = a.grip(up, offset);
        p.y += staff_dy(a.vstaff, staff);
        p
    });
    let end_grip = end.map(|a| {
        let mut p = a.grip(up, offset);
        p.y += staff_dy(a.vstaff, staff);
        p
    });
    // an open end continues at the height of the other end
    let default_y = if up {
        -offset
    } else {
        score.staff_height(staff) + offset
    };
    let (segment_type, start_pt, end_pt) = match (start_grip, end_grip) {
        (Some(s), Some(e)) => (SpannerSegmentType::Single, s, e),
        (Some(s), None) => (SpannerSegmentType::Begin, s, Point::new(system_end_x(score, system), s.y)),
        (None, Some(e)) => (SpannerSegmentType::End, Point::new(system.content_start_x(score), e.y), e),
        (None, None) => (
            SpannerSegmentType::Middle,
            Point::new(system.content_start_x(score), default_y),
            Point::new(system_end_x(score, system), default_y),
        ),
    };

    let dx = (end_pt.x - start_pt.x).abs();
    let arch = (dx * SLUR_HEIGHT_FACTOR).clamp(style.sp(style.slur_min_height), style.sp(style.slur_max_height));
    let mut seg = SpannerSegment {
        spanner: idx,
        kind: sp.kind,
        staff,
        segment_type,
        start: start_pt,
        end: end_pt,
        arch,
        up,
        pos: Point::default(),
        bbox: Rect::default(),
        autoplace: sp.autoplace,
        visible: sp.visible,
    };
    seg.compute_bezier();
    Some(seg)
}

/// Lay out the ties starting at or ending on the chords of `chords`
/// (`(tick, track)` pairs in segment order) and register them in the
/// skyline. Ties ending here are only laid out when they start on an
/// earlier system.
pub(super) fn layout_ties(score: &Score, system: &mut System, chords: &[(Ticks, usize)]) {
    let stick = system.tick(score);
    for &(tick, track) in chords {
        for (idx, sp) in score.spanners.iter().enumerate() {
            if sp.kind != SpannerKind::Tie {
                continue;
            }
            let forward = sp.tick == tick && sp.track == track;
            let backward = sp.tick2 == tick && sp.track2 == track && sp.tick < stick;
            if !forward && !backward {
                continue;
            }
            let Some(seg) = slur_tie_segment(score, system, idx, |_, _| 0.0) else {
                continue;
            };
            if !system.staves.get(seg.staff).is_some_and(|s| s.show) {
                continue;
            }
            if seg.autoplace && seg.visible {
                system.staves[seg.staff].skyline.add_shape(&seg.shape());
            }
            system.spanner_segments.push(seg);
        }
    }
}

/// Lay out the slurs of `system` whose end chords sit on another staff.
/// Staff distances must be known.
pub(super) fn layout_cross_staff_slurs(score: &Score, system: &mut System) {
    let (stick, etick) = (system.tick(score), system.end_tick(score));
    for idx in score.spanners_overlapping(stick, etick) {
        let sp = &score.spanners[idx];
        if sp.kind != SpannerKind::Slur || sp.tick >= etick || sp.tick2 < stick {
            continue;
        }
        if !is_cross_staff(score, system, idx) {
            continue;
        }
        let seg = {
            let sys = &*system;
            slur_tie_segment(score, sys, idx, |from, to| sys.staff_y(from) - sys.staff_y(to))
        };
        system.spanner_segments.retain(|s| s.spanner != idx);
        if let Some(seg) = seg {
            trace!("cross-staff slur {idx} laid out on staff {}", seg.staff);
            system.spanner_segments.push(seg);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Line spanners
// ═══════════════════════════════════════════════════════════════════════

fn line_staff(system: &System, sp: &Spanner) -> Option<usize> {
    if sp.kind.is_system_level() {
        system.first_visible_staff()
    } else {
        Some(sp.staff()).filter(|&s| system.staves.get(s).is_some_and(|ss| ss.show))
    }
}

fn line_segment(score: &Score, system: &System, idx: usize) -> Option<SpannerSegment> {
    let sp = &score.spanners[idx];
    let (stick, etick) = (system.tick(score), system.end_tick(score));
    let staff = line_staff(system, sp)?;
    let style = &score.style;

    let starts_here = sp.tick >= stick;
    let ends_here = sp.tick2 < etick;
    let x1 = if starts_here {
        x_at_tick(score, system, sp.tick)?
    } else {
        system.content_start_x(score)
    };
    let x2 = if ends_here {
        x_at_tick(score, system, sp.tick2)?
    } else {
        system_end_x(score, system)
    };
    let segment_type = match (starts_here, ends_here) {
        (true, true) => SpannerSegmentType::Single,
        (true, false) => SpannerSegmentType::Begin,
        (false, true) => SpannerSegmentType::End,
        (false, false) => SpannerSegmentType::Middle,
    };

    let bbox = Rect::new(0.0, 0.0, (x2 - x1).max(0.0), style.sp(sp.line_height));
    let mut pos = Point::new(x1, autoplace::default_y(style, score.staff_height(staff), &bbox, sp.placement));
    if sp.autoplace {
        let r = bbox.translated(pos.x, pos.y);
        let min = style.sp(style.autoplace_min_distance);
        pos.y += autoplace::clearance(&system.staves[staff].skyline, &r, sp.placement, min);
    }
    Some(SpannerSegment {
        spanner: idx,
        kind: sp.kind,
        staff,
        segment_type,
        start: Point::new(x1, pos.y),
        end: Point::new(x2, pos.y),
        arch: 0.0,
        up: sp.placement == Placement::Above,
        pos,
        bbox,
        autoplace: sp.autoplace,
        visible: sp.visible,
    })
}

/// Lay out a batch of spanners on `system`.
///
/// Every segment is placed against the skyline as it was before the
/// batch; then segments are optionally aligned per staff, slur collisions
/// and harmonic-mark/vibrato overlaps are resolved, and finally all
/// autoplaced segments are added to the skyline.
pub(super) fn process_lines(score: &Score, system: &mut System, spanners: &[usize], align: bool) {
    let mut batch: Vec<usize> = Vec::new();
    for &idx in spanners {
        let sp = &score.spanners[idx];
        let seg = if sp.kind.is_slur_or_tie() {
            slur_tie_segment(score, system, idx, |_, _| 0.0)
        } else {
            line_segment(score, system, idx)
        };
        let Some(seg) = seg else {
            continue;
        };
        let autoplace = seg.autoplace;
        system.spanner_segments.push(seg);
        if autoplace {
            batch.push(system.spanner_segments.len() - 1);
        }
    }

    if align && batch.len() > 1 {
        align_lines(score, system, &batch);
    }
    // ties are laid out earlier, so even a single slur may collide
    if !batch.is_empty() {
        resolve_slur_collisions(score, system, &batch);
    }
    fix_harmonic_vibrato(system, &batch);

    for &i in &batch {
        let seg = &system.spanner_segments[i];
        if !seg.visible {
            continue;
        }
        let staff = if seg.kind.is_system_level() {
            system.staff_or_next_visible(seg.staff)
        } else {
            Some(seg.staff)
        };
        if let Some(staff) = staff.filter(|&s| s < system.staves.len()) {
            let shape = seg.shape();
            system.staves[staff].skyline.add_shape(&shape);
        }
    }
}

/// Put every styled segment of a staff at the lowest y found on that staff.
fn align_lines(score: &Score, system: &mut System, batch: &[usize]) {
    let default_y = system.spanner_segments[batch[0]].ypos();
    let mut staff_y: HashMap<usize, f64> = HashMap::new();
    for &i in batch {
        let seg = &system.spanner_segments[i];
        if seg.visible {
            let y = staff_y.entry(seg.staff).or_insert(SKYLINE_NO_OVERLAP);
            *y = y.max(seg.ypos());
        }
    }
    for &i in batch {
        let seg = &mut system.spanner_segments[i];
        if !score.spanners[seg.spanner].styled_offset {
            continue;
        }
        seg.pos.y = match staff_y.get(&seg.staff) {
            Some(&y) if y > SKYLINE_NO_OVERLAP => y,
            _ => default_y,
        };
    }
}

/// Move slur endpoints that share a position with another slur or a tie
/// outwards, and pull apart slurs that hand over from one to the next.
fn resolve_slur_collisions(score: &Score, system: &mut System, batch: &[usize]) {
    let style = &score.style;
    let vert = style.sp(style.slur_collision_vert_offset);
    let horiz = style.sp(style.slur_collision_horiz_offset);
    let fuzzy = style.sp(style.slur_collision_fuzzy);
    let close = |a: f64, b: f64| (a - b).abs() < fuzzy;

    let mut candidates: Vec<usize> = batch.to_vec();
    candidates.extend(
        (0..system.spanner_segments.len())
            .filter(|i| system.spanner_segments[*i].kind == SpannerKind::Tie && !batch.contains(i)),
    );

    for &i1 in batch {
        if system.spanner_segments[i1].kind != SpannerKind::Slur {
            continue;
        }
        for &i2 in &candidates {
            if i1 == i2 || !system.spanner_segments[i2].kind.is_slur_or_tie() {
                continue;
            }
            let (s1, s2) = (&system.spanner_segments[i1], &system.spanner_segments[i2]);
            let (sp1, sp2) = (&score.spanners[s1.spanner], &score.spanners[s2.spanner]);

            if s2.kind == SpannerKind::Slur
                && sp1.tick2 == sp2.tick
                && sp1.track2 == sp2.track
                && close(s1.end.y, s2.start.y)
            {
                system.spanner_segments[i1].end.x -= horiz;
                system.spanner_segments[i1].compute_bezier();
                system.spanner_segments[i2].start.x += horiz;
                system.spanner_segments[i2].compute_bezier();
                continue;
            }

            if s1.staff != s2.staff {
                continue;
            }
            if s1.end.x < s2.start.x || s2.end.x < s1.start.x || s1.up != s2.up {
                continue;
            }
            let is_tie = s2.kind == SpannerKind::Tie;
            let dy = if s1.up { -vert } else { vert };
            let move_start = close(s1.start.x, s2.start.x) && (s1.end.x > s2.end.x || is_tie);
            let move_end = close(s1.end.x, s2.end.x) && (s1.start.x < s2.start.x || is_tie);
            let s1 = &mut system.spanner_segments[i1];
            if move_start {
                s1.start.y += dy;
                s1.compute_bezier();
            }
            if move_end {
                s1.end.y += dy;
                s1.compute_bezier();
            }
        }
    }
}

/// A harmonic mark and a vibrato starting at the same x: stack the
/// harmonic mark on top of the vibrato.
fn fix_harmonic_vibrato(system: &mut System, batch: &[usize]) {
    let mut prev: Option<usize> = None;
    let mut fixed = false;
    for &i in batch {
        if fixed {
            fixed = false;
            prev = Some(i);
            continue;
        }
        if let Some(p) = prev {
            let (a, b) = (&system.spanner_segments[p], &system.spanner_segments[i]);
            let same_x = (a.pos.x - b.pos.x).abs() < EPSILON;
            if a.visible && b.visible && same_x {
                let pair = match (a.kind, b.kind) {
                    (SpannerKind::HarmonicMark, SpannerKind::Vibrato) => Some((p, i)),
                    (SpannerKind::Vibrato, SpannerKind::HarmonicMark) => Some((i, p)),
                    _ => None,
                };
                if let Some((mark, vibrato)) = pair {
                    let vib_top = system.spanner_segments[vibrato].shape().top();
                    let mark_seg = &mut system.spanner_segments[mark];
                    let mark_bottom = mark_seg.shape().bottom();
                    mark_seg.pos.y += vib_top - mark_bottom;
                    fixed = true;
                }
            }
        }
        prev = Some(i);
    }
}

/// Give adjacent voltas on each staff a common height and add them to the
/// skyline. Voltas are adjacent when one ends at the tick the next starts.
pub(super) fn align_voltas(score: &Score, system: &mut System) {
    for staff in 0..system.staves.len() {
        let mut voltas: Vec<usize> = (0..system.spanner_segments.len())
            .filter(|&i| {
                let s = &system.spanner_segments[i];
                s.kind == SpannerKind::Volta && s.staff == staff
            })
            .collect();
        voltas.sort_by(|&a, &b| system.spanner_segments[a].pos.x.total_cmp(&system.spanner_segments[b].pos.x));

        let mut rest: &[usize] = &voltas;
        while !rest.is_empty() {
            let mut y: f64 = 0.0;
            let mut run = 0;
            let mut prev: Option<usize> = None;
            for &i in rest {
                let seg = &system.spanner_segments[i];
                if let Some(p) = prev.filter(|&p| p != seg.spanner) {
                    if score.spanners[p].tick2 != score.spanners[seg.spanner].tick {
                        break;
                    }
                }
                y = y.min(seg.ypos());
                run += 1;
                prev = Some(seg.spanner);
            }
            for &i in &rest[..run] {
                let styled = score.spanners[system.spanner_segments[i].spanner].styled_offset;
                let seg = &mut system.spanner_segments[i];
                if seg.autoplace && styled {
                    seg.pos.y = y;
                }
                if seg.autoplace && seg.visible {
                    let shape = seg.shape();
                    system.staves[staff].skyline.add_shape(&shape);
                }
            }
            rest = &rest[run..];
        }
    }
}
