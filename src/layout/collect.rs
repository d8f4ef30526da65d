//! Line breaking: collect measures into one system, then justify it.

use std::collections::HashMap;

use log::{debug, error};

use super::constants::EPSILON;
use super::measure::{self, is_spring_segment};
use super::spring::{stretch_segments_to_width, Spring};
use super::system::System;
use super::{annotations, brackets, narrow, vertical, LayoutContext};
use crate::model::*;

/// Shortest and longest chord/rest durations of the system being built,
/// with the values before the last measure for rollback.
#[derive(Debug, Clone, Copy)]
pub(super) struct TickBounds {
    pub(super) min: Ticks,
    pub(super) max: Ticks,
    prev_min: Ticks,
    prev_max: Ticks,
}

impl TickBounds {
    fn new() -> Self {
        Self {
            min: Ticks::MAX,
            max: 0,
            prev_min: Ticks::MAX,
            prev_max: 0,
        }
    }

    /// Fold in one measure; true when the system bounds changed.
    fn include(&mut self, cur_min: Ticks, cur_max: Ticks) -> bool {
        self.prev_min = self.min;
        self.prev_max = self.max;
        let mut changed = false;
        if cur_min > 0 && cur_min < self.min {
            self.min = cur_min;
            changed = true;
        }
        if cur_max > self.max {
            self.max = cur_max;
            changed = true;
        }
        changed
    }

    /// Undo the last `include`; true when that changes the bounds.
    fn rollback(&mut self) -> bool {
        let changed = self.min != self.prev_min || self.max != self.prev_max;
        self.min = self.prev_min;
        self.max = self.prev_max;
        changed
    }

    /// Bounds recomputed from scratch over the measures of `system`.
    fn from_system(score: &Score, system: &System) -> Self {
        let mut bounds = Self::new();
        for m in system.measures.iter().filter_map(|&i| score.measures[i].as_measure()) {
            bounds.include(m.shortest_chord_rest(), m.longest_chord_rest());
        }
        bounds.prev_min = bounds.min;
        bounds.prev_max = bounds.max;
        bounds
    }

    pub(super) fn min_ticks(&self) -> Ticks {
        if self.min == Ticks::MAX {
            0
        } else {
            self.min
        }
    }
}

/// Recompute widths of the system's measures before `stop`; returns the
/// total width change.
fn recompute_widths(score: &mut Score, system: &System, stop: Option<usize>, ticks: &TickBounds, stretch: f64) -> f64 {
    let visible = system.show_flags();
    let mut delta = 0.0;
    for &mb in &system.measures {
        if Some(mb) == stop {
            break;
        }
        if !score.is_measure(mb) {
            continue;
        }
        let old = score.measures[mb].width;
        measure::compute_width(score, mb, &visible, ticks.min_ticks(), ticks.max, stretch, false);
        delta += score.measures[mb].width - old;
    }
    delta
}

// ═══════════════════════════════════════════════════════════════════════
// collect_system
// ═══════════════════════════════════════════════════════════════════════

/// Collect the next system starting at the context's current measure.
///
/// Returns the index of the new system in `ctx.systems`, or `None` when
/// there is nothing left to lay out.
pub(super) fn collect_system(score: &mut Score, ctx: &mut LayoutContext) -> Option<usize> {
    let first = ctx.cur_measure?;

    if let Some(last) = ctx.systems.last().and_then(System::last_measure_base) {
        if let Some(mb) = score.find_potential_section_break(last) {
            ctx.update_section_state(score, mb);
        }
    }

    let mut system = ctx.get_next_system(score);
    let long_names = ctx.start_with_long_names;
    vertical::set_instrument_names(score, &mut system, long_names, score.measures[first].tick);

    let target = ctx.target_system_width(score);
    system.width = if target.is_finite() { target } else { 0.0 };
    let squeezability = score.style.squeezability;

    let mut cur_sys_width = 0.0;
    let mut layout_system_min_width = 0.0;
    let mut first_measure = true;
    let mut create_header = false;
    let mut cur_header = score.measures[first].has_header();
    let mut cur_begin_barline = begin_barline(score, first);
    let mut cur_trailer = score.measures[first].has_trailer();
    let mut break_measure: Option<usize> = None;
    let mut ticks = TickBounds::new();
    let mut old_stretch = 1.0;
    let mut old_width = 0.0;

    while let Some(cur) = ctx.cur_measure {
        let old_system = score.measures[cur].system;
        system.append_measure(cur);
        score.measures[cur].system = Some(system.id);
        if has_cross_staff_beams(score, &system) {
            update_cross_beams(score, ctx, &mut system);
        }

        let mut ww;
        if score.measures[cur].is_measure() {
            measure::compute_pre_spacing_items(score, cur);
            let (cur_min, cur_max) = score.measures[cur]
                .as_measure()
                .map(|m| (m.shortest_chord_rest(), m.longest_chord_rest()))
                .unwrap_or((0, 0));
            if ticks.include(cur_min, cur_max) {
                // every measure already in the system depends on these bounds
                cur_sys_width += recompute_widths(score, &system, Some(cur), &ticks, 1.0);
            }

            if first_measure {
                layout_system_min_width = cur_sys_width;
                let (is_first, indent) = (ctx.first_system, ctx.first_system_indent);
                vertical::layout_system(score, ctx, &mut system, cur_sys_width, is_first, indent);
                if has_cross_staff_beams(score, &system) {
                    update_cross_beams(score, ctx, &mut system);
                }
                cur_sys_width += system.left_margin;
                measure::enable_start_repeat(score, cur);
                measure::add_system_header(score, cur);
                first_measure = false;
                create_header = false;
            } else if create_header {
                measure::add_system_header(score, cur);
                create_header = false;
            } else {
                measure::remove_system_header(score, cur);
            }

            let visible = system.show_flags();
            measure::create_end_barlines(score, cur, true, &visible);
            if score.measures[cur].no_break {
                measure::remove_system_trailer(score, cur);
            } else {
                let next = score.next_measure(cur);
                measure::add_system_trailer(score, cur, next);
            }
            measure::compute_width(score, cur, &visible, ticks.min_ticks(), ticks.max, 1.0, false);
            ww = score.measures[cur].width;
        } else if let MeasureKind::HBox(h) = &score.measures[cur].kind {
            ww = h.width;
            create_header = h.create_system_header;
            score.measures[cur].width = ww;
        } else {
            // vertical and text frames form a system of their own
            score.measures[cur].x = 0.0;
            score.measures[cur].width = system.width;
            ctx.get_next_measure(score);
            vertical::layout2(score, ctx, &mut system);
            return Some(ctx.push_system(system));
        }

        // check if the current measure fits, remove it if not
        let acceptance_range = squeezability * system.squeezable_space(score);
        let overflow = system.measures.len() > 1 && cur_sys_width + ww > target + acceptance_range;
        let last = system.measures.len() - 1;
        let mut cluster_start = last;
        while cluster_start > 0 && score.measures[system.measures[cluster_start - 1]].no_break {
            cluster_start -= 1;
        }
        // a no-break run filling the whole system overflows and gets squeezed
        if overflow && cluster_start > 0 {
            break_measure = Some(cur);
            let resume = system.measures[cluster_start];
            while system.measures.len() > cluster_start {
                let Some(removed) = system.remove_last_measure() else {
                    break;
                };
                if removed != cur {
                    cur_sys_width -= score.measures[removed].width;
                }
                score.measures[removed].system = old_system;
            }
            ctx.reset_cursor(score, resume);

            let changed = if cluster_start == last {
                ticks.rollback()
            } else {
                let before = (ticks.min, ticks.max);
                ticks = TickBounds::from_system(score, &system);
                before != (ticks.min, ticks.max)
            };
            if changed {
                cur_sys_width += recompute_widths(score, &system, None, &ticks, 1.0);
            }
            break;
        }

        if let Some(prev) = ctx.prev_measure {
            if score.measures[prev].is_measure() && score.measures[prev].system == Some(system.id) {
                // the previous measure is not the last one of the system
                let visible = system.show_flags();
                if score.measures[prev].has_trailer() {
                    let ow = score.measures[prev].width;
                    measure::remove_system_trailer(score, prev);
                    measure::recompute_width(score, prev, &visible);
                    cur_sys_width += score.measures[prev].width - ow;
                }
                if score.measures[cur].is_measure() && measure::enable_start_repeat(score, cur) {
                    measure::compute_width(score, cur, &visible, ticks.min_ticks(), ticks.max, 1.0, false);
                    ww = score.measures[cur].width;
                }
                // assume another true measure follows; corrected after the loop
                cur_sys_width += measure::create_end_barlines(score, prev, false, &visible);
                if score.measures[cur].is_measure() {
                    // merging into an end-start repeat may have disabled our start repeat
                    measure::recompute_width(score, cur, &visible);
                    ww = score.measures[cur].width;
                }
            }
        }

        let line_break = ctx.options.mode.honors_breaks() && score.measures[cur].breaks.any();

        // preserve the state of the next measure, which is about to become current
        if let Some(next) = ctx.next_measure {
            if let Some(nm) = score.measures[next].as_measure() {
                old_stretch = nm.spacing.stretch;
                old_width = score.measures[next].width;
            }
            if !score.measures[cur].no_break {
                cur_header = score.measures[next].has_header();
                cur_begin_barline = begin_barline(score, next);
            }
            if !score.measures[next].no_break {
                cur_trailer = score.measures[next].has_trailer();
            }
        }

        ctx.get_next_measure(score);
        cur_sys_width += ww;

        match ctx.cur_measure {
            None => break,
            Some(mb) if line_break || score.measures[mb].is_vertical_frame() => break,
            Some(_) => {}
        }
    }

    let Some(prev) = ctx.prev_measure else {
        error!("collect_system: no previous measure after collecting a system");
        return Some(ctx.push_system(system));
    };

    if ctx.end_tick < score.measures[prev].tick && Some(prev) == ctx.system_old_measure {
        // this system ends where the previous layout ended: stop here
        let header = cur_header.then_some(cur_begin_barline);
        restore_lookahead(score, ctx, break_measure, header, cur_trailer, old_stretch, old_width);
        ctx.range_done = true;
    }

    /*
     * The system now has its final set of measures.
     */

    if score.measures[prev].is_measure() {
        let visible = system.show_flags();
        measure::create_end_barlines(score, prev, true, &visible);
    }

    vertical::hide_empty_staves(score, &mut system, ctx.first_system);
    // relayout the left margin for newly hidden or shown staves
    cur_sys_width -= system.left_margin;
    let (is_first, indent) = (ctx.first_system, ctx.first_system_indent);
    vertical::layout_system(score, ctx, &mut system, layout_system_min_width, is_first, indent);
    cur_sys_width += system.left_margin;

    let lm = system.last_measure(score);
    if let Some(lm) = lm {
        if let Some(nm) = score.next_measure(lm) {
            measure::add_system_trailer(score, lm, Some(nm));
        }
    }

    // widths again, for barlines, trailer and hidden staves; a system wider
    // than the target is computed with reduced stretch so justification
    // never has to shrink it
    let pre_stretch = if target > cur_sys_width { 1.0 } else { 1.0 - squeezability };
    cur_sys_width += recompute_widths(score, &system, None, &ticks, pre_stretch);

    let actual = system.content_width(score);
    if (actual - cur_sys_width).abs() > EPSILON {
        debug!("system {:?}: tracked width {cur_sys_width} resynced to {actual}", system.id);
        cur_sys_width = actual;
    }

    if cur_sys_width > target {
        cur_sys_width = narrow::manage_narrow_spacing(score, &system, cur_sys_width, target, &ticks);
    }

    let last_of_section = ctx.cur_measure.is_none()
        || lm.is_some_and(|m| score.measures[m].breaks.section.is_some());
    let underfull = target.is_finite() && cur_sys_width / target < score.style.last_system_fill_limit;
    if target.is_finite() && !(last_of_section && underfull) && !ctx.options.no_horizontal_stretch {
        justify_system(score, &system, cur_sys_width, target);
    }

    // place measures
    let mut x = 0.0;
    let mut first_measure = true;
    let mut create_brackets = false;
    for mb in system.measures.clone() {
        let ww = score.measures[mb].width;
        let gap = match &score.measures[mb].kind {
            MeasureKind::HBox(h) => Some((h.gap, h.create_system_header)),
            _ => None,
        };
        if score.measures[mb].is_measure() {
            if first_measure {
                x += system.left_margin;
                first_measure = false;
            }
            score.measures[mb].x = x;
            score.measures[mb].system = Some(system.id);
            if create_brackets {
                brackets::add_brackets(score, &mut system, mb);
                create_brackets = false;
            }
        } else if let Some((gap, header)) = gap {
            score.measures[mb].x = x + gap;
            create_brackets = header;
        } else {
            score.measures[mb].x = x;
        }
        x += ww;
    }
    system.width = x;
    system.min_sys_ticks = ticks.min_ticks();
    system.max_sys_ticks = ticks.max;

    annotations::layout_system_elements(score, ctx, &mut system);
    vertical::layout2(score, ctx, &mut system);

    Some(ctx.push_system(system))
}

fn begin_barline(score: &Score, idx: usize) -> bool {
    score.measures[idx].as_measure().is_some_and(|m| m.spacing.begin_barline)
}

/// The range is done: put the look-ahead measure(s) back into the state
/// the previous layout left them in. `header` carries the begin barline
/// flag when the first look-ahead measure had a system header.
fn restore_lookahead(
    score: &mut Score,
    ctx: &LayoutContext,
    break_measure: Option<usize>,
    header: Option<bool>,
    cur_trailer: bool,
    old_stretch: f64,
    old_width: f64,
) {
    let Some(cur) = ctx.cur_measure.filter(|&c| score.is_measure(c)) else {
        return;
    };
    measure::enable_start_repeat(score, cur);
    let nm = break_measure.unwrap_or(cur);
    match header {
        Some(begin_barline) => {
            measure::add_system_header(score, cur);
            measure::set_begin_barline(score, cur, begin_barline);
        }
        None => measure::remove_system_header(score, cur),
    }

    let mut m = cur;
    loop {
        if cur_trailer && !score.measures[m].no_break {
            let next = score.next_measure(m);
            measure::add_system_trailer(score, m, next);
        } else {
            measure::remove_system_trailer(score, m);
        }
        let old_system = score.measures[m]
            .system
            .and_then(|id| ctx.system_pool.iter().find(|s| s.id == id));
        let (visible, min, max) = match old_system {
            Some(s) => (s.show_flags(), s.min_sys_ticks, s.max_sys_ticks),
            None => {
                let spacing = score.measures[m].as_measure().map(|mm| mm.spacing.clone()).unwrap_or_default();
                (vec![true; score.nstaves()], spacing.min_ticks, spacing.max_ticks)
            }
        };
        measure::compute_width(score, m, &visible, min, max, old_stretch, false);
        measure::stretch_to_target_width(&mut score.measures[m], old_width);
        if m == nm || !score.measures[m].no_break {
            break;
        }
        match score.next_measure(m) {
            Some(n) => m = n,
            None => break,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Justification
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SegmentRef {
    measure: usize,
    segment: usize,
}

/// Stretch the chord/rest segments of `system` from `cur_sys_width` to
/// `target_system_width`.
///
/// Near-zero slack is a no-op, so justifying an already justified system
/// changes nothing. Negative slack is a layout fault: it is logged and the
/// system is left alone.
pub fn justify_system(score: &mut Score, system: &System, cur_sys_width: f64, target_system_width: f64) {
    let rest = target_system_width - cur_sys_width;
    if rest.abs() < EPSILON {
        return;
    }
    if rest < 0.0 {
        error!("system justification error: width {cur_sys_width} exceeds target {target_system_width}");
        return;
    }

    let mut springs: Vec<Spring<SegmentRef>> = Vec::new();
    for &mi in &system.measures {
        let Some(m) = score.measures[mi].as_measure() else {
            continue;
        };
        for (si, s) in m.segments.iter().enumerate() {
            if !is_spring_segment(s) {
                continue;
            }
            let target = SegmentRef { measure: mi, segment: si };
            if let Some(spring) = Spring::new(s.stretch, s.width - s.width_offset, target) {
                springs.push(spring);
            }
        }
    }

    for (target, width) in stretch_segments_to_width(&mut springs, rest) {
        if let Some(m) = score.measures[target.measure].as_measure_mut() {
            let seg = &mut m.segments[target.segment];
            seg.width = width + seg.width_offset;
        }
    }

    for &mi in &system.measures {
        measure::respace_segments(&mut score.measures[mi]);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Cross-staff beams
// ═══════════════════════════════════════════════════════════════════════

fn has_cross_staff_beams(score: &Score, system: &System) -> bool {
    system
        .measures
        .iter()
        .filter_map(|&i| score.measures[i].as_measure())
        .flat_map(|m| m.segments.iter())
        .flat_map(|s| s.chord_rests.iter())
        .filter_map(|cr| cr.beam.and_then(|b| score.beams.get(b)))
        .any(|b| b.cross || b.user_modified)
}

/// Staff distances are needed to decide stem directions under cross-staff
/// beams, so compute them first, then point stems towards the beam.
fn update_cross_beams(score: &mut Score, ctx: &mut LayoutContext, system: &mut System) {
    vertical::layout2(score, ctx, system);

    let mut beam_staves: HashMap<usize, (usize, usize)> = HashMap::new();
    for m in system.measures.iter().filter_map(|&i| score.measures[i].as_measure()) {
        for cr in m.segments.iter().flat_map(|s| s.chord_rests.iter()) {
            if let Some(b) = cr.beam {
                let entry = beam_staves.entry(b).or_insert((cr.vstaff(), cr.vstaff()));
                entry.0 = entry.0.min(cr.vstaff());
                entry.1 = entry.1.max(cr.vstaff());
            }
        }
    }

    for &mi in &system.measures {
        let Some(m) = score.measures[mi].as_measure_mut() else {
            continue;
        };
        for cr in m.segments.iter_mut().flat_map(|s| s.chord_rests.iter_mut()) {
            let Some(b) = cr.beam else {
                continue;
            };
            let Some(beam) = score.beams.get(b) else {
                continue;
            };
            if !beam.cross || beam.user_modified {
                continue;
            }
            if let Some(&(top, bottom)) = beam_staves.get(&b) {
                if top != bottom {
                    cr.up = cr.vstaff() > top;
                }
            }
        }
    }
}
