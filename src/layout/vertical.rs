//! Vertical layout of a system: staff visibility, left margin, staff
//! distances, bracket extents and instrument names.

use log::debug;

use super::brackets;
use super::constants::*;
use super::lines;
use super::measure;
use super::system::{InstrumentName, InstrumentNameKind, System};
use super::LayoutContext;
use crate::geometry::Rect;
use crate::model::*;
use crate::style::HAlign;

// ═══════════════════════════════════════════════════════════════════════
// Instrument names
// ═══════════════════════════════════════════════════════════════════════

/// Create, update or remove the instrument names of `system` for the names
/// in effect at `tick`.
pub(super) fn set_instrument_names(score: &Score, system: &mut System, long: bool, tick: Ticks) {
    if system.is_vertical_frame(score) {
        return;
    }
    let style = &score.style;
    if !score.show_instrument_names
        || (style.hide_instrument_name_if_one_instrument && score.visible_part_count() <= 1)
    {
        for ss in &mut system.staves {
            ss.instrument_names.clear();
        }
        return;
    }

    let (kind, font_size) = if long {
        (InstrumentNameKind::Long, style.text_size(style.long_instrument_font_size))
    } else {
        (InstrumentNameKind::Short, style.text_size(style.short_instrument_font_size))
    };

    for (staff_idx, ss) in system.staves.iter_mut().enumerate() {
        let Some(part) = score.part_of_staff(staff_idx) else {
            ss.instrument_names.clear();
            continue;
        };
        let is_top = part.first_staff == staff_idx;
        let show = part.show && score.staves[part.staff_range()].iter().any(|s| s.show);
        if !is_top || !show {
            ss.instrument_names.clear();
            continue;
        }

        let names = if long { part.long_names_at(tick) } else { part.short_names_at(tick) };
        ss.instrument_names.truncate(names.len());
        for (i, sn) in names.iter().enumerate() {
            let width = estimate_text_width(&sn.name, font_size);
            match ss.instrument_names.get_mut(i) {
                Some(name) => {
                    name.text.clone_from(&sn.name);
                    name.kind = kind;
                    name.layout_pos = sn.layout_pos;
                    name.align = style.instrument_name_align;
                    name.width = width;
                    name.height = font_size;
                }
                None => ss.instrument_names.push(InstrumentName {
                    text: sn.name.clone(),
                    kind,
                    layout_pos: sn.layout_pos,
                    align: style.instrument_name_align,
                    width,
                    height: font_size,
                    pos: Default::default(),
                }),
            }
        }
    }
}

fn instrument_names_width(system: &System, is_first: bool) -> f64 {
    system
        .staves
        .iter()
        .filter(|ss| !(is_first && !ss.show))
        .flat_map(|ss| ss.instrument_names.iter())
        .map(|n| n.width)
        .fold(0.0, f64::max)
}

// ═══════════════════════════════════════════════════════════════════════
// Horizontal: left margin, brackets, begin barlines
// ═══════════════════════════════════════════════════════════════════════

/// Compute the left margin of `system` and the x position of staves,
/// brackets and instrument names. `xo1` is added to the staff boxes.
pub(super) fn layout_system(
    score: &mut Score,
    ctx: &mut LayoutContext,
    system: &mut System,
    xo1: f64,
    is_first: bool,
    first_system_indent: bool,
) {
    if system.staves.is_empty() {
        return;
    }
    let style = &score.style;
    let actual_size = if ctx.start_with_long_names {
        style.long_instrument_font_size
    } else {
        style.short_instrument_font_size
    };
    let text_scaling = (actual_size / DEFAULT_INSTRUMENT_FONT_SIZE).max(1.0);
    let name_offset = style.sp(style.instrument_name_offset) * text_scaling;

    for (staff_idx, ss) in system.staves.iter_mut().enumerate() {
        let shown = score.staves.get(staff_idx).is_some_and(|s| s.show);
        if !shown || !ss.show {
            ss.bbox = Rect::default();
        }
    }

    brackets::layout_brackets(score, system);
    let max_brackets_width = brackets::total_bracket_offset(score, ctx);
    let mut max_names_width = instrument_names_width(system, is_first);

    let style = &score.style;
    let mut indent = if max_names_width > 0.0 {
        max_names_width + name_offset
    } else {
        0.0
    };
    if is_first && first_system_indent {
        indent = indent.max(style.sp(style.first_system_indentation) - max_brackets_width);
        max_names_width = max_names_width.max(indent - name_offset);
    }
    system.left_margin = if indent.abs() < EPSILON {
        if style.align_system_to_margin {
            0.0
        } else {
            max_brackets_width
        }
    } else {
        indent + max_brackets_width
    };

    let staff_x = system.left_margin + xo1;
    for (staff_idx, ss) in system.staves.iter_mut().enumerate() {
        let Some(staff) = score.staves.get(staff_idx) else {
            continue;
        };
        if !staff.show || !ss.show {
            continue;
        }
        ss.bbox = if staff.lines <= 1 {
            let h = staff.line_distance * staff.spatium(style);
            Rect::new(staff_x, -h, 0.0, 2.0 * h)
        } else {
            Rect::new(staff_x, 0.0, 0.0, staff.height(style))
        };
    }

    let all: Vec<usize> = (0..system.brackets.len()).collect();
    brackets::set_brackets_x_position(&mut system.brackets, &all, staff_x);

    // hidden staves are not known yet, so every name gets an x position
    let name_x = match style.instrument_name_align {
        HAlign::Left => 0.0,
        HAlign::Center => max_names_width * 0.5,
        HAlign::Right => max_names_width,
    };
    for name in system.staves.iter_mut().flat_map(|ss| ss.instrument_names.iter_mut()) {
        name.pos.x = name_x;
    }

    let visible = system
        .staves
        .iter()
        .enumerate()
        .filter(|(i, ss)| ss.show && score.staves.get(*i).is_some_and(|s| s.show))
        .count();
    let wants_barline = (visible > 1) || (visible == 1 && (style.start_barline_single || !system.brackets.is_empty()));
    let first = system.first_measure_base();
    for &mb in &system.measures {
        if !score.is_measure(mb) {
            continue;
        }
        let at_start = Some(mb) == first || mb.checked_sub(1).is_some_and(|p| score.measures[p].is_hbox());
        measure::set_begin_barline(score, mb, at_start && wants_barline);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Staff visibility
// ═══════════════════════════════════════════════════════════════════════

/// Decide which staves of `system` are shown. At least one staff always
/// stays visible.
pub(super) fn hide_empty_staves(score: &Score, system: &mut System, is_first: bool) {
    let style = &score.style;
    let nstaves = score.nstaves();
    let measures: Vec<&Measure> = system
        .measures
        .iter()
        .filter_map(|&i| score.measures[i].as_measure())
        .collect();
    let mut system_is_empty = true;

    for (staff_idx, staff) in score.staves.iter().enumerate() {
        let Some(ss) = system.staves.get_mut(staff_idx) else {
            break;
        };
        let mode = staff.hide_when_empty;
        let may_hide = mode == HideMode::Always
            || (style.hide_empty_staves
                && nstaves > 1
                && !(is_first && style.dont_hide_staves_in_first_system)
                && mode != HideMode::Never);

        if may_hide {
            let mut hide = measures.iter().all(|m| m.is_empty(staff_idx));
            if let Some(part) = score.parts.get(staff.part).filter(|p| p.nstaves > 1) {
                if hide && mode == HideMode::Instrument {
                    hide = part.staff_range().all(|st| measures.iter().all(|m| m.is_empty(st)));
                }
                // notes of another staff of the part moved onto this one
                if hide && measures.iter().any(|m| m.has_moved_chord_on(staff_idx, part.staff_range())) {
                    hide = false;
                }
            }
            ss.show = !hide && staff.show;
            if ss.show {
                system_is_empty = false;
            }
        } else if !staff.show {
            ss.show = false;
        } else {
            ss.show = true;
            system_is_empty = false;
        }
    }

    let mut first_visible = None;
    if system_is_empty {
        for (staff_idx, staff) in score.staves.iter().enumerate() {
            let Some(ss) = system.staves.get_mut(staff_idx) else {
                break;
            };
            if staff.show_if_empty && !ss.show {
                ss.show = true;
                system_is_empty = false;
            } else if first_visible.is_none() && staff.show {
                first_visible = Some(staff_idx);
            }
        }
    }
    if system_is_empty && !system.staves.is_empty() {
        let idx = first_visible.unwrap_or(0);
        debug!("system {:?}: every staff empty, keeping staff {idx}", system.id);
        system.staves[idx].show = true;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Vertical: staff distances and everything that depends on them
// ═══════════════════════════════════════════════════════════════════════

/// Lay out staves top to bottom and set the system height, then place
/// brackets, instrument names and cross-staff slurs.
pub(super) fn layout2(score: &mut Score, ctx: &mut LayoutContext, system: &mut System) {
    if let Some(&frame) = system.measures.first().filter(|&&i| score.measures[i].is_vertical_frame()) {
        if let MeasureKind::VBox(b) | MeasureKind::TBox(b) = &score.measures[frame].kind {
            let height = b.height;
            system.height = height;
            score.measures[frame].height = height;
        }
        return;
    }

    let visible: Vec<usize> = (0..system.staves.len())
        .filter(|&i| system.staves[i].show && score.staves.get(i).is_some_and(|s| s.show))
        .collect();
    for (i, ss) in system.staves.iter_mut().enumerate() {
        if !visible.contains(&i) {
            ss.bbox = Rect::default();
        }
    }
    let Some(&last_visible) = visible.last() else {
        return;
    };

    let style = &score.style;
    let sp = style.spatium;
    let min_vertical_distance = style.sp(style.min_vertical_distance);
    let (staff_distance, akkolade_distance) = if style.enable_vertical_spread {
        (style.sp(style.min_staff_spread), style.sp(style.min_staff_spread))
    } else {
        (style.sp(style.staff_distance), style.sp(style.akkolade_distance))
    };
    let linear = ctx.options.mode.is_linear();
    let left = system.left_margin;
    let width = system.width - system.left_margin;

    let mut y = 0.0;
    for (n, &si1) in visible.iter().enumerate() {
        let staff = &score.staves[si1];
        let (y_off, h) = if staff.lines == 1 {
            (
                sp * ONE_LINE_BARLINE_TO * 0.5,
                sp * (ONE_LINE_BARLINE_TO - ONE_LINE_BARLINE_FROM) * 0.5,
            )
        } else {
            (0.0, staff.height(style))
        };
        let place = |ss: &mut super::system::SysStaff, y: f64| {
            ss.y_off = y_off;
            ss.bbox = Rect::new(left, y - y_off, width, h);
        };

        let Some(&si2) = visible.get(n + 1) else {
            place(&mut system.staves[si1], y);
            break;
        };
        let staff2 = &score.staves[si2];

        let mut dist = staff.height(style);
        dist += if staff.part == staff2.part {
            akkolade_distance * staff.mag
        } else {
            staff_distance
        };
        dist += staff2.user_dist;

        let mut fixed = false;
        for m in system.measures.iter().filter_map(|&i| score.measures[i].as_measure()) {
            for spacer in &m.spacers {
                match spacer.kind {
                    SpacerKind::Fixed if spacer.staff == si1 => {
                        dist = staff.height(style) + spacer.gap;
                        fixed = true;
                    }
                    SpacerKind::Down if spacer.staff == si1 => {
                        dist = dist.max(staff.height(style) + spacer.gap);
                    }
                    SpacerKind::Up if spacer.staff == si2 => {
                        dist = dist.max(spacer.gap + staff.height(style));
                    }
                    _ => {}
                }
                if fixed {
                    break;
                }
            }
            if fixed {
                break;
            }
        }

        if !fixed {
            // the skyline may be partial in continuous view, so remember the
            // largest distance seen and never go below it
            let mut d = system.staves[si1].skyline.min_distance(&system.staves[si2].skyline);
            if linear {
                let ss = &mut system.staves[si1];
                if d > ss.continuous_dist {
                    ss.continuous_dist = d;
                } else {
                    d = ss.continuous_dist;
                }
            }
            dist = dist.max(d + min_vertical_distance);
        }
        place(&mut system.staves[si1], y);
        y += dist;
    }

    system.height = system.staves[last_visible].bbox.bottom();
    set_measure_height(score, system, system.height);
    brackets::layout_brackets_vertical(score, system);
    layout_instrument_names(score, system);
    lines::layout_cross_staff_slurs(score, system);
}

fn set_measure_height(score: &mut Score, system: &System, height: f64) {
    let sp = score.style.spatium;
    for &mb in &system.measures {
        let m = &mut score.measures[mb];
        match m.kind {
            // one spatium above the top and below the bottom staff
            MeasureKind::Measure(_) => m.height = height + 2.0 * sp,
            MeasureKind::HBox(_) => m.height = height,
            MeasureKind::TBox(_) => {}
            MeasureKind::VBox(_) => debug!("unhandled measure type {}", m.type_name()),
        }
    }
}

/// Vertical position of instrument names by their layout position.
fn layout_instrument_names(score: &Score, system: &mut System) {
    for part in &score.parts {
        let top = part.first_staff;
        if top >= system.staves.len() {
            continue;
        }
        let range = part.first_staff..(part.first_staff + part.nstaves).min(system.staves.len());
        let Some(visible) = range.clone().find(|&i| system.staves[i].show) else {
            continue;
        };
        if visible != top {
            let moved = std::mem::take(&mut system.staves[top].instrument_names);
            system.staves[visible].instrument_names.extend(moved);
        }

        let bbox = |i: usize| system.staves.get(i).map(|s| s.bbox).unwrap_or_default();
        let last_shown = range.clone().rev().find(|&i| system.staves[i].show).unwrap_or(top);
        let first = bbox(visible);
        let (second, third) = (bbox(top + 1), bbox(top + 2));
        let centres: Vec<f64> = system.staves[visible]
            .instrument_names
            .iter()
            .map(|name| {
                let (y1, y2) = match name.layout_pos {
                    1 => (first.top(), first.bottom()),
                    2 => (first.top(), second.bottom()),
                    3 => (second.top(), second.bottom()),
                    4 => (second.top(), third.bottom()),
                    5 => (third.top(), third.bottom()),
                    _ => (first.top(), bbox(last_shown).bottom()),
                };
                y1 + (y2 - y1) * 0.5
            })
            .collect();
        for (name, y) in system.staves[visible].instrument_names.iter_mut().zip(centres) {
            name.pos.y = y;
        }
    }
}
