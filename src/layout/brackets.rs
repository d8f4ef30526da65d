//! System brackets: creation with identity reuse, horizontal stacking by
//! column and vertical extents.

use log::trace;

use super::system::{Bracket, BracketKey, System};
use super::LayoutContext;
use crate::model::{BracketItem, BracketType, Score, VOICES};
use crate::style::Style;

/// Drawn width of a bracket including the gap to the next column or staff.
pub(super) fn bracket_width(style: &Style, bracket_type: BracketType) -> f64 {
    match bracket_type {
        BracketType::Brace => style.sp(style.akkolade_width + style.bracket_distance),
        BracketType::Normal | BracketType::Square | BracketType::Line => {
            style.sp(style.bracket_width + style.bracket_distance)
        }
        BracketType::NoBracket => 0.0,
    }
}

fn columns(score: &Score) -> usize {
    score
        .staves
        .iter()
        .flat_map(|s| s.brackets.iter())
        .map(|b| b.column + 1)
        .max()
        .unwrap_or(0)
}

/// First and last staff of `[staff, staff + span)` for which `shown` holds,
/// clipped to `nstaves`.
fn visible_range(staff: usize, span: usize, nstaves: usize, shown: impl Fn(usize) -> bool) -> Option<(usize, usize)> {
    if span == 0 || staff >= nstaves {
        return None;
    }
    let last = (staff + span - 1).min(nstaves - 1);
    let first = (staff..=last).find(|&i| shown(i))?;
    let last = (first..=last).rev().find(|&i| shown(i))?;
    Some((first, last))
}

/// Width of every bracket that would be drawn with all score staves in
/// their default visibility. Computed once per layout pass.
pub(super) fn total_bracket_offset(score: &Score, ctx: &mut LayoutContext) -> f64 {
    if let Some(w) = ctx.total_brackets_width {
        return w;
    }
    let nstaves = score.nstaves();
    let mut widths = vec![0.0; nstaves];
    for (staff_idx, staff) in score.staves.iter().enumerate() {
        for bi in &staff.brackets {
            if bi.bracket_type == BracketType::NoBracket {
                continue;
            }
            let Some((first, last)) = visible_range(staff_idx, bi.span, nstaves, |i| score.staves[i].show) else {
                continue;
            };
            let span = last - first + 1;
            if span > 1
                || span == bi.span
                || (span == 1 && score.style.always_show_brackets_when_empty_staves_are_hidden)
            {
                let w = bracket_width(&score.style, bi.bracket_type);
                for width in &mut widths[first..=last] {
                    *width += w;
                }
            }
        }
    }
    let total = widths.into_iter().fold(0.0, f64::max);
    ctx.total_brackets_width = Some(total);
    total
}

/// Create the brackets drawn at the start of `system`, reusing brackets of
/// the previous layout with the same key.
pub(super) fn layout_brackets(score: &Score, system: &mut System) {
    let ncolumns = columns(score);
    let mut old = std::mem::take(&mut system.brackets);
    old.append(&mut system.frame_brackets);
    let measure = system.first_measure(score);

    for staff_idx in 0..system.staves.len().min(score.nstaves()) {
        for column in 0..ncolumns {
            for bi in score.staves[staff_idx].brackets.iter().filter(|b| b.column == column) {
                if bi.bracket_type != BracketType::NoBracket {
                    create_bracket(score, system, bi, staff_idx, &mut old, measure);
                }
            }
        }
    }

    // brackets after a frame come back in `add_brackets`
    let before = old.len();
    old.retain(|b| b.key.measure.is_some() && b.key.measure != measure);
    if old.len() < before {
        trace!("system {:?}: dropped {} stale brackets", system.id, before - old.len());
    }
    system.frame_brackets = old;
}

/// Brackets in front of a measure that follows a frame asking for a new
/// system header.
pub(super) fn add_brackets(score: &Score, system: &mut System, measure: usize) {
    if system.staves.is_empty() {
        return;
    }
    let ncolumns = columns(score);
    let mut old = std::mem::take(&mut system.frame_brackets);
    let start = system.brackets.len();
    for staff_idx in 0..system.staves.len().min(score.nstaves()) {
        for column in 0..ncolumns {
            for bi in score.staves[staff_idx].brackets.iter().filter(|b| b.column == column) {
                if bi.bracket_type != BracketType::NoBracket {
                    create_bracket(score, system, bi, staff_idx, &mut old, Some(measure));
                }
            }
        }
    }
    let x = score.measures[measure].x;
    let added: Vec<usize> = (start..system.brackets.len()).collect();
    set_brackets_x_position(&mut system.brackets, &added, x);
    system.frame_brackets = old;
}

/// Create (or take from `old`) the bracket for `bi` on `staff_idx` if it
/// is visible in this system.
fn create_bracket(
    score: &Score,
    system: &mut System,
    bi: &BracketItem,
    staff_idx: usize,
    old: &mut Vec<Bracket>,
    measure: Option<usize>,
) {
    let nstaves = system.staves.len();
    let Some((first, last)) = visible_range(staff_idx, bi.span, nstaves, |i| system.staves[i].show) else {
        return;
    };
    let span = last - first + 1;
    let style = &score.style;
    let square = bi.bracket_type == BracketType::Square;
    let visible = span > 1
        || span == bi.span
        || (span == 1 && style.always_show_brackets_when_empty_staves_are_hidden && !square)
        || (span == 1 && style.always_show_square_brackets_when_empty_staves_are_hidden && square);
    if !visible {
        return;
    }

    let key = BracketKey {
        track: staff_idx * VOICES,
        column: bi.column,
        bracket_type: bi.bracket_type,
        measure,
    };
    let mut bracket = match old.iter().position(|b| b.key == key) {
        Some(i) => old.remove(i),
        None => Bracket {
            key,
            serial: system.next_bracket_serial(),
            first_staff: first,
            last_staff: last,
            span: bi.span,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        },
    };
    bracket.first_staff = first;
    bracket.last_staff = last;
    bracket.span = bi.span;
    bracket.width = bracket_width(style, bi.bracket_type);
    system.brackets.push(bracket);
}

/// Place the brackets `which` left of `x`, moving brackets of a higher
/// column further left past every lower-column bracket they overlap.
pub(super) fn set_brackets_x_position(brackets: &mut [Bracket], which: &[usize], x: f64) {
    for &i in which {
        let b1 = &brackets[i];
        let offset: f64 = which
            .iter()
            .map(|&j| &brackets[j])
            .filter(|b2| {
                let first_in = b1.first_staff >= b2.first_staff && b1.first_staff <= b2.last_staff;
                let last_in = b1.last_staff >= b2.first_staff && b1.last_staff <= b2.last_staff;
                b1.column() > b2.column() && (first_in || last_in)
            })
            .map(|b2| b2.width)
            .sum();
        brackets[i].x = x - offset - brackets[i].width;
    }
}

/// Vertical extent of each bracket: from the first to the last visible
/// staff it spans. Brackets reduced to a single staff by hiding collapse to
/// zero height unless they were declared that way or the style keeps them.
pub(super) fn layout_brackets_vertical(score: &Score, system: &mut System) {
    let always = score.style.always_show_brackets_when_empty_staves_are_hidden;
    let System { brackets, staves, .. } = system;
    for b in brackets.iter_mut() {
        let mut first = b.first_staff;
        let mut last = b.last_staff.min(staves.len().saturating_sub(1));
        while first <= last && !staves[first].show {
            first += 1;
        }
        while first <= last && !staves[last].show {
            last -= 1;
        }
        let shown = if always {
            first <= last
        } else {
            first < last || (b.span == 1 && first == last)
        };
        let (sy, ey) = if shown {
            (staves[first].bbox.top(), staves[last].bbox.bottom())
        } else {
            (0.0, 0.0)
        };
        b.y = sy;
        b.height = ey - sy;
    }
}
