//! Fallback spacing for systems still wider than the page after
//! line breaking. Each stage stops as soon as the system fits.

use super::collect::TickBounds;
use super::constants::*;
use super::measure;
use super::system::System;
use crate::model::*;

/// Shrink `system` towards `target_width`; returns the new system width.
///
/// 1. Reduce the duration stretch coefficient down to zero.
/// 2. Squeeze padding, the space after the barline and header margins.
/// 3. Scale chord/rest segment widths down, which may cause collisions.
pub(super) fn manage_narrow_spacing(
    score: &mut Score,
    system: &System,
    mut cur_width: f64,
    target_width: f64,
    ticks: &TickBounds,
) -> f64 {
    let Some(first) = system.first_measure(score) else {
        return cur_width;
    };
    let visible = system.show_flags();
    let measures: Vec<usize> = system
        .measures
        .iter()
        .copied()
        .filter(|&i| score.is_measure(i))
        .collect();

    // 1: stretch coefficient
    let mut stretch_coeff = score.measures[first]
        .as_measure()
        .map(|m| m.spacing.stretch)
        .unwrap_or(1.0)
        - NARROW_STRETCH_STEP;
    while cur_width > target_width && stretch_coeff > -EPSILON {
        let coeff = stretch_coeff.max(0.0);
        for &mi in &measures {
            let prev = score.measures[mi].width;
            measure::compute_width(score, mi, &visible, ticks.min_ticks(), ticks.max, coeff, true);
            cur_width += score.measures[mi].width - prev;
        }
        stretch_coeff -= NARROW_STRETCH_STEP;
    }
    let stretch_coeff = stretch_coeff.max(0.0);

    // 2: squeeze factor on padding and margins
    let mut squeeze = NARROW_SQUEEZE_START;
    while cur_width > target_width && squeeze > -EPSILON {
        let factor = squeeze.max(NARROW_SQUEEZE_LIMIT);
        for &mi in &measures {
            if let Some(m) = score.measures[mi].as_measure_mut() {
                for seg in &mut m.segments {
                    seg.squeeze_factor = squeeze.max(0.0);
                }
            }
            let prev = score.measures[mi].width;
            measure::compute_width(score, mi, &visible, ticks.min_ticks(), ticks.max, stretch_coeff, true);
            if let Some(m) = score.measures[mi].as_measure_mut() {
                squeeze_measure(m, factor);
            }
            measure::respace_segments(&mut score.measures[mi]);
            cur_width += score.measures[mi].width - prev;
        }
        squeeze -= NARROW_STRETCH_STEP;
    }

    // 3: forced width reduction, collisions allowed
    let mut reduction = 1.0 - NARROW_REDUCTION_STEP;
    while cur_width > target_width && reduction > -EPSILON {
        for &mi in &measures {
            if let Some(m) = score.measures[mi].as_measure_mut() {
                for seg in m.segments.iter_mut().filter(|s| s.enabled && s.is_chord_rest()) {
                    seg.width *= reduction;
                }
            }
            let prev = score.measures[mi].width;
            measure::respace_segments(&mut score.measures[mi]);
            cur_width += score.measures[mi].width - prev;
        }
        reduction -= NARROW_REDUCTION_STEP;
    }

    cur_width
}

/// Shrink the space after the barline and the margin between header
/// elements and the first chord.
fn squeeze_measure(m: &mut Measure, factor: f64) {
    let first = m.segments.iter().find(|s| s.enabled);
    if m.spacing.first_x > 0.0 && first.is_some_and(|s| !s.has_accidentals) {
        m.spacing.first_x *= factor;
    }

    let enabled: Vec<usize> = (0..m.segments.len()).filter(|&i| m.segments[i].enabled).collect();
    for pair in enabled.windows(2) {
        let next_is_chord = m.segments[pair[1]].is_chord_rest();
        let seg = &mut m.segments[pair[0]];
        let is_margin = seg.kind.is_header() || matches!(seg.kind, SegmentKind::TimeSig | SegmentKind::KeySig);
        if is_margin && next_is_chord {
            let margin = seg.width - seg.min_width;
            if margin > 0.0 {
                seg.width -= margin * (1.0 - factor);
            }
        }
    }
}
