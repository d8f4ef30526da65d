//! Measure width engine.
//!
//! Computes segment widths from the sized shapes and the note durations,
//! positions segments inside the measure and manages the generated
//! segments that depend on where a measure sits in its system: the system
//! header (clef, key signature), the system trailer (courtesy signatures)
//! and the end barline.

use super::constants::{EPSILON, MAX_DURATION_RATIO};
use super::spring::{stretch_segments_to_width, Spring};
use crate::geometry::{Rect, Shape};
use crate::model::*;
use crate::style::Style;

// ═══════════════════════════════════════════════════════════════════════
// Widths
// ═══════════════════════════════════════════════════════════════════════

/// Reset spacing state left over from a previous pass.
pub(super) fn compute_pre_spacing_items(score: &mut Score, idx: usize) {
    if let Some(m) = score.measures[idx].as_measure_mut() {
        for seg in &mut m.segments {
            seg.squeeze_factor = 1.0;
        }
    }
}

/// Segments that take part in justification.
pub(super) fn is_spring_segment(s: &Segment) -> bool {
    s.is_chord_rest() && s.ticks > 0 && s.visible && s.enabled && !s.all_elements_invisible()
}

fn duration_stretch(style: &Style, ticks: Ticks, min_ticks: Ticks, max_ticks: Ticks) -> f64 {
    let mut min_ticks = min_ticks.max(1);
    if max_ticks / min_ticks > MAX_DURATION_RATIO {
        min_ticks = max_ticks / MAX_DURATION_RATIO;
    }
    let ratio = ticks as f64 / min_ticks as f64;
    style.measure_spacing.powf(ratio.log2())
}

fn segment_shape_width(seg: &Segment, visible: &[bool]) -> f64 {
    let shown = |staff: usize| visible.get(staff).copied().unwrap_or(true);
    if seg.is_chord_rest() {
        seg.chord_rests
            .iter()
            .filter(|cr| shown(cr.vstaff()))
            .map(|cr| cr.shape.right())
            .fold(0.0, f64::max)
    } else {
        seg.staff_shapes
            .iter()
            .enumerate()
            .filter(|(staff, _)| shown(*staff))
            .map(|(_, shape)| shape.right())
            .fold(0.0, f64::max)
    }
}

/// Lay out the segments of measure `idx` and set its width.
///
/// `min_ticks`/`max_ticks` are the shortest and longest durations of the
/// whole system, `stretch_coeff` scales duration-based space, and
/// `override_min_width` lets the measure drop below the style minimum.
pub(super) fn compute_width(
    score: &mut Score,
    idx: usize,
    visible: &[bool],
    min_ticks: Ticks,
    max_ticks: Ticks,
    stretch_coeff: f64,
    override_min_width: bool,
) {
    let Score { style, measures, .. } = score;
    let MeasureBase { kind, width, .. } = &mut measures[idx];
    if let MeasureKind::Measure(m) = kind {
        *width = measure_width(style, m, visible, min_ticks, max_ticks, stretch_coeff, override_min_width);
    }
}

/// Recompute with the parameters of the last width computation.
pub(super) fn recompute_width(score: &mut Score, idx: usize, visible: &[bool]) {
    let Some(m) = score.measures[idx].as_measure() else {
        return;
    };
    let sp = m.spacing.clone();
    compute_width(score, idx, visible, sp.min_ticks, sp.max_ticks, sp.stretch, false);
}

fn measure_width(
    style: &Style,
    m: &mut Measure,
    visible: &[bool],
    min_ticks: Ticks,
    max_ticks: Ticks,
    stretch_coeff: f64,
    override_min_width: bool,
) -> f64 {
    let min_ticks = if min_ticks > 0 { min_ticks } else { DIVISION };
    let max_ticks = max_ticks.max(min_ticks);
    m.spacing.stretch = stretch_coeff;
    m.spacing.min_ticks = min_ticks;
    m.spacing.max_ticks = max_ticks;

    let enabled: Vec<usize> = (0..m.segments.len()).filter(|&i| m.segments[i].enabled).collect();
    m.spacing.first_x = match enabled.first().map(|&i| m.segments[i].kind) {
        Some(SegmentKind::ChordRest) => style.sp(style.bar_note_distance),
        Some(_) => style.sp(style.header_padding),
        None => 0.0,
    };

    for seg in m.segments.iter_mut().filter(|s| !s.enabled) {
        seg.width = 0.0;
        seg.min_width = 0.0;
    }

    for (n, &i) in enabled.iter().enumerate() {
        let next_kind = enabled.get(n + 1).map(|&j| m.segments[j].kind);
        let seg = &mut m.segments[i];
        let shape_w = segment_shape_width(seg, visible);
        let w = match seg.kind {
            SegmentKind::ChordRest => {
                let min_w = shape_w + style.sp(style.min_note_distance) * seg.squeeze_factor;
                seg.min_width = min_w;
                if seg.ticks > 0 {
                    seg.stretch = duration_stretch(style, seg.ticks, min_ticks, max_ticks);
                    min_w.max(style.sp(style.spacing_unit) * seg.stretch * stretch_coeff)
                } else {
                    seg.stretch = 0.0;
                    min_w
                }
            }
            SegmentKind::EndBarLine | SegmentKind::CourtesyTimeSig | SegmentKind::CourtesyKeySig => {
                seg.stretch = 0.0;
                let pad = if next_kind.is_some() { style.sp(style.header_padding) } else { 0.0 };
                seg.min_width = shape_w + pad;
                seg.min_width
            }
            SegmentKind::HeaderClef
            | SegmentKind::HeaderKeySig
            | SegmentKind::KeySig
            | SegmentKind::TimeSig
            | SegmentKind::StartRepeatBarLine => {
                seg.stretch = 0.0;
                seg.min_width = shape_w + style.sp(style.header_padding);
                if next_kind == Some(SegmentKind::ChordRest) {
                    seg.min_width.max(shape_w + style.sp(style.system_header_distance))
                } else {
                    seg.min_width
                }
            }
            SegmentKind::BeginBarLine | SegmentKind::Clef | SegmentKind::BarLine => {
                seg.stretch = 0.0;
                seg.min_width = shape_w + style.sp(style.header_padding);
                seg.min_width
            }
        };
        seg.width = w + seg.width_offset;
    }

    let mut total = respace(m);
    let min_measure_width = style.sp(style.min_measure_width);
    if !override_min_width && total + EPSILON < min_measure_width {
        stretch_measure_springs(m, min_measure_width - total);
        total = respace(m);
    }

    m.spacing.squeezable_space = m
        .segments
        .iter()
        .filter(|s| s.enabled && s.is_chord_rest())
        .map(|s| (s.width - s.width_offset - s.min_width).max(0.0))
        .sum();
    total
}

fn respace(m: &mut Measure) -> f64 {
    let mut x = m.spacing.first_x;
    for seg in &mut m.segments {
        seg.x = x;
        if seg.enabled {
            x += seg.width;
        }
    }
    x
}

/// Re-derive segment positions and the measure width from segment widths.
pub(super) fn respace_segments(mb: &mut MeasureBase) {
    let MeasureBase { kind, width, .. } = mb;
    if let MeasureKind::Measure(m) = kind {
        *width = respace(m);
    }
}

fn stretch_measure_springs(m: &mut Measure, extra: f64) {
    let mut springs: Vec<Spring<usize>> = m
        .segments
        .iter()
        .enumerate()
        .filter(|(_, s)| is_spring_segment(s))
        .filter_map(|(i, s)| Spring::new(s.stretch, s.width - s.width_offset, i))
        .collect();
    for (i, w) in stretch_segments_to_width(&mut springs, extra) {
        let seg = &mut m.segments[i];
        seg.width = w + seg.width_offset;
    }
}

/// Widen a measure to `target` by stretching its springs.
pub(super) fn stretch_to_target_width(mb: &mut MeasureBase, target: f64) {
    if target <= mb.width + EPSILON {
        return;
    }
    let extra = target - mb.width;
    let MeasureBase { kind, width, .. } = mb;
    if let MeasureKind::Measure(m) = kind {
        stretch_measure_springs(m, extra);
        *width = respace(m);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Generated segments
// ═══════════════════════════════════════════════════════════════════════

/// One rectangle per staff spanning the staff height.
fn column_shapes(score: &Score, width: f64) -> Vec<Shape> {
    (0..score.nstaves())
        .map(|staff| Shape::from_rect(Rect::new(0.0, 0.0, width, score.staff_height(staff))))
        .collect()
}

fn ensure_generated(m: &mut Measure, kind: SegmentKind, rtick: Ticks, shapes: Vec<Shape>) {
    match m.segment_index(kind) {
        Some(i) => {
            let seg = &mut m.segments[i];
            seg.staff_shapes = shapes;
            seg.enabled = true;
        }
        None => {
            let mut seg = Segment::new(kind, rtick, 0);
            seg.generated = true;
            seg.staff_shapes = shapes;
            m.insert_segment(seg);
        }
    }
}

fn remove_generated(m: &mut Measure, kind: SegmentKind) {
    m.segments.retain(|s| !(s.generated && s.kind == kind));
}

/// Add clef and key signature at the start of a system.
pub(super) fn add_system_header(score: &mut Score, idx: usize) {
    let Some(m) = score.measures[idx].as_measure() else {
        return;
    };
    let style = &score.style;
    let key_shapes = if m.key != 0 && !m.key_change {
        Some(column_shapes(
            score,
            m.key.unsigned_abs() as f64 * style.sp(style.key_sig_accidental_width),
        ))
    } else {
        None
    };
    let clef_shapes = column_shapes(score, style.sp(style.clef_width));
    let Some(m) = score.measures[idx].as_measure_mut() else {
        return;
    };
    ensure_generated(m, SegmentKind::HeaderClef, 0, clef_shapes);
    match key_shapes {
        Some(shapes) => ensure_generated(m, SegmentKind::HeaderKeySig, 0, shapes),
        None => remove_generated(m, SegmentKind::HeaderKeySig),
    }
}

pub(super) fn remove_system_header(score: &mut Score, idx: usize) {
    if let Some(m) = score.measures[idx].as_measure_mut() {
        m.segments
            .retain(|s| !(s.generated && (s.kind.is_header() || s.kind == SegmentKind::BeginBarLine)));
        m.spacing.begin_barline = false;
    }
}

/// Add or remove the barline joining the staves at the start of a system.
pub(super) fn set_begin_barline(score: &mut Score, idx: usize, show: bool) {
    if !score.is_measure(idx) {
        return;
    }
    let shapes = show.then(|| column_shapes(score, barline_width(&score.style, BarLineType::Normal)));
    let Some(m) = score.measures[idx].as_measure_mut() else {
        return;
    };
    match shapes {
        Some(shapes) => ensure_generated(m, SegmentKind::BeginBarLine, 0, shapes),
        None => remove_generated(m, SegmentKind::BeginBarLine),
    }
    m.spacing.begin_barline = show;
}

/// Add courtesy signatures announcing a change in the `next` measure.
pub(super) fn add_system_trailer(score: &mut Score, idx: usize, next: Option<usize>) {
    let Some(m) = score.measures[idx].as_measure() else {
        return;
    };
    let style = &score.style;
    let section_end = score.measures[idx].breaks.section.is_some();
    let next_m = next.and_then(|n| score.measures[n].as_measure());

    let key_shapes = match next_m {
        Some(nm) if nm.key_change && style.gen_courtesy_key_sig && !section_end => {
            let accidentals = nm.key.unsigned_abs().max(m.key.unsigned_abs()).max(1);
            Some(column_shapes(
                score,
                accidentals as f64 * style.sp(style.key_sig_accidental_width),
            ))
        }
        _ => None,
    };
    let time_shapes = match next_m {
        Some(nm) if nm.time_change && style.gen_courtesy_time_sig && !section_end => {
            Some(column_shapes(score, style.sp(style.time_sig_width)))
        }
        _ => None,
    };

    let ticks = score.measures[idx].ticks;
    let Some(m) = score.measures[idx].as_measure_mut() else {
        return;
    };
    match key_shapes {
        Some(shapes) => ensure_generated(m, SegmentKind::CourtesyKeySig, ticks, shapes),
        None => remove_generated(m, SegmentKind::CourtesyKeySig),
    }
    match time_shapes {
        Some(shapes) => ensure_generated(m, SegmentKind::CourtesyTimeSig, ticks, shapes),
        None => remove_generated(m, SegmentKind::CourtesyTimeSig),
    }
}

pub(super) fn remove_system_trailer(score: &mut Score, idx: usize) {
    if let Some(m) = score.measures[idx].as_measure_mut() {
        m.segments.retain(|s| !(s.generated && s.kind.is_trailer()));
    }
}

/// Enable the start-repeat barline of a measure; true if it changed.
pub(super) fn enable_start_repeat(score: &mut Score, idx: usize) -> bool {
    let Some(m) = score.measures[idx].as_measure_mut() else {
        return false;
    };
    if !m.repeat_start {
        return false;
    }
    match m.segment_index(SegmentKind::StartRepeatBarLine) {
        Some(i) if !m.segments[i].enabled => {
            m.segments[i].enabled = true;
            true
        }
        _ => false,
    }
}

fn barline_width(style: &Style, bar: BarLineType) -> f64 {
    let w = match bar {
        BarLineType::Normal => style.barline_width,
        BarLineType::Double => style.double_barline_width,
        BarLineType::End => style.end_barline_width,
        BarLineType::EndRepeat => style.repeat_barline_width,
        BarLineType::EndStartRepeat => 2.0 * style.repeat_barline_width,
    };
    style.sp(w)
}

/// Create or update the end barline of measure `idx`.
///
/// `is_last_in_system` decides repeat merging: an end repeat followed by a
/// start repeat inside a system becomes one end-start repeat barline and the
/// following start-repeat segment is disabled. Returns the width change of
/// measure `idx`.
pub(super) fn create_end_barlines(score: &mut Score, idx: usize, is_last_in_system: bool, visible: &[bool]) -> f64 {
    let Some(m) = score.measures[idx].as_measure() else {
        return 0.0;
    };
    let next = Some(idx + 1).filter(|&n| score.is_measure(n));
    let next_m = next.and_then(|n| score.measures[n].as_measure());
    let last_of_score = score.next_measure(idx).is_none();
    let section_end = score.measures[idx].breaks.section.is_some();

    let bar = if m.repeat_end {
        if !is_last_in_system && next_m.is_some_and(|nm| nm.repeat_start) {
            BarLineType::EndStartRepeat
        } else {
            BarLineType::EndRepeat
        }
    } else if last_of_score || section_end {
        BarLineType::End
    } else if next_m.is_some_and(|nm| nm.key_change) {
        BarLineType::Double
    } else {
        BarLineType::Normal
    };

    let shapes = column_shapes(score, barline_width(&score.style, bar));
    let ticks = score.measures[idx].ticks;
    if let Some(m) = score.measures[idx].as_measure_mut() {
        ensure_generated(m, SegmentKind::EndBarLine, ticks, shapes);
        m.spacing.end_barline = bar;
    }

    if let Some(n) = next {
        if let Some(nm) = score.measures[n].as_measure_mut() {
            if let Some(i) = nm.segment_index(SegmentKind::StartRepeatBarLine) {
                nm.segments[i].enabled = bar != BarLineType::EndStartRepeat;
            }
        }
    }

    let old = score.measures[idx].width;
    recompute_width(score, idx, visible);
    score.measures[idx].width - old
}
