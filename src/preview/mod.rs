//! Debug preview: draws the computed layout as SVG.
//!
//! Nothing is engraved. Staff lines, barlines and brackets are drawn as
//! lines, every element as its outline, and the skylines as dashed steps,
//! which is enough to see where the layout put things.

mod svg_builder;

use crate::layout::System;
use crate::model::*;
use crate::style::HAlign;
use svg_builder::{empty_svg, SvgBuilder};

// ── Colors and margins (SVG user units) ─────────────────────────────

const PAGE_MARGIN: f64 = 30.0;
const STAFF_COLOR: &str = "#333333";
const SHAPE_COLOR: &str = "#1f5fbf";
const HEADER_COLOR: &str = "#7f7f7f";
const ANNOTATION_COLOR: &str = "#c0392b";
const SPANNER_COLOR: &str = "#27ae60";
const LYRICS_COLOR: &str = "#333333";
const SKYLINE_NORTH_COLOR: &str = "#e67e22";
const SKYLINE_SOUTH_COLOR: &str = "#8e44ad";
const LABEL_FONT_SIZE: f64 = 7.0;

/// Render `systems` of `score` stacked top to bottom.
pub fn render_layout_svg(score: &Score, systems: &[System]) -> String {
    if systems.is_empty() {
        return empty_svg("No systems laid out");
    }
    let style = &score.style;
    let gap = style.sp(style.system_distance);
    let content_width = systems
        .iter()
        .map(|s| s.width)
        .fold(style.page_printable_width, f64::max);
    let content_height: f64 = systems.iter().map(|s| s.height + gap).sum();

    // systems carry no page position; give each a band with room for the
    // elements above its first staff
    let mut builder = SvgBuilder::new(content_width + 2.0 * PAGE_MARGIN, content_height + 2.0 * PAGE_MARGIN + gap);
    let mut y = PAGE_MARGIN + gap;
    for system in systems {
        builder.comment(&format!("system {}", system.id.0));
        render_system(&mut builder, score, system, PAGE_MARGIN, y);
        y += system.height + gap;
    }
    builder.build()
}

fn render_system(b: &mut SvgBuilder, score: &Score, system: &System, ox: f64, oy: f64) {
    if system.is_vertical_frame(score) {
        b.rect(ox, oy, system.width, system.height, "none", HEADER_COLOR, 0.5);
        return;
    }
    let sp = score.style.spatium;
    let staff_top = |staff: usize| oy + system.staff_y(staff);

    // staves
    for (idx, ss) in system.staves.iter().enumerate() {
        let Some(staff) = score.staves.get(idx) else {
            continue;
        };
        if !ss.show || !staff.show {
            continue;
        }
        let x1 = ox + ss.bbox.left();
        let x2 = ox + system.width;
        let top = staff_top(idx);
        for line in 0..staff.lines.max(1) {
            let ly = top + line as f64 * staff.line_distance * staff.spatium(&score.style);
            b.line(x1, ly, x2, ly, STAFF_COLOR, 0.5);
        }
        render_skyline(b, ss, ox, top);

        for name in &ss.instrument_names {
            let anchor = match name.align {
                HAlign::Left => "start",
                HAlign::Center => "middle",
                HAlign::Right => "end",
            };
            b.text(ox + name.pos.x, oy + name.pos.y, &name.text, name.height, STAFF_COLOR, anchor);
        }
    }

    for br in &system.brackets {
        if br.height > 0.0 {
            b.rect(ox + br.x, oy + br.y, br.width, br.height, "none", STAFF_COLOR, 0.8);
        }
    }

    let (Some(first), Some(last)) = (system.first_visible_staff(), system.last_visible_staff()) else {
        return;
    };
    let bar_top = staff_top(first);
    let bar_bottom = staff_top(last) + score.staff_height(last);

    for &mi in &system.measures {
        let mb = &score.measures[mi];
        let mx = ox + mb.x;
        b.line(mx + mb.width, bar_top, mx + mb.width, bar_bottom, STAFF_COLOR, 0.8);
        let Some(m) = mb.as_measure() else {
            b.rect(mx, bar_top, mb.width, bar_bottom - bar_top, "none", HEADER_COLOR, 0.5);
            continue;
        };
        for seg in m.segments.iter().filter(|s| s.enabled) {
            render_segment(b, score, system, seg, mx + seg.x, &staff_top);
        }
        for a in &m.elements {
            if let Some(staff) = annotation_staff(system, a) {
                render_annotation(b, a, mx, staff_top(staff));
            }
        }
    }

    for seg in &system.spanner_segments {
        if !seg.visible || !system.staves.get(seg.staff).is_some_and(|s| s.show) {
            continue;
        }
        let top = staff_top(seg.staff);
        if seg.kind.is_slur_or_tie() {
            let mid_x = (seg.start.x + seg.end.x) / 2.0;
            let ctrl_y = if seg.up {
                seg.start.y.min(seg.end.y) - 2.0 * seg.arch
            } else {
                seg.start.y.max(seg.end.y) + 2.0 * seg.arch
            };
            let d = format!(
                "M{:.1},{:.1} Q{:.1},{:.1} {:.1},{:.1}",
                ox + seg.start.x,
                top + seg.start.y,
                ox + mid_x,
                top + ctrl_y,
                ox + seg.end.x,
                top + seg.end.y
            );
            b.path(&d, "none", SPANNER_COLOR, 1.0);
        } else {
            let r = seg.bbox.translated(seg.pos.x, seg.pos.y);
            b.rect(ox + r.x, top + r.y, r.width, r.height, "none", SPANNER_COLOR, 0.8);
            b.text(ox + r.x, top + r.y - 0.5 * sp, &format!("{:?}", seg.kind), LABEL_FONT_SIZE, SPANNER_COLOR, "start");
        }
    }

    let (stick, etick) = (system.tick(score), system.end_tick(score));
    for t in score.tuplets.iter().filter(|t| t.tick >= stick && t.tick < etick && t.bbox.width > 0.0) {
        let staff = track_to_staff(t.track);
        if system.staves.get(staff).is_some_and(|s| s.show) {
            let r = t.bbox;
            b.rect(ox + r.x, staff_top(staff) + r.y, r.width, r.height, "none", SPANNER_COLOR, 0.5);
        }
    }

    for beam in &score.beams {
        let staff = track_to_staff(beam.track);
        if beam.bbox.width > 0.0 && system.staves.get(staff).is_some_and(|s| s.show) {
            let x = beam.bbox.x;
            if system.measures.iter().any(|&mi| {
                let mb = &score.measures[mi];
                x >= mb.x && x < mb.x + mb.width
            }) {
                let r = beam.bbox;
                b.rect(ox + r.x, staff_top(staff) + r.y, r.width, r.height, SHAPE_COLOR, "none", 0.0);
            }
        }
    }
}

fn render_segment(b: &mut SvgBuilder, score: &Score, system: &System, seg: &Segment, x: f64, staff_top: &dyn Fn(usize) -> f64) {
    let shown = |staff: usize| system.staves.get(staff).is_some_and(|s| s.show);
    if !seg.is_chord_rest() {
        for (staff, shape) in seg.staff_shapes.iter().enumerate().filter(|(s, _)| shown(*s)) {
            for r in &shape.rects {
                b.rect(x + r.x, staff_top(staff) + r.y, r.width, r.height, "none", HEADER_COLOR, 0.5);
            }
        }
        return;
    }
    for cr in seg.chord_rests.iter().filter(|cr| cr.visible && shown(cr.vstaff())) {
        let top = staff_top(cr.vstaff());
        let fill = if cr.is_rest { "none" } else { SHAPE_COLOR };
        for r in &cr.shape.rects {
            b.rect(x + r.x, top + r.y, r.width, r.height, fill, SHAPE_COLOR, 0.5);
        }
        for art in &cr.articulations {
            let r = art.bbox.translated(art.pos.x, art.pos.y);
            b.rect(x + r.x, top + r.y, r.width, r.height, "none", ANNOTATION_COLOR, 0.5);
        }
        for lyric in &cr.lyrics {
            let size = score.style.text_size(score.style.lyrics_font_size);
            b.text(x + lyric.pos.x, top + lyric.pos.y + size / 2.0, &lyric.text, size, LYRICS_COLOR, "start");
        }
    }
    for a in &seg.annotations {
        if let Some(staff) = annotation_staff(system, a) {
            render_annotation(b, a, x, staff_top(staff));
        }
    }
}

fn annotation_staff(system: &System, a: &Annotation) -> Option<usize> {
    if a.kind.is_system_level() {
        system.first_visible_staff()
    } else {
        Some(a.staff()).filter(|&s| system.staves.get(s).is_some_and(|ss| ss.show))
    }
}

fn render_annotation(b: &mut SvgBuilder, a: &Annotation, anchor_x: f64, staff_top: f64) {
    if !a.visible {
        return;
    }
    let r = a.bbox.translated(anchor_x + a.pos.x, staff_top + a.pos.y);
    b.rect(r.x, r.y, r.width, r.height, "none", ANNOTATION_COLOR, 0.6);
    b.text(r.x, r.y + r.height / 2.0, &format!("{:?}", a.kind), LABEL_FONT_SIZE, ANNOTATION_COLOR, "start");
}

fn render_skyline(b: &mut SvgBuilder, ss: &crate::layout::SysStaff, ox: f64, top: f64) {
    for (line, color) in [(&ss.skyline.north, SKYLINE_NORTH_COLOR), (&ss.skyline.south, SKYLINE_SOUTH_COLOR)] {
        let mut points = Vec::new();
        for s in line.segments() {
            points.push((ox + s.x, top + s.y));
            points.push((ox + s.x + s.w, top + s.y));
        }
        b.polyline(&points, color, 0.5);
    }
}
