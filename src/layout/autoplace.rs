//! Generic placement of an element above or below a staff, clear of
//! everything already in the staff's skyline.

use super::skyline::Skyline;
use crate::geometry::{Point, Rect};
use crate::model::{Annotation, Placement};
use crate::style::Style;

/// Vertical move that keeps `r` at least `min_distance` away from the
/// skyline on the side given by `placement`. Negative moves up.
pub(super) fn clearance(skyline: &Skyline, r: &Rect, placement: Placement, min_distance: f64) -> f64 {
    match placement {
        Placement::Above => match skyline.north.value_in_range(r.left(), r.right()) {
            Some(north) if r.bottom() + min_distance > north => north - min_distance - r.bottom(),
            _ => 0.0,
        },
        Placement::Below => match skyline.south.value_in_range(r.left(), r.right()) {
            Some(south) if r.top() < south + min_distance => south + min_distance - r.top(),
            _ => 0.0,
        },
    }
}

/// Default y of an element of size `bbox`: `annotation_staff_distance`
/// above the top line or below the bottom line.
pub(super) fn default_y(style: &Style, staff_height: f64, bbox: &Rect, placement: Placement) -> f64 {
    let dist = style.sp(style.annotation_staff_distance);
    match placement {
        Placement::Above => -dist - bbox.bottom(),
        Placement::Below => staff_height + dist - bbox.top(),
    }
}

/// Outline of `a` in system x and staff y, given the x of its anchor.
pub(super) fn annotation_rect(a: &Annotation, anchor_x: f64) -> Rect {
    a.bbox.translated(anchor_x + a.pos.x, a.pos.y)
}

/// Give `a` its default position, then move it clear of `skyline` when it
/// is autoplaced. Returns the outline in system coordinates.
pub(super) fn place_annotation(
    style: &Style,
    skyline: &Skyline,
    staff_height: f64,
    anchor_x: f64,
    a: &mut Annotation,
) -> Rect {
    a.pos = Point::new(a.offset.x, default_y(style, staff_height, &a.bbox, a.placement) + a.offset.y);
    if a.autoplace && a.visible {
        let r = annotation_rect(a, anchor_x);
        a.pos.y += clearance(skyline, &r, a.placement, style.sp(style.autoplace_min_distance));
    }
    annotation_rect(a, anchor_x)
}

/// Register `r` unless the element opts out.
pub(super) fn add_to_skyline(skyline: &mut Skyline, a: &Annotation, r: &Rect) {
    if a.add_to_skyline && a.visible {
        skyline.add(r);
    }
}
