//! Skylines: per-staff outlines of everything placed so far.
//!
//! A skyline has a north line (topmost occupied y for every x) and a south
//! line (bottommost occupied y). Each line is a step function stored as
//! sorted, non-overlapping horizontal segments. Gaps mean "nothing here".

use serde::{Deserialize, Serialize};

use super::constants::{EPSILON, SKYLINE_NO_OVERLAP};
use crate::geometry::{Rect, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkylineSegment {
    pub x: f64,
    pub w: f64,
    pub y: f64,
}

impl SkylineSegment {
    fn right(&self) -> f64 {
        self.x + self.w
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkylineLine {
    north: bool,
    segments: Vec<SkylineSegment>,
}

impl SkylineLine {
    pub fn new(north: bool) -> Self {
        Self {
            north,
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[SkylineSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    fn better(&self, a: f64, b: f64) -> bool {
        if self.north {
            a < b
        } else {
            a > b
        }
    }

    /// Raise (north) or lower (south) the line to `y` over `[x0, x1)`.
    pub fn add(&mut self, x0: f64, x1: f64, y: f64) {
        if x1 - x0 <= EPSILON || !y.is_finite() {
            return;
        }
        let mut out: Vec<SkylineSegment> = Vec::with_capacity(self.segments.len() + 3);
        let push = |out: &mut Vec<SkylineSegment>, a: f64, b: f64, y: f64| {
            if b - a > EPSILON {
                out.push(SkylineSegment { x: a, w: b - a, y });
            }
        };
        // start of the part of [x0, x1) not emitted yet
        let mut cursor = x0;
        for seg in &self.segments {
            let (sx0, sx1) = (seg.x, seg.right());
            if sx1 <= x0 {
                out.push(*seg);
                continue;
            }
            if sx0 >= x1 {
                if cursor < x1 {
                    push(&mut out, cursor, x1, y);
                    cursor = x1;
                }
                out.push(*seg);
                continue;
            }
            if sx0 < x0 {
                push(&mut out, sx0, x0, seg.y);
            }
            let ox0 = sx0.max(x0);
            let ox1 = sx1.min(x1);
            if cursor < ox0 {
                push(&mut out, cursor, ox0, y);
            }
            let yy = if self.better(y, seg.y) { y } else { seg.y };
            push(&mut out, ox0, ox1, yy);
            cursor = cursor.max(ox1);
            if sx1 > x1 {
                push(&mut out, x1, sx1, seg.y);
            }
        }
        if cursor < x1 {
            push(&mut out, cursor, x1, y);
        }

        // merge touching steps of equal height
        let mut merged: Vec<SkylineSegment> = Vec::with_capacity(out.len());
        for seg in out {
            match merged.last_mut() {
                Some(last) if (last.right() - seg.x).abs() <= EPSILON && (last.y - seg.y).abs() <= EPSILON => {
                    last.w = seg.right() - last.x;
                }
                _ => merged.push(seg),
            }
        }
        self.segments = merged;
    }

    /// Extreme value over `(x0, x1)`: the topmost y for a north line, the
    /// bottommost for a south line. `None` when nothing is there.
    pub fn value_in_range(&self, x0: f64, x1: f64) -> Option<f64> {
        self.segments
            .iter()
            .filter(|s| s.x < x1 && s.right() > x0)
            .map(|s| s.y)
            .reduce(|a, b| if self.better(a, b) { a } else { b })
    }

    /// Largest `self.y - other.y` over horizontally overlapping steps, where
    /// `self` is a south line and `other` a north line. This is how far the
    /// origin of `other`'s staff must sit below this one to just touch.
    pub fn min_distance(&self, other: &SkylineLine) -> f64 {
        let mut dist = SKYLINE_NO_OVERLAP;
        let (mut i, mut j) = (0, 0);
        while i < self.segments.len() && j < other.segments.len() {
            let a = &self.segments[i];
            let b = &other.segments[j];
            if a.right() > b.x && b.right() > a.x {
                dist = dist.max(a.y - b.y);
            }
            if a.right() < b.right() {
                i += 1;
            } else {
                j += 1;
            }
        }
        dist
    }
}

/// North and south outline of one staff in system coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skyline {
    pub north: SkylineLine,
    pub south: SkylineLine,
}

impl Default for Skyline {
    fn default() -> Self {
        Self::new()
    }
}

impl Skyline {
    pub fn new() -> Self {
        Self {
            north: SkylineLine::new(true),
            south: SkylineLine::new(false),
        }
    }

    pub fn clear(&mut self) {
        self.north.clear();
        self.south.clear();
    }

    pub fn add(&mut self, r: &Rect) {
        self.north.add(r.left(), r.right(), r.top());
        self.south.add(r.left(), r.right(), r.bottom());
    }

    pub fn add_shape(&mut self, shape: &Shape) {
        for r in &shape.rects {
            self.add(r);
        }
    }

    /// Minimum distance between the origin of this staff and the origin of
    /// the staff below whose skyline is `below`.
    pub fn min_distance(&self, below: &Skyline) -> f64 {
        self.south.min_distance(&below.north)
    }
}
