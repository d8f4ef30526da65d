//! Points, rectangles and shapes in layout units.
//!
//! Shapes are plain lists of rectangles. Glyph outlines are never needed
//! here: every element arrives with its bounding rectangles already sized.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

/// Axis-aligned rectangle; `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanning two corners given in any order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 && self.height <= 0.0
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn united(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_corners(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

/// Union of rectangles describing an element's occupied area.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub rects: Vec<Rect>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(r: Rect) -> Self {
        Self { rects: vec![r] }
    }

    pub fn add(&mut self, r: Rect) {
        self.rects.push(r);
    }

    pub fn extend(&mut self, other: &Shape) {
        self.rects.extend_from_slice(&other.rects);
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Shape {
        Shape {
            rects: self.rects.iter().map(|r| r.translated(dx, dy)).collect(),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for r in &mut self.rects {
            *r = r.translated(dx, dy);
        }
    }

    pub fn bbox(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.united(r))
    }

    pub fn left(&self) -> f64 {
        self.rects.iter().map(Rect::left).fold(f64::INFINITY, f64::min).min(0.0)
    }

    pub fn right(&self) -> f64 {
        self.rects.iter().map(Rect::right).fold(0.0, f64::max)
    }

    pub fn top(&self) -> f64 {
        self.rects.iter().map(Rect::top).fold(f64::INFINITY, f64::min)
    }

    pub fn bottom(&self) -> f64 {
        self.rects.iter().map(Rect::bottom).fold(f64::NEG_INFINITY, f64::max)
    }
}
