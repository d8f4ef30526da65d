//! Systems and the elements owned by them.

use serde::{Deserialize, Serialize};

use super::constants::SKYLINE_NO_OVERLAP;
use super::skyline::Skyline;
use crate::geometry::{Point, Rect, Shape};
use crate::model::{BracketType, Score, SpannerKind, Ticks};
use crate::style::HAlign;

/// Identity of a system; survives recycling through the system pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub u32);

// ═══════════════════════════════════════════════════════════════════════
// SysStaff
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentNameKind {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentName {
    pub text: String,
    pub kind: InstrumentNameKind,
    pub layout_pos: u8,
    pub align: HAlign,
    pub width: f64,
    pub height: f64,
    /// Anchor in system coordinates: `x` per `align`, `y` the vertical
    /// centre relative to the system top.
    pub pos: Point,
}

/// Per-staff state of one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysStaff {
    pub show: bool,
    /// Staff box; `y` is the distance from the system top.
    pub bbox: Rect,
    /// Extra offset of the staff lines inside the box (one-line staves).
    pub y_off: f64,
    pub skyline: Skyline,
    pub instrument_names: Vec<InstrumentName>,
    /// Distance to the next staff in continuous mode; only grows.
    pub continuous_dist: f64,
}

impl Default for SysStaff {
    fn default() -> Self {
        Self {
            show: true,
            bbox: Rect::default(),
            y_off: 0.0,
            skyline: Skyline::new(),
            instrument_names: Vec::new(),
            continuous_dist: SKYLINE_NO_OVERLAP,
        }
    }
}

impl SysStaff {
    /// y of the top staff line, relative to the system top.
    pub fn y(&self) -> f64 {
        self.bbox.y + self.y_off
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Brackets
// ═══════════════════════════════════════════════════════════════════════

/// Cache key for bracket reuse across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BracketKey {
    pub track: usize,
    pub column: usize,
    pub bracket_type: BracketType,
    /// Measure the bracket is drawn at.
    pub measure: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub key: BracketKey,
    /// Stable identity: kept when the bracket is reused.
    pub serial: u32,
    pub first_staff: usize,
    pub last_staff: usize,
    /// Declared span.
    pub span: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bracket {
    pub fn column(&self) -> usize {
        self.key.column
    }

    pub fn bracket_type(&self) -> BracketType {
        self.key.bracket_type
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Spanner segments
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpannerSegmentType {
    Single,
    Begin,
    Middle,
    End,
}

/// Part of a spanner that lies on one system.
///
/// Coordinates are system x and staff-relative y. For slurs and ties the
/// outline is derived from the grips `start`/`end` and the arch height;
/// for lines it is `bbox` moved by `pos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpannerSegment {
    pub spanner: usize,
    pub kind: SpannerKind,
    pub staff: usize,
    pub segment_type: SpannerSegmentType,
    pub start: Point,
    pub end: Point,
    pub arch: f64,
    pub up: bool,
    pub pos: Point,
    pub bbox: Rect,
    pub autoplace: bool,
    pub visible: bool,
}

impl SpannerSegment {
    pub fn shape(&self) -> Shape {
        Shape::from_rect(self.bbox.translated(self.pos.x, self.pos.y))
    }

    pub fn ypos(&self) -> f64 {
        self.pos.y
    }

    /// Recompute the outline of a slur or tie from its grips.
    pub fn compute_bezier(&mut self) {
        let top = self.start.y.min(self.end.y);
        let bottom = self.start.y.max(self.end.y);
        let (y1, y2) = if self.up {
            (top - self.arch, bottom)
        } else {
            (top, bottom + self.arch)
        };
        self.bbox = Rect::from_corners(self.start.x, y1, self.end.x, y2);
        self.pos = Point::default();
    }
}

// ═══════════════════════════════════════════════════════════════════════
// System
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    /// Indices of measures and frames, contiguous in score order.
    pub measures: Vec<usize>,
    pub staves: Vec<SysStaff>,
    pub brackets: Vec<Bracket>,
    pub spanner_segments: Vec<SpannerSegment>,
    pub left_margin: f64,
    pub width: f64,
    pub height: f64,
    pub min_sys_ticks: Ticks,
    pub max_sys_ticks: Ticks,
    pub(crate) bracket_serial: u32,
    /// Brackets an earlier pass drew after a frame, waiting to be reused.
    #[serde(skip)]
    pub(crate) frame_brackets: Vec<Bracket>,
}

impl System {
    pub fn new(id: SystemId) -> Self {
        Self {
            id,
            measures: Vec::new(),
            staves: Vec::new(),
            brackets: Vec::new(),
            spanner_segments: Vec::new(),
            left_margin: 0.0,
            width: 0.0,
            height: 0.0,
            min_sys_ticks: 0,
            max_sys_ticks: 0,
            bracket_serial: 0,
            frame_brackets: Vec::new(),
        }
    }

    /// Forget measures and per-pass results. Brackets, instrument names and
    /// continuous distances survive for reuse.
    pub fn clear(&mut self) {
        self.measures.clear();
        self.spanner_segments.clear();
        self.left_margin = 0.0;
        self.width = 0.0;
        self.height = 0.0;
        for ss in &mut self.staves {
            ss.skyline.clear();
        }
    }

    pub fn adjust_staves_number(&mut self, n: usize) {
        self.staves.resize_with(n, SysStaff::default);
    }

    pub fn append_measure(&mut self, idx: usize) {
        self.measures.push(idx);
    }

    pub fn remove_last_measure(&mut self) -> Option<usize> {
        self.measures.pop()
    }

    /// Forget measures from index `len` on, after the score lost measures.
    pub fn truncate_measures(&mut self, len: usize) {
        if let Some(cut) = self.measures.iter().position(|&i| i >= len) {
            self.measures.truncate(cut);
        }
    }

    pub fn first_measure_base(&self) -> Option<usize> {
        self.measures.first().copied()
    }

    pub fn last_measure_base(&self) -> Option<usize> {
        self.measures.last().copied()
    }

    pub fn first_measure(&self, score: &Score) -> Option<usize> {
        self.measures.iter().copied().find(|&i| score.is_measure(i))
    }

    pub fn last_measure(&self, score: &Score) -> Option<usize> {
        self.measures.iter().rev().copied().find(|&i| score.is_measure(i))
    }

    pub fn is_vertical_frame(&self, score: &Score) -> bool {
        self.measures
            .first()
            .and_then(|&i| score.measures.get(i))
            .is_some_and(|mb| mb.is_vertical_frame())
    }

    pub fn tick(&self, score: &Score) -> Ticks {
        self.measures
            .first()
            .and_then(|&i| score.measures.get(i))
            .map_or(0, |mb| mb.tick)
    }

    pub fn end_tick(&self, score: &Score) -> Ticks {
        self.measures
            .last()
            .and_then(|&i| score.measures.get(i))
            .map_or(0, |mb| mb.end_tick())
    }

    pub fn show_flags(&self) -> Vec<bool> {
        self.staves.iter().map(|s| s.show).collect()
    }

    pub fn first_visible_staff(&self) -> Option<usize> {
        self.staves.iter().position(|s| s.show)
    }

    pub fn last_visible_staff(&self) -> Option<usize> {
        self.staves.iter().rposition(|s| s.show)
    }

    /// `staff` if visible, otherwise the next visible staff below it.
    pub fn staff_or_next_visible(&self, staff: usize) -> Option<usize> {
        (staff..self.staves.len()).find(|&i| self.staves[i].show)
    }

    pub fn staff_y(&self, staff: usize) -> f64 {
        self.staves.get(staff).map(SysStaff::y).unwrap_or(0.0)
    }

    /// Total space chord/rest segments could give up.
    pub fn squeezable_space(&self, score: &Score) -> f64 {
        self.measures
            .iter()
            .filter_map(|&i| score.measures.get(i).and_then(|mb| mb.as_measure()))
            .map(|m| m.spacing.squeezable_space)
            .sum()
    }

    /// Left margin plus every measure width.
    pub fn content_width(&self, score: &Score) -> f64 {
        self.left_margin
            + self
                .measures
                .iter()
                .filter_map(|&i| score.measures.get(i))
                .map(|mb| mb.width)
                .sum::<f64>()
    }

    /// x where the music of the system begins, after any header.
    pub fn content_start_x(&self, score: &Score) -> f64 {
        let Some(first) = self.first_measure(score) else {
            return self.left_margin;
        };
        let mb = &score.measures[first];
        let seg_x = mb
            .as_measure()
            .and_then(|m| m.segments.iter().find(|s| s.enabled && s.is_chord_rest()))
            .map(|s| s.x)
            .unwrap_or(0.0);
        mb.x + seg_x
    }

    pub(crate) fn next_bracket_serial(&mut self) -> u32 {
        self.bracket_serial += 1;
        self.bracket_serial
    }
}
