//! Score model consumed by the layout engine.
//!
//! The score is an arena: parts, staves, measures, spanners, beams and
//! tuplets live in vectors and refer to each other by index. Glyph-level
//! layout is not done here; chords, clefs and annotations carry shapes
//! that are already sized. The layout engine writes its results back into
//! the layout fields of measures, segments and annotations, and adds or
//! removes generated segments (system headers, trailers, end barlines).

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{Point, Rect, Shape};
use crate::layout::SystemId;
use crate::style::Style;

/// Musical time in ticks.
pub type Ticks = i32;

/// Ticks per quarter note.
pub const DIVISION: Ticks = 480;

/// Voices per staff; a track is `staff * VOICES + voice`.
pub const VOICES: usize = 4;

pub fn track_to_staff(track: usize) -> usize {
    track / VOICES
}

// ═══════════════════════════════════════════════════════════════════════
// Score
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    pub style: Style,
    pub parts: Vec<Part>,
    pub staves: Vec<Staff>,
    /// Measures and frames in score order.
    pub measures: Vec<MeasureBase>,
    pub spanners: Vec<Spanner>,
    pub beams: Vec<Beam>,
    pub tuplets: Vec<Tuplet>,
    pub show_instrument_names: bool,
}

impl Score {
    pub fn from_json(json: &str) -> LayoutResult<Self> {
        let score: Score = serde_json::from_str(json)?;
        score.style.validate()?;
        score.validate()?;
        Ok(score)
    }

    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross references between parts, staves and measures.
    pub fn validate(&self) -> LayoutResult<()> {
        for (i, staff) in self.staves.iter().enumerate() {
            if staff.part >= self.parts.len() {
                return Err(LayoutError::InvalidScore(format!(
                    "staff {i} refers to missing part {}",
                    staff.part
                )));
            }
        }
        for (i, part) in self.parts.iter().enumerate() {
            if part.nstaves == 0 || part.first_staff + part.nstaves > self.staves.len() {
                return Err(LayoutError::InvalidScore(format!(
                    "part {i} covers staves {}..{} but the score has {}",
                    part.first_staff,
                    part.first_staff + part.nstaves,
                    self.staves.len()
                )));
            }
        }
        let mut tick = 0;
        for (i, mb) in self.measures.iter().enumerate() {
            if mb.tick != tick {
                return Err(LayoutError::InvalidScore(format!(
                    "measure {i} starts at tick {} but {tick} was expected",
                    mb.tick
                )));
            }
            tick += mb.ticks;
        }
        for (i, sp) in self.spanners.iter().enumerate() {
            if sp.tick2 < sp.tick {
                return Err(LayoutError::InvalidScore(format!(
                    "spanner {i} ends before it starts"
                )));
            }
        }
        Ok(())
    }

    pub fn nstaves(&self) -> usize {
        self.staves.len()
    }

    pub fn part_of_staff(&self, staff: usize) -> Option<&Part> {
        self.staves.get(staff).and_then(|s| self.parts.get(s.part))
    }

    pub fn staff_height(&self, staff: usize) -> f64 {
        self.staves
            .get(staff)
            .map(|s| s.height(&self.style))
            .unwrap_or(0.0)
    }

    pub fn end_tick(&self) -> Ticks {
        self.measures.last().map(|m| m.end_tick()).unwrap_or(0)
    }

    pub fn is_measure(&self, idx: usize) -> bool {
        self.measures.get(idx).is_some_and(|mb| mb.is_measure())
    }

    /// Next measure (not frame) after `idx`.
    pub fn next_measure(&self, idx: usize) -> Option<usize> {
        (idx + 1..self.measures.len()).find(|&i| self.measures[i].is_measure())
    }

    pub fn prev_index(&self, idx: usize) -> Option<usize> {
        idx.checked_sub(1)
    }

    /// Walk back over frames to find the element whose section break decides
    /// whether the element after `idx` starts a new section.
    pub fn find_potential_section_break(&self, idx: usize) -> Option<usize> {
        let mut i = idx;
        loop {
            let mb = self.measures.get(i)?;
            if mb.is_measure() || mb.breaks.section.is_some() {
                return Some(i);
            }
            i = i.checked_sub(1)?;
        }
    }

    /// Number of parts with at least one visible staff.
    pub fn visible_part_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| p.show && self.staves[p.staff_range()].iter().any(|s| s.show))
            .count()
    }

    /// Spanners overlapping the closed tick interval `[stick, etick]`.
    pub fn spanners_overlapping(&self, stick: Ticks, etick: Ticks) -> Vec<usize> {
        self.spanners
            .iter()
            .enumerate()
            .filter(|(_, sp)| sp.tick <= etick && sp.tick2 >= stick)
            .map(|(i, _)| i)
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parts and staves
// ═══════════════════════════════════════════════════════════════════════

/// A name shown in the system margin and where it sits vertically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffName {
    pub name: String,
    /// 0 centred on the part, 1 on the first staff, 2 between first and
    /// second, 3 on the second, 4 between second and third, 5 on the third.
    pub layout_pos: u8,
}

impl StaffName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            layout_pos: 0,
        }
    }
}

/// Instrument change taking effect at `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameChange {
    pub tick: Ticks,
    pub long_names: Vec<StaffName>,
    pub short_names: Vec<StaffName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: String,
    pub long_names: Vec<StaffName>,
    pub short_names: Vec<StaffName>,
    #[serde(default)]
    pub name_changes: Vec<NameChange>,
    pub show: bool,
    pub first_staff: usize,
    pub nstaves: usize,
}

impl Part {
    pub fn staff_range(&self) -> std::ops::Range<usize> {
        self.first_staff..self.first_staff + self.nstaves
    }

    fn change_at(&self, tick: Ticks) -> Option<&NameChange> {
        self.name_changes
            .iter()
            .filter(|c| c.tick <= tick)
            .max_by_key(|c| c.tick)
    }

    pub fn long_names_at(&self, tick: Ticks) -> &[StaffName] {
        match self.change_at(tick) {
            Some(c) => &c.long_names,
            None => &self.long_names,
        }
    }

    pub fn short_names_at(&self, tick: Ticks) -> &[StaffName] {
        match self.change_at(tick) {
            Some(c) => &c.short_names,
            None => &self.short_names,
        }
    }
}

/// When a staff may be hidden in systems where it has no content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HideMode {
    Auto,
    Always,
    Never,
    /// Hide only when every staff of the part is empty.
    Instrument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketType {
    Normal,
    Brace,
    Square,
    Line,
    NoBracket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketItem {
    pub column: usize,
    pub bracket_type: BracketType,
    /// Number of staves the bracket spans, starting at its own staff.
    pub span: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub part: usize,
    pub show: bool,
    pub hide_when_empty: HideMode,
    pub show_if_empty: bool,
    pub lines: u32,
    /// Line distance in spatium units.
    pub line_distance: f64,
    pub mag: f64,
    /// Extra distance above this staff, in user units.
    pub user_dist: f64,
    pub brackets: Vec<BracketItem>,
    pub is_tab: bool,
}

impl Staff {
    pub fn new(part: usize) -> Self {
        Self {
            part,
            show: true,
            hide_when_empty: HideMode::Auto,
            show_if_empty: false,
            lines: 5,
            line_distance: 1.0,
            mag: 1.0,
            user_dist: 0.0,
            brackets: Vec::new(),
            is_tab: false,
        }
    }

    pub fn spatium(&self, style: &Style) -> f64 {
        style.spatium * self.mag
    }

    /// Distance from the top to the bottom staff line.
    pub fn height(&self, style: &Style) -> f64 {
        let lines = self.lines.max(1) as f64;
        (lines - 1.0) * self.line_distance * self.spatium(style)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Measures and frames
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionBreak {
    pub first_system_indentation: bool,
    pub start_with_long_names: bool,
}

impl Default for SectionBreak {
    fn default() -> Self {
        Self {
            first_system_indentation: true,
            start_with_long_names: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutBreaks {
    pub line: bool,
    pub page: bool,
    pub section: Option<SectionBreak>,
}

impl LayoutBreaks {
    pub fn any(&self) -> bool {
        self.line || self.page || self.section.is_some()
    }
}

/// A measure or a frame together with its layout results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureBase {
    pub kind: MeasureKind,
    pub tick: Ticks,
    pub ticks: Ticks,
    pub breaks: LayoutBreaks,
    /// The system may not end after this element.
    pub no_break: bool,
    // layout results
    pub x: f64,
    pub width: f64,
    pub height: f64,
    pub system: Option<SystemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasureKind {
    Measure(Measure),
    /// Horizontal frame inside a system.
    HBox(HBox),
    /// Vertical frame; always forms a system of its own.
    VBox(VBox),
    /// Text frame; laid out like a vertical frame.
    TBox(VBox),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HBox {
    pub width: f64,
    /// Horizontal offset of the frame inside its slot.
    pub gap: f64,
    /// The measure after this frame gets a system header.
    pub create_system_header: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VBox {
    pub height: f64,
}

impl MeasureBase {
    pub fn new(kind: MeasureKind, tick: Ticks, ticks: Ticks) -> Self {
        Self {
            kind,
            tick,
            ticks,
            breaks: LayoutBreaks::default(),
            no_break: false,
            x: 0.0,
            width: 0.0,
            height: 0.0,
            system: None,
        }
    }

    pub fn end_tick(&self) -> Ticks {
        self.tick + self.ticks
    }

    pub fn is_measure(&self) -> bool {
        matches!(self.kind, MeasureKind::Measure(_))
    }

    pub fn is_hbox(&self) -> bool {
        matches!(self.kind, MeasureKind::HBox(_))
    }

    /// Vertical or text frame: ends the current system.
    pub fn is_vertical_frame(&self) -> bool {
        matches!(self.kind, MeasureKind::VBox(_) | MeasureKind::TBox(_))
    }

    pub fn as_measure(&self) -> Option<&Measure> {
        match &self.kind {
            MeasureKind::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_measure_mut(&mut self) -> Option<&mut Measure> {
        match &mut self.kind {
            MeasureKind::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            MeasureKind::Measure(_) => "Measure",
            MeasureKind::HBox(_) => "HBox",
            MeasureKind::VBox(_) => "VBox",
            MeasureKind::TBox(_) => "TBox",
        }
    }

    pub fn has_header(&self) -> bool {
        self.as_measure().is_some_and(Measure::has_header)
    }

    pub fn has_trailer(&self) -> bool {
        self.as_measure().is_some_and(Measure::has_trailer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarLineType {
    Normal,
    Double,
    End,
    EndRepeat,
    EndStartRepeat,
}

/// Spacing state written by the measure width engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureSpacing {
    /// Stretch coefficient of the last width computation.
    pub stretch: f64,
    pub min_ticks: Ticks,
    pub max_ticks: Ticks,
    /// Position of the first segment.
    pub first_x: f64,
    pub squeezable_space: f64,
    pub begin_barline: bool,
    pub end_barline: BarLineType,
}

impl Default for MeasureSpacing {
    fn default() -> Self {
        Self {
            stretch: 1.0,
            min_ticks: 0,
            max_ticks: 0,
            first_x: 0.0,
            squeezable_space: 0.0,
            begin_barline: false,
            end_barline: BarLineType::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacerKind {
    /// Space above the staff it belongs to (minimum).
    Up,
    /// Space below the staff it belongs to (minimum).
    Down,
    /// Exact space below the staff it belongs to.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spacer {
    pub staff: usize,
    pub kind: SpacerKind,
    /// Gap in user units.
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub number: i32,
    pub segments: Vec<Segment>,
    pub repeat_start: bool,
    pub repeat_end: bool,
    /// Key signature in effect (fifths).
    pub key: i32,
    /// A new key signature starts in this measure.
    pub key_change: bool,
    /// A new time signature starts in this measure.
    pub time_change: bool,
    pub spacers: Vec<Spacer>,
    /// Measure-attached annotations such as markers and jumps.
    pub elements: Vec<Annotation>,
    pub spacing: MeasureSpacing,
}

impl Measure {
    pub fn new(number: i32) -> Self {
        Self {
            number,
            segments: Vec::new(),
            repeat_start: false,
            repeat_end: false,
            key: 0,
            key_change: false,
            time_change: false,
            spacers: Vec::new(),
            elements: Vec::new(),
            spacing: MeasureSpacing::default(),
        }
    }

    pub fn has_header(&self) -> bool {
        self.segments.iter().any(|s| s.enabled && s.kind.is_header())
    }

    pub fn has_trailer(&self) -> bool {
        self.segments.iter().any(|s| s.enabled && s.kind.is_trailer())
    }

    pub fn segment_index(&self, kind: SegmentKind) -> Option<usize> {
        self.segments.iter().position(|s| s.kind == kind)
    }

    /// Insert keeping segments ordered by (relative tick, kind).
    pub fn insert_segment(&mut self, segment: Segment) -> usize {
        let key = (segment.rtick, segment.kind);
        let pos = self
            .segments
            .iter()
            .position(|s| (s.rtick, s.kind) > key)
            .unwrap_or(self.segments.len());
        self.segments.insert(pos, segment);
        pos
    }

    /// Shortest visible chord/rest duration, or 0 if there is none.
    pub fn shortest_chord_rest(&self) -> Ticks {
        self.segments
            .iter()
            .filter(|s| s.is_chord_rest() && s.enabled && s.ticks > 0)
            .map(|s| s.ticks)
            .min()
            .unwrap_or(0)
    }

    pub fn longest_chord_rest(&self) -> Ticks {
        self.segments
            .iter()
            .filter(|s| s.is_chord_rest() && s.enabled && s.ticks > 0)
            .map(|s| s.ticks)
            .max()
            .unwrap_or(0)
    }

    /// True when `staff` holds nothing but rests.
    pub fn is_empty(&self, staff: usize) -> bool {
        let seg_empty = self.segments.iter().all(|s| {
            s.chord_rests
                .iter()
                .all(|cr| cr.staff() != staff || cr.is_rest)
                && s.annotations.iter().all(|a| a.staff() != staff)
        });
        seg_empty && self.elements.iter().all(|a| a.staff() != staff)
    }

    /// True when a chord of another staff in `part_staves` is drawn on `staff`.
    pub fn has_moved_chord_on(&self, staff: usize, part_staves: std::ops::Range<usize>) -> bool {
        self.segments.iter().any(|s| {
            s.chord_rests.iter().any(|cr| {
                !cr.is_rest
                    && cr.staff_move != 0
                    && part_staves.contains(&cr.staff())
                    && cr.vstaff() == staff
            })
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Segments
// ═══════════════════════════════════════════════════════════════════════

/// Segment kinds in the order they appear at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    BeginBarLine,
    HeaderClef,
    HeaderKeySig,
    KeySig,
    TimeSig,
    StartRepeatBarLine,
    Clef,
    ChordRest,
    BarLine,
    EndBarLine,
    CourtesyTimeSig,
    CourtesyKeySig,
}

impl SegmentKind {
    pub fn is_header(self) -> bool {
        matches!(self, SegmentKind::HeaderClef | SegmentKind::HeaderKeySig)
    }

    pub fn is_trailer(self) -> bool {
        matches!(self, SegmentKind::CourtesyTimeSig | SegmentKind::CourtesyKeySig)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Tick relative to the measure start.
    pub rtick: Ticks,
    pub ticks: Ticks,
    pub enabled: bool,
    pub visible: bool,
    /// Created by layout rather than by the score content.
    pub generated: bool,
    /// Shapes of non chord/rest elements, one per staff.
    pub staff_shapes: Vec<Shape>,
    pub chord_rests: Vec<ChordRest>,
    pub annotations: Vec<Annotation>,
    /// Non-stretchable part of the width.
    pub width_offset: f64,
    pub has_accidentals: bool,
    // spacing results
    pub x: f64,
    pub width: f64,
    pub min_width: f64,
    pub stretch: f64,
    pub squeeze_factor: f64,
}

impl Segment {
    pub fn new(kind: SegmentKind, rtick: Ticks, ticks: Ticks) -> Self {
        Self {
            kind,
            rtick,
            ticks,
            enabled: true,
            visible: true,
            generated: false,
            staff_shapes: Vec::new(),
            chord_rests: Vec::new(),
            annotations: Vec::new(),
            width_offset: 0.0,
            has_accidentals: false,
            x: 0.0,
            width: 0.0,
            min_width: 0.0,
            stretch: 1.0,
            squeeze_factor: 1.0,
        }
    }

    pub fn is_chord_rest(&self) -> bool {
        self.kind == SegmentKind::ChordRest
    }

    pub fn all_elements_invisible(&self) -> bool {
        if self.is_chord_rest() {
            self.chord_rests.iter().all(|cr| !cr.visible)
        } else {
            !self.visible
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Chords, rests and their attachments
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordRest {
    pub track: usize,
    /// Staff offset for cross-staff notation inside the part.
    pub staff_move: i32,
    pub is_rest: bool,
    pub visible: bool,
    /// Stem up.
    pub up: bool,
    /// Sized shape in the coordinates of the staff the chord is drawn on.
    pub shape: Shape,
    pub beam: Option<usize>,
    pub tuplet: Option<usize>,
    pub articulations: Vec<Articulation>,
    pub lyrics: Vec<Lyric>,
}

impl ChordRest {
    pub fn staff(&self) -> usize {
        track_to_staff(self.track)
    }

    /// Staff the chord is drawn on.
    pub fn vstaff(&self) -> usize {
        (self.staff() as i64 + self.staff_move as i64).max(0) as usize
    }

    pub fn voice(&self) -> usize {
        self.track % VOICES
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticulationKind {
    Articulation,
    Fingering,
    StretchedBend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Articulation {
    pub kind: ArticulationKind,
    /// Size of the glyph; origin at its top-left corner.
    pub bbox: Rect,
    /// `None` places it on the side opposite the stem.
    pub placement: Option<Placement>,
    pub pos: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Syllabic {
    Single,
    Begin,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lyric {
    pub verse: usize,
    pub text: String,
    pub syllabic: Syllabic,
    pub pos: Point,
    pub width: f64,
}

// ═══════════════════════════════════════════════════════════════════════
// Annotations
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Sticking,
    Fermata,
    TremoloBar,
    Dynamic,
    FiguredBass,
    Expression,
    HarpPedalDiagram,
    Harmony,
    FretDiagram,
    StaffText,
    InstrumentChange,
    SystemText,
    PlayTechAnnotation,
    TripletFeel,
    TempoText,
    RehearsalMark,
    Image,
    Marker,
    Jump,
}

impl AnnotationKind {
    /// Attached to the system rather than to one staff.
    pub fn is_system_level(self) -> bool {
        matches!(
            self,
            AnnotationKind::SystemText
                | AnnotationKind::TripletFeel
                | AnnotationKind::TempoText
                | AnnotationKind::RehearsalMark
                | AnnotationKind::Marker
                | AnnotationKind::Jump
        )
    }

    pub fn default_placement(self) -> Placement {
        match self {
            AnnotationKind::Sticking
            | AnnotationKind::Dynamic
            | AnnotationKind::FiguredBass
            | AnnotationKind::Expression
            | AnnotationKind::HarpPedalDiagram => Placement::Below,
            _ => Placement::Above,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub track: usize,
    pub placement: Placement,
    /// Size of the element; origin at the anchor point.
    pub bbox: Rect,
    /// User offset added to the default position.
    pub offset: Point,
    pub autoplace: bool,
    pub add_to_skyline: bool,
    pub visible: bool,
    /// Computed position relative to the segment origin and staff top.
    pub pos: Point,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, track: usize, width: f64, height: f64) -> Self {
        Self {
            kind,
            track,
            placement: kind.default_placement(),
            bbox: Rect::new(0.0, 0.0, width, height),
            offset: Point::default(),
            autoplace: true,
            add_to_skyline: true,
            visible: true,
            pos: Point::default(),
        }
    }

    pub fn staff(&self) -> usize {
        track_to_staff(self.track)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Spanners, beams and tuplets
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpannerKind {
    Tie,
    Slur,
    Hairpin,
    Ottava,
    Pedal,
    Volta,
    GradualTempoChange,
    TextLine,
    Trill,
    LetRing,
    PalmMute,
    Vibrato,
    HarmonicMark,
}

impl SpannerKind {
    pub fn is_slur_or_tie(self) -> bool {
        matches!(self, SpannerKind::Tie | SpannerKind::Slur)
    }

    pub fn is_system_level(self) -> bool {
        matches!(self, SpannerKind::Volta | SpannerKind::GradualTempoChange)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanner {
    pub kind: SpannerKind,
    pub tick: Ticks,
    /// End tick; for slurs and ties the tick of the end chord.
    pub tick2: Ticks,
    pub track: usize,
    pub track2: usize,
    /// Slurs and ties: arch direction.
    pub up: bool,
    pub placement: Placement,
    pub autoplace: bool,
    pub visible: bool,
    /// The vertical offset still has its style default.
    pub styled_offset: bool,
    /// Height of a line spanner, in spatium units.
    pub line_height: f64,
}

impl Spanner {
    pub fn new(kind: SpannerKind, track: usize, tick: Ticks, tick2: Ticks) -> Self {
        let placement = match kind {
            SpannerKind::Hairpin | SpannerKind::Pedal => Placement::Below,
            _ => Placement::Above,
        };
        Self {
            kind,
            tick,
            tick2,
            track,
            track2: track,
            up: true,
            placement,
            autoplace: true,
            visible: true,
            styled_offset: true,
            line_height: 1.5,
        }
    }

    pub fn staff(&self) -> usize {
        track_to_staff(self.track)
    }

    pub fn is_cross_staff(&self) -> bool {
        track_to_staff(self.track2) != self.staff()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    pub track: usize,
    /// Chords of the beam sit on different staves.
    pub cross: bool,
    pub user_modified: bool,
    /// Computed outline in the coordinates of the beam's staff.
    pub bbox: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuplet {
    pub parent: Option<usize>,
    pub track: usize,
    pub tick: Ticks,
    pub ticks: Ticks,
    pub placement: Placement,
    /// Computed bracket outline in staff coordinates.
    pub bbox: Rect,
}
