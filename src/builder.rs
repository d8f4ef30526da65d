//! Programmatic score construction.
//!
//! Chords and rests get default shapes sized from the style, which is
//! enough for layout: a notehead on the middle line with a stem, or a rest
//! block in the middle of the staff.

use crate::geometry::{Rect, Shape};
use crate::model::*;
use crate::style::Style;

/// Builds a [`Score`] measure by measure.
///
/// ```
/// use scorelayout::builder::ScoreBuilder;
///
/// let score = ScoreBuilder::new()
///     .part("Flute", 1)
///     .measures(4, |_, m| {
///         m.notes(0, &[480, 480, 480, 480]);
///     })
///     .build();
/// assert_eq!(score.measures.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct ScoreBuilder {
    score: Score,
    tick: Ticks,
    time_sig: (i32, i32),
    number: i32,
}

impl Default for ScoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreBuilder {
    pub fn new() -> Self {
        Self {
            score: Score::default(),
            tick: 0,
            time_sig: (4, 4),
            number: 0,
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.score.style = style;
        self
    }

    pub fn style_mut(&mut self) -> &mut Style {
        &mut self.score.style
    }

    pub fn show_instrument_names(mut self, show: bool) -> Self {
        self.score.show_instrument_names = show;
        self
    }

    /// Add a part with `nstaves` staves. Parts with more than one staff get
    /// a brace.
    pub fn part(mut self, name: &str, nstaves: usize) -> Self {
        let index = self.score.parts.len();
        let first_staff = self.score.staves.len();
        let short: String = name.chars().take(3).collect::<String>() + ".";
        self.score.parts.push(Part {
            id: format!("P{}", index + 1),
            long_names: vec![StaffName::new(name)],
            short_names: vec![StaffName::new(&short)],
            name_changes: Vec::new(),
            show: true,
            first_staff,
            nstaves,
        });
        for _ in 0..nstaves {
            self.score.staves.push(Staff::new(index));
        }
        if nstaves > 1 {
            self.score.staves[first_staff].brackets.push(BracketItem {
                column: 0,
                bracket_type: BracketType::Brace,
                span: nstaves,
            });
        }
        self
    }

    /// Change a staff added earlier.
    pub fn staff(mut self, idx: usize, f: impl FnOnce(&mut Staff)) -> Self {
        if let Some(staff) = self.score.staves.get_mut(idx) {
            f(staff);
        }
        self
    }

    /// Add a bracket spanning `span` staves from `staff`.
    pub fn bracket(mut self, staff: usize, column: usize, bracket_type: BracketType, span: usize) -> Self {
        if let Some(s) = self.score.staves.get_mut(staff) {
            s.brackets.push(BracketItem {
                column,
                bracket_type,
                span,
            });
        }
        self
    }

    pub fn measure(mut self, f: impl FnOnce(&mut MeasureBuilder)) -> Self {
        self.push_measure(f);
        self
    }

    /// Add `n` measures; `f` gets the measure's position in the run.
    pub fn measures(mut self, n: usize, f: impl Fn(usize, &mut MeasureBuilder)) -> Self {
        for i in 0..n {
            self.push_measure(|m| f(i, m));
        }
        self
    }

    fn push_measure(&mut self, f: impl FnOnce(&mut MeasureBuilder)) {
        self.number += 1;
        let heights: Vec<f64> = self.score.staves.iter().map(|s| s.height(&self.score.style)).collect();
        let mut mb = MeasureBuilder::new(&self.score.style, heights, self.number, self.time_sig);
        f(&mut mb);
        self.time_sig = mb.time_sig;
        let base = mb.finish(&self.score.style, self.tick);
        self.tick += base.ticks;
        self.score.measures.push(base);
    }

    /// Horizontal frame of `width` user units.
    pub fn hbox(mut self, width: f64, create_system_header: bool) -> Self {
        let kind = MeasureKind::HBox(HBox {
            width,
            gap: 0.0,
            create_system_header,
        });
        self.score.measures.push(MeasureBase::new(kind, self.tick, 0));
        self
    }

    /// Vertical frame of `height` user units.
    pub fn vbox(mut self, height: f64) -> Self {
        let kind = MeasureKind::VBox(VBox { height });
        self.score.measures.push(MeasureBase::new(kind, self.tick, 0));
        self
    }

    /// Change the element added last.
    pub fn last(mut self, f: impl FnOnce(&mut MeasureBase)) -> Self {
        if let Some(mb) = self.score.measures.last_mut() {
            f(mb);
        }
        self
    }

    pub fn spanner(mut self, spanner: Spanner) -> Self {
        self.score.spanners.push(spanner);
        self
    }

    pub fn beam(mut self, beam: Beam) -> Self {
        self.score.beams.push(beam);
        self
    }

    pub fn tuplet(mut self, tuplet: Tuplet) -> Self {
        self.score.tuplets.push(tuplet);
        self
    }

    pub fn build(self) -> Score {
        self.score
    }
}

/// Default outline of a chord: a notehead on the middle line and a stem.
pub fn chord_shape(style: &Style, up: bool) -> Shape {
    let sp = style.spatium;
    let head = Rect::new(0.0, 1.5 * sp, 1.2 * sp, sp);
    let stem = if up {
        Rect::new(1.1 * sp, -1.5 * sp, 0.1 * sp, 3.5 * sp)
    } else {
        Rect::new(0.0, 2.0 * sp, 0.1 * sp, 3.5 * sp)
    };
    let mut shape = Shape::from_rect(head);
    shape.add(stem);
    shape
}

pub fn rest_shape(style: &Style) -> Shape {
    let sp = style.spatium;
    Shape::from_rect(Rect::new(0.0, sp, sp, 2.0 * sp))
}

/// Builds one measure.
#[derive(Debug, Clone)]
pub struct MeasureBuilder {
    measure: Measure,
    time_sig: (i32, i32),
    breaks: LayoutBreaks,
    no_break: bool,
    /// Shapes used for new chords and rests.
    chord_up: Shape,
    chord_down: Shape,
    rest: Shape,
    staff_heights: Vec<f64>,
}

impl MeasureBuilder {
    fn new(style: &Style, staff_heights: Vec<f64>, number: i32, time_sig: (i32, i32)) -> Self {
        Self {
            measure: Measure::new(number),
            time_sig,
            breaks: LayoutBreaks::default(),
            no_break: false,
            chord_up: chord_shape(style, true),
            chord_down: chord_shape(style, false),
            rest: rest_shape(style),
            staff_heights,
        }
    }

    fn ticks(&self) -> Ticks {
        self.time_sig.0 * DIVISION * 4 / self.time_sig.1.max(1)
    }

    /// Start a new time signature in this measure.
    pub fn time_sig(&mut self, numerator: i32, denominator: i32) -> &mut Self {
        self.time_sig = (numerator, denominator);
        self.measure.time_change = true;
        self
    }

    /// Key signature in effect; `change` starts it in this measure.
    pub fn key(&mut self, fifths: i32, change: bool) -> &mut Self {
        self.measure.key = fifths;
        self.measure.key_change = change;
        self
    }

    fn segment_at(&mut self, rtick: Ticks) -> &mut Segment {
        let i = match self
            .measure
            .segments
            .iter()
            .position(|s| s.is_chord_rest() && s.rtick == rtick)
        {
            Some(i) => i,
            None => self.measure.insert_segment(Segment::new(SegmentKind::ChordRest, rtick, 0)),
        };
        &mut self.measure.segments[i]
    }

    /// Add a chord or rest and let `f` adjust it.
    pub fn chord_rest(&mut self, track: usize, rtick: Ticks, rest: bool, f: impl FnOnce(&mut ChordRest)) -> &mut Self {
        let up = track % 2 == 0;
        let shape = if rest {
            self.rest.clone()
        } else if up {
            self.chord_up.clone()
        } else {
            self.chord_down.clone()
        };
        let mut cr = ChordRest {
            track,
            staff_move: 0,
            is_rest: rest,
            visible: true,
            up,
            shape,
            beam: None,
            tuplet: None,
            articulations: Vec::new(),
            lyrics: Vec::new(),
        };
        f(&mut cr);
        self.segment_at(rtick).chord_rests.push(cr);
        self
    }

    /// Consecutive chords in `track`, one per duration.
    pub fn notes(&mut self, track: usize, durations: &[Ticks]) -> &mut Self {
        let mut rtick = 0;
        for &d in durations {
            self.chord_rest(track, rtick, false, |_| {});
            rtick += d;
        }
        self
    }

    /// A whole-measure rest in `track`.
    pub fn rest(&mut self, track: usize) -> &mut Self {
        self.chord_rest(track, 0, true, |_| {})
    }

    /// Attach an annotation to the chord/rest segment at `rtick`.
    pub fn annotate(&mut self, rtick: Ticks, annotation: Annotation) -> &mut Self {
        self.segment_at(rtick).annotations.push(annotation);
        self
    }

    /// Attach a measure-level element such as a marker or jump.
    pub fn element(&mut self, annotation: Annotation) -> &mut Self {
        self.measure.elements.push(annotation);
        self
    }

    pub fn spacer(&mut self, staff: usize, kind: SpacerKind, gap: f64) -> &mut Self {
        self.measure.spacers.push(Spacer { staff, kind, gap });
        self
    }

    pub fn repeat_start(&mut self) -> &mut Self {
        self.measure.repeat_start = true;
        self
    }

    pub fn repeat_end(&mut self) -> &mut Self {
        self.measure.repeat_end = true;
        self
    }

    pub fn line_break(&mut self) -> &mut Self {
        self.breaks.line = true;
        self
    }

    pub fn section_break(&mut self, section: SectionBreak) -> &mut Self {
        self.breaks.section = Some(section);
        self
    }

    /// The system may not end after this measure.
    pub fn no_break(&mut self) -> &mut Self {
        self.no_break = true;
        self
    }

    fn column(&self, width: f64) -> Vec<Shape> {
        self.staff_heights
            .iter()
            .map(|&h| Shape::from_rect(Rect::new(0.0, 0.0, width, h)))
            .collect()
    }

    fn finish(mut self, style: &Style, tick: Ticks) -> MeasureBase {
        let ticks = self.ticks();
        if self.measure.time_change {
            let mut seg = Segment::new(SegmentKind::TimeSig, 0, 0);
            seg.staff_shapes = self.column(style.sp(style.time_sig_width));
            self.measure.insert_segment(seg);
        }
        if self.measure.key_change {
            let mut seg = Segment::new(SegmentKind::KeySig, 0, 0);
            let w = self.measure.key.unsigned_abs().max(1) as f64 * style.sp(style.key_sig_accidental_width);
            seg.staff_shapes = self.column(w);
            self.measure.insert_segment(seg);
        }
        if self.measure.repeat_start {
            let mut seg = Segment::new(SegmentKind::StartRepeatBarLine, 0, 0);
            seg.staff_shapes = self.column(style.sp(style.repeat_barline_width));
            seg.enabled = false;
            self.measure.insert_segment(seg);
        }
        if !self.measure.segments.iter().any(Segment::is_chord_rest) {
            for staff in 0..self.staff_heights.len() {
                self.chord_rest(staff * VOICES, 0, true, |_| {});
            }
        }

        // each chord/rest segment lasts until the next one
        let starts: Vec<Ticks> = self
            .measure
            .segments
            .iter()
            .filter(|s| s.is_chord_rest())
            .map(|s| s.rtick)
            .collect();
        for seg in self.measure.segments.iter_mut().filter(|s| s.is_chord_rest()) {
            let next = starts.iter().copied().find(|&t| t > seg.rtick).unwrap_or(ticks);
            seg.ticks = next - seg.rtick;
        }

        let mut base = MeasureBase::new(MeasureKind::Measure(self.measure), tick, ticks);
        base.breaks = self.breaks;
        base.no_break = self.no_break;
        base
    }
}
