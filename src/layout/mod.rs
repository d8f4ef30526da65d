//! System layout engine.
//!
//! Splits the measures of a score into systems, justifies each system to
//! the page width, spaces its staves vertically and places everything drawn
//! around the staves against per-staff skylines.
//!
//! The entry points are [`layout_score`] for a complete pass and
//! [`LayoutContext::layout_range`] for relayout after an edit; both leave
//! the systems in the returned context and write positions back into the
//! score.

mod annotations;
mod autoplace;
mod brackets;
mod collect;
mod constants;
mod lines;
mod lyrics;
mod measure;
mod narrow;
pub mod skyline;
pub mod spring;
mod system;
mod vertical;

use std::collections::VecDeque;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::LayoutResult;
use crate::model::{Score, Ticks};

pub use collect::justify_system;
pub use constants::SKYLINE_NO_OVERLAP;
pub use skyline::{Skyline, SkylineLine, SkylineSegment};
pub use spring::{stretch_segments_to_width, Spring};
pub use system::*;

// ═══════════════════════════════════════════════════════════════════════
// Options
// ═══════════════════════════════════════════════════════════════════════

/// How measures are arranged into systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutMode {
    /// Systems on pages; line, page and section breaks are honoured.
    #[default]
    Page,
    /// Systems stacked without pages; breaks are honoured.
    System,
    /// Systems as wide as the page, breaks ignored.
    Float,
    /// One endless system.
    Line,
    /// One endless system with fixed measure widths.
    HorizontalFixed,
}

impl LayoutMode {
    /// All measures go into a single system of unbounded width.
    pub fn is_linear(self) -> bool {
        matches!(self, LayoutMode::Line | LayoutMode::HorizontalFixed)
    }

    pub fn honors_breaks(self) -> bool {
        matches!(self, LayoutMode::Page | LayoutMode::System)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub mode: LayoutMode,
    /// Indent the first system of each section.
    pub first_system_indent: bool,
    /// How far a chord symbol may move to line up with its neighbours,
    /// in spatium units.
    pub max_chord_shift_above: f64,
    pub max_chord_shift_below: f64,
    /// As above, for chord symbols in systems with fret diagrams.
    pub max_fret_shift_above: f64,
    pub max_fret_shift_below: f64,
    /// Leave systems at their natural width.
    pub no_horizontal_stretch: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Page,
            first_system_indent: true,
            max_chord_shift_above: 0.0,
            max_chord_shift_below: 0.0,
            max_fret_shift_above: 0.0,
            max_fret_shift_below: 0.0,
            no_horizontal_stretch: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// LayoutContext
// ═══════════════════════════════════════════════════════════════════════

/// State of a layout pass: the measure cursor, section state and the
/// systems built so far. Systems of a previous pass are kept in a pool and
/// reused, so their identities survive relayout.
#[derive(Debug)]
pub struct LayoutContext {
    options: LayoutOptions,

    // measure cursor
    cur_measure: Option<usize>,
    prev_measure: Option<usize>,
    next_measure: Option<usize>,

    /// Range being laid out.
    start_tick: Ticks,
    end_tick: Ticks,

    // section state
    first_system: bool,
    first_system_indent: bool,
    start_with_long_names: bool,

    systems: Vec<System>,
    system_pool: VecDeque<System>,
    /// Last measure the recycled system ended with.
    system_old_measure: Option<usize>,
    range_done: bool,
    total_brackets_width: Option<f64>,
    next_system_id: u32,
}

impl LayoutContext {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            cur_measure: None,
            prev_measure: None,
            next_measure: None,
            start_tick: 0,
            end_tick: 0,
            first_system: true,
            first_system_indent: true,
            start_with_long_names: true,
            systems: Vec::new(),
            system_pool: VecDeque::new(),
            system_old_measure: None,
            range_done: false,
            total_brackets_width: None,
            next_system_id: 0,
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    /// Measure the cursor points at; `None` once every measure is placed.
    pub fn current_measure(&self) -> Option<usize> {
        self.cur_measure
    }

    /// The last pass stopped early because the rest of the layout was
    /// unchanged.
    pub fn range_done(&self) -> bool {
        self.range_done
    }

    /// Lay out every measure of `score`, reusing the systems of a previous
    /// pass.
    pub fn layout_all(&mut self, score: &mut Score) {
        self.begin_layout(score);
        self.run(score);
    }

    /// Prepare a full pass with the cursor on the first measure, leaving
    /// the systems to be collected one at a time by
    /// [`Self::collect_system`].
    pub fn begin_layout(&mut self, score: &Score) {
        let mut pool = std::mem::take(&mut self.systems);
        drop_stale_measures(&mut pool, score.measures.len());
        // a partial relayout only sees part of the skylines; a full one
        // starts the continuous distances over
        for ss in pool.iter_mut().flat_map(|s| s.staves.iter_mut()) {
            ss.continuous_dist = SKYLINE_NO_OVERLAP;
        }
        self.start(score, pool, 0, score.end_tick());
        self.reset_cursor(score, 0);
    }

    /// Relayout after a change between `stick` and `etick`.
    ///
    /// Systems ending at or before `stick` are kept as they are. Layout
    /// restarts at the first system reaching past `stick` and stops as soon
    /// as a new system ends where an old one did after `etick`; the old
    /// systems from there on are kept.
    pub fn layout_range(&mut self, score: &mut Score, stick: Ticks, etick: Ticks) {
        let mut systems = std::mem::take(&mut self.systems);
        drop_stale_measures(&mut systems, score.measures.len());
        let keep = systems
            .iter()
            .position(|s| s.end_tick(score) > stick)
            .unwrap_or(systems.len());
        let pool = systems.split_off(keep);
        let resume = match pool.first().and_then(System::first_measure_base) {
            Some(m) => m,
            None => systems
                .last()
                .and_then(System::last_measure_base)
                .map_or(0, |m| m + 1),
        };
        self.systems = systems;
        self.start(score, pool, stick, etick);
        self.reset_cursor(score, resume);
        self.run(score);
    }

    fn start(&mut self, score: &Score, pool: Vec<System>, stick: Ticks, etick: Ticks) {
        self.start_tick = stick;
        self.end_tick = etick;
        self.range_done = false;
        self.system_old_measure = None;
        self.total_brackets_width = None;
        self.first_system = true;
        self.first_system_indent = self.options.first_system_indent;
        self.start_with_long_names = true;
        self.system_pool = pool.into();
        if let Some(max) = self.systems.iter().chain(self.system_pool.iter()).map(|s| s.id.0).max() {
            self.next_system_id = self.next_system_id.max(max + 1);
        }
        debug!(
            "layout from tick {stick} to {etick}: {} systems kept, {} pooled, {} measures",
            self.systems.len(),
            self.system_pool.len(),
            score.measures.len()
        );
    }

    fn run(&mut self, score: &mut Score) {
        while !self.range_done {
            if self.collect_system(score).is_none() {
                break;
            }
        }
        self.finish();
    }

    /// Collect the next system; returns its index in [`Self::systems`].
    pub fn collect_system(&mut self, score: &mut Score) -> Option<usize> {
        collect::collect_system(score, self)
    }

    fn finish(&mut self) {
        if self.range_done {
            let reused = self.system_pool.len();
            self.systems.extend(self.system_pool.drain(..));
            debug!("range done, {reused} old systems kept");
        } else {
            self.system_pool.clear();
        }
        info!("layout finished with {} systems", self.systems.len());
    }

    // ── cursor ──────────────────────────────────────────────────────

    fn reset_cursor(&mut self, score: &Score, idx: usize) {
        if idx >= score.measures.len() {
            self.prev_measure = idx.checked_sub(1).filter(|&p| p < score.measures.len());
            self.cur_measure = None;
            self.next_measure = None;
            return;
        }
        self.prev_measure = score.prev_index(idx);
        self.cur_measure = Some(idx);
        self.next_measure = Some(idx + 1).filter(|&n| n < score.measures.len());
    }

    fn get_next_measure(&mut self, score: &Score) {
        self.prev_measure = self.cur_measure;
        self.cur_measure = self.next_measure;
        self.next_measure = self
            .cur_measure
            .map(|c| c + 1)
            .filter(|&n| n < score.measures.len());
    }

    // ── systems ─────────────────────────────────────────────────────

    /// A system from the pool, or a new one.
    fn get_next_system(&mut self, score: &Score) -> System {
        let mut system = match self.system_pool.pop_front() {
            Some(mut s) => {
                self.system_old_measure = s.last_measure_base();
                s.clear();
                s
            }
            None => {
                self.system_old_measure = None;
                let id = SystemId(self.next_system_id);
                self.next_system_id += 1;
                System::new(id)
            }
        };
        system.adjust_staves_number(score.nstaves());
        system
    }

    fn push_system(&mut self, system: System) -> usize {
        self.systems.push(system);
        self.systems.len() - 1
    }

    /// Section state for the system after element `mb`.
    fn update_section_state(&mut self, score: &Score, mb: usize) {
        let section = score.measures[mb].breaks.section;
        self.first_system = section.is_some() && self.options.mode != LayoutMode::Float;
        self.first_system_indent = self.first_system
            && self.options.first_system_indent
            && section.is_some_and(|s| s.first_system_indentation);
        self.start_with_long_names = self.first_system && section.is_some_and(|s| s.start_with_long_names);
    }

    fn target_system_width(&self, score: &Score) -> f64 {
        if self.options.mode.is_linear() {
            f64::INFINITY
        } else {
            score.style.page_printable_width
        }
    }
}

/// Systems of an earlier pass may refer to measures the score no longer has.
fn drop_stale_measures(systems: &mut Vec<System>, nmeasures: usize) {
    for system in systems.iter_mut() {
        system.truncate_measures(nmeasures);
    }
    let before = systems.len();
    systems.retain(|s| !s.measures.is_empty());
    if systems.len() < before {
        debug!("{} systems lost all their measures", before - systems.len());
    }
}

/// Lay out `score` from scratch.
pub fn layout_score(score: &mut Score, options: LayoutOptions) -> LayoutContext {
    let mut ctx = LayoutContext::new(options);
    ctx.layout_all(score);
    ctx
}

/// The computed systems as JSON.
pub fn layout_to_json(systems: &[System]) -> LayoutResult<String> {
    Ok(serde_json::to_string_pretty(systems)?)
}
