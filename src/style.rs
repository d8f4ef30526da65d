//! Engraving style: every tunable distance and switch the layout reads.
//!
//! `spatium` and `page_printable_width` are in user units (the same units
//! as all computed positions). Everything else that describes a distance is
//! in spatium units and is scaled with [`Style::sp`].

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};

/// Horizontal alignment of instrument names in the left margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Spatium at which font point sizes are taken as user units.
const FONT_SPATIUM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    // ── Page ────────────────────────────────────────────────────────
    /// Distance between two staff lines, in user units.
    pub spatium: f64,
    /// Usable width of a system, in user units.
    pub page_printable_width: f64,
    /// Vertical gap between systems in the preview output.
    pub system_distance: f64,

    // ── Horizontal spacing ──────────────────────────────────────────
    /// Growth factor per doubling of note duration.
    pub measure_spacing: f64,
    /// Base width of the shortest note in a system.
    pub spacing_unit: f64,
    /// Padding after a chord/rest shape.
    pub min_note_distance: f64,
    /// Space between a barline and the first chord.
    pub bar_note_distance: f64,
    /// Space between the header and the first chord.
    pub system_header_distance: f64,
    /// Padding after clefs, key and time signatures.
    pub header_padding: f64,
    pub min_measure_width: f64,
    /// Fraction of squeezable space a system may overshoot its width by.
    pub squeezability: f64,
    /// Systems ending a section and filled below this ratio stay unjustified.
    pub last_system_fill_limit: f64,

    // ── Generated glyph widths ──────────────────────────────────────
    pub clef_width: f64,
    pub key_sig_accidental_width: f64,
    pub time_sig_width: f64,
    pub barline_width: f64,
    pub double_barline_width: f64,
    pub end_barline_width: f64,
    pub repeat_barline_width: f64,
    pub gen_courtesy_key_sig: bool,
    pub gen_courtesy_time_sig: bool,
    /// Draw a begin barline on single-staff systems too.
    pub start_barline_single: bool,

    // ── Vertical spacing ────────────────────────────────────────────
    pub staff_distance: f64,
    /// Distance between staves of the same part.
    pub akkolade_distance: f64,
    pub min_vertical_distance: f64,
    pub enable_vertical_spread: bool,
    pub min_staff_spread: f64,

    // ── Staff visibility ────────────────────────────────────────────
    pub hide_empty_staves: bool,
    pub dont_hide_staves_in_first_system: bool,
    pub always_show_brackets_when_empty_staves_are_hidden: bool,
    pub always_show_square_brackets_when_empty_staves_are_hidden: bool,

    // ── Brackets ────────────────────────────────────────────────────
    pub bracket_width: f64,
    pub akkolade_width: f64,
    pub bracket_distance: f64,

    // ── Instrument names & indentation ──────────────────────────────
    pub hide_instrument_name_if_one_instrument: bool,
    pub long_instrument_font_size: f64,
    pub short_instrument_font_size: f64,
    pub instrument_name_offset: f64,
    pub instrument_name_align: HAlign,
    pub first_system_indentation: f64,
    pub align_system_to_margin: bool,

    // ── Slurs and ties ──────────────────────────────────────────────
    pub slur_endpoint_offset: f64,
    pub tie_endpoint_offset: f64,
    pub slur_min_height: f64,
    pub slur_max_height: f64,
    pub slur_collision_vert_offset: f64,
    pub slur_collision_horiz_offset: f64,
    pub slur_collision_fuzzy: f64,

    // ── Annotation placement ────────────────────────────────────────
    pub autoplace_min_distance: f64,
    /// Default gap between the staff and a freshly placed annotation.
    pub annotation_staff_distance: f64,
    pub articulation_distance: f64,
    pub tuplet_bracket_height: f64,
    pub tuplet_distance: f64,
    pub beam_width: f64,
    pub line_height: f64,
    pub expression_dynamic_gap: f64,

    // ── Lyrics ──────────────────────────────────────────────────────
    pub lyrics_font_size: f64,
    pub lyrics_line_height: f64,
    pub lyrics_min_top_distance: f64,
    pub lyrics_min_distance: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            spatium: 10.0,
            page_printable_width: 740.0,
            system_distance: 9.0,

            measure_spacing: 1.5,
            spacing_unit: 3.0,
            min_note_distance: 0.5,
            bar_note_distance: 1.3,
            system_header_distance: 2.5,
            header_padding: 0.5,
            min_measure_width: 8.0,
            squeezability: 0.3,
            last_system_fill_limit: 0.3,

            clef_width: 2.6,
            key_sig_accidental_width: 1.0,
            time_sig_width: 2.0,
            barline_width: 0.16,
            double_barline_width: 0.7,
            end_barline_width: 0.9,
            repeat_barline_width: 1.5,
            gen_courtesy_key_sig: true,
            gen_courtesy_time_sig: true,
            start_barline_single: false,

            staff_distance: 6.5,
            akkolade_distance: 6.5,
            min_vertical_distance: 0.5,
            enable_vertical_spread: false,
            min_staff_spread: 3.5,

            hide_empty_staves: false,
            dont_hide_staves_in_first_system: true,
            always_show_brackets_when_empty_staves_are_hidden: false,
            always_show_square_brackets_when_empty_staves_are_hidden: false,

            bracket_width: 0.45,
            akkolade_width: 1.6,
            bracket_distance: 0.45,

            hide_instrument_name_if_one_instrument: true,
            long_instrument_font_size: 10.0,
            short_instrument_font_size: 10.0,
            instrument_name_offset: 1.0,
            instrument_name_align: HAlign::Right,
            first_system_indentation: 5.0,
            align_system_to_margin: true,

            slur_endpoint_offset: 0.5,
            tie_endpoint_offset: 0.25,
            slur_min_height: 0.5,
            slur_max_height: 2.5,
            slur_collision_vert_offset: 0.65,
            slur_collision_horiz_offset: 0.2,
            slur_collision_fuzzy: 0.25,

            autoplace_min_distance: 0.5,
            annotation_staff_distance: 1.0,
            articulation_distance: 0.5,
            tuplet_bracket_height: 1.0,
            tuplet_distance: 0.5,
            beam_width: 0.5,
            line_height: 1.5,
            expression_dynamic_gap: 0.5,

            lyrics_font_size: 10.0,
            lyrics_line_height: 1.6,
            lyrics_min_top_distance: 1.0,
            lyrics_min_distance: 0.25,
        }
    }
}

impl Style {
    /// Parse a style from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> LayoutResult<Self> {
        let style: Style = serde_json::from_str(json)?;
        style.validate()?;
        Ok(style)
    }

    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> LayoutResult<()> {
        if !(self.spatium > 0.0) {
            return Err(LayoutError::InvalidStyle(format!(
                "spatium must be positive, got {}",
                self.spatium
            )));
        }
        if !(self.page_printable_width > 0.0) {
            return Err(LayoutError::InvalidStyle(format!(
                "page_printable_width must be positive, got {}",
                self.page_printable_width
            )));
        }
        if !(0.0..1.0).contains(&self.squeezability) {
            return Err(LayoutError::InvalidStyle(format!(
                "squeezability must be in [0, 1), got {}",
                self.squeezability
            )));
        }
        if !(0.0..=1.0).contains(&self.last_system_fill_limit) {
            return Err(LayoutError::InvalidStyle(format!(
                "last_system_fill_limit must be in [0, 1], got {}",
                self.last_system_fill_limit
            )));
        }
        if !(self.measure_spacing > 0.0) {
            return Err(LayoutError::InvalidStyle(format!(
                "measure_spacing must be positive, got {}",
                self.measure_spacing
            )));
        }
        Ok(())
    }

    /// Convert a distance in spatium units to user units.
    pub fn sp(&self, value: f64) -> f64 {
        value * self.spatium
    }

    /// Height in user units of text set at `points`; text follows the
    /// staff size.
    pub fn text_size(&self, points: f64) -> f64 {
        points * self.spatium / FONT_SPATIUM
    }
}
