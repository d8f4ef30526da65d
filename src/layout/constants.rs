//! Fixed constants of the layout engine.

// ── Numeric tolerances ──────────────────────────────────────────────
pub(super) const EPSILON: f64 = 1e-6;

/// Returned by skyline distance queries when nothing overlaps.
pub const SKYLINE_NO_OVERLAP: f64 = -1_000_000.0;

// ── Narrow spacing ──────────────────────────────────────────────────
pub(super) const NARROW_STRETCH_STEP: f64 = 0.2;
pub(super) const NARROW_SQUEEZE_START: f64 = 0.8;
pub(super) const NARROW_SQUEEZE_LIMIT: f64 = 0.3;
pub(super) const NARROW_REDUCTION_STEP: f64 = 0.05;

// ── Duration spacing ────────────────────────────────────────────────
/// Long notes are spaced as if the shortest note were at least this
/// fraction of the longest one.
pub(super) const MAX_DURATION_RATIO: i32 = 32;

// ── Staves ──────────────────────────────────────────────────────────
/// Barline extent of a one-line staff, in half spaces around the line.
pub(super) const ONE_LINE_BARLINE_FROM: f64 = -4.0;
pub(super) const ONE_LINE_BARLINE_TO: f64 = 4.0;

// ── Text ────────────────────────────────────────────────────────────
pub(super) const DEFAULT_INSTRUMENT_FONT_SIZE: f64 = 10.0;
pub(super) const TEXT_CHAR_WIDTH_FACTOR: f64 = 0.55;

// ── Slurs ───────────────────────────────────────────────────────────
pub(super) const SLUR_HEIGHT_FACTOR: f64 = 0.15;

/// Estimate the rendered width of a text string for a given font size.
pub(super) fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * TEXT_CHAR_WIDTH_FACTOR
}
