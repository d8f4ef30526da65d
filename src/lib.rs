//! scorelayout — system layout engine for engraved music.
//!
//! Takes a score whose glyphs are already sized and decides where things
//! go: which measures share a system, how wide every segment becomes, how
//! far apart the staves sit and where slurs, dynamics, lyrics and the rest
//! of the annotations land.
//!
//! # Example
//! ```
//! use scorelayout::builder::ScoreBuilder;
//! use scorelayout::{layout_score, LayoutOptions};
//!
//! let mut score = ScoreBuilder::new()
//!     .part("Violin", 1)
//!     .measures(24, |_, m| {
//!         m.notes(0, &[480, 480, 480, 480]);
//!     })
//!     .build();
//! let ctx = layout_score(&mut score, LayoutOptions::default());
//! assert!(ctx.systems().len() > 1);
//! ```

pub mod builder;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod preview;
pub mod style;

pub use error::{LayoutError, LayoutResult};
pub use layout::{layout_score, layout_to_json, LayoutContext, LayoutMode, LayoutOptions};
pub use model::*;
pub use preview::render_layout_svg;
pub use style::Style;

/// Load a score from JSON, lay it out and return the systems as JSON.
pub fn layout_json(score_json: &str, options: LayoutOptions) -> LayoutResult<String> {
    let mut score = Score::from_json(score_json)?;
    let ctx = layout_score(&mut score, options);
    layout_to_json(ctx.systems())
}
