//! Lyrics lines below each staff.
//!
//! All verses of a staff share one base line per system: the first verse
//! sits just below the lowest thing already in the staff's south skyline
//! over the extent of the lyrics, every further verse one lyrics line
//! lower.

use log::trace;

use super::constants::estimate_text_width;
use super::system::System;
use crate::geometry::{Point, Rect};
use crate::model::Score;

/// A segment of a system's measures: (measure index, segment index).
pub(super) type SegRef = (usize, usize);

struct Placed {
    seg: SegRef,
    cr: usize,
    lyric: usize,
    verse: usize,
    /// Outline at y = 0 in system x.
    x: f64,
    width: f64,
}

/// Place the lyrics of the chords in `segments` and add them to the
/// skylines of their staves.
pub(super) fn layout_lyrics(score: &mut Score, system: &mut System, segments: &[SegRef]) {
    let style = score.style.clone();
    let height = style.text_size(style.lyrics_font_size);
    let min_top = style.sp(style.lyrics_min_top_distance);
    let line_height = style.sp(style.lyrics_line_height);

    for staff in 0..system.staves.len().min(score.nstaves()) {
        if !system.staves[staff].show {
            continue;
        }

        let mut placed: Vec<Placed> = Vec::new();
        for &(mi, si) in segments {
            let mb = &score.measures[mi];
            let Some(m) = mb.as_measure() else {
                continue;
            };
            let seg = &m.segments[si];
            for (ci, cr) in seg.chord_rests.iter().enumerate() {
                if cr.staff() != staff {
                    continue;
                }
                let center = mb.x + seg.x + cr.shape.bbox().center_x();
                for (li, lyric) in cr.lyrics.iter().enumerate() {
                    let width = estimate_text_width(&lyric.text, height);
                    placed.push(Placed {
                        seg: (mi, si),
                        cr: ci,
                        lyric: li,
                        verse: lyric.verse,
                        x: center - width / 2.0,
                        width,
                    });
                }
            }
        }
        if placed.is_empty() {
            continue;
        }

        let skyline = &system.staves[staff].skyline;
        let base = placed
            .iter()
            .filter_map(|p| skyline.south.value_in_range(p.x, p.x + p.width))
            .fold(score.staff_height(staff), f64::max)
            + min_top;
        trace!("staff {staff}: lyrics base line at {base}");

        for p in &placed {
            let y = base + p.verse as f64 * line_height;
            let (mi, si) = p.seg;
            let mb = &mut score.measures[mi];
            let mx = mb.x;
            let Some(m) = mb.as_measure_mut() else {
                continue;
            };
            let seg = &mut m.segments[si];
            let lyric = &mut seg.chord_rests[p.cr].lyrics[p.lyric];
            lyric.pos = Point::new(p.x - mx - seg.x, y);
            lyric.width = p.width;
            system.staves[staff].skyline.add(&Rect::new(p.x, y, p.width, height));
        }
    }
}
