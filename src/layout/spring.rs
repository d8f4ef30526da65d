//! Spring model for distributing extra horizontal space.
//!
//! Every stretchable segment is a spring with constant `k = 1 / stretch`
//! and a pre-tension of `width * k`. Applying a force `F` lengthens every
//! spring whose pre-tension is below `F` to `F / k`; springs already longer
//! than that stay as they are.

use log::warn;

use super::constants::EPSILON;

#[derive(Debug, Clone, PartialEq)]
pub struct Spring<T> {
    pub spring_const: f64,
    pub width: f64,
    pub pre_tension: f64,
    pub target: T,
}

impl<T> Spring<T> {
    /// `None` for a segment with no positive stretch: it cannot be a spring.
    pub fn new(stretch: f64, width: f64, target: T) -> Option<Self> {
        if !(stretch > EPSILON) {
            warn!("segment with non-positive stretch {stretch} skipped as spring");
            return None;
        }
        let spring_const = 1.0 / stretch;
        Some(Self {
            spring_const,
            width,
            pre_tension: width * spring_const,
            target,
        })
    }
}

/// Distribute `extra` width over `springs`.
///
/// Returns the new width for every spring that lengthened, in spring order
/// after sorting by pre-tension. The increases sum to `extra`.
pub fn stretch_segments_to_width<T: Copy>(springs: &mut [Spring<T>], extra: f64) -> Vec<(T, f64)> {
    if springs.is_empty() || extra <= 0.0 {
        return Vec::new();
    }
    springs.sort_by(|a, b| a.pre_tension.total_cmp(&b.pre_tension));

    let mut inverse_spring_const = 0.0;
    let mut width = extra;
    let mut force = 0.0;
    for (i, spring) in springs.iter().enumerate() {
        inverse_spring_const += 1.0 / spring.spring_const;
        width += spring.width;
        force = width / inverse_spring_const;
        match springs.get(i + 1) {
            Some(next) if force >= next.pre_tension => continue,
            _ => break,
        }
    }

    springs
        .iter()
        .filter(|s| force > s.pre_tension)
        .map(|s| (s.target, force / s.spring_const))
        .collect()
}
