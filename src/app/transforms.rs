//! Pure sequence transforms shared by the decoding stages
//!
//! Run counting, modal-interval detection, positional interpolation and
//! rounding helpers. None of these functions know about records; they work on
//! plain slices so each stage can apply them to whichever column it needs.

use std::collections::BTreeMap;

/// Number a sequence by runs of equal values, starting at 1
///
/// `[3, 3, 1, 1, 2]` becomes `[1, 1, 2, 2, 3]`. Used to turn the
/// instrument's per-cycle step ids into a file-wide monotonic step number.
pub fn count_changes<T: PartialEq>(values: &[T]) -> Vec<u32> {
    let mut out = Vec::with_capacity(values.len());
    let mut run = 0u32;
    let mut previous: Option<&T> = None;
    for value in values {
        if previous != Some(value) {
            run += 1;
        }
        out.push(run);
        previous = Some(value);
    }
    out
}

/// Most frequent positive interval between consecutive known values
///
/// Intervals are quantised to milliseconds before counting; ties resolve to
/// the smallest interval. Returns `None` when no two adjacent values are known.
pub fn modal_delta(values: &[Option<f64>]) -> Option<f64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for pair in values.windows(2) {
        if let (Some(a), Some(b)) = (pair[0], pair[1]) {
            let delta_ms = ((b - a) * 1000.0).round() as i64;
            if delta_ms > 0 {
                *counts.entry(delta_ms).or_default() += 1;
            }
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for (delta_ms, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((delta_ms, count));
        }
    }
    best.map(|(delta_ms, _)| delta_ms as f64 / 1000.0)
}

/// Fill interior gaps by linear interpolation on position
///
/// Only gaps bounded by known values on both sides are filled. Returns the
/// number of positions written.
pub fn interpolate_interior(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut last_known: Option<usize> = None;
    for i in 0..values.len() {
        let Some(current) = values[i] else {
            continue;
        };
        if let Some(k) = last_known {
            if i > k + 1 {
                let Some(start) = values[k] else { continue };
                let span = (i - k) as f64;
                for j in (k + 1)..i {
                    let t = (j - k) as f64 / span;
                    values[j] = Some(start + (current - start) * t);
                    filled += 1;
                }
            }
        }
        last_known = Some(i);
    }
    filled
}

/// Fill missing values with the last known one; leading gaps stay missing
pub fn forward_fill<T: Clone>(values: &mut [Option<T>]) {
    let mut last: Option<T> = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => last = Some(v.clone()),
            None => *value = last.clone(),
        }
    }
}

/// Fill leading missing values with the first known one
pub fn back_fill_leading<T: Clone>(values: &mut [Option<T>]) {
    let Some(first) = values.iter().position(Option::is_some) else {
        return;
    };
    let fill = values[first].clone();
    for value in values.iter_mut().take(first) {
        *value = fill.clone();
    }
}

/// Round half away from zero to a number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Compare with an absolute tolerance
pub fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Format a duration in seconds as `HH:MM:SS`
///
/// Hours are not wrapped at 24, so multi-day steps stay readable.
pub fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
