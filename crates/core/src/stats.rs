//! Deterministic mode computation over floating-point samples.

use std::collections::BTreeMap;

/// Most frequent value of `values` after bucketing to `1 / buckets_per_point`
/// points, with its frequency. Ties go to the smallest value. Non-finite
/// samples are ignored.
pub fn mode_with_count(values: &[f32], buckets_per_point: f32) -> Option<(f32, usize)> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in values.iter().filter(|v| v.is_finite()) {
        *counts
            .entry((value * buckets_per_point).round() as i64)
            .or_insert(0) += 1;
    }

    // Ascending iteration plus a strict comparison keeps the smallest bucket
    // on ties.
    let mut best: Option<(i64, usize)> = None;
    for (bucket, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((bucket, count));
        }
    }

    best.map(|(bucket, count)| (bucket as f32 / buckets_per_point, count))
}

pub fn mode(values: &[f32], buckets_per_point: f32) -> Option<f32> {
    mode_with_count(values, buckets_per_point).map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_picks_most_frequent() {
        let values = [12.0, 14.4, 14.4, 12.0, 14.4, 30.0];
        assert_eq!(mode_with_count(&values, 100.0), Some((14.4, 3)));
    }

    #[test]
    fn test_mode_tie_goes_to_smallest() {
        let values = [18.0, 12.0, 18.0, 12.0];
        assert_eq!(mode(&values, 100.0), Some(12.0));
    }

    #[test]
    fn test_mode_buckets_noise_together() {
        let values = [2.001, 1.999, 2.0, 5.0, 5.0];
        assert_eq!(mode(&values, 100.0), Some(2.0));
    }

    #[test]
    fn test_mode_empty_and_non_finite() {
        assert_eq!(mode(&[], 100.0), None);
        assert_eq!(mode(&[f32::NAN, f32::INFINITY], 100.0), None);
    }

    #[test]
    fn test_mode_coarse_buckets() {
        let values = [71.8, 72.1, 72.2, 90.0];
        assert_eq!(mode_with_count(&values, 2.0), Some((72.0, 3)));
    }
}
