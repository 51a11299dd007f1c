//! Robust order statistics over view counts.
//!
//! View counts are heavy-tailed, so everything here is rank-based (trimmed
//! median, nearest-rank percentiles) or log-space (geometric mean).

/// Sort a vector of finite values ascending.
pub fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

/// Bounds `[lo, hi)` of the 10%/90% trimmed slice of `n` sorted values.
///
/// `lo = floor(n * 0.1)` and `hi = ceil(n * 0.9)`, computed in integer
/// arithmetic so exact multiples of ten never round the wrong way.
/// For `n >= 1` the slice always holds at least one element.
pub fn trimmed_bounds(n: usize) -> (usize, usize) {
    let lo = n / 10;
    let hi = (9 * n).div_ceil(10);
    (lo, hi)
}

/// Median of the 10%/90% trimmed slice of an ascending-sorted list.
///
/// Picks `trimmed[len / 2]` (upper median for even lengths). Returns `None`
/// for an empty input.
pub fn trimmed_median(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let (lo, hi) = trimmed_bounds(sorted.len());
    let trimmed = &sorted[lo..hi];
    trimmed.get(trimmed.len() / 2).copied()
}

/// Nearest-rank percentile at `floor(n * fraction)` of an ascending list.
pub fn nearest_rank(sorted: &[f64], fraction: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let index = (sorted.len() as f64 * fraction).floor() as usize;
    sorted.get(index.min(sorted.len() - 1)).copied()
}

/// Geometric mean `exp(mean(ln v))` of strictly positive values.
///
/// Non-positive or non-finite values are ignored. Returns `None` when no
/// usable value remains.
pub fn geometric_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite() && **v > 0.0)
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v.ln(), count + 1));
    if count == 0 {
        return None;
    }
    Some((sum / count as f64).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_slice_never_empty() {
        for n in 1..=500 {
            let (lo, hi) = trimmed_bounds(n);
            assert!(hi > lo, "n = {n} produced an empty slice");
            assert!(hi <= n);
        }
    }

    #[test]
    fn trimmed_bounds_match_float_definition() {
        for n in 1..=200_usize {
            let (lo, hi) = trimmed_bounds(n);
            assert_eq!(lo, (n as f64 * 0.1).floor() as usize);
            // Float ceil of 0.9n can overshoot by one when 0.9n is integral,
            // so compare against the exact rational ceiling.
            assert_eq!(hi, (9 * n + 9) / 10);
        }
    }

    #[test]
    fn trimmed_bounds_small_inputs() {
        assert_eq!(trimmed_bounds(1), (0, 1));
        assert_eq!(trimmed_bounds(3), (0, 3));
        assert_eq!(trimmed_bounds(10), (1, 9));
        assert_eq!(trimmed_bounds(40), (4, 36));
    }

    #[test]
    fn trimmed_median_single_value() {
        assert_eq!(trimmed_median(&[42.0]), Some(42.0));
    }

    #[test]
    fn trimmed_median_empty() {
        assert_eq!(trimmed_median(&[]), None);
    }

    #[test]
    fn trimmed_median_ignores_outliers() {
        let mut values: Vec<f64> = (1..=9).map(|v| v as f64 * 100.0).collect();
        values.push(1_000_000.0);
        sort_ascending(&mut values);
        // Trimmed slice is [200..=900], index 4 of 8 -> 600.
        assert_eq!(trimmed_median(&values), Some(600.0));
    }

    #[test]
    fn nearest_rank_positions() {
        let values: Vec<f64> = (0..20).map(|v| v as f64).collect();
        assert_eq!(nearest_rank(&values, 0.1), Some(2.0));
        assert_eq!(nearest_rank(&values, 0.25), Some(5.0));
        assert_eq!(nearest_rank(&values, 0.5), Some(10.0));
        assert_eq!(nearest_rank(&values, 0.75), Some(15.0));
        assert_eq!(nearest_rank(&values, 0.9), Some(18.0));
        assert_eq!(nearest_rank(&values, 1.0), Some(19.0));
        assert_eq!(nearest_rank(&[], 0.5), None);
    }

    #[test]
    fn geometric_mean_of_powers_of_ten() {
        let gm = geometric_mean(&[100.0, 10_000.0]).unwrap();
        assert!((gm - 1_000.0).abs() < 1e-6);
    }

    #[test]
    fn geometric_mean_resists_outliers() {
        let values = [1_000.0, 1_000.0, 1_000.0, 1_000_000.0];
        let gm = geometric_mean(&values).unwrap();
        let arithmetic = values.iter().sum::<f64>() / values.len() as f64;
        assert!(gm < arithmetic / 40.0);
    }

    #[test]
    fn geometric_mean_skips_non_positive() {
        assert_eq!(geometric_mean(&[0.0, -5.0]), None);
        assert_eq!(geometric_mean(&[]), None);
    }
}
