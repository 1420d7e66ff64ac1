//! Rank-based lookups on sorted samples.
//!
//! All lookups use the truncating rank `floor(fraction * n)`. A rank that falls
//! outside `[0, n)` is reported as `None` instead of being clamped, so callers can
//! turn it into a configuration error.

/// Returns the zero-based rank `floor(fraction * len)`.
///
/// Returns `None` if `fraction` is negative or not finite, or if the rank is not
/// a valid index into a slice of length `len`.
///
/// # Examples
///
/// ```
/// use rectcut_stats::percentiles::rank_index;
///
/// assert_eq!(rank_index(10, 0.0), Some(0));
/// assert_eq!(rank_index(10, 0.25), Some(2));
/// assert_eq!(rank_index(10, 0.95), Some(9));
/// assert_eq!(rank_index(10, 1.0), None);
/// assert_eq!(rank_index(0, 0.5), None);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn rank_index(len: usize, fraction: f64) -> Option<usize> {
    if !fraction.is_finite() || fraction < 0.0 {
        return None;
    }
    let rank = (len as f64 * fraction).floor();
    if rank >= len as f64 {
        return None;
    }
    Some(rank as usize)
}

/// Returns the value at rank `floor(fraction * n)` of an ascending slice.
///
/// # Panics
///
/// Panics if `sorted_values` is not sorted in ascending order.
///
/// # Examples
///
/// ```
/// use rectcut_stats::percentiles::value_at_fraction;
///
/// let values = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(value_at_fraction(&values, 0.5), Some(3.0));
/// assert_eq!(value_at_fraction(&values, 0.99), Some(4.0));
/// assert_eq!(value_at_fraction(&values, 1.0), None);
/// ```
#[must_use]
pub fn value_at_fraction(sorted_values: &[f64], fraction: f64) -> Option<f64> {
    assert!(
        sorted_values.is_sorted_by(|a, b| a.total_cmp(b).is_le()),
        "values must be sorted in ascending order"
    );
    rank_index(sorted_values.len(), fraction).map(|idx| sorted_values[idx])
}

/// Collects values into a vector sorted by [`f64::total_cmp`].
#[must_use]
pub fn sorted<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort_by(f64::total_cmp);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_truncates() {
        // 0.975 * 7 = 6.825
        assert_eq!(rank_index(7, 0.975), Some(6));
        // 0.025 * 7 = 0.175
        assert_eq!(rank_index(7, 0.025), Some(0));
    }

    #[test]
    fn test_rank_rejects_invalid_fractions() {
        assert_eq!(rank_index(10, -0.1), None);
        assert_eq!(rank_index(10, f64::NAN), None);
        assert_eq!(rank_index(10, f64::INFINITY), None);
        assert_eq!(rank_index(10, 1.5), None);
    }

    #[test]
    fn test_sorted_handles_negative_zero_and_infinities() {
        let values = sorted([3.0, f64::NEG_INFINITY, -0.0, 0.0, f64::INFINITY]);
        assert_eq!(values[0], f64::NEG_INFINITY);
        assert!(values[1].is_sign_negative());
        assert_eq!(values[4], f64::INFINITY);
    }

    #[test]
    #[should_panic(expected = "sorted")]
    fn test_unsorted_input_panics() {
        let _ = value_at_fraction(&[2.0, 1.0], 0.5);
    }
}
