//! Weighted pass/total bookkeeping.

/// Accumulated weights of examples that passed a selection, out of all examples seen.
///
/// # Examples
///
/// ```
/// use rectcut_stats::weighted::WeightedCount;
///
/// let mut count = WeightedCount::default();
/// count.add(2.0, true);
/// count.add(6.0, false);
/// assert_eq!(count.fraction(), Some(0.25));
///
/// assert_eq!(WeightedCount::default().fraction(), None);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct WeightedCount {
    /// Sum of weights of passing examples.
    pub passed: f64,
    /// Sum of weights of all examples.
    pub total: f64,
}

impl WeightedCount {
    /// Records one example.
    pub fn add(&mut self, weight: f64, passed: bool) {
        self.total += weight;
        if passed {
            self.passed += weight;
        }
    }

    /// Returns `passed / total`, or `None` when the total weight is not positive.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0.0).then(|| self.passed / self.total)
    }
}

impl Extend<(f64, bool)> for WeightedCount {
    fn extend<T: IntoIterator<Item = (f64, bool)>>(&mut self, iter: T) {
        for (weight, passed) in iter {
            self.add(weight, passed);
        }
    }
}

impl FromIterator<(f64, bool)> for WeightedCount {
    fn from_iter<T: IntoIterator<Item = (f64, bool)>>(iter: T) -> Self {
        let mut count = Self::default();
        count.extend(iter);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_weight_total_has_no_fraction() {
        let count: WeightedCount = [(0.0, true), (0.0, false)].into_iter().collect();
        assert_eq!(count.fraction(), None);
    }

    #[test]
    fn test_weights_are_respected() {
        let count: WeightedCount = [(3.0, true), (1.0, false)].into_iter().collect();
        assert_eq!(count.passed, 3.0);
        assert_eq!(count.total, 4.0);
        assert_eq!(count.fraction(), Some(0.75));
    }
}
