/// Summary of a set of `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// The smallest value.
    pub min: f64,
    /// The largest value.
    pub max: f64,
    /// The arithmetic mean.
    pub mean: f64,
    /// The population standard deviation.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes statistics over `values`.
    ///
    /// Returns `None` if `values` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use rectcut_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    /// assert_eq!(stats.min, 2.0);
    /// assert_eq!(stats.max, 9.0);
    /// assert_eq!(stats.mean, 5.0);
    /// assert_eq!(stats.std_dev, 2.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}
