//! Weighted example collections.

use rand::{Rng, seq::SliceRandom as _};
use rectcut_stats::weighted::WeightedCount;

use crate::{bounds::Bounds, error::ConfigurationError};

/// One example: feature values aligned with the feature table, plus a weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub values: Vec<f64>,
    pub weight: f64,
}

impl Event {
    /// An event with unit weight.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            weight: 1.0,
        }
    }

    #[must_use]
    pub fn weighted(values: Vec<f64>, weight: f64) -> Self {
        Self { values, weight }
    }
}

/// An ordered, weighted collection of events sharing one feature layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    feature_count: usize,
    events: Vec<Event>,
}

impl Sample {
    /// Creates a sample, rejecting events whose length differs from `feature_count`.
    pub fn new(
        name: impl Into<String>,
        feature_count: usize,
        events: Vec<Event>,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        if let Some((index, event)) = events
            .iter()
            .enumerate()
            .find(|(_, e)| e.values.len() != feature_count)
        {
            return Err(ConfigurationError::RaggedEvent {
                sample: name,
                index,
                expected: feature_count,
                actual: event.values.len(),
            });
        }
        Ok(Self {
            name,
            feature_count,
            events,
        })
    }

    /// Creates a sample whose events are known to match `feature_count`.
    pub(crate) fn from_aligned(name: &str, feature_count: usize, events: Vec<Event>) -> Self {
        debug_assert!(events.iter().all(|e| e.values.len() == feature_count));
        Self {
            name: name.to_owned(),
            feature_count,
            events,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.events.iter().map(|e| e.weight).sum()
    }

    /// All values of one feature, in event order.
    #[must_use]
    pub fn column(&self, feature: usize) -> Vec<f64> {
        self.events.iter().map(|e| e.values[feature]).collect()
    }

    /// Smallest and largest finite value of one feature, if any.
    #[must_use]
    pub fn extent(&self, feature: usize) -> Option<(f64, f64)> {
        self.events
            .iter()
            .map(|e| e.values[feature])
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }

    /// Weighted count of events passing every per-feature interval.
    #[must_use]
    pub fn count_passing(&self, bounds: &[Bounds]) -> WeightedCount {
        self.events
            .iter()
            .map(|e| (e.weight, crate::bounds::passes(bounds, &e.values)))
            .collect()
    }

    /// Draws `train_count` events uniformly at random for training; the rest form the
    /// test subset. Both subsets keep the original event order.
    ///
    /// A `train_count` of zero takes half of the sample.
    pub fn split<R>(&self, train_count: usize, rng: &mut R) -> Result<(Sample, Sample), ConfigurationError>
    where
        R: Rng + ?Sized,
    {
        let train_count = if train_count == 0 {
            self.len() / 2
        } else {
            train_count
        };
        if train_count > self.len() {
            return Err(ConfigurationError::InsufficientEvents {
                sample: self.name.clone(),
                requested: train_count,
                available: self.len(),
            });
        }

        let mut indices = (0..self.len()).collect::<Vec<_>>();
        indices.shuffle(rng);
        let mut in_train = vec![false; self.len()];
        for &i in &indices[..train_count] {
            in_train[i] = true;
        }

        let (train, test): (Vec<_>, Vec<_>) = self
            .events
            .iter()
            .zip(in_train)
            .partition(|(_, is_train)| *is_train);
        let build = |events: Vec<(&Event, bool)>, suffix: &str| Sample {
            name: format!("{}/{suffix}", self.name),
            feature_count: self.feature_count,
            events: events.into_iter().map(|(e, _)| e.clone()).collect(),
        };
        Ok((build(train, "train"), build(test, "test")))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;

    fn sample(n: usize) -> Sample {
        #[expect(clippy::cast_precision_loss)]
        let events = (0..n).map(|i| Event::new(vec![i as f64])).collect();
        Sample::new("signal", 1, events).unwrap()
    }

    #[test]
    fn test_ragged_events_are_rejected() {
        let err = Sample::new(
            "background",
            2,
            vec![Event::new(vec![1.0, 2.0]), Event::new(vec![1.0])],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::RaggedEvent {
                sample: "background".to_owned(),
                index: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_split_is_disjoint_and_ordered() {
        let s = sample(100);
        let mut rng = Pcg64::seed_from_u64(1);
        let (train, test) = s.split(30, &mut rng).unwrap();
        assert_eq!(train.len(), 30);
        assert_eq!(test.len(), 70);
        let train_values = train.column(0);
        let test_values = test.column(0);
        assert!(train_values.is_sorted());
        assert!(test_values.is_sorted());
        assert!(train_values.iter().all(|v| !test_values.contains(v)));
    }

    #[test]
    fn test_split_is_deterministic_for_a_seed() {
        let s = sample(50);
        let a = s.split(10, &mut Pcg64::seed_from_u64(9)).unwrap();
        let b = s.split(10, &mut Pcg64::seed_from_u64(9)).unwrap();
        let c = s.split(10, &mut Pcg64::seed_from_u64(10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn test_split_defaults_to_half_and_rejects_oversized_requests() {
        let s = sample(11);
        let mut rng = Pcg64::seed_from_u64(0);
        let (train, test) = s.split(0, &mut rng).unwrap();
        assert_eq!((train.len(), test.len()), (5, 6));
        assert!(matches!(
            s.split(12, &mut rng),
            Err(ConfigurationError::InsufficientEvents { requested: 12, available: 11, .. })
        ));
    }

    #[test]
    fn test_count_passing_uses_weights() {
        let s = Sample::new(
            "signal",
            1,
            vec![
                Event::weighted(vec![0.5], 2.0),
                Event::weighted(vec![1.5], 1.0),
                Event::weighted(vec![f64::NAN], 1.0),
            ],
        )
        .unwrap();
        let count = s.count_passing(&[Bounds::new(0.0, 1.0)]);
        assert_eq!(count.passed, 2.0);
        assert_eq!(count.total, 4.0);
        assert_eq!(s.extent(0), Some((0.5, 1.5)));
    }
}
