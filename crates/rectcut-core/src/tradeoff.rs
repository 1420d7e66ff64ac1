//! The signal-efficiency / background-rejection frontier.

use serde::{Deserialize, Serialize};

use crate::{
    bounds::{Bounds, BoundsVector},
    evaluate::Performance,
};

/// One point of the frontier and the cut set that achieves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffPoint {
    /// Signal efficiency on the sample the point was optimized on.
    pub signal_efficiency: f64,
    /// Background rejection on the sample the point was optimized on.
    pub background_rejection: f64,
    pub cuts: BoundsVector,
    /// Performance of the same cuts on held-out events, when any were available.
    pub test: Option<Performance>,
}

/// How cuts are read off the curve between two frontier points.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Interpolate each finite cut side linearly in signal efficiency. Infinite
    /// sides take the value of the endpoint nearer in efficiency.
    #[default]
    Linear,
    /// Take the frontier point nearest in efficiency (ties go to the looser point).
    Nearest,
}

/// Frontier points in strictly increasing signal efficiency and strictly
/// decreasing background rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeoffCurve {
    points: Vec<TradeoffPoint>,
}

impl TradeoffCurve {
    /// Builds the frontier from arbitrary candidates, dropping dominated ones.
    ///
    /// A candidate survives only if no other candidate has at least its efficiency
    /// and at least its rejection. Candidates with non-finite coordinates are ignored.
    #[must_use]
    pub fn from_candidates(candidates: Vec<TradeoffPoint>) -> Self {
        let mut candidates = candidates
            .into_iter()
            .filter(|p| p.signal_efficiency.is_finite() && p.background_rejection.is_finite())
            .collect::<Vec<_>>();
        candidates.sort_by(|a, b| {
            b.signal_efficiency
                .total_cmp(&a.signal_efficiency)
                .then(b.background_rejection.total_cmp(&a.background_rejection))
        });

        let mut best_rejection = f64::NEG_INFINITY;
        let mut points = vec![];
        for point in candidates {
            if point.background_rejection > best_rejection {
                best_rejection = point.background_rejection;
                points.push(point);
            }
        }
        points.reverse();
        Self { points }
    }

    #[must_use]
    pub fn points(&self) -> &[TradeoffPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cuts at `target` signal efficiency.
    ///
    /// Targets outside the curve's efficiency range clamp to the nearest end.
    /// Returns `None` for an empty curve.
    #[must_use]
    pub fn cuts_at(&self, target: f64, mode: Interpolation) -> Option<BoundsVector> {
        let (lo, hi, t) = self.bracket(target)?;
        let cuts = match mode {
            _ if t <= 0.0 => lo.cuts.clone(),
            _ if t >= 1.0 => hi.cuts.clone(),
            Interpolation::Nearest if t < 0.5 => lo.cuts.clone(),
            Interpolation::Nearest => hi.cuts.clone(),
            Interpolation::Linear => BoundsVector::new(
                lo.cuts
                    .as_slice()
                    .iter()
                    .zip(hi.cuts.as_slice())
                    .map(|(a, b)| {
                        Bounds::new(lerp_side(a.lower, b.lower, t), lerp_side(a.upper, b.upper, t))
                    })
                    .collect(),
            ),
        };
        Some(cuts)
    }

    /// Background rejection at `target`, interpolated linearly and clamped to the ends.
    #[must_use]
    pub fn rejection_at(&self, target: f64) -> Option<f64> {
        let (lo, hi, t) = self.bracket(target)?;
        Some(lo.background_rejection + (hi.background_rejection - lo.background_rejection) * t)
    }

    /// `count` evenly spaced `(efficiency, rejection)` samples spanning the curve.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn resample(&self, count: usize) -> Vec<(f64, f64)> {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return vec![];
        };
        if count < 2 || self.points.len() < 2 {
            return self
                .points
                .iter()
                .map(|p| (p.signal_efficiency, p.background_rejection))
                .collect();
        }
        let span = last.signal_efficiency - first.signal_efficiency;
        (0..count)
            .filter_map(|i| {
                let eff = first.signal_efficiency + span * (i as f64) / ((count - 1) as f64);
                self.rejection_at(eff).map(|rej| (eff, rej))
            })
            .collect()
    }

    /// The two points around `target` and the position of `target` between them (0..=1).
    fn bracket(&self, target: f64) -> Option<(&TradeoffPoint, &TradeoffPoint, f64)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if target <= first.signal_efficiency {
            return Some((first, first, 0.0));
        }
        if target >= last.signal_efficiency {
            return Some((last, last, 1.0));
        }
        let hi_idx = self
            .points
            .partition_point(|p| p.signal_efficiency < target);
        let lo = &self.points[hi_idx - 1];
        let hi = &self.points[hi_idx];
        let t = (target - lo.signal_efficiency) / (hi.signal_efficiency - lo.signal_efficiency);
        Some((lo, hi, t))
    }
}

fn lerp_side(a: f64, b: f64, t: f64) -> f64 {
    if a.is_finite() && b.is_finite() {
        a + (b - a) * t
    } else if t < 0.5 {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(eff: f64, rej: f64, upper: f64) -> TradeoffPoint {
        TradeoffPoint {
            signal_efficiency: eff,
            background_rejection: rej,
            cuts: BoundsVector::new(vec![Bounds::new(f64::NEG_INFINITY, upper)]),
            test: None,
        }
    }

    fn curve() -> TradeoffCurve {
        TradeoffCurve::from_candidates(vec![
            point(0.5, 0.95, 1.0),
            point(0.9, 0.6, 3.0),
            point(0.7, 0.8, 2.0),
            point(1.0, 0.0, f64::INFINITY),
        ])
    }

    #[test]
    fn test_dominated_candidates_are_dropped() {
        let curve = TradeoffCurve::from_candidates(vec![
            point(0.5, 0.9, 1.0),
            point(0.4, 0.85, 0.9),  // dominated by (0.5, 0.9)
            point(0.5, 0.7, 1.1),   // same efficiency, worse rejection
            point(0.8, 0.9, 2.0),   // dominates (0.5, 0.9)
            point(0.9, 0.3, 3.0),
            point(f64::NAN, 1.0, 0.0),
        ]);
        let effs = curve.points().iter().map(|p| p.signal_efficiency).collect::<Vec<_>>();
        assert_eq!(effs, vec![0.8, 0.9]);
    }

    #[test]
    fn test_curve_is_monotone() {
        let curve = curve();
        for pair in curve.points().windows(2) {
            assert!(pair[1].signal_efficiency > pair[0].signal_efficiency);
            assert!(pair[1].background_rejection <= pair[0].background_rejection);
        }
    }

    #[test]
    fn test_linear_interpolation() {
        let cuts = curve().cuts_at(0.8, Interpolation::Linear).unwrap();
        assert!((cuts.get(0).unwrap().upper - 2.5).abs() < 1e-12);
        assert_eq!(cuts.get(0).unwrap().lower, f64::NEG_INFINITY);
        assert_eq!(curve().cuts_at(0.7, Interpolation::Linear).unwrap().get(0).unwrap().upper, 2.0);
    }

    #[test]
    fn test_nearest_point() {
        let curve = curve();
        assert_eq!(curve.cuts_at(0.75, Interpolation::Nearest).unwrap().get(0).unwrap().upper, 2.0);
        assert_eq!(curve.cuts_at(0.85, Interpolation::Nearest).unwrap().get(0).unwrap().upper, 3.0);
    }

    #[test]
    fn test_infinite_sides_follow_the_nearer_endpoint() {
        let curve = curve();
        assert_eq!(curve.cuts_at(0.92, Interpolation::Linear).unwrap().get(0).unwrap().upper, 3.0);
        assert_eq!(
            curve.cuts_at(0.98, Interpolation::Linear).unwrap().get(0).unwrap().upper,
            f64::INFINITY
        );
        assert_eq!(
            curve.cuts_at(1.0, Interpolation::Linear).unwrap().get(0).unwrap().upper,
            f64::INFINITY
        );
    }

    #[test]
    fn test_targets_clamp_to_the_ends() {
        let curve = curve();
        assert_eq!(curve.cuts_at(0.1, Interpolation::Linear).unwrap().get(0).unwrap().upper, 1.0);
        assert_eq!(curve.rejection_at(0.1), Some(0.95));
        assert_eq!(curve.rejection_at(2.0), Some(0.0));
        assert!(TradeoffCurve::from_candidates(vec![]).cuts_at(0.5, Interpolation::Linear).is_none());
    }

    #[test]
    fn test_resample_spans_the_curve() {
        let samples = curve().resample(6);
        assert_eq!(samples.len(), 6);
        assert_eq!(samples[0], (0.5, 0.95));
        assert!((samples[5].0 - 1.0).abs() < 1e-12);
        for pair in samples.windows(2) {
            assert!(pair[1].1 <= pair[0].1);
        }
    }
}
