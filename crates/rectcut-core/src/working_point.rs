//! Working-point extraction from a trade-off curve.

use serde::{Deserialize, Serialize};

use crate::{
    bounds::BoundsVector,
    error::{ConfigurationError, Error},
    feature::FeatureTable,
    state::{LOWER_KEY, PipelineState, UPPER_KEY, lower_key, upper_key},
    tradeoff::{Interpolation, TradeoffCurve},
};

/// A named target signal efficiency.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingPointSpec {
    id: String,
    target_efficiency: f64,
}

impl WorkingPointSpec {
    /// Fails unless `0 < target_efficiency <= 1`.
    pub fn new(id: impl Into<String>, target_efficiency: f64) -> Result<Self, ConfigurationError> {
        let id = id.into();
        if !(target_efficiency > 0.0 && target_efficiency <= 1.0) {
            return Err(ConfigurationError::InvalidTargetEfficiency {
                id,
                target: target_efficiency,
            });
        }
        Ok(Self {
            id,
            target_efficiency,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn target_efficiency(&self) -> f64 {
        self.target_efficiency
    }
}

/// The cuts chosen for one [`WorkingPointSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingPoint {
    pub id: String,
    pub target_efficiency: f64,
    pub cuts: BoundsVector,
}

impl WorkingPoint {
    /// Reads the cuts a previous extraction stored for `spec`.
    pub fn from_state(
        spec: &WorkingPointSpec,
        features: &FeatureTable,
        state: &PipelineState,
    ) -> Result<Self, Error> {
        let lower = state.limits(&lower_key(spec.id()))?;
        let upper = state.limits(&upper_key(spec.id()))?;
        Ok(Self {
            id: spec.id().to_owned(),
            target_efficiency: spec.target_efficiency(),
            cuts: BoundsVector::from_limits(features, &lower, &upper)?,
        })
    }
}

/// Reads the cuts at the working point's target off `curve` and records them.
///
/// Sides the feature's boundary type leaves unconstrained are forced to infinity.
/// The cuts are written under `<id>_lower` / `<id>_upper` and also replace the
/// current search range, so the next working point searches inside this one.
pub fn extract_working_point(
    curve: &TradeoffCurve,
    spec: &WorkingPointSpec,
    features: &FeatureTable,
    mode: Interpolation,
    state: &mut PipelineState,
) -> Result<WorkingPoint, ConfigurationError> {
    let cuts = curve
        .cuts_at(spec.target_efficiency(), mode)
        .ok_or_else(|| ConfigurationError::EmptyTradeoffCurve {
            id: spec.id().to_owned(),
        })?;
    features.check_len("curve cuts", cuts.len())?;
    let cuts = cuts.relax_unconstrained(features);

    state.set_bounds(&lower_key(spec.id()), &upper_key(spec.id()), &cuts);
    state.set_bounds(LOWER_KEY, UPPER_KEY, &cuts);
    tracing::info!(
        id = spec.id(),
        target = spec.target_efficiency(),
        "working point extracted"
    );

    Ok(WorkingPoint {
        id: spec.id().to_owned(),
        target_efficiency: spec.target_efficiency(),
        cuts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bounds::Bounds,
        feature::{BoundaryType, FeatureSpec},
        tradeoff::TradeoffPoint,
    };

    fn features() -> FeatureTable {
        FeatureTable::new(vec![
            FeatureSpec::new("pt", BoundaryType::LowerOnly, 0.95).unwrap(),
            FeatureSpec::new("iso", BoundaryType::UpperOnly, 0.95).unwrap(),
        ])
        .unwrap()
    }

    fn curve() -> TradeoffCurve {
        let point = |eff: f64, rej: f64, pt: f64, iso: f64| TradeoffPoint {
            signal_efficiency: eff,
            background_rejection: rej,
            // Unconstrained sides carry finite junk to check that extraction relaxes them.
            cuts: BoundsVector::new(vec![Bounds::new(pt, 100.0), Bounds::new(-5.0, iso)]),
            test: None,
        };
        TradeoffCurve::from_candidates(vec![
            point(0.6, 0.9, 20.0, 0.1),
            point(0.8, 0.7, 10.0, 0.2),
            TradeoffPoint {
                signal_efficiency: 1.0,
                background_rejection: 0.0,
                cuts: BoundsVector::open(2),
                test: None,
            },
        ])
    }

    #[test]
    fn test_target_efficiency_is_validated() {
        assert!(WorkingPointSpec::new("loose", 1.0).is_ok());
        for target in [0.0, -0.1, 1.01, f64::NAN] {
            assert!(matches!(
                WorkingPointSpec::new("bad", target),
                Err(ConfigurationError::InvalidTargetEfficiency { .. })
            ));
        }
    }

    #[test]
    fn test_extraction_writes_and_chains() {
        let features = features();
        let mut state = PipelineState::new();
        let spec = WorkingPointSpec::new("tight", 0.7).unwrap();
        let wp = extract_working_point(&curve(), &spec, &features, Interpolation::Linear, &mut state)
            .unwrap();

        let pt = wp.cuts.get(0).unwrap();
        let iso = wp.cuts.get(1).unwrap();
        assert!((pt.lower - 15.0).abs() < 1e-12);
        assert_eq!(pt.upper, f64::INFINITY);
        assert_eq!(iso.lower, f64::NEG_INFINITY);
        assert!((iso.upper - 0.15).abs() < 1e-12);

        assert_eq!(state.limits("tight_lower").unwrap(), wp.cuts.lower_limits());
        assert_eq!(state.limits("tight_upper").unwrap(), wp.cuts.upper_limits());
        assert_eq!(state.limits(LOWER_KEY).unwrap(), wp.cuts.lower_limits());
        assert_eq!(state.limits(UPPER_KEY).unwrap(), wp.cuts.upper_limits());

        let reloaded = WorkingPoint::from_state(&spec, &features, &state).unwrap();
        assert_eq!(reloaded, wp);
    }

    #[test]
    fn test_full_efficiency_leaves_upper_only_open() {
        let features = features();
        let mut state = PipelineState::new();
        let spec = WorkingPointSpec::new("all", 1.0).unwrap();
        let wp = extract_working_point(&curve(), &spec, &features, Interpolation::Nearest, &mut state)
            .unwrap();
        assert_eq!(wp.cuts.get(1).unwrap().upper, f64::INFINITY);
        assert_eq!(wp.cuts.get(0).unwrap().lower, f64::NEG_INFINITY);
    }

    #[test]
    fn test_empty_curve_is_an_error() {
        let mut state = PipelineState::new();
        let spec = WorkingPointSpec::new("tight", 0.5).unwrap();
        let err = extract_working_point(
            &TradeoffCurve::from_candidates(vec![]),
            &spec,
            &features(),
            Interpolation::Linear,
            &mut state,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::EmptyTradeoffCurve {
                id: "tight".to_owned()
            }
        );
        assert!(!state.contains(LOWER_KEY));
    }

    #[test]
    fn test_missing_working_point_in_state() {
        let spec = WorkingPointSpec::new("medium", 0.5).unwrap();
        let err = WorkingPoint::from_state(&spec, &features(), &PipelineState::new()).unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }
}
