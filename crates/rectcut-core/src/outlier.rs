//! Outlier bounds estimation.
//!
//! Each feature's search range is trimmed to the central part of the signal
//! distribution before optimization. With `t` the feature's trim target and the
//! signal values sorted ascending, the limit at fraction `q` is the value at rank
//! `floor(q * n)`:
//!
//! | boundary type | lower                  | upper                  |
//! |---------------|------------------------|------------------------|
//! | upper only    | `-inf`                 | `q = t`                |
//! | lower only    | `q = 1 - t`            | `+inf`                 |
//! | two sided     | `q = (1 - t) / 2`      | `q = (1 + t) / 2`      |
//!
//! Event weights do not enter the ranking.

use rectcut_stats::percentiles;

use crate::{
    bounds::{Bounds, BoundsVector},
    error::{ConfigurationError, Error},
    feature::{BoundaryType, FeatureSpec, FeatureTable},
    sample::Sample,
    state::{LOWER_KEY, PipelineState, UPPER_KEY},
};

/// Computes outlier bounds for every feature from the signal sample.
pub fn estimate_bounds(
    features: &FeatureTable,
    signal: &Sample,
) -> Result<BoundsVector, ConfigurationError> {
    features.check_len("signal sample", signal.feature_count())?;
    let bounds = features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let sorted = percentiles::sorted(signal.column(i));
            let bounds = feature_bounds(feature, &sorted)?;
            tracing::debug!(
                feature = feature.name(),
                boundary = %feature.boundary_type(),
                lower = bounds.lower,
                upper = bounds.upper,
                "outlier bounds"
            );
            Ok(bounds)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BoundsVector::new(bounds))
}

fn feature_bounds(feature: &FeatureSpec, sorted: &[f64]) -> Result<Bounds, ConfigurationError> {
    let t = feature.trim_target();
    let at = |fraction: f64| {
        percentiles::value_at_fraction(sorted, fraction).ok_or_else(|| {
            ConfigurationError::RankOutOfRange {
                feature: feature.name().to_owned(),
                fraction,
                len: sorted.len(),
            }
        })
    };
    let bounds = match feature.boundary_type() {
        BoundaryType::UpperOnly => Bounds::new(f64::NEG_INFINITY, at(t)?),
        BoundaryType::LowerOnly => Bounds::new(at(1.0 - t)?, f64::INFINITY),
        BoundaryType::TwoSided => Bounds::new(at((1.0 - t) / 2.0)?, at((1.0 + t) / 2.0)?),
    };
    Ok(bounds)
}

/// Returns the search range stored in `state`, estimating and storing it first if absent.
///
/// Trimming is idempotent: once [`LOWER_KEY`] and [`UPPER_KEY`] exist they are
/// reused unchanged, whatever produced them. On error the state is untouched.
pub fn trim_outliers(
    state: &mut PipelineState,
    features: &FeatureTable,
    signal: &Sample,
) -> Result<TrimOutcome, Error> {
    if state.contains(LOWER_KEY) && state.contains(UPPER_KEY) {
        let lower = state.limits(LOWER_KEY)?;
        let upper = state.limits(UPPER_KEY)?;
        let bounds = BoundsVector::from_limits(features, &lower, &upper)?;
        return Ok(TrimOutcome::Reused(bounds));
    }
    let bounds = estimate_bounds(features, signal)?;
    state.set_bounds(LOWER_KEY, UPPER_KEY, &bounds);
    Ok(TrimOutcome::Estimated(bounds))
}

/// What [`trim_outliers`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    /// Bounds were already present in the state.
    Reused(BoundsVector),
    /// Bounds were estimated and written to the state.
    Estimated(BoundsVector),
}

impl TrimOutcome {
    #[must_use]
    pub fn bounds(&self) -> &BoundsVector {
        match self {
            Self::Reused(bounds) | Self::Estimated(bounds) => bounds,
        }
    }
}
