//! Realized performance of a cut set on independent data.

use serde::{Deserialize, Serialize};

use crate::{
    bounds::BoundsVector,
    error::{EvaluationError, SampleClass},
    sample::Sample,
};

/// Signal efficiency and background rejection of one cut set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub signal_efficiency: f64,
    pub background_rejection: f64,
}

/// Measures `cuts` on a signal and a background sample.
///
/// Efficiencies are weighted pass fractions over the whole sample (the base
/// selection is applied upstream). An empty or zero-weight sample is an error,
/// never a `NaN`.
pub fn evaluate(
    cuts: &BoundsVector,
    signal: &Sample,
    background: &Sample,
) -> Result<Performance, EvaluationError> {
    let signal_efficiency = pass_fraction(cuts, signal, SampleClass::Signal)?;
    let background_efficiency = pass_fraction(cuts, background, SampleClass::Background)?;
    Ok(Performance {
        signal_efficiency,
        background_rejection: 1.0 - background_efficiency,
    })
}

/// Weighted fraction of `sample` passing every cut.
pub fn pass_fraction(
    cuts: &BoundsVector,
    sample: &Sample,
    class: SampleClass,
) -> Result<f64, EvaluationError> {
    let count = sample.count_passing(cuts.as_slice());
    count
        .fraction()
        .ok_or(EvaluationError::EmptyBaseSelection {
            class,
            total_weight: count.total,
        })
}
