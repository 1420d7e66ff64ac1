//! The stages of a calibration run.
//!
//! Stages run in a fixed order: `trim`, one `optimize:<id>` per working point in
//! configuration order, then `evaluate`. Each stage reads the state it needs,
//! checks that its keys exist, and returns the next state without touching the
//! one it was given, so a failing stage leaves nothing half-written.

use rectcut_core::{
    BoundsVector, PipelineState, TradeoffCurve,
    evaluate::{Performance, evaluate},
    outlier::{TrimOutcome, trim_outliers},
    state::{LOWER_KEY, UPPER_KEY, lower_key, upper_key},
    working_point::{WorkingPoint, WorkingPointSpec, extract_working_point},
};
use rectcut_optimizer::optimize;
use serde::Serialize;

use crate::{config::PipelineInputs, error::PipelineError};

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Outlier trimming of the search range.
    Trim,
    /// Optimization and extraction of one working point.
    Optimize(WorkingPointSpec),
    /// Performance of every working point on independent samples.
    Evaluate,
}

/// Stages of a run over `working_points`, in execution order.
#[must_use]
pub fn plan(working_points: &[WorkingPointSpec]) -> Vec<Stage> {
    let mut stages = vec![Stage::Trim];
    stages.extend(working_points.iter().cloned().map(Stage::Optimize));
    stages.push(Stage::Evaluate);
    stages
}

/// Performance of one working point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkingPointEvaluation {
    pub id: String,
    pub target_efficiency: f64,
    #[serde(flatten)]
    pub performance: Performance,
}

/// What a completed stage produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Trimmed(TrimOutcome),
    /// The search range was set from the configured initial bounds.
    Configured(BoundsVector),
    Optimized {
        working_point: WorkingPoint,
        curve: TradeoffCurve,
        seed: u64,
    },
    /// The working point was already in the state and only re-chained.
    Reused(WorkingPoint),
    Evaluated(Vec<WorkingPointEvaluation>),
}

impl Stage {
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Trim => "trim".to_owned(),
            Self::Optimize(spec) => format!("optimize:{}", spec.id()),
            Self::Evaluate => "evaluate".to_owned(),
        }
    }

    /// State keys that must exist before the stage can run.
    #[must_use]
    pub fn required_keys(&self, working_points: &[WorkingPointSpec]) -> Vec<String> {
        match self {
            Self::Trim => vec![],
            Self::Optimize(_) => vec![LOWER_KEY.to_owned(), UPPER_KEY.to_owned()],
            Self::Evaluate => working_points
                .iter()
                .flat_map(|wp| [lower_key(wp.id()), upper_key(wp.id())])
                .collect(),
        }
    }

    pub fn check_preconditions(
        &self,
        state: &PipelineState,
        working_points: &[WorkingPointSpec],
    ) -> Result<(), PipelineError> {
        match self
            .required_keys(working_points)
            .into_iter()
            .find(|key| !state.contains(key))
        {
            Some(key) => Err(PipelineError::ResumeStateMissing {
                stage: self.name(),
                key,
            }),
            None => Ok(()),
        }
    }

    /// Runs the stage on a copy of `state` and returns the new state.
    pub fn run(
        &self,
        inputs: &PipelineInputs,
        state: &PipelineState,
    ) -> Result<(PipelineState, StageOutput), PipelineError> {
        self.check_preconditions(state, &inputs.working_points)?;
        let mut next = state.clone();
        let output = match self {
            Self::Trim => run_trim(inputs, &mut next)?,
            Self::Optimize(spec) => run_optimize(inputs, spec, &mut next)?,
            Self::Evaluate => StageOutput::Evaluated(run_evaluate(inputs, &next)?),
        };
        Ok((next, output))
    }
}

fn run_trim(inputs: &PipelineInputs, state: &mut PipelineState) -> Result<StageOutput, PipelineError> {
    let present = state.contains(LOWER_KEY) && state.contains(UPPER_KEY);
    if let (false, Some(bounds)) = (present, &inputs.initial_bounds) {
        state.set_bounds(LOWER_KEY, UPPER_KEY, bounds);
        tracing::info!("search range taken from the configured initial bounds");
        return Ok(StageOutput::Configured(bounds.clone()));
    }
    let outcome = trim_outliers(state, &inputs.features, &inputs.signal)?;
    match &outcome {
        TrimOutcome::Reused(_) => tracing::info!("search range already present; trimming skipped"),
        TrimOutcome::Estimated(_) => tracing::info!("search range estimated from the signal sample"),
    }
    Ok(StageOutput::Trimmed(outcome))
}

fn run_optimize(
    inputs: &PipelineInputs,
    spec: &WorkingPointSpec,
    state: &mut PipelineState,
) -> Result<StageOutput, PipelineError> {
    let features = &inputs.features;
    if state.contains(&lower_key(spec.id())) && state.contains(&upper_key(spec.id())) {
        let working_point = WorkingPoint::from_state(spec, features, state)?;
        state.set_bounds(LOWER_KEY, UPPER_KEY, &working_point.cuts);
        tracing::info!(id = spec.id(), "working point already present; optimization skipped");
        return Ok(StageOutput::Reused(working_point));
    }

    let lower = state.limits(LOWER_KEY)?;
    let upper = state.limits(UPPER_KEY)?;
    let search = BoundsVector::from_limits(features, &lower, &upper)?;
    let result = optimize(
        &inputs.optimizer,
        features,
        &search,
        &inputs.signal,
        &inputs.background,
    )?;
    let working_point =
        extract_working_point(&result.curve, spec, features, inputs.extraction, state)?;
    Ok(StageOutput::Optimized {
        working_point,
        curve: result.curve,
        seed: result.seed,
    })
}

fn run_evaluate(
    inputs: &PipelineInputs,
    state: &PipelineState,
) -> Result<Vec<WorkingPointEvaluation>, PipelineError> {
    let (signal, background) = match &inputs.evaluation {
        Some((signal, background)) => (signal, background),
        None => {
            tracing::warn!(
                "no independent evaluation samples configured; evaluating on the optimization samples"
            );
            (&inputs.signal, &inputs.background)
        }
    };
    inputs
        .working_points
        .iter()
        .map(|spec| {
            let working_point = WorkingPoint::from_state(spec, &inputs.features, state)?;
            let performance = evaluate(&working_point.cuts, signal, background).map_err(
                |source| PipelineError::Evaluation {
                    id: spec.id().to_owned(),
                    source,
                },
            )?;
            tracing::info!(
                id = spec.id(),
                signal_efficiency = performance.signal_efficiency,
                background_rejection = performance.background_rejection,
                "working point evaluated"
            );
            Ok(WorkingPointEvaluation {
                id: spec.id().to_owned(),
                target_efficiency: spec.target_efficiency(),
                performance,
            })
        })
        .collect()
}
