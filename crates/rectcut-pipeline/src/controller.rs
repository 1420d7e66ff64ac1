//! Sequential, resumable execution of the stage plan.

use std::path::{Path, PathBuf};

use rectcut_core::{ConfigurationError, PipelineState, StateError, working_point::WorkingPoint};

use crate::{
    config::PipelineInputs,
    error::PipelineError,
    report::PipelineReport,
    stage::{Stage, plan},
};

/// Where the pipeline state lives between stages and between runs.
pub trait StateStore {
    fn load(&mut self) -> Result<PipelineState, StateError>;
    fn save(&mut self, state: &PipelineState) -> Result<(), StateError>;
}

/// JSON snapshot on disk. A missing file is an empty state.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&mut self) -> Result<PipelineState, StateError> {
        PipelineState::load_or_default(&self.path)
    }

    fn save(&mut self, state: &PipelineState) -> Result<(), StateError> {
        state.save(&self.path)?;
        tracing::debug!(path = %self.path.display(), "pipeline state saved");
        Ok(())
    }
}

/// Keeps the state in memory; counts saves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    pub state: PipelineState,
    pub saves: usize,
}

impl StateStore for MemoryStateStore {
    fn load(&mut self) -> Result<PipelineState, StateError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &PipelineState) -> Result<(), StateError> {
        self.state = state.clone();
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Pipeline<'a> {
    inputs: &'a PipelineInputs,
    stages: Vec<Stage>,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(inputs: &'a PipelineInputs) -> Self {
        Self {
            inputs,
            stages: plan(&inputs.working_points),
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage from index `start` on, saving the state after each one.
    ///
    /// Earlier stages are not run; their results must already be in the stored
    /// state. A stage that fails leaves the stored state as the previous stage
    /// saved it.
    pub fn run<S>(&self, store: &mut S, start: usize) -> Result<PipelineReport, PipelineError>
    where
        S: StateStore + ?Sized,
    {
        if start >= self.stages.len() {
            return Err(ConfigurationError::ResumeStageOutOfRange {
                stage: start,
                count: self.stages.len(),
            }
            .into());
        }

        let mut state = store.load()?;
        let mut report = PipelineReport::default();
        for (index, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            if index < start {
                tracing::info!(index, stage = %name, "stage skipped (resuming later)");
                report.skipped.push(name);
                continue;
            }
            tracing::info!(index, stage = %name, "stage started");
            let (next, output) = stage.run(self.inputs, &state)?;
            store.save(&next)?;
            state = next;
            report.record(output);
            tracing::info!(index, stage = %name, "stage finished");
        }

        report.working_points = self
            .inputs
            .working_points
            .iter()
            .filter_map(|spec| WorkingPoint::from_state(spec, &self.inputs.features, &state).ok())
            .collect();
        Ok(report)
    }
}
