use std::{io, path::PathBuf};

use rectcut_core::{ConfigurationError, EvaluationError, IngestError, StateError};

/// Any failure that aborts a pipeline run.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PipelineError {
    #[display("configuration error: {_0}")]
    Configuration(ConfigurationError),
    #[display("state error: {_0}")]
    State(StateError),
    #[display("ingest error: {_0}")]
    Ingest(IngestError),
    #[display("stage '{stage}' requires state key '{key}', which is missing; resume from an earlier stage")]
    ResumeStateMissing { stage: String, key: String },
    #[display("evaluation of working point '{id}' failed: {source}")]
    Evaluation { id: String, source: EvaluationError },
    #[display("failed to read {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ConfigurationError> for PipelineError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<StateError> for PipelineError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<IngestError> for PipelineError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

impl From<rectcut_core::Error> for PipelineError {
    fn from(e: rectcut_core::Error) -> Self {
        match e {
            rectcut_core::Error::Configuration(e) => e.into(),
            rectcut_core::Error::State(e) => e.into(),
            rectcut_core::Error::Ingest(e) => e.into(),
        }
    }
}

impl PipelineError {
    /// Whether this is a malformed configuration rather than a problem with state or files.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
