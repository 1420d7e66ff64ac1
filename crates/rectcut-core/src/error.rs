use std::{io, path::PathBuf};

/// A malformed configuration detected at stage entry.
///
/// These are never retried: rerunning with the same inputs fails the same way.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigurationError {
    #[display("inconsistent sizes: {table} has {actual} entries but {expected} features are configured")]
    LengthMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[display("feature '{feature}': unknown boundary type '{code}' (expected upper_only/0, lower_only/1 or two_sided/2)")]
    UnknownBoundaryType { feature: String, code: String },
    #[display("limits on '{feature}': {lower} >= {upper}")]
    InvertedBounds {
        feature: String,
        lower: f64,
        upper: f64,
    },
    #[display("feature '{feature}': trim target {trim_target} is outside (0, 1)")]
    TrimTargetOutOfRange { feature: String, trim_target: f64 },
    #[display("feature '{feature}': rank for fraction {fraction} is outside [0, {len})")]
    RankOutOfRange {
        feature: String,
        fraction: f64,
        len: usize,
    },
    #[display("working point '{id}': target efficiency {target} is outside (0, 1]")]
    InvalidTargetEfficiency { id: String, target: f64 },
    #[display("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },
    #[display("no features configured")]
    NoFeatures,
    #[display("{sample} sample: event #{index} has {actual} values but {expected} features are configured")]
    RaggedEvent {
        sample: String,
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[display("{sample} sample: requested {requested} training events but only {available} are available")]
    InsufficientEvents {
        sample: String,
        requested: usize,
        available: usize,
    },
    #[display("{sample} sample has no positive total weight")]
    EmptySample { sample: String },
    #[display("working point '{id}': trade-off curve is empty")]
    EmptyTradeoffCurve { id: String },
    #[display("optimizer parameter '{name}' is invalid: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[display("resume stage {stage} is out of range (pipeline has {count} stages)")]
    ResumeStageOutOfRange { stage: usize, count: usize },
}

/// Which class an evaluation denominator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SampleClass {
    #[display("signal")]
    Signal,
    #[display("background")]
    Background,
}

/// The evaluator cannot form an efficiency.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum EvaluationError {
    #[display("{class} base selection is empty (total weight {total_weight})")]
    EmptyBaseSelection {
        class: SampleClass,
        total_weight: f64,
    },
}

/// Failure reading, writing or decoding a [`PipelineState`](crate::state::PipelineState) entry.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StateError {
    #[display("pipeline state has no key '{key}'")]
    Missing { key: String },
    #[display("pipeline state key '{key}' has an unexpected type: {message}")]
    Mistyped { key: String, message: String },
    #[display("failed to access state snapshot {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to decode state snapshot {}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failure reading a sample file.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum IngestError {
    #[display("failed to open sample file {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to read CSV {}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
    #[display("{}: missing column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[display("{}:{line}: cannot parse '{value}' in column '{column}'", path.display())]
    InvalidValue {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },
}

/// Any failure of a state-touching operation of this crate.
///
/// Evaluation has its own [`EvaluationError`] so callers can attach the working
/// point being measured.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum Error {
    #[display("configuration error: {_0}")]
    Configuration(ConfigurationError),
    #[display("state error: {_0}")]
    State(StateError),
    #[display("ingest error: {_0}")]
    Ingest(IngestError),
}
