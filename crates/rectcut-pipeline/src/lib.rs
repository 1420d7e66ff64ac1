//! Staged, resumable calibration runs.
//!
//! A [`RunConfig`](config::RunConfig) is validated into
//! [`PipelineInputs`](config::PipelineInputs), then a [`Pipeline`](controller::Pipeline)
//! runs its stages in order, persisting the [`PipelineState`](rectcut_core::PipelineState)
//! through a [`StateStore`](controller::StateStore) after each one. A run can
//! resume at any stage whose required state keys are present.

pub use self::error::PipelineError;

pub mod config;
pub mod controller;
pub mod error;
pub mod report;
pub mod stage;
