//! Core data model for rectangular cut calibration.
//!
//! A [`FeatureTable`] lists the discriminating variables and the side(s) on
//! which each may be cut. Cuts are [`BoundsVector`]s of closed intervals. Signal
//! and background events live in [`Sample`]s. Stages of a calibration run share
//! a [`PipelineState`]:
//!
//! 1. [`outlier::trim_outliers`] narrows the search range to the bulk of the signal.
//! 2. An optimizer produces a [`TradeoffCurve`] inside that range.
//! 3. [`working_point::extract_working_point`] picks cuts at a target efficiency
//!    and narrows the range for the next working point.
//! 4. [`evaluate::evaluate`] measures the chosen cuts on independent events.
//!
//! ```
//! use rectcut_core::{
//!     BoundaryType, FeatureSpec, FeatureTable, PipelineState,
//!     outlier::trim_outliers,
//!     sample::{Event, Sample},
//! };
//!
//! let features = FeatureTable::new(vec![FeatureSpec::new("iso", BoundaryType::UpperOnly, 0.9)?])?;
//! let events = (0..10).map(|i| Event::new(vec![f64::from(i)])).collect();
//! let signal = Sample::new("signal", 1, events)?;
//!
//! let mut state = PipelineState::new();
//! let bounds = trim_outliers(&mut state, &features, &signal)?;
//! assert_eq!(bounds.bounds().get(0).map(|b| b.upper), Some(9.0));
//! assert_eq!(state.limits("lower")?, vec![f64::NEG_INFINITY]);
//! # Ok::<(), rectcut_core::Error>(())
//! ```

pub use self::{
    bounds::{Bounds, BoundsVector},
    error::{
        ConfigurationError, Error, EvaluationError, IngestError, SampleClass, StateError,
    },
    feature::{BoundaryType, FeatureSpec, FeatureTable},
    sample::{Event, Sample},
    state::PipelineState,
    tradeoff::{Interpolation, TradeoffCurve, TradeoffPoint},
};

pub mod bounds;
pub mod error;
pub mod evaluate;
pub mod feature;
pub mod ingest;
pub mod outlier;
pub mod sample;
pub mod state;
pub mod tradeoff;
pub mod working_point;
