//! Rectangular cut optimization.
//!
//! [`optimize`] searches axis-aligned cut boxes with a genetic algorithm and
//! returns the frontier of signal efficiency against background rejection that
//! such boxes can reach on a training split of the samples.
//!
//! # Architecture
//!
//! ```text
//! SearchSpace (cuts)         search range per feature, genetic operators
//!     ↓ seeds
//! Population (genetic)       scored in parallel, ranked by Pareto domination
//!     ↓ offers every generation
//! FrontierArchive (archive)  best cuts per signal-efficiency bin
//!     ↓ becomes
//! TradeoffCurve              monotone, closed by the loosest cuts of the search range
//! ```
//!
//! Several independent cycles feed the same archive. The whole run is
//! reproducible from its seed and does not depend on the number of workers.

pub use self::optimizer::{Optimization, OptimizerParams, default_workers, optimize};

pub mod archive;
pub mod cuts;
pub mod genetic;
pub mod optimizer;
