//! Statistical helpers shared by the cut calibration crates.
//!
//! - **Rank lookup**: [`percentiles`] maps a fraction of a sorted sample to a value
//!   using plain `floor` truncation (no interpolation, no rounding)
//! - **Weighted pass fractions**: [`weighted`] accumulates passed/total weights and
//!   refuses to divide by an empty denominator
//! - **Descriptive statistics**: [`descriptive`] summarizes a set of scores, used for
//!   optimizer progress logging
//!
//! # Examples
//!
//! ```
//! use rectcut_stats::{percentiles, weighted::WeightedCount};
//!
//! let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
//! assert_eq!(percentiles::value_at_fraction(&sorted, 0.5), Some(3.0));
//!
//! let count: WeightedCount = [(1.0, true), (1.0, false)].into_iter().collect();
//! assert_eq!(count.fraction(), Some(0.5));
//! ```

pub mod descriptive;
pub mod percentiles;
pub mod weighted;
