//! Cut-vector genes and the genetic operators acting on them.
//!
//! A gene is one [`Bounds`] per feature. Only the sides a feature's boundary type
//! constrains are searched; the other side stays at the search range's limit
//! (usually infinite) and is never tightened. These operations are used by
//! [`genetic::PopulationEvolver`](crate::genetic::PopulationEvolver) to implement
//! initialization, crossover and mutation.
//!
//! # Operations
//!
//! - **Initialization**: [`SearchSpace::random`] draws searched sides uniformly and
//!   [`SearchSpace::loosest`] gives the cut keeping every training event
//! - **Crossover**: [`SearchSpace::blx_alpha`] blends two parents side by side
//! - **Mutation**: [`SearchSpace::mutate`] adds Gaussian noise scaled to each side's
//!   search width
//!
//! Every operator ends with a repair step that clamps searched sides into range and
//! swaps a two-sided pair that came out inverted.
//!
//! # Design Decisions
//!
//! ## Search Range From Limits and Data
//!
//! Searched sides live inside the intersection of the input search range and the
//! extent of the training data. A cut beyond the outermost training event selects
//! the same events as a cut placed on it, so the intersection loses nothing. It
//! also turns infinite limits into finite ones, which keeps every gene value finite
//! and gives mutation a width to scale by.
//!
//! ## Width-Relative Mutation
//!
//! Features come in unrelated units, so a single absolute `sigma` would be too
//! coarse for one feature and too fine for another. Mutation noise is therefore a
//! fraction of each side's search width.
//!
//! ## Repair Instead of Rejection
//!
//! Offspring that leave the range are clamped back rather than redrawn. Clamping
//! needs no retry loop, so the number of random draws per child stays fixed and a
//! seeded run stays reproducible.
//!
//! # Current Limitations
//!
//! - **Clamping piles up at the edges**: Offspring pushed out of range land exactly
//!   on the range limits, which over-samples the loosest cut on that side
//! - **No correlation between features**: Crossover and mutation act on each side
//!   independently, so rotated or correlated selections are only reached slowly
//! - **Degenerate ranges are fixed**: When the limits and the data do not overlap,
//!   the side collapses onto a single value and is never searched

use rand::Rng;
use rand_distr::StandardNormal;
use rectcut_core::{
    BoundaryType, Bounds, BoundsVector, ConfigurationError, FeatureTable, Sample,
};

/// Closed interval a searched cut side may take.
///
/// Both ends are finite and `min <= max`; a zero width means the side is fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRange {
    pub min: f64,
    pub max: f64,
}

impl SearchRange {
    #[must_use]
    pub fn width(self) -> f64 {
        self.max - self.min
    }

    fn clamp(self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn sample<R>(self, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
    {
        rng.random_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone)]
struct FeatureSearch {
    boundary: BoundaryType,
    /// The input search range; unsearched sides are pinned to it.
    limits: Bounds,
    range: SearchRange,
}

/// Per-feature search ranges for one optimization.
///
/// A search space pairs each feature's boundary type with its input limits and the
/// [`SearchRange`] its searched sides may take. Every cut vector it produces
/// satisfies, per feature:
///
/// - searched sides lie inside the feature's [`SearchRange`]
/// - unsearched sides equal the input limits
/// - `lower <= upper`
///
/// The space is built once per optimization from the training samples and shared
/// read-only by all generations and cycles.
#[derive(Debug, Clone)]
pub struct SearchSpace {
    features: Vec<FeatureSearch>,
}

impl SearchSpace {
    /// Builds the search space for `features`.
    ///
    /// # Arguments
    ///
    /// * `features` - Names and boundary types, in column order
    /// * `limits` - Input search range; unsearched sides are pinned to it
    /// * `samples` - Training samples whose finite extent bounds the searched sides
    ///
    /// Fails if `limits` has the wrong length or an inverted feature. A feature
    /// whose limits hold no training data gets a fixed side and a warning.
    pub fn new(
        features: &FeatureTable,
        limits: &BoundsVector,
        samples: &[&Sample],
    ) -> Result<Self, ConfigurationError> {
        limits.check_ordered(features)?;
        let features = features
            .iter()
            .zip(limits.as_slice())
            .enumerate()
            .map(|(i, (feature, &limits))| {
                let extent = samples
                    .iter()
                    .filter_map(|s| s.extent(i))
                    .reduce(|(lo1, hi1), (lo2, hi2)| (f64::min(lo1, lo2), f64::max(hi1, hi2)));
                let range = search_range(limits, extent);
                if range.width() <= 0.0 {
                    tracing::warn!(
                        feature = feature.name(),
                        lower = limits.lower,
                        upper = limits.upper,
                        "search range holds no training data spread; cut side is fixed"
                    );
                }
                FeatureSearch {
                    boundary: feature.boundary_type(),
                    limits,
                    range,
                }
            })
            .collect();
        Ok(Self { features })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Range of the searched sides of feature `index`.
    #[must_use]
    pub fn range(&self, index: usize) -> Option<SearchRange> {
        self.features.get(index).map(|f| f.range)
    }

    /// The cut that keeps every training event inside the input limits.
    #[must_use]
    pub fn loosest(&self) -> Vec<Bounds> {
        self.features
            .iter()
            .map(|f| {
                let mut b = f.limits;
                if f.boundary.constrains_lower() {
                    b.lower = f.range.min;
                }
                if f.boundary.constrains_upper() {
                    b.upper = f.range.max;
                }
                b
            })
            .collect()
    }

    /// Draws every searched side uniformly from its range, then repairs the result.
    pub fn random<R>(&self, rng: &mut R) -> Vec<Bounds>
    where
        R: Rng + ?Sized,
    {
        let mut cuts = self
            .features
            .iter()
            .map(|f| {
                let mut b = f.limits;
                if f.boundary.constrains_lower() {
                    b.lower = f.range.sample(rng);
                }
                if f.boundary.constrains_upper() {
                    b.upper = f.range.sample(rng);
                }
                b
            })
            .collect::<Vec<_>>();
        self.repair(&mut cuts);
        cuts
    }

    /// BLX-α crossover: each searched side is drawn uniformly from the parents'
    /// interval widened by `alpha` times its length on both ends.
    ///
    /// # Arguments
    ///
    /// * `p1`, `p2` - Parent cut vectors of equal length
    /// * `alpha` - Extension factor; 0 keeps children between the parents
    /// * `rng` - Random number generator
    ///
    /// # Panics
    ///
    /// Panics if the parents differ in length.
    pub fn blx_alpha<R>(&self, p1: &[Bounds], p2: &[Bounds], alpha: f64, rng: &mut R) -> Vec<Bounds>
    where
        R: Rng + ?Sized,
    {
        assert_eq!(p1.len(), p2.len());
        let mut blend = |x1: f64, x2: f64| {
            let min = f64::min(x1, x2);
            let max = f64::max(x1, x2);
            let d = max - min;
            rng.random_range((min - alpha * d)..=(max + alpha * d))
        };
        let mut cuts = self
            .features
            .iter()
            .zip(p1.iter().zip(p2))
            .map(|(f, (a, b))| {
                let mut child = f.limits;
                if f.boundary.constrains_lower() {
                    child.lower = blend(a.lower, b.lower);
                }
                if f.boundary.constrains_upper() {
                    child.upper = blend(a.upper, b.upper);
                }
                child
            })
            .collect::<Vec<_>>();
        self.repair(&mut cuts);
        cuts
    }

    /// Gaussian mutation: with probability `rate`, each searched side moves by
    /// `N(0, sigma_fraction * width)`, where `width` is that feature's range width.
    ///
    /// Sides of a fixed (zero-width) range never move.
    pub fn mutate<R>(&self, cuts: &mut [Bounds], sigma_fraction: f64, rate: f64, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for (f, b) in self.features.iter().zip(cuts.iter_mut()) {
            let sigma = sigma_fraction * f.range.width();
            let mut jitter = |value: &mut f64| {
                if rng.random_bool(rate) {
                    let noise: f64 = rng.sample(StandardNormal);
                    *value += noise * sigma;
                }
            };
            if f.boundary.constrains_lower() {
                jitter(&mut b.lower);
            }
            if f.boundary.constrains_upper() {
                jitter(&mut b.upper);
            }
        }
        self.repair(cuts);
    }

    fn repair(&self, cuts: &mut [Bounds]) {
        for (f, b) in self.features.iter().zip(cuts.iter_mut()) {
            if f.boundary.constrains_lower() {
                b.lower = f.range.clamp(b.lower);
            } else {
                b.lower = f.limits.lower;
            }
            if f.boundary.constrains_upper() {
                b.upper = f.range.clamp(b.upper);
            } else {
                b.upper = f.limits.upper;
            }
            if b.lower > b.upper {
                (b.lower, b.upper) = (b.upper, b.lower);
            }
        }
    }
}

fn search_range(limits: Bounds, extent: Option<(f64, f64)>) -> SearchRange {
    let (data_min, data_max) = extent.unwrap_or((limits.lower, limits.upper));
    let min = f64::max(limits.lower, data_min);
    let max = f64::min(limits.upper, data_max);
    if min <= max && min.is_finite() && max.is_finite() {
        return SearchRange { min, max };
    }
    // The data and the limits do not overlap; collapse onto a finite limit.
    let pivot = if limits.lower.is_finite() {
        limits.lower
    } else if limits.upper.is_finite() {
        limits.upper
    } else {
        0.0
    };
    SearchRange {
        min: pivot,
        max: pivot,
    }
}
