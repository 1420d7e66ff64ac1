//! Genetic search over cut vectors.
//!
//! This module evolves populations of rectangular cuts towards the trade-off
//! frontier between signal efficiency and background efficiency. It uses
//! tournament selection, BLX-α crossover and Gaussian mutation, with all genetic
//! operators provided by [`SearchSpace`].
//!
//! # Algorithm Overview
//!
//! One generation follows this cycle:
//!
//! 1. **Evaluate** - Every individual's cuts are applied to the training samples
//! 2. **Rank** - Fitness is minus the number of population members that
//!    Pareto-dominate the individual, so the current frontier scores 0
//! 3. **Elites** - Frontier cuts supplied by the caller survive unchanged
//! 4. **Tournament Selection** - Parents are drawn by tournament on the ranking
//! 5. **Crossover (BLX-α)** - Two parents are blended side by side
//! 6. **Mutation** - Gaussian noise scaled to each side's search width
//! 7. **Repair** - Sides are clamped into the search range and inverted pairs swapped
//!
//! # Key Components
//!
//! - [`Individual`] - One cut vector with its training efficiencies and fitness
//! - [`Population`] - The individuals of one generation, scored together
//! - [`PopulationEvolver`] - Selection, crossover and mutation settings for one step
//!
//! # Parallelization
//!
//! Evaluation is the only parallel step. The population is split into contiguous
//! chunks scored on scoped threads. Each individual is scored on its own and no
//! random numbers are drawn there, so results do not depend on the worker count.
//! Ranking and reproduction run on the calling thread.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg64;
//! use rectcut_core::{BoundaryType, BoundsVector, Event, FeatureSpec, FeatureTable, Sample};
//! use rectcut_optimizer::{
//!     cuts::SearchSpace,
//!     genetic::{Population, PopulationEvolver},
//! };
//!
//! let features = FeatureTable::new(vec![FeatureSpec::new("x", BoundaryType::TwoSided, 0.9)?])?;
//! let signal = (0..20).map(|i| Event::new(vec![f64::from(i) / 10.0])).collect();
//! let signal = Sample::new("signal", 1, signal)?;
//! let background = (-50..50).map(|i| Event::new(vec![f64::from(i) / 10.0])).collect();
//! let background = Sample::new("background", 1, background)?;
//!
//! let space = SearchSpace::new(&features, &BoundsVector::open(1), &[&signal, &background])?;
//! let mut rng = Pcg64::seed_from_u64(1);
//! let mut population = Population::random(&space, 20, &mut rng);
//! let evolver = PopulationEvolver {
//!     elite_count: 2,
//!     tournament_size: 2,
//!     mutation_sigma: 0.05,
//!     blx_alpha: 0.3,
//!     mutation_rate: 0.3,
//! };
//!
//! for _ in 0..5 {
//!     population.evaluate_fitness(&signal, &background, 2);
//!     population = evolver.evolve(&population, &space, vec![], &mut rng);
//! }
//! population.evaluate_fitness(&signal, &background, 2);
//!
//! assert_eq!(population.individuals().len(), 20);
//! // nobody dominates the best-ranked individual
//! assert_eq!(population.individuals()[0].fitness(), 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Design Decisions
//!
//! ## Domination Count Fitness
//!
//! A cut set has two objectives, so there is no single score to maximize. Counting
//! how many members dominate an individual gives a scalar that tournament selection
//! can use directly. Every non-dominated individual scores 0, so selection pressure
//! pushes the whole population towards the frontier instead of towards one point
//! on it.
//!
//! ## Externally Supplied Elites
//!
//! The population alone keeps only a handful of frontier points alive. Elites are
//! therefore taken from the caller's efficiency-binned archive
//! ([`FrontierArchive::elites`](crate::archive::FrontierArchive::elites)), which
//! spreads them over the whole efficiency range. Without an archive the best-ranked
//! individuals are carried over instead.
//!
//! ## Parameter Control
//!
//! The evolver holds fixed parameters for one step. Schedules such as shrinking the
//! mutation width over time are implemented by the caller creating a different
//! evolver per generation (see [`optimize`](crate::optimize)).
//!
//! # Current Limitations
//!
//! - **Ranking is quadratic**: Domination counts compare every pair of individuals,
//!   which dominates the cost for populations in the thousands
//! - **No diversity preservation within a generation**: Duplicate individuals are
//!   not removed and there is no crowding distance; diversity along the frontier
//!   comes from the archive's elites only
//! - **Training efficiencies only**: Fitness never looks at held-out events, so
//!   overtraining is only visible in the curve's test performance

use std::thread;

use rand::{Rng, seq::IndexedRandom as _};
use rectcut_core::{Bounds, Sample};
use rectcut_stats::descriptive::DescriptiveStats;

use crate::cuts::SearchSpace;

/// A single individual in the genetic algorithm population.
///
/// An individual is one candidate cut vector, with one [`Bounds`] per feature, and
/// the performance measured for it on the training samples. A freshly created
/// individual has not been evaluated yet: it reports no signal, full background
/// and the lowest possible fitness until [`Population::evaluate_fitness`] runs.
#[derive(Debug, Clone)]
pub struct Individual {
    cuts: Vec<Bounds>,
    signal_efficiency: f64,
    background_efficiency: f64,
    fitness: f64,
}

impl Individual {
    /// Creates an unevaluated individual holding `cuts`.
    ///
    /// The cuts are taken as they are; callers build them through [`SearchSpace`]
    /// so they already lie inside the search range.
    #[must_use]
    pub fn new(cuts: Vec<Bounds>) -> Self {
        Self {
            cuts,
            signal_efficiency: 0.0,
            background_efficiency: 1.0,
            fitness: f64::MIN,
        }
    }

    #[must_use]
    pub fn cuts(&self) -> &[Bounds] {
        &self.cuts
    }

    /// Weighted fraction of training signal passing the cuts.
    #[must_use]
    pub fn signal_efficiency(&self) -> f64 {
        self.signal_efficiency
    }

    /// Weighted fraction of training background passing the cuts.
    #[must_use]
    pub fn background_efficiency(&self) -> f64 {
        self.background_efficiency
    }

    /// Higher is better; 0 means no other member of the population dominates this one.
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[cfg(test)]
    pub(crate) fn set_performance(&mut self, signal_efficiency: f64, background_efficiency: f64) {
        self.signal_efficiency = signal_efficiency;
        self.background_efficiency = background_efficiency;
    }

    fn evaluate(&mut self, signal: &Sample, background: &Sample) {
        self.signal_efficiency = signal.count_passing(&self.cuts).fraction().unwrap_or(0.0);
        self.background_efficiency = background
            .count_passing(&self.cuts)
            .fraction()
            .unwrap_or(1.0);
    }

    /// At least as much signal and at most as much background, strictly better in one.
    fn dominates(&self, other: &Self) -> bool {
        self.signal_efficiency >= other.signal_efficiency
            && self.background_efficiency <= other.background_efficiency
            && (self.signal_efficiency > other.signal_efficiency
                || self.background_efficiency < other.background_efficiency)
    }
}

/// The individuals of one generation.
///
/// A population is created by [`Population::random`], scored and sorted by
/// [`Population::evaluate_fitness`], and replaced by the result of
/// [`PopulationEvolver::evolve`]. Its size stays constant across generations.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// Creates `count` random individuals, the first of which is the loosest cut.
    ///
    /// The loosest cut guarantees that the high-efficiency end of the search range
    /// is represented from the first generation on.
    ///
    /// # Arguments
    ///
    /// * `space` - Search ranges and boundary types of the features
    /// * `count` - Number of individuals
    /// * `rng` - Random number generator for the uniform initialization
    #[must_use]
    pub fn random<R>(space: &SearchSpace, count: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..count)
            .map(|i| {
                let cuts = if i == 0 {
                    space.loosest()
                } else {
                    space.random(rng)
                };
                Individual::new(cuts)
            })
            .collect();
        Self { individuals }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// Scores every individual on the training samples, then sorts the population
    /// by fitness, best first.
    ///
    /// # Arguments
    ///
    /// * `signal` - Training signal sample
    /// * `background` - Training background sample
    /// * `workers` - Maximum number of scoped threads used for scoring (0 is treated as 1)
    ///
    /// Individuals of equal fitness keep their relative order, so the result is the
    /// same for any `workers`. A sample with no positive weight scores every
    /// individual as keeping no signal or all background.
    pub fn evaluate_fitness(&mut self, signal: &Sample, background: &Sample, workers: usize) {
        let chunk_size = self.individuals.len().div_ceil(workers.max(1)).max(1);
        thread::scope(|s| {
            for chunk in self.individuals.chunks_mut(chunk_size) {
                s.spawn(move || {
                    for ind in chunk {
                        ind.evaluate(signal, background);
                    }
                });
            }
        });

        #[expect(clippy::cast_precision_loss)]
        let fitness = self
            .individuals
            .iter()
            .map(|ind| {
                let dominated_by = self
                    .individuals
                    .iter()
                    .filter(|other| other.dominates(ind))
                    .count();
                -(dominated_by as f64)
            })
            .collect::<Vec<_>>();
        for (ind, fitness) in self.individuals.iter_mut().zip(fitness) {
            ind.fitness = fitness;
        }

        // sort by fitness descending
        self.individuals
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    /// Summary of the fitness values, `None` for an empty population.
    #[must_use]
    pub fn compute_fitness_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.individuals.iter().map(Individual::fitness))
    }

    /// Summary of the training signal efficiencies, `None` for an empty population.
    #[must_use]
    pub fn compute_signal_efficiency_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.individuals.iter().map(Individual::signal_efficiency))
    }
}

/// Parameters turning one generation into the next.
///
/// An evolver carries no state between calls. Create a new one whenever the
/// parameters change, for example per evolution phase.
#[derive(Debug, Clone)]
pub struct PopulationEvolver {
    /// Upper limit on the number of elites carried over unchanged.
    pub elite_count: usize,
    /// Tournament size for selection (larger = stronger selection pressure)
    pub tournament_size: usize,
    /// Mutation standard deviation as a fraction of each side's search width.
    pub mutation_sigma: f64,
    /// BLX-α crossover parameter.
    pub blx_alpha: f64,
    /// Probability of mutating each searched side.
    pub mutation_rate: f64,
}

impl PopulationEvolver {
    /// Builds the next generation, the same size as `population`.
    ///
    /// # Arguments
    ///
    /// * `population` - Current generation, sorted by fitness (best first) as left by
    ///   [`Population::evaluate_fitness`]
    /// * `space` - Search space providing crossover, mutation and repair
    /// * `elites` - Cut vectors carried over unchanged, at most `elite_count` of them.
    ///   When empty, the best `elite_count` individuals of `population` are used.
    /// * `rng` - Random number generator for selection and the genetic operators
    ///
    /// The remaining slots are filled with children of two tournament-selected
    /// parents.
    ///
    /// # Panics
    ///
    /// Panics if `population` is not sorted by fitness.
    #[must_use]
    pub fn evolve<R>(
        &self,
        population: &Population,
        space: &SearchSpace,
        elites: Vec<Vec<Bounds>>,
        rng: &mut R,
    ) -> Population
    where
        R: Rng + ?Sized,
    {
        let individuals = &population.individuals;
        assert!(individuals.is_sorted_by(|a, b| a.fitness >= b.fitness));
        let size = individuals.len();
        let mut next_individuals = Vec::with_capacity(size);

        if elites.is_empty() {
            next_individuals.extend(
                individuals
                    .iter()
                    .take(self.elite_count)
                    .map(|ind| Individual::new(ind.cuts.clone())),
            );
        } else {
            next_individuals.extend(
                elites
                    .into_iter()
                    .take(self.elite_count.min(size))
                    .map(Individual::new),
            );
        }

        while next_individuals.len() < size {
            let p1 = tournament_select(individuals, self.tournament_size, rng);
            let p2 = tournament_select(individuals, self.tournament_size, rng);
            let mut child = space.blx_alpha(&p1.cuts, &p2.cuts, self.blx_alpha, rng);
            space.mutate(&mut child, self.mutation_sigma, self.mutation_rate, rng);
            next_individuals.push(Individual::new(child));
        }

        Population {
            individuals: next_individuals,
        }
    }
}

/// Picks `tournament_size` distinct individuals at random and returns the fittest.
///
/// Ties go to the individual drawn first.
fn tournament_select<'a, R>(
    population: &'a [Individual],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Individual
where
    R: Rng + ?Sized,
{
    assert!(!population.is_empty() && tournament_size > 0);
    population
        .choose_multiple(rng, tournament_size)
        .reduce(|best, ind| if ind.fitness > best.fitness { ind } else { best })
        .unwrap_or(&population[0])
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;
    use rectcut_core::{BoundaryType, BoundsVector, Event, FeatureSpec, FeatureTable};

    use super::*;

    #[expect(clippy::cast_precision_loss)]
    fn samples() -> (Sample, Sample) {
        let signal = (0..50).map(|i| Event::new(vec![i as f64 / 50.0])).collect();
        let background = (0..50).map(|i| Event::new(vec![i as f64 / 10.0])).collect();
        (
            Sample::new("signal", 1, signal).unwrap(),
            Sample::new("background", 1, background).unwrap(),
        )
    }

    fn space(signal: &Sample, background: &Sample) -> SearchSpace {
        let features =
            FeatureTable::new(vec![FeatureSpec::new("x", BoundaryType::UpperOnly, 0.9).unwrap()])
                .unwrap();
        SearchSpace::new(&features, &BoundsVector::open(1), &[signal, background]).unwrap()
    }

    fn ind(signal_efficiency: f64, background_efficiency: f64) -> Individual {
        Individual {
            cuts: vec![],
            signal_efficiency,
            background_efficiency,
            fitness: f64::MIN,
        }
    }

    #[test]
    fn test_domination() {
        assert!(ind(0.8, 0.1).dominates(&ind(0.7, 0.1)));
        assert!(ind(0.8, 0.1).dominates(&ind(0.8, 0.2)));
        assert!(!ind(0.8, 0.1).dominates(&ind(0.8, 0.1)));
        assert!(!ind(0.8, 0.1).dominates(&ind(0.9, 0.2)));
    }

    #[test]
    fn test_evaluation_ranks_the_frontier_first() {
        let (signal, background) = samples();
        let space = space(&signal, &background);
        let mut population = Population {
            individuals: vec![
                // keeps all signal but only half of the background
                Individual::new(vec![Bounds::new(f64::NEG_INFINITY, 24.5 / 10.0)]),
                Individual::new(space.loosest()),
                Individual::new(vec![Bounds::new(f64::NEG_INFINITY, 0.5)]),
            ],
        };
        population.evaluate_fitness(&signal, &background, 2);
        let best = &population.individuals()[0];
        assert_eq!(best.fitness(), 0.0);
        assert!(population.individuals().iter().all(|i| i.fitness() <= 0.0));
        // cut at 0.5 keeps 26/50 signal and 6/50 background
        let tight = population
            .individuals()
            .iter()
            .find(|i| i.cuts()[0].upper == 0.5)
            .unwrap();
        assert!((tight.signal_efficiency() - 0.52).abs() < 1e-12);
        assert!((tight.background_efficiency() - 0.12).abs() < 1e-12);
        assert_eq!(tight.fitness(), 0.0);
    }

    #[test]
    fn test_evaluation_is_independent_of_worker_count() {
        let (signal, background) = samples();
        let space = space(&signal, &background);
        let population = Population::random(&space, 17, &mut Pcg64::seed_from_u64(1));
        let scores = |workers| {
            let mut population = population.clone();
            population.evaluate_fitness(&signal, &background, workers);
            population
                .individuals()
                .iter()
                .map(|i| (i.cuts()[0].upper, i.signal_efficiency(), i.fitness()))
                .collect::<Vec<_>>()
        };
        assert_eq!(scores(1), scores(3));
        assert_eq!(scores(1), scores(64));
    }

    #[test]
    fn test_evolve_keeps_size_and_elites() {
        let (signal, background) = samples();
        let space = space(&signal, &background);
        let mut rng = Pcg64::seed_from_u64(9);
        let mut population = Population::random(&space, 20, &mut rng);
        population.evaluate_fitness(&signal, &background, 4);
        let evolver = PopulationEvolver {
            elite_count: 2,
            tournament_size: 2,
            mutation_sigma: 0.1,
            blx_alpha: 0.3,
            mutation_rate: 0.3,
        };
        let elite = vec![Bounds::new(f64::NEG_INFINITY, 0.25)];
        let next = evolver.evolve(&population, &space, vec![elite.clone()], &mut rng);
        assert_eq!(next.individuals().len(), 20);
        assert_eq!(next.individuals()[0].cuts(), elite.as_slice());

        let next = evolver.evolve(&population, &space, vec![], &mut rng);
        assert_eq!(next.individuals()[1].cuts(), population.individuals()[1].cuts());
    }
}
