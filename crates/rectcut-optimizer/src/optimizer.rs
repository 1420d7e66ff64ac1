//! Driver running genetic cycles into a frontier archive.

use std::{num::NonZero, thread};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use rectcut_core::{
    BoundsVector, ConfigurationError, EvaluationError, FeatureTable, Sample, SampleClass,
    TradeoffCurve, evaluate::evaluate,
};

use crate::{
    archive::FrontierArchive,
    cuts::SearchSpace,
    genetic::{Population, PopulationEvolver},
};

/// Settings of one optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerParams {
    /// Signal events drawn for training; 0 takes half of the sample.
    pub signal_train_count: usize,
    /// Background events drawn for training; 0 takes half of the sample.
    pub background_train_count: usize,
    /// Seed of the split and the search. `None` draws a fresh one.
    pub seed: Option<u64>,
    pub population: usize,
    pub generations: usize,
    /// Independent restarts feeding the same archive.
    pub cycles: usize,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub blx_alpha: f64,
    pub mutation_rate: f64,
    /// Signal-efficiency bins of the frontier archive.
    pub efficiency_bins: usize,
    /// Threads used to score a population.
    pub workers: usize,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            signal_train_count: 0,
            background_train_count: 0,
            seed: None,
            population: 200,
            generations: 40,
            cycles: 3,
            elite_count: 8,
            tournament_size: 2,
            blx_alpha: 0.3,
            mutation_rate: 0.3,
            efficiency_bins: 100,
            workers: default_workers(),
        }
    }
}

/// Number of threads the machine offers, at least 1.
#[must_use]
pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZero::get)
}

impl OptimizerParams {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |name, reason| Err(ConfigurationError::InvalidParameter { name, reason });
        if self.population < 2 {
            return invalid("population", "must be at least 2");
        }
        if self.generations == 0 {
            return invalid("generations", "must be positive");
        }
        if self.cycles == 0 {
            return invalid("cycles", "must be positive");
        }
        if self.elite_count >= self.population {
            return invalid("elite_count", "must be smaller than the population");
        }
        if self.tournament_size == 0 || self.tournament_size > self.population {
            return invalid("tournament_size", "must be between 1 and the population");
        }
        if !(self.blx_alpha >= 0.0 && self.blx_alpha.is_finite()) {
            return invalid("blx_alpha", "must be a non-negative number");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid("mutation_rate", "must be within [0, 1]");
        }
        if self.efficiency_bins == 0 {
            return invalid("efficiency_bins", "must be positive");
        }
        if self.workers == 0 {
            return invalid("workers", "must be positive");
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum EvolutionPhase {
    #[default]
    Exploration,
    Transition,
    Convergence,
}

impl EvolutionPhase {
    fn from_generation(generation: usize, generations: usize) -> Self {
        match generation * 10 / generations.max(1) {
            0..3 => Self::Exploration,
            3..7 => Self::Transition,
            _ => Self::Convergence,
        }
    }

    const fn mutation_sigma(self) -> f64 {
        match self {
            Self::Exploration => 0.1,
            Self::Transition => 0.04,
            Self::Convergence => 0.01,
        }
    }
}

/// Result of [`optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    pub curve: TradeoffCurve,
    /// Seed actually used, for reproducing an unseeded run.
    pub seed: u64,
    pub signal_train_events: usize,
    pub background_train_events: usize,
}

/// Searches rectangular cuts inside `search` and returns the trade-off curve.
///
/// Both samples are split into a training and a held-out part first. Inverted
/// `search` limits are reported before any search work is done.
pub fn optimize(
    params: &OptimizerParams,
    features: &FeatureTable,
    search: &BoundsVector,
    signal: &Sample,
    background: &Sample,
) -> Result<Optimization, ConfigurationError> {
    params.validate()?;
    search.check_ordered(features)?;
    features.check_len("signal sample", signal.feature_count())?;
    features.check_len("background sample", background.feature_count())?;

    let seed = params.seed.unwrap_or_else(|| rand::rng().random());
    tracing::info!(seed, "optimizer seed");
    let mut rng = Pcg64::seed_from_u64(seed);

    let (signal_train, signal_test) = signal.split(params.signal_train_count, &mut rng)?;
    let (background_train, background_test) =
        background.split(params.background_train_count, &mut rng)?;
    // The loosest cuts the search range allows close the curve at high efficiency.
    let anchor = search.clone().relax_unconstrained(features);
    let anchor_train = evaluate(&anchor, &signal_train, &background_train).map_err(
        |EvaluationError::EmptyBaseSelection { class, .. }| {
            let sample = match class {
                SampleClass::Signal => &signal_train,
                SampleClass::Background => &background_train,
            };
            ConfigurationError::EmptySample {
                sample: sample.name().to_owned(),
            }
        },
    )?;
    tracing::info!(
        signal_train = signal_train.len(),
        signal_test = signal_test.len(),
        background_train = background_train.len(),
        background_test = background_test.len(),
        "samples split"
    );
    tracing::debug!(
        signal_efficiency = anchor_train.signal_efficiency,
        background_rejection = anchor_train.background_rejection,
        "loosest cuts in the search range"
    );

    let space = SearchSpace::new(features, search, &[&signal_train, &background_train])?;
    let mut archive = FrontierArchive::new(params.efficiency_bins);

    for cycle in 0..params.cycles {
        let mut population = Population::random(&space, params.population, &mut rng);
        for generation in 0..params.generations {
            let phase = EvolutionPhase::from_generation(generation, params.generations);
            population.evaluate_fitness(&signal_train, &background_train, params.workers);
            let improved = population
                .individuals()
                .iter()
                .filter(|ind| archive.offer(ind))
                .count();

            if let (Some(fitness), Some(efficiency)) = (
                population.compute_fitness_stats(),
                population.compute_signal_efficiency_stats(),
            ) {
                tracing::debug!(
                    cycle,
                    generation,
                    ?phase,
                    improved,
                    coverage = archive.coverage(),
                    fitness_mean = fitness.mean,
                    fitness_min = fitness.min,
                    efficiency_min = efficiency.min,
                    efficiency_max = efficiency.max,
                    efficiency_std_dev = efficiency.std_dev,
                    "generation evaluated"
                );
            }

            if generation + 1 < params.generations {
                let evolver = PopulationEvolver {
                    elite_count: params.elite_count,
                    tournament_size: params.tournament_size,
                    mutation_sigma: phase.mutation_sigma(),
                    blx_alpha: params.blx_alpha,
                    mutation_rate: params.mutation_rate,
                };
                let elites = archive.elites(params.elite_count);
                population = evolver.evolve(&population, &space, elites, &mut rng);
            }
        }
        tracing::info!(
            cycle,
            coverage = archive.coverage(),
            bins = params.efficiency_bins,
            "optimizer cycle finished"
        );
    }

    let test = (!signal_test.is_empty() && !background_test.is_empty())
        .then_some((&signal_test, &background_test));
    let curve = archive.into_curve(anchor, anchor_train, test);
    tracing::info!(points = curve.len(), "trade-off curve built");

    Ok(Optimization {
        curve,
        seed,
        signal_train_events: signal_train.len(),
        background_train_events: background_train.len(),
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal, Uniform};
    use rectcut_core::{BoundaryType, Bounds, Event, FeatureSpec, Interpolation};

    use super::*;

    fn features(boundary: BoundaryType) -> FeatureTable {
        FeatureTable::new(vec![FeatureSpec::new("x", boundary, 0.95).unwrap()]).unwrap()
    }

    fn samples(n: usize) -> (Sample, Sample) {
        let mut rng = Pcg64::seed_from_u64(42);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let uniform = Uniform::new(-5.0, 5.0).unwrap();
        let signal = (0..n)
            .map(|_| Event::new(vec![normal.sample(&mut rng)]))
            .collect();
        let background = (0..n)
            .map(|_| Event::new(vec![uniform.sample(&mut rng)]))
            .collect();
        (
            Sample::new("signal", 1, signal).unwrap(),
            Sample::new("background", 1, background).unwrap(),
        )
    }

    fn small_params(workers: usize) -> OptimizerParams {
        OptimizerParams {
            seed: Some(7),
            population: 40,
            generations: 12,
            cycles: 2,
            elite_count: 4,
            efficiency_bins: 50,
            workers,
            ..OptimizerParams::default()
        }
    }

    #[test]
    fn test_phase_schedule() {
        assert_eq!(EvolutionPhase::from_generation(0, 40), EvolutionPhase::Exploration);
        assert_eq!(EvolutionPhase::from_generation(11, 40), EvolutionPhase::Exploration);
        assert_eq!(EvolutionPhase::from_generation(12, 40), EvolutionPhase::Transition);
        assert_eq!(EvolutionPhase::from_generation(39, 40), EvolutionPhase::Convergence);
    }

    #[test]
    fn test_inverted_bounds_fail_before_search() {
        let (signal, background) = samples(10);
        let search = BoundsVector::new(vec![Bounds::new(5.0, 1.0)]);
        let err = optimize(
            &small_params(1),
            &features(BoundaryType::TwoSided),
            &search,
            &signal,
            &background,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvertedBounds {
                feature: "x".to_owned(),
                lower: 5.0,
                upper: 1.0
            }
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let params = OptimizerParams {
            elite_count: 200,
            ..small_params(1)
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::InvalidParameter { name: "elite_count", .. })
        ));
        let params = OptimizerParams {
            mutation_rate: 1.5,
            ..small_params(1)
        };
        assert!(params.validate().is_err());
        assert!(OptimizerParams::default().validate().is_ok());
    }

    #[test]
    fn test_too_many_training_events() {
        let (signal, background) = samples(10);
        let params = OptimizerParams {
            signal_train_count: 11,
            ..small_params(1)
        };
        let err = optimize(
            &params,
            &features(BoundaryType::TwoSided),
            &BoundsVector::open(1),
            &signal,
            &background,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InsufficientEvents { requested: 11, .. }));
    }

    #[test]
    fn test_zero_weight_training_sample_is_rejected() {
        let (signal, _) = samples(10);
        let background = Sample::new(
            "background",
            1,
            (0..10).map(|i| Event::weighted(vec![f64::from(i)], 0.0)).collect(),
        )
        .unwrap();
        let err = optimize(
            &small_params(1),
            &features(BoundaryType::TwoSided),
            &BoundsVector::open(1),
            &signal,
            &background,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::EmptySample { ref sample } if sample.starts_with("background")));
    }

    #[test]
    fn test_curve_is_monotone_and_separates() {
        let (signal, background) = samples(2000);
        let result = optimize(
            &small_params(4),
            &features(BoundaryType::TwoSided),
            &BoundsVector::open(1),
            &signal,
            &background,
        )
        .unwrap();
        assert_eq!(result.seed, 7);
        assert_eq!(result.signal_train_events, 1000);

        let points = result.curve.points();
        assert!(points.len() > 3);
        for pair in points.windows(2) {
            assert!(pair[1].signal_efficiency > pair[0].signal_efficiency);
            assert!(pair[1].background_rejection <= pair[0].background_rejection);
        }
        assert!(points.iter().all(|p| p.test.is_some()));
        // A window of about +-1.28 keeps 80% of N(0, 1) and a quarter of U(-5, 5).
        assert!(result.curve.rejection_at(0.8).unwrap() > 0.5);
        let cuts = result.curve.cuts_at(1.0, Interpolation::Linear).unwrap();
        assert_eq!(cuts, BoundsVector::open(1));
    }

    #[test]
    fn test_curve_never_leaves_a_bounded_search_range() {
        let (signal, background) = samples(1000);
        let search = BoundsVector::new(vec![Bounds::new(-1.0, 1.5)]);
        let result = optimize(
            &small_params(2),
            &features(BoundaryType::TwoSided),
            &search,
            &signal,
            &background,
        )
        .unwrap();
        let top = result.curve.points().last().unwrap();
        assert_eq!(top.cuts, search);
        assert!(top.signal_efficiency < 0.95);
        for target in [0.3, 0.6, 0.9, 0.95, 1.0] {
            for mode in [Interpolation::Linear, Interpolation::Nearest] {
                let cuts = result.curve.cuts_at(target, mode).unwrap();
                let b = cuts.get(0).unwrap();
                assert!(
                    -1.0 <= b.lower && b.upper <= 1.5,
                    "cuts {b:?} at {target} leave the search range"
                );
            }
        }
        assert_eq!(result.curve.cuts_at(0.95, Interpolation::Linear), Some(search));
    }

    #[test]
    fn test_unconstrained_side_is_never_tightened() {
        let (signal, background) = samples(400);
        let result = optimize(
            &small_params(2),
            &features(BoundaryType::UpperOnly),
            &BoundsVector::open(1),
            &signal,
            &background,
        )
        .unwrap();
        assert!(
            result
                .curve
                .points()
                .iter()
                .all(|p| p.cuts.get(0).unwrap().lower == f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_results_do_not_depend_on_worker_count() {
        let (signal, background) = samples(300);
        let run = |workers| {
            optimize(
                &small_params(workers),
                &features(BoundaryType::TwoSided),
                &BoundsVector::open(1),
                &signal,
                &background,
            )
            .unwrap()
        };
        let single = run(1);
        assert_eq!(single, run(3));
        assert_eq!(single, run(8));
    }
}
