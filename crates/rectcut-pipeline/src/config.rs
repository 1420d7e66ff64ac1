//! Run configuration document.
//!
//! ```json
//! {
//!   "features": [{ "name": "hoe", "boundary_type": "upper_only", "trim_target": 0.95 }],
//!   "signal": { "path": "signal.csv", "weight": "w" },
//!   "background": { "path": "background.csv" },
//!   "working_points": [{ "id": "loose", "target_efficiency": 0.9 }]
//! }
//! ```
//!
//! Optional sections: `evaluation` (independent samples), `training`, `extraction`
//! (`"linear"` or `"nearest"`), `initial_bounds`, `resume_stage` and `state`.

use std::{
    collections::HashSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use rectcut_core::{
    BoundaryType, BoundsVector, ConfigurationError, FeatureSpec, FeatureTable, Interpolation,
    Sample, bounds::limits_from_json, ingest::read_csv_sample, working_point::WorkingPointSpec,
};
use rectcut_optimizer::{OptimizerParams, default_workers};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::PipelineError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub features: Vec<FeatureConfig>,
    pub signal: SampleSource,
    pub background: SampleSource,
    #[serde(default)]
    pub evaluation: Option<EvaluationSources>,
    #[serde(default)]
    pub training: TrainingConfig,
    pub working_points: Vec<WorkingPointConfig>,
    #[serde(default)]
    pub extraction: Interpolation,
    #[serde(default)]
    pub initial_bounds: Option<InitialBounds>,
    #[serde(default)]
    pub resume_stage: usize,
    /// State snapshot path, relative to the output directory; defaults to `state.json`.
    #[serde(default)]
    pub state: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    pub name: String,
    /// A name (`upper_only`, `lower_only`, `two_sided`) or a numeric code (0, 1, 2).
    pub boundary_type: Value,
    pub trim_target: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleSource {
    pub path: PathBuf,
    /// Weight column; events weigh 1 without it.
    #[serde(default)]
    pub weight: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationSources {
    pub signal: SampleSource,
    pub background: SampleSource,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    pub signal_count: usize,
    pub background_count: usize,
    pub seed: Option<u64>,
    pub population: usize,
    pub generations: usize,
    pub cycles: usize,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub blx_alpha: f64,
    pub mutation_rate: f64,
    pub efficiency_bins: usize,
    pub workers: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let params = OptimizerParams::default();
        Self {
            signal_count: params.signal_train_count,
            background_count: params.background_train_count,
            seed: params.seed,
            population: params.population,
            generations: params.generations,
            cycles: params.cycles,
            elite_count: params.elite_count,
            tournament_size: params.tournament_size,
            blx_alpha: params.blx_alpha,
            mutation_rate: params.mutation_rate,
            efficiency_bins: params.efficiency_bins,
            workers: None,
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn optimizer_params(&self) -> OptimizerParams {
        OptimizerParams {
            signal_train_count: self.signal_count,
            background_train_count: self.background_count,
            seed: self.seed,
            population: self.population,
            generations: self.generations,
            cycles: self.cycles,
            elite_count: self.elite_count,
            tournament_size: self.tournament_size,
            blx_alpha: self.blx_alpha,
            mutation_rate: self.mutation_rate,
            efficiency_bins: self.efficiency_bins,
            workers: self.workers.unwrap_or_else(default_workers),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkingPointConfig {
    pub id: String,
    pub target_efficiency: f64,
}

/// Search range used instead of outlier trimming. Limits may be numbers or the
/// strings `"-inf"` / `"+inf"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialBounds {
    #[serde(deserialize_with = "deserialize_limits")]
    pub lower: Vec<f64>,
    #[serde(deserialize_with = "deserialize_limits")]
    pub upper: Vec<f64>,
}

fn deserialize_limits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    limits_from_json(&value).map_err(serde::de::Error::custom)
}

impl RunConfig {
    /// Reads a configuration file, resolving relative sample paths against its directory.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| PipelineError::Json {
                path: path.to_owned(),
                source,
            })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let mut sources = vec![&mut self.signal, &mut self.background];
        if let Some(evaluation) = &mut self.evaluation {
            sources.extend([&mut evaluation.signal, &mut evaluation.background]);
        }
        for source in sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
    }

    pub fn feature_table(&self) -> Result<FeatureTable, ConfigurationError> {
        let features = self
            .features
            .iter()
            .map(|f| {
                let boundary = parse_boundary_type(&f.boundary_type).ok_or_else(|| {
                    ConfigurationError::UnknownBoundaryType {
                        feature: f.name.clone(),
                        code: match &f.boundary_type {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        },
                    }
                })?;
                FeatureSpec::new(&f.name, boundary, f.trim_target)
            })
            .collect::<Result<Vec<_>, _>>()?;
        FeatureTable::new(features)
    }

    /// Working points in configuration order, which is also the extraction order.
    pub fn working_point_specs(&self) -> Result<Vec<WorkingPointSpec>, ConfigurationError> {
        let mut seen = HashSet::new();
        self.working_points
            .iter()
            .map(|wp| {
                if !seen.insert(wp.id.as_str()) {
                    return Err(ConfigurationError::Duplicate {
                        kind: "working point",
                        name: wp.id.clone(),
                    });
                }
                WorkingPointSpec::new(&wp.id, wp.target_efficiency)
            })
            .collect()
    }

    pub fn initial_bounds(
        &self,
        features: &FeatureTable,
    ) -> Result<Option<BoundsVector>, ConfigurationError> {
        self.initial_bounds
            .as_ref()
            .map(|b| {
                let bounds = BoundsVector::from_limits(features, &b.lower, &b.upper)?;
                bounds.check_ordered(features)?;
                Ok(bounds)
            })
            .transpose()
    }

    /// Validates the whole document and reads every sample it names.
    pub fn load_inputs(&self) -> Result<PipelineInputs, PipelineError> {
        let features = self.feature_table()?;
        let working_points = self.working_point_specs()?;
        let initial_bounds = self.initial_bounds(&features)?;
        let optimizer = self.training.optimizer_params();
        optimizer.validate()?;

        let read = |name: &str, source: &SampleSource| {
            read_csv_sample(name, &source.path, &features, source.weight.as_deref())
        };
        let signal = read("signal", &self.signal)?;
        let background = read("background", &self.background)?;
        let evaluation = self
            .evaluation
            .as_ref()
            .map(|e| {
                Ok::<_, PipelineError>((
                    read("evaluation signal", &e.signal)?,
                    read("evaluation background", &e.background)?,
                ))
            })
            .transpose()?;
        tracing::info!(
            features = features.len(),
            signal = signal.len(),
            background = background.len(),
            evaluation = evaluation.is_some(),
            "inputs loaded"
        );

        Ok(PipelineInputs {
            features,
            signal,
            background,
            evaluation,
            initial_bounds,
            working_points,
            optimizer,
            extraction: self.extraction,
        })
    }
}

fn parse_boundary_type(value: &Value) -> Option<BoundaryType> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(BoundaryType::from_code),
        _ => None,
    }
}

/// Everything a pipeline run needs, validated and in memory.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub features: FeatureTable,
    pub signal: Sample,
    pub background: Sample,
    /// Independent signal and background samples for the evaluation stage.
    pub evaluation: Option<(Sample, Sample)>,
    pub initial_bounds: Option<BoundsVector>,
    pub working_points: Vec<WorkingPointSpec>,
    pub optimizer: OptimizerParams,
    pub extraction: Interpolation,
}
