//! Run results and their text/JSON renderings.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rectcut_core::{
    BoundsVector, FeatureSpec, FeatureTable, TradeoffCurve, TradeoffPoint,
    working_point::WorkingPoint,
};
use serde::Serialize;

use crate::stage::{StageOutput, WorkingPointEvaluation};

/// Number of evenly spaced samples in a curve export.
pub const CURVE_SAMPLES: usize = 101;

/// What one [`Pipeline::run`](crate::controller::Pipeline::run) did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    /// Stages that did not run or found their results already stored.
    pub skipped: Vec<String>,
    /// Search range after the trim stage, if it ran.
    pub search_range: Option<BoundsVector>,
    /// Curves of the working points optimized in this run.
    pub curves: Vec<CurveExport>,
    pub evaluations: Vec<WorkingPointEvaluation>,
    /// Every working point present in the final state, in configuration order.
    pub working_points: Vec<WorkingPoint>,
}

impl PipelineReport {
    pub(crate) fn record(&mut self, output: StageOutput) {
        match output {
            StageOutput::Trimmed(outcome) => self.search_range = Some(outcome.bounds().clone()),
            StageOutput::Configured(bounds) => self.search_range = Some(bounds),
            StageOutput::Optimized {
                working_point,
                curve,
                seed,
            } => self.curves.push(CurveExport::new(&working_point, &curve, seed)),
            StageOutput::Reused(working_point) => {
                self.skipped.push(format!("optimize:{}", working_point.id));
            }
            StageOutput::Evaluated(evaluations) => self.evaluations = evaluations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveSample {
    pub signal_efficiency: f64,
    pub background_rejection: f64,
}

/// Plot-ready export of one trade-off curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveExport {
    pub id: String,
    pub target_efficiency: f64,
    pub seed: u64,
    pub points: Vec<TradeoffPoint>,
    pub samples: Vec<CurveSample>,
}

impl CurveExport {
    #[must_use]
    pub fn new(working_point: &WorkingPoint, curve: &TradeoffCurve, seed: u64) -> Self {
        Self {
            id: working_point.id.clone(),
            target_efficiency: working_point.target_efficiency,
            seed,
            points: curve.points().to_vec(),
            samples: curve
                .resample(CURVE_SAMPLES)
                .into_iter()
                .map(|(signal_efficiency, background_rejection)| CurveSample {
                    signal_efficiency,
                    background_rejection,
                })
                .collect(),
        }
    }
}

/// `working_points.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingPointsDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub features: Vec<&'a str>,
    pub working_points: &'a [WorkingPoint],
}

impl<'a> WorkingPointsDocument<'a> {
    #[must_use]
    pub fn new(features: &'a FeatureTable, working_points: &'a [WorkingPoint]) -> Self {
        Self {
            generated_at: Utc::now(),
            features: features.iter().map(FeatureSpec::name).collect(),
            working_points,
        }
    }
}

/// `evaluation.json` document.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub independent_samples: bool,
    pub working_points: &'a [WorkingPointEvaluation],
}

impl<'a> EvaluationDocument<'a> {
    #[must_use]
    pub fn new(evaluations: &'a [WorkingPointEvaluation], independent_samples: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            independent_samples,
            working_points: evaluations,
        }
    }
}

fn format_limit(value: f64) -> String {
    if value == f64::INFINITY {
        format!("{:>8}", "+inf")
    } else if value == f64::NEG_INFINITY {
        format!("{:>8}", "-inf")
    } else {
        format!("{value:8.5}")
    }
}

/// Per-feature `[lower, upper]` table of one working point.
///
/// ```
/// # use rectcut_core::{BoundaryType, Bounds, BoundsVector, FeatureSpec, FeatureTable};
/// # use rectcut_core::working_point::WorkingPoint;
/// # use rectcut_pipeline::report::format_cut_table;
/// let features = FeatureTable::new(vec![FeatureSpec::new("hoe", BoundaryType::UpperOnly, 0.9)?])?;
/// let wp = WorkingPoint {
///     id: "tight".to_owned(),
///     target_efficiency: 0.7,
///     cuts: BoundsVector::new(vec![Bounds::new(f64::NEG_INFINITY, 0.125)]),
/// };
/// assert_eq!(
///     format_cut_table(&features, &wp),
///     "# tight (target efficiency 0.700)\n                     hoe: [     -inf,  0.12500 ]\n",
/// );
/// # Ok::<(), rectcut_core::ConfigurationError>(())
/// ```
#[must_use]
pub fn format_cut_table(features: &FeatureTable, working_point: &WorkingPoint) -> String {
    let header = format!(
        "{} (target efficiency {:.3})",
        working_point.id, working_point.target_efficiency
    );
    format_bounds_table(features, &header, &working_point.cuts)
}

/// `bounds` as one `name: [ lower, upper ]` row per feature under a `# header` line.
#[must_use]
pub fn format_bounds_table(features: &FeatureTable, header: &str, bounds: &BoundsVector) -> String {
    let mut out = format!("# {header}\n");
    for (feature, b) in features.iter().zip(bounds.as_slice()) {
        let _ = writeln!(
            out,
            "{:>24}: [ {}, {} ]",
            feature.name(),
            format_limit(b.lower),
            format_limit(b.upper)
        );
    }
    out
}

/// Cut tables of every working point, separated by blank lines.
#[must_use]
pub fn format_cut_tables(features: &FeatureTable, working_points: &[WorkingPoint]) -> String {
    working_points
        .iter()
        .map(|wp| format_cut_table(features, wp))
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn format_evaluation_table(evaluations: &[WorkingPointEvaluation]) -> String {
    let mut out = format!(
        "{:<16} {:>8} {:>10} {:>10}\n",
        "working point", "target", "sig. eff.", "bkg. rej."
    );
    for e in evaluations {
        let _ = writeln!(
            out,
            "{:<16} {:>8.3} {:>10.4} {:>10.4}",
            e.id,
            e.target_efficiency,
            e.performance.signal_efficiency,
            e.performance.background_rejection
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use rectcut_core::{BoundaryType, Bounds, evaluate::Performance};

    use super::*;

    fn features() -> FeatureTable {
        FeatureTable::new(vec![
            FeatureSpec::new("pt", BoundaryType::LowerOnly, 0.9).unwrap(),
            FeatureSpec::new("eta", BoundaryType::TwoSided, 0.9).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_cut_table_renders_infinities() {
        let wp = WorkingPoint {
            id: "veto".to_owned(),
            target_efficiency: 0.95,
            cuts: BoundsVector::new(vec![
                Bounds::new(20.0, f64::INFINITY),
                Bounds::new(-2.5, 2.5),
            ]),
        };
        let table = format_cut_table(&features(), &wp);
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "# veto (target efficiency 0.950)");
        assert_eq!(lines[1], "                      pt: [ 20.00000,     +inf ]");
        assert_eq!(lines[2], "                     eta: [ -2.50000,  2.50000 ]");
    }

    #[test]
    fn test_evaluation_table() {
        let table = format_evaluation_table(&[WorkingPointEvaluation {
            id: "loose".to_owned(),
            target_efficiency: 0.9,
            performance: Performance {
                signal_efficiency: 0.8912,
                background_rejection: 0.75,
            },
        }]);
        let row = table.lines().nth(1).unwrap();
        assert_eq!(row, "loose               0.900     0.8912     0.7500");
    }

    #[test]
    fn test_curve_export_serializes_infinite_cuts() {
        let curve = TradeoffCurve::from_candidates(vec![
            TradeoffPoint {
                signal_efficiency: 0.5,
                background_rejection: 0.9,
                cuts: BoundsVector::new(vec![Bounds::new(30.0, f64::INFINITY), Bounds::new(-1.0, 1.0)]),
                test: None,
            },
            TradeoffPoint {
                signal_efficiency: 1.0,
                background_rejection: 0.0,
                cuts: BoundsVector::open(2),
                test: None,
            },
        ]);
        let wp = WorkingPoint {
            id: "tight".to_owned(),
            target_efficiency: 0.5,
            cuts: curve.points()[0].cuts.clone(),
        };
        let export = CurveExport::new(&wp, &curve, 3);
        assert_eq!(export.samples.len(), CURVE_SAMPLES);
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["points"][1]["cuts"]["upper"][0], "+inf");
        assert_eq!(json["points"][0]["cuts"]["lower"][0], 30.0);
        assert_eq!(json["seed"], 3);
    }
}
