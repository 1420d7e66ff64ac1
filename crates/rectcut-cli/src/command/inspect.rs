use std::path::PathBuf;

use anyhow::Context as _;
use rectcut_core::{
    BoundsVector, PipelineState,
    state::{LOWER_KEY, UPPER_KEY},
    working_point::WorkingPoint,
};
use rectcut_pipeline::{
    config::RunConfig,
    report::{format_bounds_table, format_cut_table},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Run configuration (JSON) naming the features and working points
    config: PathBuf,
    /// State snapshot to read
    state: PathBuf,
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let InspectArg { config, state } = arg;
    let config = RunConfig::from_path(config)?;
    let features = config.feature_table()?;
    let working_points = config.working_point_specs()?;
    let state = PipelineState::load(state)
        .with_context(|| format!("Failed to load state snapshot: {}", state.display()))?;

    if state.contains(LOWER_KEY) && state.contains(UPPER_KEY) {
        let range = BoundsVector::from_limits(
            &features,
            &state.limits(LOWER_KEY)?,
            &state.limits(UPPER_KEY)?,
        )?;
        println!("{}", format_bounds_table(&features, "current search range", &range));
    }
    for spec in &working_points {
        match WorkingPoint::from_state(spec, &features, &state) {
            Ok(wp) => println!("{}", format_cut_table(&features, &wp)),
            Err(e) => println!("# {}: not available ({e})\n", spec.id()),
        }
    }
    Ok(())
}
