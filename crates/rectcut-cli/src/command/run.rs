use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use rectcut_pipeline::{
    config::RunConfig,
    controller::{FileStateStore, Pipeline},
    report::{
        EvaluationDocument, WorkingPointsDocument, format_cut_tables, format_evaluation_table,
    },
};

use crate::util::{save_json, write_text_file};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RunArg {
    /// Run configuration (JSON)
    config: PathBuf,
    /// Output directory
    output: PathBuf,
    /// Stage index to resume from; overrides `resume_stage` in the configuration
    #[arg(long)]
    resume_stage: Option<usize>,
}

pub(crate) fn run(arg: &RunArg) -> anyhow::Result<()> {
    let RunArg {
        config: config_path,
        output,
        resume_stage,
    } = arg;

    let config = RunConfig::from_path(config_path)?;
    let inputs = config
        .load_inputs()
        .with_context(|| format!("Invalid run configuration: {}", config_path.display()))?;
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    let state_path = output.join(config.state.as_deref().unwrap_or(Path::new("state.json")));
    let mut store = FileStateStore::new(state_path);
    let pipeline = Pipeline::new(&inputs);
    for (index, stage) in pipeline.stages().iter().enumerate() {
        tracing::debug!(index, stage = %stage.name(), "planned stage");
    }
    let start = resume_stage.unwrap_or(config.resume_stage);
    let report = pipeline.run(&mut store, start)?;

    let cuts = format_cut_tables(&inputs.features, &report.working_points);
    print!("{cuts}");
    write_text_file(&output.join("cuts.txt"), &cuts)?;
    save_json(
        &WorkingPointsDocument::new(&inputs.features, &report.working_points),
        &output.join("working_points.json"),
    )?;

    if !report.evaluations.is_empty() {
        println!();
        print!("{}", format_evaluation_table(&report.evaluations));
        save_json(
            &EvaluationDocument::new(&report.evaluations, inputs.evaluation.is_some()),
            &output.join("evaluation.json"),
        )?;
    }

    if !report.curves.is_empty() {
        let curves_dir = output.join("curves");
        fs::create_dir_all(&curves_dir).with_context(|| {
            format!("Failed to create curve directory: {}", curves_dir.display())
        })?;
        for curve in &report.curves {
            save_json(curve, &curves_dir.join(format!("{}.json", curve.id)))?;
        }
    }

    tracing::info!(
        state = %store.path().display(),
        output = %output.display(),
        skipped = report.skipped.len(),
        "run completed"
    );
    Ok(())
}
