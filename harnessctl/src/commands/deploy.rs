use anyhow::{Context, Result};
use clap::Args;
use cli_harness::{DeployPlan, Sandbox};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Deploy plan (YAML)
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// Harness config file (YAML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep the workspace on disk afterwards
    #[arg(long)]
    pub keep: bool,
}

pub fn run(args: DeployArgs) -> Result<i32> {
    let config = super::load_config(args.config.as_deref())?;
    let plan = DeployPlan::from_yaml_file(&args.plan).context("Failed to load deploy plan")?;

    let sandbox = Sandbox::with_config(config).context("Failed to create workspace")?;
    let outcome = sandbox.deploy(&plan);
    let root = super::finish(sandbox, args.keep);
    let report = outcome.context("Deploy failed")?;

    let ok = report.all_succeeded();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "root": root,
            "kept": args.keep,
            "succeeded": ok,
            "steps": report.steps,
        }))?
    );
    Ok(if ok { 0 } else { 1 })
}
