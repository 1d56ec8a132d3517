use anyhow::{Context, Result};
use clap::Args;
use cli_harness::runner::shell_escape;
use cli_harness::{DeployPlan, DeployReport, ExitOutcome, Sandbox};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::expect::{ExpectationOutcome, Expectations};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Harness config file (YAML); defaults to HARNESS_CONFIG / built-ins
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deploy plan to apply before running the command
    #[arg(long, value_name = "FILE")]
    pub plan: Option<PathBuf>,

    /// Keep the workspace on disk after the run
    #[arg(long)]
    pub keep: bool,

    /// Fail unless the command exits with this status
    #[arg(long, value_name = "CODE")]
    pub expect_status: Option<i32>,

    /// Fail unless the combined output matches this regex (repeatable)
    #[arg(long = "expect", value_name = "REGEX")]
    pub expect: Vec<String>,

    /// Command to run from the workspace root. A single argument is passed
    /// to the shell as-is; several are quoted as separate words.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput {
    root: String,
    kept: bool,
    output: String,
    status: ExitOutcome,
    exit_code: Option<i32>,
    duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    deploy: Option<DeployReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    expectations: Vec<ExpectationOutcome>,
}

pub fn run(args: RunArgs) -> Result<i32> {
    let config = super::load_config(args.config.as_deref())?;
    let expectations = Expectations::new(args.expect_status, &args.expect)?;
    let plan = args
        .plan
        .as_deref()
        .map(DeployPlan::from_yaml_file)
        .transpose()
        .context("Failed to load deploy plan")?;

    let sandbox = Sandbox::with_config(config).context("Failed to create workspace")?;
    let command_line = join_command(&args.command);

    // Run inside a closure so the sandbox is always finished, even on error.
    let outcome = (|| -> Result<_> {
        let deploy = match &plan {
            Some(plan) => Some(sandbox.deploy(plan).context("Deploy failed")?),
            None => None,
        };
        info!("Running `{}` in {}", command_line, sandbox.root().display());
        let result = sandbox.exec(&command_line)?;
        Ok((deploy, result))
    })();
    let root = super::finish(sandbox, args.keep);
    let (deploy, result) = outcome?;

    let outcomes = expectations.evaluate(&result);
    let passed = outcomes.iter().all(|o| o.passed);

    let report = RunOutput {
        root,
        kept: args.keep,
        exit_code: result.exit_code(),
        output: result.output,
        status: result.status,
        duration_ms: result.duration_ms,
        deploy,
        expectations: outcomes,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !expectations.is_empty() && !passed {
        eprintln!("One or more expectations failed");
        return Ok(1);
    }
    Ok(0)
}

fn join_command(words: &[String]) -> String {
    match words {
        [line] => line.clone(),
        _ => words
            .iter()
            .map(|word| shell_escape(word))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
