pub mod deploy;
pub mod run;
pub mod show_config;

use anyhow::{Context, Result};
use cli_harness::{paths, HarnessConfig, Sandbox};
use std::path::Path;
use tracing::{info, warn};

/// Load `--config` if given, otherwise the environment-derived config.
pub(crate) fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => HarnessConfig::from_env().context("Failed to load config from environment"),
    }
}

/// Tear the sandbox down (or keep it) and return the root for reporting.
pub(crate) fn finish(mut sandbox: Sandbox, keep: bool) -> String {
    let root = paths::display(sandbox.root());
    if keep {
        let kept = sandbox.persist();
        info!("Keeping workspace {}", kept.display());
    } else if let Some(warning) = sandbox.done() {
        warn!("{}", warning);
    }
    root
}
