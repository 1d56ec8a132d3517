use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::paths;
use crate::runner::{shell_escape, CommandResult, CommandRunner};
use crate::scope;
use crate::workspace::Workspace;

/// What to do when an install or check command exits nonzero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyPolicy {
    /// Stop at the first failing command with `DeployFailed`.
    #[default]
    Strict,
    /// Log the failure and keep going.
    Lenient,
}

/// Installs the tool under test into a workspace.
///
/// Command templates may use `{root}`, `{install_dir}`, `{bin}` and `{lib}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPlan {
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    /// Dependency manifest written to the workspace root before installing.
    #[serde(default)]
    pub manifest: Option<String>,
    #[serde(default)]
    pub install: Option<String>,
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(default)]
    pub verify: VerifyPolicy,
}

fn default_manifest_name() -> String {
    "Gemfile".to_string()
}

impl Default for DeployPlan {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
            manifest: None,
            install: None,
            checks: Vec::new(),
            verify: VerifyPolicy::default(),
        }
    }
}

impl DeployPlan {
    pub fn from_yaml_file(path: &Path) -> Result<Self, HarnessError> {
        let load_err = |message: String| HarnessError::ConfigLoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let plan: Self = serde_yaml::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        plan.validate().map_err(load_err)?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), String> {
        let name = Path::new(&self.manifest_name);
        if self.manifest_name.is_empty()
            || name.components().count() != 1
            || name.file_name().is_none()
        {
            return Err(format!(
                "manifestName '{}' must be a plain file name",
                self.manifest_name
            ));
        }
        Ok(())
    }

    fn commands(&self) -> impl Iterator<Item = &String> {
        self.install.iter().chain(self.checks.iter())
    }
}

/// One executed install or check command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStep {
    pub command: String,
    pub result: CommandResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub steps: Vec<DeployStep>,
}

impl DeployReport {
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.result.success())
    }
}

/// Substitute workspace placeholders in a command template.
///
/// Each path is shell-quoted so it stays one word whatever the temp
/// directory is called.
pub fn expand(template: &str, workspace: &Workspace) -> String {
    let quoted = |path: &Path| shell_escape(&paths::display(path));
    template
        .replace("{root}", &quoted(workspace.root()))
        .replace("{install_dir}", &quoted(workspace.install_dir()))
        .replace("{bin}", &quoted(&workspace.install_bin()))
        .replace("{lib}", &quoted(&workspace.install_lib()))
}

/// Write the manifest, then run the install command and every check inside
/// a scope bound to `workspace`.
#[instrument(skip_all, fields(root = %workspace.root().display()))]
pub fn deploy(
    workspace: &Workspace,
    config: &HarnessConfig,
    runner: &CommandRunner,
    plan: &DeployPlan,
) -> Result<DeployReport, HarnessError> {
    plan.validate().map_err(HarnessError::setup)?;

    if let Some(manifest) = &plan.manifest {
        let path = workspace.root().join(&plan.manifest_name);
        fs::write(&path, manifest).map_err(|e| {
            HarnessError::setup(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!("Wrote dependency manifest {}", path.display());
    }

    scope::run(workspace, config, || {
        let mut report = DeployReport::default();
        for template in plan.commands() {
            let command = expand(template, workspace);
            let result = runner.run(&command)?;

            if !result.success() {
                match plan.verify {
                    VerifyPolicy::Strict => {
                        return Err(HarnessError::DeployFailed {
                            command,
                            status: result.status,
                            output: result.output,
                        });
                    }
                    VerifyPolicy::Lenient => {
                        warn!("Deploy step `{}` failed with {}", command, result.status);
                    }
                }
            }
            report.steps.push(DeployStep { command, result });
        }
        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_defaults_to_strict_gemfile() {
        let plan: DeployPlan = serde_yaml::from_str("install: bundle install\n").unwrap();
        assert_eq!(plan.manifest_name, "Gemfile");
        assert_eq!(plan.verify, VerifyPolicy::Strict);
        assert!(plan.checks.is_empty());
    }

    #[test]
    fn lenient_policy_parses() {
        let plan: DeployPlan =
            serde_yaml::from_str("verify: lenient\nchecks: [\"tool --help\"]\n").unwrap();
        assert_eq!(plan.verify, VerifyPolicy::Lenient);
        assert_eq!(plan.commands().count(), 1);
    }

    #[test]
    fn manifest_name_must_be_a_file_name() {
        let plan = DeployPlan {
            manifest_name: "../Gemfile".to_string(),
            ..DeployPlan::default()
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn expand_substitutes_layout_paths() {
        let ws = Workspace::create().unwrap();
        let line = expand("install --path {install_dir} --bin {bin}", &ws);
        assert!(line.contains(&paths::display(ws.install_dir())));
        assert!(line.contains(&paths::display(&ws.install_bin())));
        assert!(!line.contains('{'));
    }

    #[test]
    #[cfg(unix)]
    fn expand_quotes_paths_with_spaces() {
        let parent = tempfile::Builder::new()
            .prefix("with space ")
            .tempdir()
            .unwrap();
        let ws = Workspace::create_in(parent.path(), &HarnessConfig::default()).unwrap();

        let line = expand("mkdir -p {install_dir}/marker", &ws);

        let expected = format!("mkdir -p '{}'/marker", paths::display(ws.install_dir()));
        assert_eq!(line, expected);
    }
}
