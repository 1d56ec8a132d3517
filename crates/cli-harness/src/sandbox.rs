use std::path::Path;
use tracing::info;

use crate::config::HarnessConfig;
use crate::deploy::{self, DeployPlan, DeployReport};
use crate::error::HarnessError;
use crate::runner::{CommandResult, CommandRunner};
use crate::scope;
use crate::workspace::{InstallLayout, Workspace};

/// One disposable workspace plus the settings used to run commands in it.
///
/// ```no_run
/// use cli_harness::Sandbox;
///
/// let mut sandbox = Sandbox::new()?;
/// let result = sandbox.context_exec("echo", &["hello"])?;
/// assert_eq!(result.exit_code(), Some(0));
/// if let Some(warning) = sandbox.done() {
///     eprintln!("{}", warning);
/// }
/// # Ok::<(), cli_harness::HarnessError>(())
/// ```
#[derive(Debug)]
pub struct Sandbox {
    config: HarnessConfig,
    workspace: Workspace,
    runner: CommandRunner,
}

impl Sandbox {
    pub fn new() -> Result<Self, HarnessError> {
        Self::with_config(HarnessConfig::default())
    }

    pub fn with_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        let workspace = Workspace::with_config(&config)?;
        Ok(Self {
            config,
            workspace,
            runner: CommandRunner::new(),
        })
    }

    pub fn with_runner(mut self, runner: CommandRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    pub fn layout(&self) -> &InstallLayout {
        self.workspace.layout()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Run `body` inside this sandbox's scope.
    pub fn with_context<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<HarnessError>,
    {
        scope::run(&self.workspace, &self.config, body)
    }

    /// Run a command line from the workspace root.
    pub fn exec(&self, command_line: &str) -> Result<CommandResult, HarnessError> {
        self.with_context(|| self.runner.run(command_line))
    }

    /// Run `cmd` with quoted `args` from the workspace root.
    pub fn context_exec<S: AsRef<str>>(
        &self,
        cmd: &str,
        args: &[S],
    ) -> Result<CommandResult, HarnessError> {
        self.with_context(|| self.runner.run_args(cmd, args))
    }

    pub fn deploy(&self, plan: &DeployPlan) -> Result<DeployReport, HarnessError> {
        deploy::deploy(&self.workspace, &self.config, &self.runner, plan)
    }

    /// Remove the workspace. Returns a cleanup warning instead of failing.
    #[must_use = "a cleanup warning should be reported"]
    pub fn done(&mut self) -> Option<HarnessError> {
        info!("Tearing down sandbox {}", self.workspace.root().display());
        self.workspace.destroy()
    }

    /// Keep the workspace on disk and return its root.
    pub fn persist(self) -> std::path::PathBuf {
        self.workspace.keep()
    }
}
