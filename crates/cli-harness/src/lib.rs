//! Run a command-line tool end-to-end inside a disposable workspace.
//!
//! A [`Workspace`] is a fresh temp directory with a fixed install layout.
//! [`scope::run`] changes into it, strips host variables that would leak
//! dependency configuration into the tool under test, points the search
//! paths at the workspace, runs the caller's work and then restores the
//! previous directory and the full environment, whatever happened.
//! [`CommandRunner`] shells out and captures merged output and exit status.
//!
//! Only one scope may be active per process.

pub mod config;
pub mod deploy;
pub mod env;
pub mod error;
pub mod paths;
pub mod runner;
pub mod sandbox;
pub mod scope;
pub mod workspace;

pub use config::HarnessConfig;
pub use deploy::{DeployPlan, DeployReport, DeployStep, VerifyPolicy};
pub use env::{EnvBackup, EnvSnapshot};
pub use error::HarnessError;
pub use runner::{CommandResult, CommandRunner, ExitOutcome};
pub use sandbox::Sandbox;
pub use workspace::{InstallLayout, Workspace};
