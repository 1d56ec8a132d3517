//! Scoped execution: change into a workspace, narrow the environment, run
//! some work, and always put both back.
//!
//! The working directory and the environment are process-wide. Only one
//! scope may be active per process at a time; entering a second one (from
//! a nested call or another thread) fails with `ContextSetupFailed`
//! instead of interleaving. Test suites that touch either resource outside
//! a scope must serialize themselves.

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument, warn};

use crate::config::HarnessConfig;
use crate::env::{constrain, EnvBackup};
use crate::error::HarnessError;
use crate::workspace::Workspace;

static SCOPE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Whether a scope is currently active in this process.
pub fn is_active() -> bool {
    SCOPE_ACTIVE.load(Ordering::SeqCst)
}

/// Run `body` with the working directory set to the workspace root and the
/// environment constrained per `config`.
///
/// The previous directory and the full environment are restored on every
/// exit path, including a panic in `body`. A failure from `body` is
/// returned after restoration completes.
#[instrument(skip_all, fields(root = %workspace.root().display()))]
pub fn run<T, E, F>(workspace: &Workspace, config: &HarnessConfig, body: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<HarnessError>,
{
    let mut context = ExecutionContext::enter(workspace, config)?;
    let outcome = body();
    let restored = context.restore();
    drop(context);

    match (outcome, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(restore_err)) => {
            warn!("Scope restoration failed after body error: {}", restore_err);
            Err(err)
        }
    }
}

struct ScopeSlot;

impl ScopeSlot {
    fn claim() -> Result<Self, HarnessError> {
        SCOPE_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ScopeSlot)
            .map_err(|_| HarnessError::setup("another execution scope is already active"))
    }
}

impl Drop for ScopeSlot {
    fn drop(&mut self) {
        SCOPE_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// State held for the lifetime of one scoped call.
struct ExecutionContext<'a> {
    workspace: &'a Workspace,
    backup: EnvBackup,
    prior_dir: Option<PathBuf>,
    restored: bool,
    // Released after Drop::drop has restored everything.
    _slot: ScopeSlot,
}

impl<'a> ExecutionContext<'a> {
    fn enter(workspace: &'a Workspace, config: &HarnessConfig) -> Result<Self, HarnessError> {
        let slot = ScopeSlot::claim()?;
        let mut context = Self {
            workspace,
            backup: EnvBackup::new(),
            prior_dir: None,
            restored: false,
            _slot: slot,
        };
        context.backup.capture();

        if let Err(err) = context.setup(config) {
            if let Err(restore_err) = context.restore() {
                warn!("Restoration after failed setup also failed: {}", restore_err);
            }
            return Err(err);
        }

        debug!("Entered scope at {}", workspace.root().display());
        Ok(context)
    }

    fn setup(&mut self, config: &HarnessConfig) -> Result<(), HarnessError> {
        let prior = env::current_dir().map_err(|e| {
            HarnessError::setup(format!("cannot read current directory: {}", e))
        })?;
        self.prior_dir = Some(prior);

        let root = self.workspace.root();
        env::set_current_dir(root).map_err(|e| {
            HarnessError::setup(format!("cannot change into {}: {}", root.display(), e))
        })?;

        constrain(
            config,
            &self.workspace.install_lib(),
            &self.workspace.install_bin(),
        )
    }

    fn restore(&mut self) -> Result<(), HarnessError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        let env_result = self.backup.restore();
        let dir_result = match &self.prior_dir {
            Some(dir) => env::set_current_dir(dir).map_err(|e| HarnessError::RestoreFailed {
                message: format!("cannot return to {}: {}", dir.display(), e),
            }),
            None => Ok(()),
        };

        debug!("Left scope at {}", self.workspace.root().display());
        env_result.and(dir_result)
    }
}

impl Drop for ExecutionContext<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!("Scope restoration during unwind failed: {}", err);
        }
    }
}
