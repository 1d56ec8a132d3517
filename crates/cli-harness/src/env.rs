//! Point-in-time copies of the process environment.
//!
//! The process environment is global and mutable. Nothing here locks it:
//! callers must not mutate it from other threads while a snapshot is being
//! captured or applied.

use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use tracing::debug;

use crate::config::{is_valid_var_name, HarnessConfig};
use crate::error::HarnessError;

/// An owned copy of every environment variable at the moment of capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars_os().collect(),
        }
    }

    /// Make the live environment equal to this snapshot.
    ///
    /// Variables that appeared after capture are removed; captured variables
    /// are reset to their captured values.
    pub fn apply(&self) {
        let live: Vec<(OsString, OsString)> = env::vars_os().collect();
        let mut removed = 0usize;
        let mut reset = 0usize;

        for (key, value) in &live {
            match self.vars.get(key) {
                None => {
                    env::remove_var(key);
                    removed += 1;
                }
                Some(captured) if captured != value => {
                    env::set_var(key, captured);
                    reset += 1;
                }
                Some(_) => {}
            }
        }

        for (key, value) in &self.vars {
            if env::var_os(key).is_none() {
                env::set_var(key, value);
                reset += 1;
            }
        }

        debug!(removed, reset, "environment restored from snapshot");
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn contains(&self, key: impl AsRef<OsStr>) -> bool {
        self.vars.contains_key(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

/// Holds the reference point a later `restore` goes back to.
#[derive(Debug, Default)]
pub struct EnvBackup {
    snapshot: Option<EnvSnapshot>,
}

impl EnvBackup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any previous snapshot with the current environment.
    pub fn capture(&mut self) -> &EnvSnapshot {
        self.snapshot.insert(EnvSnapshot::capture())
    }

    pub fn snapshot(&self) -> Option<&EnvSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn restore(&self) -> Result<(), HarnessError> {
        let snapshot = self.snapshot.as_ref().ok_or(HarnessError::MissingSnapshot)?;
        snapshot.apply();
        Ok(())
    }
}

/// Narrow the live environment for a scoped run.
///
/// Removes every denylisted variable, then points the two search-path
/// variables at the workspace install directories.
pub fn constrain(config: &HarnessConfig, lib: &Path, bin: &Path) -> Result<(), HarnessError> {
    for key in &config.denylist {
        if !is_valid_var_name(key) {
            return Err(HarnessError::setup(format!(
                "denylisted variable '{}' is not a valid name",
                key
            )));
        }
        if env::var_os(key).is_some() {
            debug!("Removing {} from scoped environment", key);
            env::remove_var(key);
        }
    }

    for (key, value) in [(&config.lib_path_var, lib), (&config.bin_path_var, bin)] {
        if !is_valid_var_name(key) {
            return Err(HarnessError::setup(format!(
                "search-path variable '{}' is not a valid name",
                key
            )));
        }
        env::set_var(key, value);
    }

    Ok(())
}
