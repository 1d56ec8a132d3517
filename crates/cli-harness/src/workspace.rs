use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// The fixed install subtree inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    base_name: String,
    dir: PathBuf,
}

impl InstallLayout {
    fn new(root: &Path, base_name: &str) -> Self {
        Self {
            base_name: base_name.to_string(),
            dir: root.join(base_name),
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn install_dir(&self) -> &Path {
        &self.dir
    }

    pub fn bin(&self) -> PathBuf {
        self.dir.join("bin")
    }

    pub fn lib(&self) -> PathBuf {
        self.dir.join("lib")
    }
}

/// A uniquely named temporary directory with the install layout created
/// up front.
///
/// Dropping a workspace removes it best-effort; call [`Workspace::destroy`]
/// to find out whether removal actually worked.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    layout: InstallLayout,
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn create() -> Result<Self, HarnessError> {
        Self::with_config(&HarnessConfig::default())
    }

    pub fn with_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        Self::create_in(&std::env::temp_dir(), config)
    }

    /// Create the workspace under `parent` instead of the system temp dir.
    pub fn create_in(parent: &Path, config: &HarnessConfig) -> Result<Self, HarnessError> {
        let dir = tempfile::Builder::new()
            .prefix(&config.temp_prefix)
            .tempdir_in(parent)
            .map_err(|source| HarnessError::WorkspaceCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;

        let root = normalize_root(dir.path()).map_err(|source| {
            HarnessError::WorkspaceCreationFailed {
                path: dir.path().to_path_buf(),
                source,
            }
        })?;

        let layout = InstallLayout::new(&root, &config.layout_dir);
        for sub in [layout.bin(), layout.lib()] {
            fs::create_dir_all(&sub)
                .map_err(|source| HarnessError::WorkspaceCreationFailed { path: sub, source })?;
        }

        debug!("Created workspace {}", root.display());
        Ok(Self {
            root,
            layout,
            dir: Some(dir),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn install_dir(&self) -> &Path {
        self.layout.install_dir()
    }

    pub fn install_bin(&self) -> PathBuf {
        self.layout.bin()
    }

    pub fn install_lib(&self) -> PathBuf {
        self.layout.lib()
    }

    pub fn is_destroyed(&self) -> bool {
        self.dir.is_none()
    }

    /// Remove the workspace tree.
    ///
    /// Safe to call repeatedly. A removal failure comes back as a
    /// `CleanupWarning` and is logged; it is never raised.
    #[must_use = "a cleanup warning should be reported"]
    pub fn destroy(&mut self) -> Option<HarnessError> {
        let dir = self.dir.take()?;
        match dir.close() {
            Ok(()) => {
                debug!("Removed workspace {}", self.root.display());
                None
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                warn!(
                    "Failed to remove workspace {}: {}",
                    self.root.display(),
                    source
                );
                Some(HarnessError::CleanupWarning {
                    path: self.root.clone(),
                    source,
                })
            }
        }
    }

    /// Stop managing the directory so it outlives this value.
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.dir.take() {
            let _ = dir.keep();
        }
        self.root.clone()
    }
}

#[cfg(unix)]
fn normalize_root(path: &Path) -> io::Result<PathBuf> {
    // Temp dirs may sit behind symlinks (macOS /var); current_dir() reports
    // the resolved path, so the root must match it.
    fs::canonicalize(path)
}

#[cfg(not(unix))]
fn normalize_root(path: &Path) -> io::Result<PathBuf> {
    Ok(path.to_path_buf())
}
