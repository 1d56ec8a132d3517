use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::HarnessError;

/// Variables that would point the tool under test back at the host's own
/// dependency manager or interpreter options.
pub const DEFAULT_DENYLIST: &[&str] = &["BUNDLE_GEMFILE", "BUNDLE_BIN_PATH", "RUBYOPT"];

/// Settings shared by workspaces and scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
    /// Name of the install subtree under the workspace root.
    pub layout_dir: String,
    /// Variables removed for the duration of a scope.
    pub denylist: Vec<String>,
    /// Search-path variable pointed at the install `lib` directory.
    pub lib_path_var: String,
    /// Search-path variable pointed at the install `bin` directory.
    pub bin_path_var: String,
    /// Prefix for workspace directory names.
    pub temp_prefix: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            layout_dir: "gems".to_string(),
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            lib_path_var: "RUBYLIB".to_string(),
            bin_path_var: "RUBYPATH".to_string(),
            temp_prefix: "cli-harness-".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Load a YAML config file. Missing keys fall back to defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, HarnessError> {
        debug!("Loading harness config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| HarnessError::ConfigLoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| HarnessError::ConfigLoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate().map_err(|message| HarnessError::ConfigLoadFailed {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Build the effective config from `HARNESS_CONFIG`, then apply
    /// `HARNESS_LAYOUT_DIR` and `HARNESS_DENYLIST` overrides.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut config = match env::var("HARNESS_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(&PathBuf::from(path))?,
            _ => Self::default(),
        };

        if let Ok(dir) = env::var("HARNESS_LAYOUT_DIR") {
            if !dir.trim().is_empty() {
                config.layout_dir = dir.trim().to_string();
            }
        }

        if let Ok(list) = env::var("HARNESS_DENYLIST") {
            config.denylist = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate().map_err(|message| HarnessError::ConfigLoadFailed {
            path: PathBuf::from("<environment>"),
            message,
        })?;
        Ok(config)
    }

    /// Check that every name can be used as a path component or a variable.
    pub fn validate(&self) -> Result<(), String> {
        let layout = Path::new(&self.layout_dir);
        if self.layout_dir.is_empty() || layout.components().count() != 1 || layout.is_absolute()
        {
            return Err(format!(
                "layoutDir '{}' must be a single relative path component",
                self.layout_dir
            ));
        }
        if self.layout_dir == ".." || self.layout_dir == "." {
            return Err(format!("layoutDir '{}' is not allowed", self.layout_dir));
        }

        for name in self
            .denylist
            .iter()
            .chain([&self.lib_path_var, &self.bin_path_var])
        {
            if !is_valid_var_name(name) {
                return Err(format!("'{}' is not a valid environment variable name", name));
            }
        }
        Ok(())
    }
}

pub(crate) fn is_valid_var_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_gem_layout() {
        let config = HarnessConfig::default();
        assert_eq!(config.layout_dir, "gems");
        assert_eq!(config.lib_path_var, "RUBYLIB");
        assert_eq!(config.bin_path_var, "RUBYPATH");
        assert_eq!(
            config.denylist,
            vec!["BUNDLE_GEMFILE", "BUNDLE_BIN_PATH", "RUBYOPT"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_file_overrides_only_given_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harness.yaml");
        fs::write(&path, "layoutDir: vendor\ndenylist: [NODE_OPTIONS]\n").unwrap();

        let config = HarnessConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.layout_dir, "vendor");
        assert_eq!(config.denylist, vec!["NODE_OPTIONS"]);
        assert_eq!(config.lib_path_var, "RUBYLIB");
    }

    #[test]
    fn yaml_file_with_bad_variable_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("harness.yaml");
        fs::write(&path, "libPathVar: \"A=B\"\n").unwrap();

        let err = HarnessConfig::from_yaml_file(&path).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigLoadFailed { .. }));
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let err = HarnessConfig::from_yaml_file(Path::new("/nonexistent/harness.yaml"))
            .unwrap_err();
        assert_eq!(err.code(), "HARNESS_CONFIG_LOAD_FAILED");
    }

    #[test]
    fn nested_layout_dir_is_rejected() {
        let config = HarnessConfig {
            layout_dir: "a/b".to_string(),
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_are_applied() {
        env::remove_var("HARNESS_CONFIG");
        env::set_var("HARNESS_LAYOUT_DIR", "deps");
        env::set_var("HARNESS_DENYLIST", "FOO_OPTS, BAR_PATH,,");

        let config = HarnessConfig::from_env().unwrap();

        env::remove_var("HARNESS_LAYOUT_DIR");
        env::remove_var("HARNESS_DENYLIST");

        assert_eq!(config.layout_dir, "deps");
        assert_eq!(config.denylist, vec!["FOO_OPTS", "BAR_PATH"]);
    }
}
