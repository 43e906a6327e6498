use crate::runtime::settings::AddonSettings;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const PLUGIN_PATH_VAR: &str = "PXR_PLUGINPATH_NAME";
pub const ASSET_RESOLVER_VAR: &str = "USD_ASSET_RESOLVER";
pub const TF_DEBUG_VAR: &str = "TF_DEBUG";
pub const PYTHON_PATH_VAR: &str = "PYTHONPATH";
pub const PATH_VAR: &str = "PATH";
pub const LOG_LEVEL_VAR: &str = "AYONLOGGERLOGLVL";
pub const FILE_LOGGING_VAR: &str = "AYONLOGGERSFILELOGGING";
pub const FILE_LOG_POS_VAR: &str = "AYONLOGGERSFILEPOS";

/// Environment a child process needs to import and run the downloaded USD build.
///
/// The configuration is computed once and applied to the `Command` that
/// spawns the dependent process. It never touches the current process.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    vars: Vec<(String, OsString)>,
    python_paths: Vec<PathBuf>,
}

impl EnvironmentConfig {
    /// ### Parameters
    /// - `usd_root`: Root of the extracted USD build
    /// - `addon_dir`: The client addon directory, registered as plugin path
    /// - `settings`: Debug and logger flags
    /// - `base_path`: The `PATH` the child would otherwise inherit
    ///
    pub fn for_usd_root(
        usd_root: &Path,
        addon_dir: &Path,
        settings: &AddonSettings,
        base_path: Option<OsString>,
    ) -> Result<Self, String> {
        let python_dir = usd_root.join("lib").join("python");
        let bin_dir = usd_root.join("bin");

        let mut search: Vec<PathBuf> = base_path
            .as_ref()
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default();
        search.push(bin_dir);
        let path = std::env::join_paths(search)
            .map_err(|e| format!("Failed to build {}: {}", PATH_VAR, e))?;

        let vars = vec![
            (PLUGIN_PATH_VAR.to_string(), addon_dir.as_os_str().to_os_string()),
            (ASSET_RESOLVER_VAR.to_string(), OsString::new()),
            (TF_DEBUG_VAR.to_string(), OsString::from(&settings.tf_debug)),
            (PYTHON_PATH_VAR.to_string(), python_dir.as_os_str().to_os_string()),
            (PATH_VAR.to_string(), path),
            (LOG_LEVEL_VAR.to_string(), OsString::from(&settings.log_level)),
            (FILE_LOGGING_VAR.to_string(), OsString::from(&settings.file_logging)),
            (FILE_LOG_POS_VAR.to_string(), OsString::from(&settings.file_log_pos)),
        ];

        Ok(EnvironmentConfig {
            vars,
            python_paths: vec![python_dir],
        })
    }

    /// Same as [`EnvironmentConfig::for_usd_root`] with the current `PATH` as base.
    pub fn from_current_path(
        usd_root: &Path,
        addon_dir: &Path,
        settings: &AddonSettings,
    ) -> Result<Self, String> {
        Self::for_usd_root(usd_root, addon_dir, settings, std::env::var_os(PATH_VAR))
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &OsString)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&OsString> {
        self.vars.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Module search path entries for an embedded interpreter.
    pub fn python_paths(&self) -> &[PathBuf] {
        &self.python_paths
    }

    pub fn apply(&self, cmd: &mut Command) {
        for (key, value) in &self.vars {
            cmd.env(key, value);
        }
    }
}
