use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.toml";

/// Per-platform list of directories holding a locally installed USD build.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlatformPaths {
    #[serde(default)]
    pub windows: Vec<PathBuf>,
    #[serde(default)]
    pub linux: Vec<PathBuf>,
    #[serde(default)]
    pub darwin: Vec<PathBuf>,
}

impl PlatformPaths {
    pub fn for_platform(&self, platform: &str) -> &[PathBuf] {
        match platform {
            "windows" => &self.windows,
            "linux" => &self.linux,
            "darwin" => &self.darwin,
            _ => &[],
        }
    }
}

/// Runtime settings of the addon, read from `settings.toml` in the addon directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AddonSettings {
    /// Download USD from the server. When false one of `custom_roots` is used.
    pub use_downloaded: bool,
    pub custom_roots: PlatformPaths,
    pub tf_debug: String,
    pub log_level: String,
    pub file_logging: String,
    pub file_log_pos: String,
}

impl Default for AddonSettings {
    fn default() -> Self {
        AddonSettings {
            use_downloaded: true,
            custom_roots: PlatformPaths::default(),
            tf_debug: "1".to_string(),
            log_level: "WARN".to_string(),
            file_logging: "1".to_string(),
            file_log_pos: ".log".to_string(),
        }
    }
}

impl AddonSettings {
    /// Loads `settings.toml` from `addon_dir`, falling back to defaults when absent.
    pub fn load(addon_dir: &Path) -> Result<Self, String> {
        let path = addon_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(AddonSettings::default());
        }
        let txt = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        toml::from_str(&txt).map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))
    }

    /// First custom root for `platform` that exists on disk.
    pub fn custom_root(&self, platform: &str) -> Option<PathBuf> {
        self.custom_roots
            .for_platform(platform)
            .iter()
            .find(|p| p.is_dir())
            .cloned()
    }
}
