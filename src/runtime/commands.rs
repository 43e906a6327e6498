use crate::builder::content::FILES_INFO;
use crate::runtime::addon::{AddonLifecycle, DownloadDialog, TrayPresence, UsdAddon};
use crate::runtime::bootstrap::{PackageLocation, RuntimePaths, current_platform, resolve_usd_root};
use crate::runtime::dialog::ConsoleDownloadDialog;
use crate::runtime::environment::{EnvironmentConfig, PLUGIN_PATH_VAR};
use crate::runtime::settings::AddonSettings;
use crate::runtime::store::DownloadStore;
use crate::types::source::ArchiveRecord;
use crate::utils::{
    fetch::fetcher_for,
    fs::ensure_dir,
    logger::{LogLevel, Logger},
};
use std::path::{Path, PathBuf};
use std::process::Command;

const FALLBACK_ADDON_NAME: &str = "usd";

/// Everything the runtime commands need, resolved once.
pub struct RuntimeContext {
    pub location: PackageLocation,
    pub addon_dir: PathBuf,
    pub settings: AddonSettings,
    pub records: Vec<ArchiveRecord>,
    pub paths: RuntimePaths,
    pub addon_name: String,
}

impl RuntimeContext {
    /// Reads settings and the server's `files_info.json`. Performs blocking I/O.
    ///
    /// ### Parameters
    /// - `package`: URL or directory where the server publishes its private files
    /// - `addon_dir`: The client addon directory
    ///
    pub fn load(package: &str, addon_dir: &Path) -> Result<Self, String> {
        let location = PackageLocation::new(package);
        let settings = AddonSettings::load(addon_dir)?;
        let paths = RuntimePaths::from_env()?;
        let scratch = paths.download_dir();
        ensure_dir(&scratch)?;

        let fetcher = fetcher_for(&location.file(FILES_INFO))?;
        let records = location.server_records(fetcher.as_ref(), &scratch)?;
        let addon_name = records
            .first()
            .map(|r| r.name.clone())
            .unwrap_or_else(|| FALLBACK_ADDON_NAME.to_string());

        Ok(RuntimeContext {
            location,
            addon_dir: addon_dir.to_path_buf(),
            settings,
            records,
            paths,
            addon_name,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.paths.store_file(&self.addon_name)
    }

    /// Environment for the USD build resolved on this machine.
    pub fn environment(&self) -> Result<EnvironmentConfig, String> {
        let platform = current_platform();
        let store = DownloadStore::load(&self.store_path())?;
        let root = resolve_usd_root(&self.settings, &self.records, &store, platform)
            .ok_or_else(|| {
                format!(
                    "No USD build available for {}; run 'usdpack bootstrap' first",
                    platform
                )
            })?;
        EnvironmentConfig::from_current_path(&root, &self.addon_dir, &self.settings)
    }
}

/// Runs the tray start flow with the console download dialog.
pub async fn bootstrap(ctx: RuntimeContext) -> Result<Option<PathBuf>, String> {
    let logger = Logger::new();
    let location = ctx.location.clone();
    let download_dir = ctx.paths.download_dir();
    let store_path = ctx.store_path();

    let dialog_store = store_path.clone();
    let mut addon = UsdAddon::new(
        &ctx.addon_name,
        ctx.records.clone(),
        store_path,
        Box::new(move || {
            Box::new(ConsoleDownloadDialog::new(
                location.clone(),
                download_dir.clone(),
                dialog_store.clone(),
            )) as Box<dyn DownloadDialog>
        }),
    );

    addon.initialize(ctx.settings.clone());
    addon.tray_start()?;

    let outcome = match addon.finish_download().await {
        Some(result) => {
            let root = result?;
            logger.log_message(
                LogLevel::Success,
                &format!("USD for {} ready at {}", addon.name(), root.display()),
            );
            Some(root)
        }
        None => {
            logger.info("USD is already available, nothing to download");
            None
        }
    };

    addon.tray_exit();
    Ok(outcome)
}

/// Prints the environment as `KEY=VALUE` lines.
pub fn print_env(ctx: &RuntimeContext) -> Result<(), String> {
    let env = ctx.environment()?;
    for (key, value) in env.vars() {
        println!("{}={}", key, value.to_string_lossy());
    }

    let python_paths: Vec<String> = env
        .python_paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    Logger::new().debug(&format!("Python search paths: {}", python_paths.join(", ")));
    Ok(())
}

/// Spawns `command` with the USD environment and returns its exit code.
pub fn exec(ctx: &RuntimeContext, command: &[String]) -> Result<i32, String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| "No command given to exec".to_string())?;

    let env = ctx.environment()?;
    if let Some(plugins) = env.get(PLUGIN_PATH_VAR) {
        Logger::new().debug(&format!(
            "Running {} with {}={}",
            program,
            PLUGIN_PATH_VAR,
            plugins.to_string_lossy()
        ));
    }

    let mut cmd = Command::new(program);
    cmd.args(args);
    env.apply(&mut cmd);

    let status = cmd
        .status()
        .map_err(|e| format!("Failed to run {}: {}", program, e))?;
    Ok(status.code().unwrap_or(1))
}
