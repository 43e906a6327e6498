use crate::runtime::bootstrap::{current_platform, download_needed};
use crate::runtime::settings::AddonSettings;
use crate::runtime::store::DownloadStore;
use crate::types::source::ArchiveRecord;
use crate::utils::logger::Logger;
use std::path::PathBuf;
use tokio::sync::oneshot;

pub type DownloadResult = Result<PathBuf, String>;

/// Lifecycle hooks the host calls on every addon.
pub trait AddonLifecycle {
    fn initialize(&mut self, settings: AddonSettings);
}

/// Hooks the host calls while its tray application runs.
pub trait TrayPresence {
    fn tray_start(&mut self) -> Result<(), String>;
    fn tray_exit(&mut self);
}

/// Modal download UI owned by the host.
///
/// `start` returns the single completion signal of the download.
pub trait DownloadDialog: Send {
    fn show(&mut self, record: &ArchiveRecord);
    fn start(&mut self) -> oneshot::Receiver<DownloadResult>;
    fn close(&mut self);
}

pub type DialogFactory = Box<dyn FnMut() -> Box<dyn DownloadDialog> + Send>;

struct PendingDownload {
    dialog: Box<dyn DownloadDialog>,
    completion: oneshot::Receiver<DownloadResult>,
}

/// Client side of the USD addon: downloads the USD build on tray start.
pub struct UsdAddon {
    name: String,
    enabled: bool,
    settings: AddonSettings,
    server_records: Vec<ArchiveRecord>,
    store_path: PathBuf,
    platform: String,
    dialog_factory: DialogFactory,
    pending: Option<PendingDownload>,
}

impl UsdAddon {
    pub fn new(
        name: &str,
        server_records: Vec<ArchiveRecord>,
        store_path: PathBuf,
        dialog_factory: DialogFactory,
    ) -> Self {
        UsdAddon {
            name: name.to_string(),
            enabled: false,
            settings: AddonSettings::default(),
            server_records,
            store_path,
            platform: current_platform().to_string(),
            dialog_factory,
            pending: None,
        }
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_downloading(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits for the running download, then closes and drops its dialog.
    ///
    /// Returns `None` when no download was started.
    pub async fn finish_download(&mut self) -> Option<DownloadResult> {
        let PendingDownload {
            mut dialog,
            completion,
        } = self.pending.take()?;

        let result = completion
            .await
            .unwrap_or_else(|_| Err("Download ended without reporting a result".to_string()));
        dialog.close();
        Some(result)
    }
}

impl AddonLifecycle for UsdAddon {
    fn initialize(&mut self, settings: AddonSettings) {
        self.enabled = true;
        self.settings = settings;
        self.pending = None;
    }
}

impl TrayPresence for UsdAddon {
    fn tray_start(&mut self) -> Result<(), String> {
        if !self.enabled || self.pending.is_some() {
            return Ok(());
        }

        let store = DownloadStore::load(&self.store_path)?;
        let Some(record) =
            download_needed(&self.settings, &self.server_records, &store, &self.platform)
        else {
            Logger::new().debug("USD is up to date, no download needed");
            return Ok(());
        };

        let mut dialog = (self.dialog_factory)();
        dialog.show(&record);
        let completion = dialog.start();
        self.pending = Some(PendingDownload { dialog, completion });
        Ok(())
    }

    fn tray_exit(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            pending.dialog.close();
        }
    }
}
