use crate::runtime::addon::{DownloadDialog, DownloadResult};
use crate::runtime::bootstrap::{PackageLocation, download_usd};
use crate::runtime::store::DownloadStore;
use crate::types::source::ArchiveRecord;
use crate::utils::{fetch, logger::Logger, spinner::spinner_bar};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::thread;
use tokio::sync::oneshot;

/// Terminal stand-in for the host's download window.
///
/// The download runs on a helper thread; the spinner is cleared on `close`.
pub struct ConsoleDownloadDialog {
    location: PackageLocation,
    download_dir: PathBuf,
    store_path: PathBuf,
    record: Option<ArchiveRecord>,
    bar: Option<ProgressBar>,
}

impl ConsoleDownloadDialog {
    pub fn new(location: PackageLocation, download_dir: PathBuf, store_path: PathBuf) -> Self {
        ConsoleDownloadDialog {
            location,
            download_dir,
            store_path,
            record: None,
            bar: None,
        }
    }
}

impl DownloadDialog for ConsoleDownloadDialog {
    fn show(&mut self, record: &ArchiveRecord) {
        self.record = Some(record.clone());
        self.bar = Some(spinner_bar(format!(
            "Downloading 3rd party dependencies: {}",
            record.filename
        )));
    }

    fn start(&mut self) -> oneshot::Receiver<DownloadResult> {
        let (tx, rx) = oneshot::channel();
        let Some(record) = self.record.clone() else {
            let _ = tx.send(Err("Download dialog started before being shown".to_string()));
            return rx;
        };

        let location = self.location.clone();
        let download_dir = self.download_dir.clone();
        let store_path = self.store_path.clone();
        let bar = self.bar.clone();

        thread::spawn(move || {
            let result = (|| {
                let fetcher = fetch::fetcher_for(&location.file(&record.filename))?;
                let mut store = DownloadStore::load(&store_path)?;
                download_usd(&record, &location, fetcher.as_ref(), &download_dir, &mut store)
            })();
            if let Some(bar) = &bar {
                bar.set_message(match &result {
                    Ok(_) => "Finished".to_string(),
                    Err(_) => "Failed".to_string(),
                });
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn close(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        if let Some(record) = self.record.take() {
            Logger::new().debug(&format!("Download window for {} closed", record.filename));
        }
    }
}
