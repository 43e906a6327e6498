use crate::types::source::ArchiveRecord;
use crate::utils::fs::ensure_dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// An archive that was downloaded and extracted on this machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadedRecord {
    #[serde(flatten)]
    pub archive: ArchiveRecord,
    pub root: PathBuf,
    pub downloaded_at: DateTime<Utc>,
}

/// JSON list of downloaded archives kept next to the runtime downloads.
#[derive(Debug, Clone)]
pub struct DownloadStore {
    path: PathBuf,
    records: Vec<DownloadedRecord>,
}

impl DownloadStore {
    /// Reads the store at `path`; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, String> {
        let records = if path.exists() {
            let txt = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            serde_json::from_str(&txt)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
        } else {
            Vec::new()
        };

        Ok(DownloadStore {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn records(&self) -> &[DownloadedRecord] {
        &self.records
    }

    /// Extracted root of a download matching `archive`'s checksum, if still on disk.
    pub fn find_current(&self, archive: &ArchiveRecord) -> Option<&DownloadedRecord> {
        self.records.iter().find(|r| {
            r.archive.checksum.eq_ignore_ascii_case(&archive.checksum) && r.root.is_dir()
        })
    }

    /// Replaces any record of the same platform with a fresh one.
    pub fn upsert(&mut self, archive: ArchiveRecord, root: PathBuf) {
        self.records
            .retain(|r| r.archive.platform != archive.platform || r.archive.name != archive.name);
        self.records.push(DownloadedRecord {
            archive,
            root,
            downloaded_at: Utc::now(),
        });
    }

    pub fn save(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| format!("Failed to serialize download store: {}", e))?;
        fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }
}
