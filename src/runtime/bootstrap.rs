use crate::builder::content::FILES_INFO;
use crate::runtime::settings::AddonSettings;
use crate::runtime::store::DownloadStore;
use crate::types::source::ArchiveRecord;
use crate::utils::{
    archive::extract_archive,
    checksum,
    fetch::{Fetch, is_remote, join_location},
    fs::{ensure_dir, remove_dir_if_exists},
    logger::Logger,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the runtime keeps downloaded archives and its download store.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimePaths {
    pub home: PathBuf,
}

impl RuntimePaths {
    /// `USDPACK_HOME`, else `<local data dir>/usdpack`.
    pub fn from_env() -> Result<Self, String> {
        if let Ok(home) = std::env::var("USDPACK_HOME") {
            if !home.trim().is_empty() {
                return Ok(RuntimePaths {
                    home: PathBuf::from(home),
                });
            }
        }
        let data = dirs::data_local_dir()
            .ok_or_else(|| "Failed to locate the local data directory".to_string())?;
        Ok(RuntimePaths {
            home: data.join("usdpack"),
        })
    }

    pub fn download_dir(&self) -> PathBuf {
        self.home.join("downloads")
    }

    pub fn store_file(&self, addon_name: &str) -> PathBuf {
        self.home.join("addons").join(format!("{}-usd.json", addon_name))
    }
}

/// Platform key used in `files_info.json`.
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "darwin",
        _ => "linux",
    }
}

/// Location of the server's private files: a URL, a version directory or its `private` dir.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageLocation(String);

impl PackageLocation {
    pub fn new(location: &str) -> Self {
        if is_remote(location) {
            return PackageLocation(location.to_string());
        }
        let path = Path::new(location);
        if path.join("private").join(FILES_INFO).is_file() {
            PackageLocation(path.join("private").to_string_lossy().into_owned())
        } else {
            PackageLocation(location.to_string())
        }
    }

    pub fn file(&self, filename: &str) -> String {
        join_location(&self.0, filename)
    }

    /// Reads `files_info.json` published next to the archives.
    pub fn server_records(&self, fetcher: &dyn Fetch, scratch: &Path) -> Result<Vec<ArchiveRecord>, String> {
        let dest = scratch.join(FILES_INFO);
        fetcher.fetch(&self.file(FILES_INFO), &dest)?;
        let txt = fs::read_to_string(&dest)
            .map_err(|e| format!("Failed to read {}: {}", dest.display(), e))?;
        serde_json::from_str(&txt).map_err(|e| format!("Invalid {}: {}", FILES_INFO, e))
    }
}

/// Returns the archive to fetch for `platform`, or `None` when nothing has to be downloaded.
///
/// ### Parameters
/// - `settings`: The addon settings
/// - `server_records`: Archives published by the server
/// - `store`: Downloads already present on this machine
/// - `platform`: The platform key to look up
///
pub fn download_needed(
    settings: &AddonSettings,
    server_records: &[ArchiveRecord],
    store: &DownloadStore,
    platform: &str,
) -> Option<ArchiveRecord> {
    if !settings.use_downloaded {
        return None;
    }
    let record = server_records.iter().find(|r| r.platform == platform)?;
    if store.find_current(record).is_some() {
        return None;
    }
    Some(record.clone())
}

/// Root of the USD build to use on this machine.
pub fn resolve_usd_root(
    settings: &AddonSettings,
    server_records: &[ArchiveRecord],
    store: &DownloadStore,
    platform: &str,
) -> Option<PathBuf> {
    if !settings.use_downloaded {
        return settings.custom_root(platform);
    }
    let record = server_records.iter().find(|r| r.platform == platform)?;
    store.find_current(record).map(|r| r.root.clone())
}

/// Fetches, verifies and extracts one archive, then records it in the store.
///
/// ### Parameters
/// - `record`: The archive to download
/// - `location`: Where the server publishes its archives
/// - `fetcher`: The transport
/// - `download_dir`: Runtime downloads directory
/// - `store`: The download store to update and save
///
pub fn download_usd(
    record: &ArchiveRecord,
    location: &PackageLocation,
    fetcher: &dyn Fetch,
    download_dir: &Path,
    store: &mut DownloadStore,
) -> Result<PathBuf, String> {
    let logger = Logger::new();
    ensure_dir(download_dir)?;

    let zip_path = download_dir.join(&record.filename);
    if !checksum::matches(&zip_path, &record.checksum, record.checksum_algorithm)? {
        if zip_path.exists() {
            fs::remove_file(&zip_path)
                .map_err(|e| format!("Failed to remove stale '{}': {}", zip_path.display(), e))?;
        }
        logger.debug(&format!("Fetching {} -> {}", record.filename, zip_path.display()));
        fetcher.fetch(&location.file(&record.filename), &zip_path)?;
        checksum::verify_file(&zip_path, &record.checksum, record.checksum_algorithm)?;
    }

    let stem = Path::new(&record.filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| record.filename.clone());
    let target = download_dir.join(&stem);
    remove_dir_if_exists(&target)?;
    let count = extract_archive(&zip_path, &target)?;
    logger.debug(&format!("Extracted {} file(s) into {}", count, target.display()));
    let root = usd_root_in(&target, &stem)?;

    store.upsert(record.clone(), root.clone());
    store.save()?;
    Ok(root)
}

/// Published archives wrap the build in a `<stem>/` folder; flat ones do not.
fn usd_root_in(target: &Path, stem: &str) -> Result<PathBuf, String> {
    let entries: Vec<fs::DirEntry> = fs::read_dir(target)
        .map_err(|e| format!("Failed to read directory '{}': {}", target.display(), e))?
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Failed to read directory '{}': {}", target.display(), e))?;

    match entries.as_slice() {
        [only] if only.file_name() == stem && only.path().is_dir() => Ok(only.path()),
        _ => Ok(target.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::ChecksumAlgorithm;
    use crate::utils::archive::ArchiveWriter;
    use crate::utils::fetch::LocalFetcher;

    /// Publishes a USD zip plus `files_info.json` in `<dir>/pkg/private`.
    fn publish(dir: &Path, platform: &str) -> (PackageLocation, ArchiveRecord) {
        publish_with_prefix(dir, platform, "")
    }

    fn publish_with_prefix(
        dir: &Path,
        platform: &str,
        prefix: &str,
    ) -> (PackageLocation, ArchiveRecord) {
        let private = dir.join("pkg").join("private");
        fs::create_dir_all(&private).unwrap();

        let payload = dir.join("pxr.py");
        fs::write(&payload, "# pxr").unwrap();
        let zip_path = private.join("usd-test.zip");
        let mut writer = ArchiveWriter::create(&zip_path).unwrap();
        writer
            .add_file(&payload, &format!("{}lib/python/pxr/__init__.py", prefix))
            .unwrap();
        writer.finish().unwrap();

        let record = ArchiveRecord {
            name: "usd".into(),
            filename: "usd-test.zip".into(),
            checksum: checksum::file_checksum(&zip_path, ChecksumAlgorithm::Sha256).unwrap(),
            checksum_algorithm: ChecksumAlgorithm::Sha256,
            platform: platform.into(),
        };
        fs::write(
            private.join(FILES_INFO),
            serde_json::to_string(&vec![record.clone()]).unwrap(),
        )
        .unwrap();

        (
            PackageLocation::new(&dir.join("pkg").to_string_lossy()),
            record,
        )
    }

    #[test]
    fn version_dir_resolves_to_private() {
        let dir = tempfile::tempdir().unwrap();
        let (location, _) = publish(dir.path(), "linux");
        assert_eq!(
            location.file("a.zip"),
            dir.path()
                .join("pkg")
                .join("private")
                .join("a.zip")
                .to_string_lossy()
        );
    }

    #[test]
    fn download_extracts_and_becomes_current() {
        let dir = tempfile::tempdir().unwrap();
        let (location, record) = publish(dir.path(), "linux");
        let paths = RuntimePaths {
            home: dir.path().join("home"),
        };
        let mut store = DownloadStore::load(&paths.store_file("usd")).unwrap();
        let settings = AddonSettings::default();

        let records = location
            .server_records(&LocalFetcher, dir.path())
            .unwrap();
        assert_eq!(records, vec![record.clone()]);
        assert_eq!(
            download_needed(&settings, &records, &store, "linux"),
            Some(record.clone())
        );

        let root = download_usd(
            &record,
            &location,
            &LocalFetcher,
            &paths.download_dir(),
            &mut store,
        )
        .unwrap();
        assert_eq!(root, paths.download_dir().join("usd-test"));
        assert!(root.join("lib/python/pxr/__init__.py").is_file());

        let reloaded = DownloadStore::load(&paths.store_file("usd")).unwrap();
        assert_eq!(download_needed(&settings, &records, &reloaded, "linux"), None);
        assert_eq!(
            resolve_usd_root(&settings, &records, &reloaded, "linux"),
            Some(root)
        );
    }

    #[test]
    fn wrapped_archive_root_is_the_inner_folder() {
        let dir = tempfile::tempdir().unwrap();
        let (location, record) = publish_with_prefix(dir.path(), "linux", "usd-test/");
        let download_dir = dir.path().join("dl");
        let mut store = DownloadStore::load(&dir.path().join("s.json")).unwrap();

        let root = download_usd(&record, &location, &LocalFetcher, &download_dir, &mut store)
            .unwrap();
        assert_eq!(root, download_dir.join("usd-test").join("usd-test"));
        assert!(root.join("lib").join("python").join("pxr").is_dir());
        assert_eq!(store.records()[0].root, root);
    }

    #[test]
    fn nothing_needed_without_platform_record_or_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let (_, record) = publish(dir.path(), "windows");
        let store = DownloadStore::load(&dir.path().join("s.json")).unwrap();

        assert_eq!(
            download_needed(&AddonSettings::default(), &[record.clone()], &store, "linux"),
            None
        );

        let disabled = AddonSettings {
            use_downloaded: false,
            ..Default::default()
        };
        assert_eq!(download_needed(&disabled, &[record], &store, "windows"), None);
    }

    #[test]
    fn corrupted_archive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (location, mut record) = publish(dir.path(), "linux");
        record.checksum = "00".repeat(32);
        let mut store = DownloadStore::load(&dir.path().join("s.json")).unwrap();

        let err = download_usd(
            &record,
            &location,
            &LocalFetcher,
            &dir.path().join("downloads"),
            &mut store,
        )
        .unwrap_err();
        assert!(err.contains("checksum mismatch"));
        assert!(store.records().is_empty());
    }

    #[test]
    fn platform_key_is_known() {
        assert!(["windows", "linux", "darwin"].contains(&current_platform()));
    }
}
