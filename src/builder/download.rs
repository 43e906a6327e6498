use crate::types::source::{ArchiveRecord, UsdSource};
use crate::utils::{
    checksum,
    fetch::{Fetch, filename_from_url},
    logger::Logger,
};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub records: Vec<ArchiveRecord>,
    pub cache_hits: usize,
    pub downloaded: usize,
}

/// Makes sure every source archive is present in `downloads_dir` with the
/// declared checksum.
///
/// A file that already hashes to the declared checksum is kept. Anything else
/// is removed and fetched again; a mismatch after fetching aborts the run.
///
/// ### Parameters
/// - `sources`: The archives to fetch, in order
/// - `downloads_dir`: The scratch downloads directory
/// - `addon_name`: Name recorded in each archive record
/// - `fetcher`: Transport used for cache misses
///
pub fn download_sources(
    sources: &[UsdSource],
    downloads_dir: &Path,
    addon_name: &str,
    fetcher: &dyn Fetch,
) -> Result<DownloadReport, String> {
    let logger = Logger::new();
    let mut report = DownloadReport::default();

    for source in sources {
        let filename = filename_from_url(&source.url)?;
        let zip_path = downloads_dir.join(&filename);
        report.records.push(ArchiveRecord {
            name: addon_name.to_string(),
            filename: filename.clone(),
            checksum: source.checksum.clone(),
            checksum_algorithm: source.checksum_algorithm,
            platform: source.platform.clone(),
        });

        if zip_path.exists() {
            if checksum::matches(&zip_path, &source.checksum, source.checksum_algorithm)? {
                logger.debug(&format!("USD zip from {} already exists", source.url));
                report.cache_hits += 1;
                continue;
            }
            fs::remove_file(&zip_path).map_err(|e| {
                format!("Failed to remove stale '{}': {}", zip_path.display(), e)
            })?;
        }

        logger.debug(&format!("USD zip from {} -> {}", source.url, zip_path.display()));
        fetcher.fetch(&source.url, &zip_path)?;
        checksum::verify_file(&zip_path, &source.checksum, source.checksum_algorithm)?;
        report.downloaded += 1;
    }

    Ok(report)
}
