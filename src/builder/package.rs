use crate::builder::{content, download};
use crate::types::addon::AddonDescriptor;
use crate::types::source::UsdSource;
use crate::utils::{
    fetch::Fetch,
    fs::{ensure_dir, remove_dir_if_empty, remove_dir_if_exists},
    logger::{LogLevel, Logger},
    spinner,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Defaults to `<root>/package`.
    pub output_dir: Option<PathBuf>,
    pub skip_zip: bool,
    pub keep_sources: bool,
}

#[derive(Debug, Clone)]
pub struct PackageOutput {
    pub descriptor: AddonDescriptor,
    pub version_dir: PathBuf,
    pub archive: Option<PathBuf>,
    pub cache_hits: usize,
    pub downloaded: usize,
}

/// Builds the addon package for the repository at `root`.
///
/// Every step must succeed before the next one starts. A failure leaves
/// whatever was written so far; the next run purges it.
///
/// ### Parameters
/// - `root`: The addon repository root
/// - `options`: Output directory and zip flags
/// - `sources`: USD archives to bundle
/// - `fetcher`: Transport for archives missing from `<root>/downloads`
///
pub fn create_package(
    root: &Path,
    options: &PackageOptions,
    sources: &[UsdSource],
    fetcher: &dyn Fetch,
) -> Result<PackageOutput, String> {
    let logger = Logger::new();

    let descriptor = spinner::run_step(
        "Reading addon manifest",
        |d: &AddonDescriptor| format!("Preparing package for {}-{}", d.name, d.version),
        || AddonDescriptor::load(root),
    )?;

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| root.join("package"));
    let downloads_dir = root.join("downloads");
    ensure_dir(&downloads_dir)?;

    let report = spinner::run_step(
        &format!("Fetching {} USD archive(s)", sources.len()),
        |r: &download::DownloadReport| {
            format!(
                "USD archives ready ({} downloaded, {} cached)",
                r.downloaded, r.cache_hits
            )
        },
        || download::download_sources(sources, &downloads_dir, &descriptor.name, fetcher),
    )?;

    let addon_root = output_dir.join(&descriptor.name);
    let version_dir = descriptor.version_dir(&output_dir);
    if version_dir.is_dir() {
        logger.info(&format!("Purging {}", version_dir.display()));
        remove_dir_if_exists(&version_dir)?;
    }
    let out_file = output_dir.join(descriptor.archive_name());
    if out_file.is_file() {
        logger.info(&format!("Removing previous package {}", out_file.display()));
        fs::remove_file(&out_file)
            .map_err(|e| format!("Failed to remove '{}': {}", out_file.display(), e))?;
    }

    match content::fill_client_version(root, &descriptor)? {
        Some(path) => logger.debug(&format!("Wrote {}", path.display())),
        None => logger.debug("No client directory; version stamp skipped"),
    }

    spinner::run_step(
        "Copying server content",
        |count: &usize| format!("Copied {} server file(s)", count),
        || {
            ensure_dir(&version_dir)?;
            content::copy_server_content(root, &version_dir)
        },
    )?;

    spinner::run_step(
        "Copying USD archives",
        |info: &PathBuf| format!("Wrote {}", info.display()),
        || content::copy_archives(&downloads_dir, &version_dir, &report.records),
    )?;

    let client_zip = spinner::run_step(
        "Preparing client code zip",
        |zip: &Option<PathBuf>| match zip {
            Some(p) => format!("Client zip created: {}", p.display()),
            None => "Client directory was not found. Skipping".to_string(),
        },
        || content::zip_client_side(root, &version_dir),
    )?;
    if client_zip.is_none() {
        logger.warn("Package contains no client code");
    }

    let mut archive: Option<PathBuf> = None;
    if !options.skip_zip {
        let created = spinner::run_step(
            "Creating server package",
            |p: &PathBuf| format!("Output package can be found: {}", p.display()),
            || content::create_server_package(root, &version_dir, &out_file),
        )?;
        archive = Some(created);

        // Sources are removed only once the archive exists
        if !options.keep_sources {
            spinner::run_unit_step(
                "Removing source files for server package",
                "Source files removed",
                || {
                    remove_dir_if_exists(&version_dir)?;
                    remove_dir_if_empty(&addon_root)
                },
            )?;
        }
    }

    let mut trace = vec![format!(
        "USD archives: {} downloaded, {} cached",
        report.downloaded, report.cache_hits
    )];
    match &archive {
        Some(path) => trace.push(format!("Archive: {}", path.display())),
        None => trace.push(format!("Layout: {}", version_dir.display())),
    }
    logger.log_message_with_trace(LogLevel::Success, "Package creation finished", &trace);

    Ok(PackageOutput {
        descriptor,
        version_dir,
        archive,
        cache_hits: report.cache_hits,
        downloaded: report.downloaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::ChecksumAlgorithm;
    use crate::utils::fetch::LocalFetcher;
    use sha2::{Digest, Sha256};
    use std::fs;

    const ARCHIVE_BODY: &[u8] = b"pretend usd build";

    /// An addon repository plus a local "mirror" holding one USD archive.
    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        sources: Vec<UsdSource>,
    }

    fn fixture(mirror_body: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let mirror = dir.path().join("mirror");
        fs::create_dir_all(root.join("server/settings")).unwrap();
        fs::create_dir_all(root.join("client/usd_addon")).unwrap();
        fs::create_dir_all(&mirror).unwrap();

        fs::write(
            root.join("package.py"),
            "name = \"usd\"\nversion = \"1.0.0\"\nclient_dir = \"usd_addon\"\n",
        )
        .unwrap();
        fs::write(root.join("server/__init__.py"), "server").unwrap();
        fs::write(root.join("server/settings/main.py"), "settings").unwrap();
        fs::write(root.join("server/.DS_Store"), "junk").unwrap();
        fs::write(root.join("client/usd_addon/__init__.py"), "client").unwrap();
        fs::write(mirror.join("usd-24.03_linux_py39.zip"), mirror_body).unwrap();

        let sources = vec![UsdSource {
            release: "24.03".into(),
            platform: "linux".into(),
            url: mirror
                .join("usd-24.03_linux_py39.zip")
                .to_string_lossy()
                .into_owned(),
            checksum: hex::encode(Sha256::digest(ARCHIVE_BODY)),
            checksum_algorithm: ChecksumAlgorithm::Sha256,
        }];

        Fixture {
            _dir: dir,
            root,
            sources,
        }
    }

    fn run(fx: &Fixture, options: &PackageOptions) -> Result<PackageOutput, String> {
        create_package(&fx.root, options, &fx.sources, &LocalFetcher)
    }

    #[test]
    fn skip_zip_keeps_layout_without_archive() {
        let fx = fixture(ARCHIVE_BODY);
        let options = PackageOptions {
            skip_zip: true,
            ..Default::default()
        };
        let out = run(&fx, &options).unwrap();

        let version_dir = fx.root.join("package/usd/1.0.0");
        assert_eq!(out.version_dir, version_dir);
        assert!(out.archive.is_none());
        assert!(!fx.root.join("package/usd-1.0.0.zip").exists());
        assert!(version_dir.join("server/__init__.py").is_file());
        assert!(version_dir.join("server/settings/main.py").is_file());
        assert!(!version_dir.join("server/.DS_Store").exists());
        assert!(version_dir.join("private/client.zip").is_file());
        assert!(version_dir.join("private/files_info.json").is_file());
        assert!(version_dir.join("private/usd-24.03_linux_py39.zip").is_file());

        let stamp = fs::read_to_string(fx.root.join("client/usd_addon/version.py")).unwrap();
        assert!(stamp.contains("__version__ = \"1.0.0\""));
    }

    #[test]
    fn default_run_removes_sources_after_zipping() {
        let fx = fixture(ARCHIVE_BODY);
        let out = run(&fx, &PackageOptions::default()).unwrap();

        assert_eq!(out.archive, Some(fx.root.join("package/usd-1.0.0.zip")));
        assert!(fx.root.join("package/usd-1.0.0.zip").is_file());
        assert!(!fx.root.join("package/usd/1.0.0").exists());
        assert!(!fx.root.join("package/usd").exists());
    }

    #[test]
    fn skip_zip_rerun_drops_previous_archive() {
        let fx = fixture(ARCHIVE_BODY);
        run(&fx, &PackageOptions::default()).unwrap();
        assert!(fx.root.join("package/usd-1.0.0.zip").is_file());

        let options = PackageOptions {
            skip_zip: true,
            ..Default::default()
        };
        let out = run(&fx, &options).unwrap();
        assert!(out.archive.is_none());
        assert!(!fx.root.join("package/usd-1.0.0.zip").exists());
        assert!(fx.root.join("package/usd/1.0.0/server/__init__.py").is_file());
    }

    #[test]
    fn keep_sources_retains_layout() {
        let fx = fixture(ARCHIVE_BODY);
        let options = PackageOptions {
            keep_sources: true,
            ..Default::default()
        };
        run(&fx, &options).unwrap();

        assert!(fx.root.join("package/usd-1.0.0.zip").is_file());
        assert!(fx.root.join("package/usd/1.0.0/private/client.zip").is_file());
    }

    #[test]
    fn custom_output_dir_is_purged_per_version() {
        let fx = fixture(ARCHIVE_BODY);
        let output = fx.root.join("custom-out");
        let stale = output.join("usd/1.0.0/server/stale.py");
        let other_version = output.join("usd/0.9.0/server/__init__.py");
        for p in [&stale, &other_version] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "old").unwrap();
        }

        let options = PackageOptions {
            output_dir: Some(output.clone()),
            skip_zip: true,
            ..Default::default()
        };
        run(&fx, &options).unwrap();

        assert!(!stale.exists());
        assert!(other_version.exists());
        assert!(output.join("usd/1.0.0/server/__init__.py").is_file());
    }

    #[test]
    fn rerun_is_reproducible_and_uses_cache() {
        let fx = fixture(ARCHIVE_BODY);
        let options = PackageOptions {
            skip_zip: true,
            ..Default::default()
        };

        let first = run(&fx, &options).unwrap();
        let zip_path = fx.root.join("package/usd/1.0.0/private/client.zip");
        let first_zip = fs::read(&zip_path).unwrap();
        let first_settings =
            fs::read(fx.root.join("package/usd/1.0.0/server/settings/main.py")).unwrap();

        let second = run(&fx, &options).unwrap();
        assert_eq!(first.downloaded, 1);
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.cache_hits, 1);
        assert_eq!(fs::read(&zip_path).unwrap(), first_zip);
        assert_eq!(
            fs::read(fx.root.join("package/usd/1.0.0/server/settings/main.py")).unwrap(),
            first_settings
        );
    }

    #[test]
    fn checksum_mismatch_aborts_before_output() {
        let fx = fixture(b"corrupted download");
        let err = run(&fx, &PackageOptions::default()).unwrap_err();

        assert!(err.contains("checksum mismatch"));
        assert!(!fx.root.join("package").exists());
    }

    #[test]
    fn missing_server_dir_aborts() {
        let fx = fixture(ARCHIVE_BODY);
        fs::remove_dir_all(fx.root.join("server")).unwrap();

        let err = run(&fx, &PackageOptions::default()).unwrap_err();
        assert!(err.contains("Directory not found"));
        assert!(!fx.root.join("package/usd-1.0.0.zip").exists());
    }
}
