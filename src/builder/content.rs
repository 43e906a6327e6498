use crate::types::addon::{AddonDescriptor, MANIFEST_FILE};
use crate::types::source::ArchiveRecord;
use crate::utils::{
    archive::ArchiveWriter,
    fs::{self as ufs, IgnoreRules, ensure_dir, safe_copy_file},
};
use std::fs;
use std::path::{Path, PathBuf};

pub const FILES_INFO: &str = "files_info.json";
pub const CLIENT_ZIP: &str = "client.zip";

/// Rewrites `client/<client_dir>/version.py` for the current descriptor.
///
/// Returns `None` when the repository has no `client` directory.
pub fn fill_client_version(
    root: &Path,
    descriptor: &AddonDescriptor,
) -> Result<Option<PathBuf>, String> {
    let client_dir = root.join("client");
    if !client_dir.is_dir() {
        return Ok(None);
    }
    let version_dir = client_dir.join(&descriptor.client_dir);
    ensure_dir(&version_dir)?;

    let version_file = version_dir.join("version.py");
    fs::write(&version_file, client_version_content(descriptor)).map_err(|e| {
        format!(
            "Failed to write '{}': {}",
            version_file.display(),
            e
        )
    })?;
    Ok(Some(version_file))
}

fn client_version_content(descriptor: &AddonDescriptor) -> String {
    format!(
        "# -*- coding: utf-8 -*-\n\"\"\"Addon name and version, regenerated on every package build.\n\nDo not edit by hand; change package.py instead.\n\"\"\"\nname = \"{}\"\n__version__ = \"{}\"\n",
        descriptor.name, descriptor.version
    )
}

/// Copies the filtered `server` tree into `{version_dir}/server`.
///
/// ### Parameters
/// - `root`: The addon repository root
/// - `version_dir`: The package version directory
///
pub fn copy_server_content(root: &Path, version_dir: &Path) -> Result<usize, String> {
    let server_dir = root.join("server");
    let rules = IgnoreRules::server_defaults()?;
    let entries = ufs::find_files(&server_dir, &rules)?;

    let dst_root = version_dir.join("server");
    for entry in &entries {
        safe_copy_file(&entry.path, &dst_root.join(&entry.relative))?;
    }
    Ok(entries.len())
}

/// Copies the verified archives to `{version_dir}/private` next to `files_info.json`.
pub fn copy_archives(
    downloads_dir: &Path,
    version_dir: &Path,
    records: &[ArchiveRecord],
) -> Result<PathBuf, String> {
    let private_dir = version_dir.join("private");
    ensure_dir(&private_dir)?;

    for record in records {
        safe_copy_file(
            &downloads_dir.join(&record.filename),
            &private_dir.join(&record.filename),
        )?;
    }

    let info_path = private_dir.join(FILES_INFO);
    let json = serde_json::to_string(records)
        .map_err(|e| format!("Failed to serialize {}: {}", FILES_INFO, e))?;
    fs::write(&info_path, json)
        .map_err(|e| format!("Failed to write '{}': {}", info_path.display(), e))?;
    Ok(info_path)
}

/// Zips the filtered `client` tree into `{version_dir}/private/client.zip`.
///
/// Returns `None` when the repository has no `client` directory.
pub fn zip_client_side(root: &Path, version_dir: &Path) -> Result<Option<PathBuf>, String> {
    let client_dir = root.join("client");
    if !client_dir.is_dir() {
        return Ok(None);
    }

    let rules = IgnoreRules::server_defaults()?;
    let entries = ufs::find_files(&client_dir, &rules)?;

    let zip_path = version_dir.join("private").join(CLIENT_ZIP);
    let mut writer = ArchiveWriter::create(&zip_path)?;
    for entry in &entries {
        writer.add_file(&entry.path, &ufs::to_unix_string(&entry.relative))?;
    }
    writer.finish().map(Some)
}

/// Writes the distributable archive: `package.py` plus the whole version directory.
///
/// ### Parameters
/// - `root`: The addon repository root (holds `package.py`)
/// - `version_dir`: The package version directory
/// - `out_file`: The archive to create
///
pub fn create_server_package(
    root: &Path,
    version_dir: &Path,
    out_file: &Path,
) -> Result<PathBuf, String> {
    let entries = ufs::find_files(version_dir, &IgnoreRules::none())?;

    let mut writer = ArchiveWriter::create(out_file)?;
    writer.add_file(&root.join(MANIFEST_FILE), MANIFEST_FILE)?;
    for entry in &entries {
        writer.add_file(&entry.path, &ufs::to_unix_string(&entry.relative))?;
    }
    writer.finish()
}
