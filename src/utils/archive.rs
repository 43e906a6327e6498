use crate::utils::fs::ensure_dir;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Deflate zip writer used for every archive the packager produces.
pub struct ArchiveWriter {
    zip: ZipWriter<fs::File>,
    path: PathBuf,
    options: FileOptions,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let file = fs::File::create(path)
            .map_err(|e| format!("Failed to create archive '{}': {}", path.display(), e))?;

        Ok(ArchiveWriter {
            zip: ZipWriter::new(file),
            path: path.to_path_buf(),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        })
    }

    /// Streams `src` into the archive under `name` (`/`-separated).
    pub fn add_file(&mut self, src: &Path, name: &str) -> Result<(), String> {
        self.zip
            .start_file(name, self.options)
            .map_err(|e| format!("Failed to add {} to zip: {}", name, e))?;
        let mut file = fs::File::open(src)
            .map_err(|e| format!("Failed to read '{}': {}", src.display(), e))?;
        io::copy(&mut file, &mut self.zip)
            .map_err(|e| format!("Failed to write {} to zip: {}", name, e))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf, String> {
        self.zip
            .finish()
            .map_err(|e| format!("Failed to finalize zip '{}': {}", self.path.display(), e))?;
        Ok(self.path)
    }
}

/// Extracts every entry of `zip_path` below `dest`.
///
/// Entries whose names would escape `dest` are skipped. On Windows each
/// target path is rewritten to its extended-length form first.
///
/// ### Parameters
/// - `zip_path`: The archive to extract
/// - `dest`: The destination directory
///
pub fn extract_archive(zip_path: &Path, dest: &Path) -> Result<usize, String> {
    let file = fs::File::open(zip_path)
        .map_err(|e| format!("Failed to open archive '{}': {}", zip_path.display(), e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| format!("Invalid zip '{}': {}", zip_path.display(), e))?;

    ensure_dir(dest)?;
    let dest = long_path(dest)?;
    let mut extracted = 0usize;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("Failed to read zip entry {}: {}", i, e))?;
        // Rebuilt from components so separators stay native under a `\\?\` prefix
        let Some(rel) = entry
            .enclosed_name()
            .map(|p| p.components().collect::<PathBuf>())
        else {
            continue;
        };
        let target = dest.join(rel);

        if entry.is_dir() {
            ensure_dir(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        let mut out = fs::File::create(&target)
            .map_err(|e| format!("Failed to create '{}': {}", target.display(), e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| format!("Failed to extract '{}': {}", target.display(), e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                .map_err(|e| format!("Failed to set mode on '{}': {}", target.display(), e))?;
        }

        extracted += 1;
    }

    Ok(extracted)
}

/// Rewrites `path` so it is not subject to the legacy `MAX_PATH` limit.
#[cfg(windows)]
pub fn long_path(path: &Path) -> Result<PathBuf, String> {
    let abs = std::path::absolute(path)
        .map_err(|e| format!("Failed to resolve '{}': {}", path.display(), e))?;
    Ok(PathBuf::from(extended_length(&abs.to_string_lossy())))
}

#[cfg(not(windows))]
pub fn long_path(path: &Path) -> Result<PathBuf, String> {
    Ok(path.to_path_buf())
}

#[cfg_attr(not(windows), allow(dead_code))]
fn extended_length(path: &str) -> String {
    if path.starts_with(r"\\?\") {
        path.to_string()
    } else if let Some(unc) = path.strip_prefix(r"\\") {
        format!(r"\\?\UNC\{}", unc)
    } else {
        format!(r"\\?\{}", path)
    }
}
