use crate::utils::fs::{ensure_dir, safe_copy_file};
use std::fs;
use std::path::Path;

/// Retrieves a remote or local resource into `dest`.
pub trait Fetch {
    fn fetch(&self, location: &str, dest: &Path) -> Result<(), String>;
}

/// Plain HTTP(S) GET, streamed to disk. No timeout and no retries.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, location: &str, dest: &Path) -> Result<(), String> {
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }

        let mut response = self
            .client
            .get(location)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("Failed to download {}: {}", location, e))?;

        let mut file = fs::File::create(dest)
            .map_err(|e| format!("Failed to create '{}': {}", dest.display(), e))?;
        response
            .copy_to(&mut file)
            .map_err(|e| format!("Failed to write '{}': {}", dest.display(), e))?;
        Ok(())
    }
}

/// Treats the location as a path on the local filesystem.
pub struct LocalFetcher;

impl Fetch for LocalFetcher {
    fn fetch(&self, location: &str, dest: &Path) -> Result<(), String> {
        let src = Path::new(location);
        if !src.is_file() {
            return Err(format!("Source file not found: {}", location));
        }
        safe_copy_file(src, dest)
    }
}

/// HTTP for `http(s)://` locations, plain copies otherwise.
pub fn fetcher_for(location: &str) -> Result<Box<dyn Fetch + Send>, String> {
    if is_remote(location) {
        Ok(Box::new(HttpFetcher::new()?))
    } else {
        Ok(Box::new(LocalFetcher))
    }
}

/// Returns the last path segment of a URL (or plain path).
pub fn filename_from_url(location: &str) -> Result<String, String> {
    let from_url = url::Url::parse(location).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });

    let name = match from_url {
        Some(name) => name,
        None => location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    if name.is_empty() {
        Err(format!("No file name in location: {}", location))
    } else {
        Ok(name)
    }
}

/// Joins a base URL or directory with a file name.
pub fn join_location(base: &str, filename: &str) -> String {
    if is_remote(base) {
        format!("{}/{}", base.trim_end_matches('/'), filename)
    } else {
        Path::new(base).join(filename).to_string_lossy().into_owned()
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_url_segment() {
        assert_eq!(
            filename_from_url("https://host/thirdparty/usd-24.03_linux_py39.zip").unwrap(),
            "usd-24.03_linux_py39.zip"
        );
        assert_eq!(
            filename_from_url("https://host/a.zip?token=1").unwrap(),
            "a.zip"
        );
        assert_eq!(filename_from_url("/srv/files/b.zip").unwrap(), "b.zip");
        assert!(filename_from_url("https://host/dir/").is_err());
    }

    #[test]
    fn join_handles_urls_and_dirs() {
        assert_eq!(
            join_location("https://host/private/", "files_info.json"),
            "https://host/private/files_info.json"
        );
        assert_eq!(
            join_location("pkg", "a.zip"),
            Path::new("pkg").join("a.zip").to_string_lossy()
        );
    }

    #[test]
    fn local_fetcher_copies_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.zip");
        fs::write(&src, b"zip").unwrap();
        let dest = dir.path().join("downloads").join("a.zip");

        LocalFetcher.fetch(&src.to_string_lossy(), &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"zip");

        let err = LocalFetcher
            .fetch(&dir.path().join("missing.zip").to_string_lossy(), &dest)
            .unwrap_err();
        assert!(err.contains("not found"));
    }
}
