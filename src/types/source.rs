use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SOURCE_URL: &str = "https://distribute.openpype.io/thirdparty";

/// Digest functions accepted for archive verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha224 => "sha224",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha384 => "sha384",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha224" => Ok(ChecksumAlgorithm::Sha224),
            "sha256" => Ok(ChecksumAlgorithm::Sha256),
            "sha384" => Ok(ChecksumAlgorithm::Sha384),
            "sha512" => Ok(ChecksumAlgorithm::Sha512),
            other => Err(format!(
                "Unknown checksum algorithm: {} (expected: sha224|sha256|sha384|sha512)",
                other
            )),
        }
    }
}

/// One downloadable USD build for a release and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsdSource {
    pub release: String,
    pub platform: String,
    pub url: String,
    pub checksum: String,
    pub checksum_algorithm: ChecksumAlgorithm,
}

/// Entry of `files_info.json`. Field names are read by the server addon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub name: String,
    pub filename: String,
    pub checksum: String,
    pub checksum_algorithm: ChecksumAlgorithm,
    pub platform: String,
}

pub fn source_base_url() -> String {
    std::env::var("USDPACK_SOURCE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string())
}

/// Returns the static source table resolved against `base_url`.
pub fn usd_sources(base_url: &str) -> Vec<UsdSource> {
    // (release, platform, file name, sha256)
    let table = [
        (
            "24.03",
            "windows",
            "usd-24.03_win64_py39.zip",
            "7d7852b9c8e3501e5f64175decc08d70e3bf1c083faaaf2c1a8aa8f9af43ab30",
        ),
        (
            "24.03",
            "linux",
            "usd-24.03_linux_py39.zip",
            "27010ad67d5acd25e3c95b1ace4ab30e047b5a9e48082db0545ae44ae7ec9b09",
        ),
    ];

    table
        .iter()
        .map(|(release, platform, file, checksum)| UsdSource {
            release: release.to_string(),
            platform: platform.to_string(),
            url: format!("{}/{}", base_url, file),
            checksum: checksum.to_string(),
            checksum_algorithm: ChecksumAlgorithm::Sha256,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_parse_case_insensitively() {
        assert_eq!(
            "SHA256".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::Sha256
        );
        assert!("md5".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn record_serializes_with_server_field_names() {
        let record = ArchiveRecord {
            name: "usd".into(),
            filename: "usd-24.03_linux_py39.zip".into(),
            checksum: "abc".into(),
            checksum_algorithm: ChecksumAlgorithm::Sha256,
            platform: "linux".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["checksum_algorithm"], "sha256");
        assert_eq!(value["filename"], "usd-24.03_linux_py39.zip");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn sources_cover_windows_and_linux() {
        let sources = usd_sources("http://mirror.local");
        let platforms: Vec<&str> = sources.iter().map(|s| s.platform.as_str()).collect();
        assert_eq!(platforms, vec!["windows", "linux"]);
        assert_eq!(
            sources[1].url,
            "http://mirror.local/usd-24.03_linux_py39.zip"
        );
    }
}
