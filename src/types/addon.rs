use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "package.py";

/// Name, version and client directory of the addon being packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonDescriptor {
    pub name: String,
    pub version: String,
    pub client_dir: String,
}

impl AddonDescriptor {
    /// Reads `package.py` from the addon root.
    ///
    /// ### Parameters
    /// - `root`: The addon repository root
    ///
    pub fn load(root: &Path) -> Result<Self, String> {
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(format!(
                "{} not found in: {}",
                MANIFEST_FILE,
                root.to_string_lossy()
            ));
        }

        let txt = fs::read_to_string(&manifest_path)
            .map_err(|e| format!("Failed to read {}: {}", MANIFEST_FILE, e))?;
        Self::parse(&txt)
    }

    /// Parses the top-level `key = "value"` assignments of a manifest.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut name: Option<String> = None;
        let mut version: Option<String> = None;
        let mut client_dir: Option<String> = None;

        for line in source.lines() {
            // Indented lines belong to nested blocks
            if line.starts_with(char::is_whitespace) {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let Some(value) = unquote(value.trim()) else {
                continue;
            };
            match key.trim() {
                "name" => name = Some(value),
                "version" => version = Some(value),
                "client_dir" => client_dir = Some(value),
                _ => {}
            }
        }

        let name = required(name, "name")?;
        let version = required(version, "version")?;
        let client_dir = required(client_dir, "client_dir")?;

        Ok(AddonDescriptor {
            name,
            version,
            client_dir,
        })
    }

    /// Returns `{output}/{name}/{version}`.
    pub fn version_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.name).join(&self.version)
    }

    /// Returns the file name of the distributable archive.
    pub fn archive_name(&self) -> String {
        format!("{}-{}.zip", self.name, self.version)
    }
}

fn unquote(value: &str) -> Option<String> {
    // Accept '...' or "...", followed by nothing but an optional comment
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &value[1..];
    let end = body.find(quote)?;
    let rest = body[end + 1..].trim_start();
    if rest.is_empty() || rest.starts_with('#') {
        Some(body[..end].to_string())
    } else {
        None
    }
}

fn required(value: Option<String>, key: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!(
            "Field '{}' is required in {}",
            key, MANIFEST_FILE
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"name = "usd"
title = "USD"
version = "0.1.0"
client_dir = "usd_addon"  # client code

services = {
    name = "ignored"
}
"#;

    #[test]
    fn parses_descriptor_fields() {
        let descriptor = AddonDescriptor::parse(MANIFEST).unwrap();
        assert_eq!(descriptor.name, "usd");
        assert_eq!(descriptor.version, "0.1.0");
        assert_eq!(descriptor.client_dir, "usd_addon");
    }

    #[test]
    fn single_quotes_are_accepted() {
        let src = "name = 'usd'\nversion = '1.2.3'\nclient_dir = 'c'\n";
        let descriptor = AddonDescriptor::parse(src).unwrap();
        assert_eq!(descriptor.version, "1.2.3");
    }

    #[test]
    fn hash_inside_quotes_is_kept() {
        let src = "name = \"usd #1\"  # display name\nversion = '1.0 #rc'\nclient_dir = \"c\"#x\n";
        let descriptor = AddonDescriptor::parse(src).unwrap();
        assert_eq!(descriptor.name, "usd #1");
        assert_eq!(descriptor.version, "1.0 #rc");
        assert_eq!(descriptor.client_dir, "c");
    }

    #[test]
    fn trailing_text_after_value_is_ignored() {
        let src = "name = \"usd\" + suffix\nversion = \"1\"\nclient_dir = \"c\"\n";
        let err = AddonDescriptor::parse(src).unwrap_err();
        assert!(err.contains("name"));
    }

    #[test]
    fn missing_client_dir_is_an_error() {
        let err = AddonDescriptor::parse("name = \"usd\"\nversion = \"1\"\n").unwrap_err();
        assert!(err.contains("client_dir"));
    }

    #[test]
    fn output_paths_follow_name_and_version() {
        let descriptor = AddonDescriptor::parse(MANIFEST).unwrap();
        assert_eq!(
            descriptor.version_dir(Path::new("out")),
            Path::new("out").join("usd").join("0.1.0")
        );
        assert_eq!(descriptor.archive_name(), "usd-0.1.0.zip");
    }

    #[test]
    fn load_reports_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = AddonDescriptor::load(dir.path()).unwrap_err();
        assert!(err.contains("package.py not found"));
    }
}
