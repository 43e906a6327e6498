use regex::Regex;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A file found under a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub relative: PathBuf,
}

/// Name patterns excluded from a tree walk.
///
/// A pattern excludes an entry when it matches anywhere in the entry's name.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    pub dirs: Vec<Regex>,
    pub files: Vec<Regex>,
}

impl IgnoreRules {
    pub fn new(dir_patterns: &[&str], file_patterns: &[&str]) -> Result<Self, String> {
        Ok(IgnoreRules {
            dirs: compile(dir_patterns)?,
            files: compile(file_patterns)?,
        })
    }

    /// Hidden entries, `__pycache__` folders and `.pyc` files.
    pub fn server_defaults() -> Result<Self, String> {
        Self::new(&[r"^\.", r"^__pycache__$"], &[r"^\.", r"\.pyc$"])
    }

    pub fn none() -> Self {
        IgnoreRules::default()
    }

    fn skips_dir(&self, name: &str) -> bool {
        self.dirs.iter().any(|re| re.is_match(name))
    }

    fn skips_file(&self, name: &str) -> bool {
        self.files.iter().any(|re| re.is_match(name))
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>, String> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| format!("Invalid ignore pattern '{}': {}", p, e)))
        .collect()
}

/// Collects every file under `root` that the rules do not exclude.
///
/// Directories are visited breadth-first and each directory is listed in name
/// order, so the result is stable between runs.
///
/// ### Parameters
/// - `root`: The directory to scan
/// - `rules`: Directory and file name exclusions
///
pub fn find_files(root: &Path, rules: &IgnoreRules) -> Result<Vec<FileEntry>, String> {
    if !root.is_dir() {
        return Err(format!("Directory not found: {}", root.to_string_lossy()));
    }

    let mut output: Vec<FileEntry> = Vec::new();
    let mut queue: VecDeque<(PathBuf, PathBuf)> = VecDeque::new();
    queue.push_back((root.to_path_buf(), PathBuf::new()));

    while let Some((dir, parents)) = queue.pop_front() {
        let rd = fs::read_dir(&dir)
            .map_err(|e| format!("Failed to read directory '{}': {}", dir.display(), e))?;
        let mut entries: Vec<fs::DirEntry> = rd
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Failed to read directory '{}': {}", dir.display(), e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_file() {
                if !rules.skips_file(&name) {
                    output.push(FileEntry {
                        relative: parents.join(&name),
                        path,
                    });
                }
                continue;
            }

            if path.is_dir() && !rules.skips_dir(&name) {
                queue.push_back((path, parents.join(&name)));
            }
        }
    }

    Ok(output)
}

pub fn to_unix_string<P: AsRef<Path>>(p: P) -> String {
    let s = p.as_ref().to_string_lossy().into_owned();
    s.replace('\\', "/")
}

/// Creates a directory and its parents, ignoring "already exists".
pub fn ensure_dir(path: &Path) -> Result<(), String> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(format!(
            "Failed to create directory '{}': {}",
            path.display(),
            e
        )),
    }
}

/// Copies a file, creating the destination directory first.
pub fn safe_copy_file(src: &Path, dst: &Path) -> Result<(), String> {
    if src == dst {
        return Ok(());
    }
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).map_err(|e| {
        format!(
            "Failed to copy '{}' to '{}': {}",
            src.display(),
            dst.display(),
            e
        )
    })?;
    Ok(())
}

/// Removes a directory tree. Returns false when there was nothing to remove.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool, String> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!(
            "Failed to remove '{}': {}",
            path.display(),
            e
        )),
    }
}

/// Removes `path` only when it is an empty directory.
pub fn remove_dir_if_empty(path: &Path) -> Result<(), String> {
    let is_empty = match fs::read_dir(path) {
        Ok(mut rd) => rd.next().is_none(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(format!(
                "Failed to read directory '{}': {}",
                path.display(),
                e
            ));
        }
    };
    if is_empty {
        fs::remove_dir(path)
            .map_err(|e| format!("Failed to remove '{}': {}", path.display(), e))?;
    }
    Ok(())
}
