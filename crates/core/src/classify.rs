//! Path classification for incoming events
//!
//! Decides whether a raw event path is in scope and normalizes it into the
//! key used by the aggregator. Rules are applied in order:
//! 1. Blank or unnormalizable paths
//! 2. Paths outside the monitored root (case-insensitive)
//! 3. The monitored root itself
//! 4. The monitor's own output files (audit log, JSON export)
//! 5. Noise file names (`desktop.ini`, ...)
//! 6. File names without an extension

use crate::config::MonitorConfig;
use crate::error::ConfigError;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Why a path was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty, blank, or could not be normalized
    Unnormalizable,
    /// Not under the monitored root
    OutsideRoot,
    /// The monitored root itself
    IsRoot,
    /// One of the monitor's own output files
    IsLogFile,
    /// File name on the noise list
    Noise,
    /// File name has no extension
    NoExtension,
}

/// Filters and normalizes raw event paths
#[derive(Debug, Clone)]
pub struct PathClassifier {
    /// Normalized monitored root
    root: PathBuf,
    /// Case-folded components of `root`
    root_key: Vec<String>,
    /// Case-folded components of each output file path
    own_keys: Vec<Vec<String>>,
    /// Case-folded noise file names
    noise: HashSet<String>,
}

impl PathClassifier {
    /// Create a classifier for the given root, log file and noise names
    pub fn new<I, S>(root: &Path, log_file: &Path, noise: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = normalize_path(root)
            .ok_or_else(|| ConfigError::InvalidPath(root.to_path_buf()))?;
        let log_file = normalize_path(log_file)
            .ok_or_else(|| ConfigError::InvalidPath(log_file.to_path_buf()))?;

        Ok(Self {
            root_key: fold(&root),
            own_keys: vec![fold(&log_file)],
            root,
            noise: noise
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        })
    }

    /// Also reject `path`, another file the monitor writes itself
    pub fn with_own_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let path = normalize_path(path).ok_or_else(|| ConfigError::InvalidPath(path.to_path_buf()))?;
        self.own_keys.push(fold(&path));
        Ok(self)
    }

    /// Build a classifier from monitor configuration
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let classifier = Self::new(&config.root, &config.log_path(), &config.noise_names)?;
        match config.json_log_path() {
            Some(export) => classifier.with_own_file(&export),
            None => Ok(classifier),
        }
    }

    /// Normalized monitored root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Classify a raw path, returning the aggregation key if it is in scope
    pub fn classify(&self, raw: &str) -> Option<PathBuf> {
        self.check(raw).ok()
    }

    /// Classify a raw path, reporting which rule rejected it
    pub fn check(&self, raw: &str) -> Result<PathBuf, Rejection> {
        let path = normalize(raw).ok_or(Rejection::Unnormalizable)?;
        let key = fold(&path);

        if !key.starts_with(&self.root_key) {
            return Err(Rejection::OutsideRoot);
        }
        if key.len() == self.root_key.len() {
            return Err(Rejection::IsRoot);
        }
        if self.own_keys.contains(&key) {
            return Err(Rejection::IsLogFile);
        }

        // Non-empty and longer than the root, so the last component is a name
        let name = key.last().map(String::as_str).unwrap_or_default();
        if self.noise.contains(name) {
            return Err(Rejection::Noise);
        }
        if !has_extension(name) {
            return Err(Rejection::NoExtension);
        }

        Ok(path)
    }
}

/// Normalize a raw path string into an absolute, lexically clean path
///
/// Returns `None` for blank input or input that cannot name a path. The
/// file does not have to exist: deleted files must still classify.
pub fn normalize(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() || raw.contains('\0') {
        return None;
    }
    normalize_path(Path::new(raw))
}

/// Lexical normalization of an already-typed path
///
/// Relative paths are resolved against the current directory; `.` is
/// dropped and `..` pops one component (clamped at the root).
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Case-folded components, used for all path comparisons
fn fold(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect()
}

/// `report.txt` and `.profile` have an extension, `Makefile` and `file.` don't
fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(dot) => dot + 1 < name.len(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NOISE_NAMES;

    fn classifier() -> PathClassifier {
        PathClassifier::new(
            Path::new("/mon"),
            Path::new("/mon/audit.log"),
            DEFAULT_NOISE_NAMES,
        )
        .unwrap()
    }

    #[test]
    fn test_accepts_files_under_root() {
        let c = classifier();
        assert_eq!(c.classify("/mon/a.txt"), Some(PathBuf::from("/mon/a.txt")));
        assert_eq!(
            c.classify("/mon/sub/dir/report.final.pdf"),
            Some(PathBuf::from("/mon/sub/dir/report.final.pdf"))
        );
        assert_eq!(c.classify("/mon/.profile"), Some(PathBuf::from("/mon/.profile")));
    }

    #[test]
    fn test_normalizes_dot_segments() {
        let c = classifier();
        assert_eq!(
            c.classify("/mon/sub/../b.txt"),
            Some(PathBuf::from("/mon/b.txt"))
        );
        assert_eq!(c.classify("/mon/./c.txt"), Some(PathBuf::from("/mon/c.txt")));

        // Escaping the root through `..` is caught after normalization
        assert_eq!(c.check("/mon/../etc/passwd.txt"), Err(Rejection::OutsideRoot));
    }

    #[test]
    fn test_rejects_blank_and_invalid() {
        let c = classifier();
        assert_eq!(c.check(""), Err(Rejection::Unnormalizable));
        assert_eq!(c.check("   "), Err(Rejection::Unnormalizable));
        assert_eq!(c.check("/mon/bad\0name.txt"), Err(Rejection::Unnormalizable));
    }

    #[test]
    fn test_rejects_outside_root() {
        let c = classifier();
        assert_eq!(c.check("/other/a.txt"), Err(Rejection::OutsideRoot));
        // Sibling sharing a string prefix is not under the root
        assert_eq!(c.check("/monitor/a.txt"), Err(Rejection::OutsideRoot));
    }

    #[test]
    fn test_root_comparison_is_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify("/MON/A.TXT"), Some(PathBuf::from("/MON/A.TXT")));
    }

    #[test]
    fn test_rejects_root_itself() {
        let c = classifier();
        assert_eq!(c.check("/mon"), Err(Rejection::IsRoot));
        assert_eq!(c.check("/mon/"), Err(Rejection::IsRoot));
    }

    #[test]
    fn test_rejects_log_file() {
        let c = classifier();
        assert_eq!(c.check("/mon/audit.log"), Err(Rejection::IsLogFile));
        assert_eq!(c.check("/Mon/Audit.LOG"), Err(Rejection::IsLogFile));
        // Same name elsewhere is fine
        assert!(c.classify("/mon/sub/audit.log").is_some());
    }

    #[test]
    fn test_rejects_json_export_from_config() {
        let mut config = MonitorConfig::for_root("/mon");
        config.json_log = Some(PathBuf::from("events.jsonl"));
        let c = PathClassifier::from_config(&config).unwrap();

        assert_eq!(c.check("/mon/events.jsonl"), Err(Rejection::IsLogFile));
        assert_eq!(c.check("/mon/audit.log"), Err(Rejection::IsLogFile));
        assert!(c.classify("/mon/other.jsonl").is_some());
    }

    #[test]
    fn test_rejects_noise_names() {
        let c = classifier();
        assert_eq!(c.check("/mon/desktop.ini"), Err(Rejection::Noise));
        assert_eq!(c.check("/mon/sub/Folder.JPG"), Err(Rejection::Noise));
        assert_eq!(c.check("/mon/folder.gif"), Err(Rejection::Noise));
        // Exact name match only
        assert!(c.classify("/mon/my-desktop.ini").is_some());
    }

    #[test]
    fn test_rejects_missing_extension() {
        let c = classifier();
        assert_eq!(c.check("/mon/Makefile"), Err(Rejection::NoExtension));
        assert_eq!(c.check("/mon/sub"), Err(Rejection::NoExtension));
        assert_eq!(c.check("/mon/trailing."), Err(Rejection::NoExtension));
    }

    #[test]
    fn test_custom_noise_list() {
        let c = PathClassifier::new(Path::new("/mon"), Path::new("/var/log/x.log"), ["Thumbs.db"])
            .unwrap();
        assert_eq!(c.check("/mon/thumbs.db"), Err(Rejection::Noise));
        assert!(c.classify("/mon/desktop.ini").is_some());
    }

    #[test]
    fn test_relative_paths_resolve_against_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let c = PathClassifier::new(&cwd, &cwd.join("audit.log"), DEFAULT_NOISE_NAMES).unwrap();
        assert_eq!(c.classify("notes.md"), Some(cwd.join("notes.md")));
    }
}
