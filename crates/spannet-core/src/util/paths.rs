//! Path resolution utilities.
//!
//! Generic path helpers shared by the persistence layer and the CLI.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Expands `~` to the user's home directory.
///
/// If the path starts with `~`, replaces it with the user's home directory.
/// Otherwise returns the path unchanged.
///
/// # Example
///
/// ```
/// use spannet_core::util::paths::expand_tilde;
///
/// let expanded = expand_tilde("~/networks");
/// assert!(!expanded.starts_with("~"));
/// ```
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Make sure the directory that will contain `path` exists.
///
/// When the directory is missing it is created if `create_dir` is set,
/// otherwise a [`Error::NotFound`] is returned.
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P, create_dir: bool) -> Result<()> {
    let Some(parent) = path.as_ref().parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    if create_dir {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))
    } else {
        Err(Error::not_found(format!(
            "directory {} does not exist",
            parent.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_with_tilde() {
        let path = expand_tilde("~/test/path");
        assert!(!path.starts_with("~"), "Tilde should be expanded");
        if let Some(home) = dirs::home_dir() {
            assert!(path.starts_with(&home), "Path should start with home dir");
            assert!(path.ends_with("test/path"), "Path should preserve suffix");
        }
    }

    #[test]
    fn test_expand_tilde_without_tilde() {
        let original = PathBuf::from("/absolute/path");
        let expanded = expand_tilde(&original);
        assert_eq!(original, expanded, "Absolute path should not change");
    }

    #[test]
    fn test_expand_tilde_tilde_only() {
        let path = expand_tilde("~");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home, "~ should expand to home directory");
        }
    }

    #[test]
    fn test_ensure_parent_dir_existing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_parent_dir(dir.path().join("net.xml"), false).is_ok());
    }

    #[test]
    fn test_ensure_parent_dir_missing_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("net.xml");
        let err = ensure_parent_dir(&target, false).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_ensure_parent_dir_creates() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("net.xml");
        ensure_parent_dir(&target, true).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn test_ensure_parent_dir_bare_file_name() {
        assert!(ensure_parent_dir("net.xml", false).is_ok());
    }
}
