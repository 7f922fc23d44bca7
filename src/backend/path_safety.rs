//! Validation of paths received from the outside before they reach the
//! filesystem.

use std::path::{Component, Path, PathBuf};

use super::BackendError;
use crate::paths::strip_file_scheme;

/// Accept `/abs/path` or `file:/abs/path`; reject relative paths and `..`.
///
/// When `allowed_root` is set the path must also live under it.
pub fn normalize_local_path(raw: &str, allowed_root: Option<&Path>) -> Result<PathBuf, BackendError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BackendError::InvalidPath("path must not be empty".to_string()));
    }

    let path = Path::new(strip_file_scheme(trimmed));
    if !path.is_absolute() {
        return Err(BackendError::InvalidPath(format!(
            "path must be absolute: {}",
            raw
        )));
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(BackendError::InvalidPath(format!(
            "path must not contain '..': {}",
            raw
        )));
    }

    if let Some(root) = allowed_root {
        if !path.starts_with(root) {
            return Err(BackendError::InvalidPath(format!(
                "path is outside the allowed root {}: {}",
                root.display(),
                raw
            )));
        }
    }

    Ok(path.to_path_buf())
}
