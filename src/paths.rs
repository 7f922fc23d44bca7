//! Path helpers shared by the tree model, the controller and the backend.

/// Scheme prefix table metadata uses for local files.
pub const FILE_SCHEME: &str = "file:";

/// Strip a leading `file:` scheme so the path can be displayed or reused as a
/// lookup key.
pub fn strip_file_scheme(path: &str) -> &str {
    path.strip_prefix(FILE_SCHEME).unwrap_or(path)
}

/// Last path segment, or the whole path when it has none.
pub fn file_name(path: &str) -> &str {
    let path = strip_file_scheme(path);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

/// Map a table root to its metadata directory.
///
/// Paths already pointing at a `metadata` directory are kept as they are.
pub fn to_metadata_dir(table_root: &str) -> String {
    let trimmed = table_root.trim();
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed == "metadata" || trimmed.ends_with("/metadata") {
        trimmed.to_string()
    } else {
        format!("{}/metadata", trimmed)
    }
}
