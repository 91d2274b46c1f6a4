use crate::files::normalized_path;
use std::path::{Path, PathBuf};

/// Resolves a model-supplied relative path under `root`.
///
/// Returns `None` when the path is absolute, contains a `..` segment, or
/// names no file at all. Backslashes count as separators.
pub fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    normalized_path(relative).map(|path| root.join(path))
}
