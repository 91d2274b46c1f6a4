//! File descriptors produced from model output
//!
//! A [`FileDescriptor`] is one generated file: a relative path, an optional
//! declared kind, and the raw text content. A [`FileSet`] is the ordered,
//! path-unique collection produced for one generation or refinement request.

mod kind;
mod path;

pub use kind::{infer_kind, is_json_kind, UNKNOWN_KIND};
pub use path::normalized_path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// One generated file.
///
/// Serialized with the field names the completion prompts ask for
/// (`filename`, `type`, `content`); `path` and `kind` are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(
        rename = "filename",
        alias = "path",
        deserialize_with = "non_empty_string"
    )]
    pub path: String,

    #[serde(
        rename = "type",
        alias = "kind",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,

    pub content: String,
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("file path must not be empty"));
    }
    Ok(value)
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: None,
            content: content.into(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Declared kind, or the kind inferred from the path when none was declared.
    pub fn effective_kind(&self) -> &str {
        match self.kind.as_deref() {
            Some(kind) if !kind.trim().is_empty() => kind,
            _ => infer_kind(&self.path),
        }
    }

    /// True when the declared kind or the path extension indicates JSON.
    pub fn is_json(&self) -> bool {
        is_json_kind(self.effective_kind()) || self.path.to_lowercase().ends_with(".json")
    }
}

/// Ordered collection of file descriptors, unique by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet {
    files: Vec<FileDescriptor>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from descriptors in model order.
    ///
    /// When a path repeats, the later descriptor replaces the earlier one and
    /// takes its position at the end of the sequence seen so far.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = FileDescriptor>) -> Self {
        let mut set = Self::new();
        for descriptor in descriptors {
            set.insert(descriptor);
        }
        set
    }

    /// Inserts a descriptor, replacing any earlier descriptor naming the same file.
    ///
    /// `./a.txt` and `a.txt` name the same file, as do `a\b` and `a/b`.
    pub fn insert(&mut self, descriptor: FileDescriptor) {
        let key = path_key(&descriptor.path);
        if let Some(pos) = self.files.iter().position(|f| path_key(&f.path) == key) {
            warn!(path = %descriptor.path, "Duplicate file path in model output, keeping last occurrence");
            self.files.remove(pos);
        }
        self.files.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileDescriptor> {
        self.files.iter()
    }

    pub fn get(&self, path: &str) -> Option<&FileDescriptor> {
        let key = path_key(path);
        self.files.iter().find(|f| path_key(&f.path) == key)
    }

    /// First path that would resolve outside a workspace root, if any.
    pub fn escaping_path(&self) -> Option<&str> {
        self.files
            .iter()
            .map(|f| f.path.as_str())
            .find(|path| normalized_path(path).is_none())
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    pub fn as_slice(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn into_vec(self) -> Vec<FileDescriptor> {
        self.files
    }
}

/// Escaping paths have no canonical form and only match themselves.
fn path_key(path: &str) -> String {
    normalized_path(path).unwrap_or_else(|| path.to_string())
}

impl FromIterator<FileDescriptor> for FileSet {
    fn from_iter<I: IntoIterator<Item = FileDescriptor>>(iter: I) -> Self {
        Self::from_descriptors(iter)
    }
}

impl IntoIterator for FileSet {
    type Item = FileDescriptor;
    type IntoIter = std::vec::IntoIter<FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a FileDescriptor;
    type IntoIter = std::slice::Iter<'a, FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
