//! Workspace materialization
//!
//! Writes a [`FileSet`] beneath a root directory. Every path is checked
//! before anything is written, so a traversal attempt anywhere in the set
//! leaves the filesystem untouched. JSON files whose content parses are
//! re-serialized in pretty-printed form; everything else is written verbatim.

mod path;

pub use path::resolve_under;

use crate::files::{FileDescriptor, FileSet};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("File path escapes the workspace root: {path}")]
    PathEscape { path: String },

    #[error("Failed to write {} file(s) to the workspace: {source}", .failed.len())]
    WriteFailure {
        /// Paths that could not be written, in set order
        failed: Vec<String>,
        /// Files written before and after the failures
        report: MaterializeReport,
        #[source]
        source: io::Error,
    },
}

/// One file written to the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub path: String,
    pub bytes: usize,
    pub sha256: String,
    /// Content was re-serialized as pretty-printed JSON
    pub canonicalized: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub root: PathBuf,
    pub files: Vec<WrittenFile>,
}

impl MaterializeReport {
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

/// Fails with `PathEscape` on the first path that would leave any workspace root.
pub fn ensure_contained(files: &FileSet) -> Result<(), MaterializeError> {
    match files.escaping_path() {
        Some(path) => Err(MaterializeError::PathEscape {
            path: path.to_string(),
        }),
        None => Ok(()),
    }
}

/// Writes file sets into a workspace directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Materializer;

impl Materializer {
    pub fn new() -> Self {
        Self
    }

    pub async fn materialize(
        &self,
        files: &FileSet,
        root: &Path,
    ) -> Result<MaterializeReport, MaterializeError> {
        let targets = files
            .iter()
            .map(|file| {
                resolve_under(root, &file.path)
                    .map(|target| (file, target))
                    .ok_or_else(|| {
                        warn!(path = %file.path, root = %root.display(), "Rejected path outside workspace");
                        MaterializeError::PathEscape {
                            path: file.path.clone(),
                        }
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = MaterializeReport {
            root: root.to_path_buf(),
            files: Vec::with_capacity(targets.len()),
        };
        let mut failed = Vec::new();
        let mut first_error: Option<io::Error> = None;

        for (file, target) in targets {
            match write_one(file, &target).await {
                Ok(written) => report.files.push(written),
                Err(e) => {
                    warn!(path = %file.path, error = %e, "Failed to write workspace file");
                    failed.push(file.path.clone());
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(source) = first_error {
            return Err(MaterializeError::WriteFailure {
                failed,
                report,
                source,
            });
        }

        info!(
            root = %root.display(),
            files = report.files.len(),
            bytes = report.total_bytes(),
            "Workspace materialized"
        );
        Ok(report)
    }
}

async fn write_one(file: &FileDescriptor, target: &Path) -> io::Result<WrittenFile> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let (content, canonicalized) = render_content(file);
    tokio::fs::write(target, content.as_bytes()).await?;
    debug!(path = %file.path, bytes = content.len(), canonicalized, "Wrote file");

    Ok(WrittenFile {
        path: file.path.clone(),
        bytes: content.len(),
        sha256: hex::encode(Sha256::digest(content.as_bytes())),
        canonicalized,
    })
}

/// Content to write, and whether JSON canonicalization was applied.
fn render_content(file: &FileDescriptor) -> (String, bool) {
    if !file.is_json() {
        return (file.content.clone(), false);
    }

    match serde_json::from_str::<serde_json::Value>(&file.content)
        .and_then(|value| serde_json::to_string_pretty(&value))
    {
        Ok(mut pretty) => {
            pretty.push('\n');
            (pretty, true)
        }
        Err(e) => {
            warn!(path = %file.path, error = %e, "Declared JSON did not parse, writing verbatim");
            (file.content.clone(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_pretty_prints_json() {
        let file = FileDescriptor::new("package.json", r#"{"name":"site","private":true}"#);
        let (content, canonicalized) = render_content(&file);
        assert!(canonicalized);
        assert_eq!(content, "{\n  \"name\": \"site\",\n  \"private\": true\n}\n");
    }

    #[test]
    fn test_render_invalid_json_verbatim() {
        let file = FileDescriptor::new("tsconfig.json", "{ // comments\n}");
        let (content, canonicalized) = render_content(&file);
        assert!(!canonicalized);
        assert_eq!(content, "{ // comments\n}");
    }

    #[test]
    fn test_render_declared_kind_counts() {
        let file = FileDescriptor::new("manifest", "[1,2]").with_kind("JSON");
        assert!(render_content(&file).1);

        let text = FileDescriptor::new("notes.txt", "[1,2]");
        assert_eq!(render_content(&text), ("[1,2]".to_string(), false));
    }

    #[tokio::test]
    async fn test_materialize_writes_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileSet::from_descriptors(vec![
            FileDescriptor::new("src/components/Navbar.tsx", "export {};"),
            FileDescriptor::new("index.html", "<html></html>"),
        ]);

        let report = Materializer::new()
            .materialize(&files, dir.path())
            .await
            .unwrap();

        assert_eq!(report.files.len(), 2);
        let navbar = std::fs::read_to_string(dir.path().join("src/components/Navbar.tsx")).unwrap();
        assert_eq!(navbar, "export {};");
        assert_eq!(report.files[1].bytes, "<html></html>".len());
        assert_eq!(report.files[1].sha256.len(), 64);
    }
}
