use super::{CollabError, ProjectStore};
use crate::files::{FileDescriptor, FileSet};
use crate::generation::ProjectId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct StoredProject {
    project_id: ProjectId,
    saved_at: DateTime<Utc>,
    files: FileSet,
}

/// Stores each project as `<dir>/<project_id>.json`.
///
/// Relevance is a plain term-frequency ranking over paths and contents.
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    dir: PathBuf,
    max_context_size: usize,
}

impl FsProjectStore {
    pub fn new(dir: impl Into<PathBuf>, max_context_size: usize) -> Self {
        Self {
            dir: dir.into(),
            max_context_size,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn project_path(&self, project_id: ProjectId) -> PathBuf {
        self.dir.join(format!("{}.json", project_id))
    }

    async fn read(&self, project_id: ProjectId) -> Result<StoredProject, CollabError> {
        let path = self.project_path(project_id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CollabError::ProjectNotFound(project_id))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents)
            .map_err(|e| CollabError::Corrupt(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    async fn save(&self, project_id: ProjectId, files: &FileSet) -> Result<(), CollabError> {
        if let Some(path) = files.escaping_path() {
            return Err(CollabError::InvalidPath(path.to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let stored = StoredProject {
            project_id,
            saved_at: Utc::now(),
            files: files.clone(),
        };
        let contents = serde_json::to_string_pretty(&stored)
            .map_err(|e| CollabError::Corrupt(e.to_string()))?;

        let path = self.project_path(project_id);
        tokio::fs::write(&path, contents).await?;
        debug!(%project_id, path = %path.display(), files = files.len(), "Project saved");
        Ok(())
    }

    async fn load(&self, project_id: ProjectId) -> Result<FileSet, CollabError> {
        Ok(self.read(project_id).await?.files)
    }

    async fn load_relevant(
        &self,
        project_id: ProjectId,
        query: &str,
    ) -> Result<String, CollabError> {
        let files = self.read(project_id).await?.files;
        let ranked = rank_files(files.as_slice(), query);
        Ok(build_excerpt(&ranked, self.max_context_size))
    }
}

fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.len() >= 3)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Files with at least one query-term hit, best first; all files when none match.
fn rank_files<'a>(files: &'a [FileDescriptor], query: &str) -> Vec<&'a FileDescriptor> {
    let terms = query_terms(query);

    let mut scored: Vec<(usize, &FileDescriptor)> = files
        .iter()
        .map(|file| {
            let path = file.path.to_lowercase();
            let content = file.content.to_lowercase();
            let score = terms
                .iter()
                .map(|term| path.matches(term.as_str()).count() * 3 + content.matches(term.as_str()).count())
                .sum();
            (score, file)
        })
        .collect();

    if scored.iter().all(|(score, _)| *score == 0) {
        return files.iter().collect();
    }

    scored.retain(|(score, _)| *score > 0);
    // Stable sort keeps set order among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, file)| file).collect()
}

fn build_excerpt(files: &[&FileDescriptor], max_size: usize) -> String {
    let mut excerpt = String::new();

    for file in files {
        let section = format!("--- {} ---\n{}\n\n", file.path, file.content);
        if excerpt.len() + section.len() <= max_size {
            excerpt.push_str(&section);
        } else if excerpt.is_empty() {
            let mut end = max_size.min(section.len());
            while !section.is_char_boundary(end) {
                end -= 1;
            }
            excerpt.push_str(&section[..end]);
            break;
        } else {
            break;
        }
    }

    excerpt
}
