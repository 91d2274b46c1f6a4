//! Response normalization
//!
//! Converts raw completion text into a [`FileSet`]. The text is stripped of a
//! surrounding code fence, then each [`ParseStrategy`] is tried in its fixed
//! precedence order and the first success wins. Per-flow differences (wrapper
//! keys, empty-result tolerance) live in a [`NormalizerProfile`].

mod strategy;

pub use strategy::ParseStrategy;

use crate::files::FileSet;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const EXCERPT_CHARS: usize = 200;

/// Wrapper keys recognized for generation responses, in precedence order.
pub const GENERATION_WRAPPER_KEYS: &[&str] = &["files", "result", "code", "data", "output"];

/// Wrapper keys recognized for refinement responses, in precedence order.
pub const REFINEMENT_WRAPPER_KEYS: &[&str] =
    &["files", "changes", "result", "code", "data", "output"];

/// Flow-specific normalizer parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerProfile {
    pub name: &'static str,
    pub wrapper_keys: &'static [&'static str],
    /// Accept an empty array under a wrapper key when no key holds files.
    pub allow_empty_wrapped: bool,
}

impl NormalizerProfile {
    pub fn generation() -> Self {
        Self {
            name: "generation",
            wrapper_keys: GENERATION_WRAPPER_KEYS,
            allow_empty_wrapped: false,
        }
    }

    /// Refinement adds `changes` and treats an empty change list as a result.
    pub fn refinement() -> Self {
        Self {
            name: "refinement",
            wrapper_keys: REFINEMENT_WRAPPER_KEYS,
            allow_empty_wrapped: true,
        }
    }
}

impl Default for NormalizerProfile {
    fn default() -> Self {
        Self::generation()
    }
}

/// One failed strategy and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyAttempt {
    pub strategy: ParseStrategy,
    pub error: String,
}

impl fmt::Display for StrategyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Model output could not be parsed as files (tried {})", strategy_list(.attempts))]
    ParseFailure {
        attempts: Vec<StrategyAttempt>,
        /// Leading portion of the cleaned output, for operator logs
        excerpt: String,
    },
}

impl NormalizeError {
    pub fn attempts(&self) -> &[StrategyAttempt] {
        match self {
            NormalizeError::ParseFailure { attempts, .. } => attempts,
        }
    }

    pub fn excerpt(&self) -> &str {
        match self {
            NormalizeError::ParseFailure { excerpt, .. } => excerpt,
        }
    }
}

fn strategy_list(attempts: &[StrategyAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.strategy.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Removes one surrounding fenced code block marker and whitespace.
///
/// The opening fence may carry a language tag (```` ```json ````).
pub fn strip_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_')))
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }

    let trimmed = text.trim_end();
    if let Some(rest) = trimmed.strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Normalizer bound to one flow profile.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    profile: NormalizerProfile,
}

impl Normalizer {
    pub fn new(profile: NormalizerProfile) -> Self {
        Self { profile }
    }

    pub fn generation() -> Self {
        Self::new(NormalizerProfile::generation())
    }

    pub fn refinement() -> Self {
        Self::new(NormalizerProfile::refinement())
    }

    pub fn profile(&self) -> &NormalizerProfile {
        &self.profile
    }

    pub fn normalize(&self, raw: &str) -> Result<FileSet, NormalizeError> {
        let text = strip_fence(raw);
        let mut attempts = Vec::with_capacity(ParseStrategy::ORDER.len());

        for current in ParseStrategy::ORDER {
            let result = match current {
                ParseStrategy::DirectArray => strategy::parse_direct_array(text),
                ParseStrategy::SingleObject => strategy::parse_single_object(text),
                ParseStrategy::WrappedObject => strategy::parse_wrapped_object(
                    text,
                    self.profile.wrapper_keys,
                    self.profile.allow_empty_wrapped,
                )
                .map(|(key, files)| {
                    debug!(key = %key, "Files found under wrapper key");
                    files
                }),
            };

            match result {
                Ok(files) => {
                    debug!(
                        profile = self.profile.name,
                        strategy = %current,
                        file_count = files.len(),
                        "Normalized model output"
                    );
                    return Ok(FileSet::from_descriptors(files));
                }
                Err(error) => {
                    debug!(profile = self.profile.name, strategy = %current, %error, "Parse strategy failed");
                    attempts.push(StrategyAttempt {
                        strategy: current,
                        error,
                    });
                }
            }
        }

        let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        warn!(
            profile = self.profile.name,
            excerpt = %excerpt,
            "All parse strategies failed"
        );
        Err(NormalizeError::ParseFailure { attempts, excerpt })
    }
}

/// Normalizes with the generation profile.
pub fn normalize(raw: &str) -> Result<FileSet, NormalizeError> {
    Normalizer::generation().normalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_with_language_tag() {
        let raw = "```json\n[{\"filename\": \"a\", \"content\": \"b\"}]\n```\n";
        assert_eq!(strip_fence(raw), "[{\"filename\": \"a\", \"content\": \"b\"}]");
    }

    #[test]
    fn test_strip_fence_plain() {
        assert_eq!(strip_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_fence("  []  "), "[]");
        assert_eq!(strip_fence("```[]```"), "[]");
    }

    #[test]
    fn test_single_object() {
        let files = normalize(r#"{"filename": "index.html", "type": "html", "content": "<p/>"}"#)
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files.paths(), vec!["index.html"]);
    }

    #[test]
    fn test_failure_lists_every_strategy() {
        let err = normalize("not json at all").unwrap_err();
        let strategies: Vec<_> = err.attempts().iter().map(|a| a.strategy).collect();
        assert_eq!(strategies, ParseStrategy::ORDER.to_vec());
        assert_eq!(err.excerpt(), "not json at all");
        assert!(err.to_string().contains("direct-array, single-object, wrapped-object"));
    }

    #[test]
    fn test_generation_rejects_only_empty_wrapped() {
        assert!(normalize(r#"{"files": []}"#).is_err());
    }

    #[test]
    fn test_refinement_accepts_empty_changes() {
        let files = Normalizer::refinement()
            .normalize(r#"{"changes": []}"#)
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_refinement_recognizes_changes_key() {
        let files = Normalizer::refinement()
            .normalize(r#"{"changes": [{"filename": "a.css", "content": "body{}"}]}"#)
            .unwrap();
        assert_eq!(files.paths(), vec!["a.css"]);
        assert!(normalize(r#"{"changes": [{"filename": "a.css", "content": "body{}"}]}"#).is_err());
    }
}
