use crate::files::FileDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Structural interpretation tried against cleaned model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParseStrategy {
    /// A JSON array of file descriptors
    DirectArray,
    /// A single file descriptor object
    SingleObject,
    /// An object holding the array under a conventional wrapper key
    WrappedObject,
}

impl ParseStrategy {
    /// Precedence order; the first strategy that succeeds wins.
    pub const ORDER: [ParseStrategy; 3] = [
        ParseStrategy::DirectArray,
        ParseStrategy::SingleObject,
        ParseStrategy::WrappedObject,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ParseStrategy::DirectArray => "direct-array",
            ParseStrategy::SingleObject => "single-object",
            ParseStrategy::WrappedObject => "wrapped-object",
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(super) fn parse_direct_array(text: &str) -> Result<Vec<FileDescriptor>, String> {
    serde_json::from_str::<Vec<FileDescriptor>>(text).map_err(|e| e.to_string())
}

pub(super) fn parse_single_object(text: &str) -> Result<Vec<FileDescriptor>, String> {
    serde_json::from_str::<FileDescriptor>(text)
        .map(|file| vec![file])
        .map_err(|e| e.to_string())
}

/// Looks up each wrapper key in order and parses its value as a file array.
///
/// The first key holding a valid non-empty array wins. When `allow_empty` is
/// set and no key holds a non-empty array, the first key holding a valid
/// empty array is accepted.
pub(super) fn parse_wrapped_object(
    text: &str,
    wrapper_keys: &[&str],
    allow_empty: bool,
) -> Result<(String, Vec<FileDescriptor>), String> {
    let map = serde_json::from_str::<serde_json::Map<String, Value>>(text)
        .map_err(|e| e.to_string())?;

    let mut first_empty: Option<&str> = None;
    let mut problems = Vec::new();

    for key in wrapper_keys {
        let Some(value) = map.get(*key) else {
            continue;
        };
        match Vec::<FileDescriptor>::deserialize(value) {
            Ok(files) if !files.is_empty() => return Ok((key.to_string(), files)),
            Ok(_) => {
                first_empty.get_or_insert(*key);
                problems.push(format!("\"{}\": empty array", key));
            }
            Err(e) => problems.push(format!("\"{}\": {}", key, e)),
        }
    }

    if allow_empty {
        if let Some(key) = first_empty {
            return Ok((key.to_string(), Vec::new()));
        }
    }

    if problems.is_empty() {
        Err(format!(
            "no wrapper key found (expected one of: {})",
            wrapper_keys.join(", ")
        ))
    } else {
        Err(problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_fixed() {
        let names: Vec<_> = ParseStrategy::ORDER.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["direct-array", "single-object", "wrapped-object"]);
    }

    #[test]
    fn test_direct_array_accepts_empty() {
        assert!(parse_direct_array("[]").unwrap().is_empty());
    }

    #[test]
    fn test_wrapped_skips_invalid_and_empty_keys() {
        let text = r#"{"files": [], "result": "nope", "code": [{"filename": "a", "content": "1"}]}"#;
        let (key, files) = parse_wrapped_object(text, &["files", "result", "code"], false).unwrap();
        assert_eq!(key, "code");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_wrapped_empty_only_when_allowed() {
        let text = r#"{"changes": []}"#;
        assert!(parse_wrapped_object(text, &["changes"], false).is_err());

        let (key, files) = parse_wrapped_object(text, &["changes"], true).unwrap();
        assert_eq!(key, "changes");
        assert!(files.is_empty());
    }

    #[test]
    fn test_wrapped_reports_missing_keys() {
        let err = parse_wrapped_object(r#"{"other": 1}"#, &["files"], false).unwrap_err();
        assert!(err.contains("no wrapper key found"));
    }
}
