//! Response normalizer behavior against realistic model output

use sitesmith::files::{FileDescriptor, FileSet};
use sitesmith::normalize::{normalize, Normalizer, ParseStrategy};
use yare::parameterized;

fn descriptors() -> Vec<FileDescriptor> {
    vec![
        FileDescriptor::new("index.html", "<!doctype html><div id=\"root\"></div>").with_kind("html"),
        FileDescriptor::new("src/main.tsx", "import App from './App';").with_kind("typescript"),
        FileDescriptor::new("package.json", "{\"name\":\"site\"}").with_kind("json"),
    ]
}

#[test]
fn test_array_round_trip() {
    let raw = serde_json::to_string(&descriptors()).unwrap();
    let files = normalize(&raw).unwrap();
    assert_eq!(files.into_vec(), descriptors());
}

#[test]
fn test_single_object() {
    let raw = r#"{"filename": "index.html", "type": "html", "content": "<h1>Hello</h1>"}"#;
    let files = normalize(raw).unwrap();
    assert_eq!(
        files.into_vec(),
        vec![FileDescriptor::new("index.html", "<h1>Hello</h1>").with_kind("html")]
    );
}

#[test]
fn test_fenced_response() {
    let raw = "\n```json\n[{\"filename\": \"a.css\", \"content\": \"body{}\"}]\n```\n";
    let files = normalize(raw).unwrap();
    assert_eq!(files.paths(), vec!["a.css"]);
}

#[parameterized(
    files_key = { r#"{"files": [{"filename": "f.txt", "content": "1"}]}"#, "f.txt" },
    result_key = { r#"{"result": [{"filename": "r.txt", "content": "1"}]}"#, "r.txt" },
    output_key = { r#"{"output": [{"filename": "o.txt", "content": "1"}]}"#, "o.txt" },
    earliest_key_wins = {
        r#"{"output": [{"filename": "o.txt", "content": "1"}], "code": [{"filename": "c.txt", "content": "2"}]}"#,
        "c.txt"
    },
    empty_earlier_key_skipped = {
        r#"{"files": [], "data": [{"filename": "d.txt", "content": "1"}]}"#,
        "d.txt"
    },
    invalid_earlier_key_skipped = {
        r#"{"files": "none", "result": [{"filename": "r.txt", "content": "1"}]}"#,
        "r.txt"
    },
)]
fn test_wrapper_key_precedence(raw: &str, expected: &str) {
    let files = normalize(raw).unwrap();
    assert_eq!(files.paths(), vec![expected]);
}

#[parameterized(
    empty = { "" },
    whitespace = { "   \n" },
    prose = { "not json at all" },
    number = { "42" },
    unknown_wrapper = { r#"{"items": [{"filename": "a", "content": "b"}]}"# },
    missing_content = { r#"[{"filename": "a.txt"}]"# },
)]
fn test_parse_failure(raw: &str) {
    let err = normalize(raw).unwrap_err();
    let tried: Vec<ParseStrategy> = err.attempts().iter().map(|a| a.strategy).collect();
    assert_eq!(tried, ParseStrategy::ORDER.to_vec());
}

#[test]
fn test_generation_rejects_empty_wrapper_but_refinement_accepts_it() {
    let raw = r#"{"changes": []}"#;
    assert!(Normalizer::generation().normalize(raw).is_err());

    let files = Normalizer::refinement().normalize(raw).unwrap();
    assert_eq!(files, FileSet::new());
}

#[test]
fn test_refinement_changes_key() {
    let raw = r#"{"changes": [{"filename": "src/Navbar.tsx", "content": "export {}"}]}"#;
    let files = Normalizer::refinement().normalize(raw).unwrap();
    assert_eq!(files.paths(), vec!["src/Navbar.tsx"]);
}

#[test]
fn test_duplicate_paths_last_wins() {
    let raw = r#"[
        {"filename": "a.txt", "content": "first"},
        {"filename": "b.txt", "content": "b"},
        {"filename": "a.txt", "content": "second"}
    ]"#;
    let files = normalize(raw).unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files.get("a.txt").unwrap().content, "second");
}

#[test]
fn test_failure_excerpt_is_bounded() {
    let raw = "x".repeat(5_000);
    let err = normalize(&raw).unwrap_err();
    assert!(err.excerpt().chars().count() <= 200);
}
