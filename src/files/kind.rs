//! Fallback content-category lookup for files the model did not label.

use std::path::Path;

/// Category reported when neither extension nor file name is recognized.
pub const UNKNOWN_KIND: &str = "Unknown";

/// Infers a content category from a file path.
///
/// Extensions are matched case-insensitively; a handful of well-known
/// configuration file names are recognized when the extension alone is not
/// conclusive.
pub fn infer_kind(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    let file = Path::new(&lower);
    let base = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(lower.as_str());

    // Dotfiles such as `.env` have no extension according to `Path`.
    let ext = match file.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext,
        None => base.strip_prefix('.').unwrap_or(""),
    };

    match ext {
        "html" => "HTML",
        "css" => "CSS",
        "js" => "JavaScript",
        "jsx" => "JSX",
        "ts" => "TypeScript",
        "tsx" => "TSX",
        "json" => "JSON",
        "md" => "Markdown",
        "txt" => "Text",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "sh" => "Shell",
        "py" => "Python",
        "go" => "Go",
        "env" => "Env",
        "gitignore" => "GitIgnore",
        "svg" => "SVG",
        "png" | "jpg" | "jpeg" | "gif" | "webp" => "Image",
        _ => infer_from_name(base),
    }
}

fn infer_from_name(base: &str) -> &'static str {
    if base.contains("dockerfile") {
        "Dockerfile"
    } else if base.contains("vite.config") || base.contains("tailwind.config") {
        "Config"
    } else {
        UNKNOWN_KIND
    }
}

/// Returns true when the declared or inferred kind names JSON content.
pub fn is_json_kind(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup() {
        assert_eq!(infer_kind("src/App.tsx"), "TSX");
        assert_eq!(infer_kind("index.html"), "HTML");
        assert_eq!(infer_kind("config/site.YML"), "YAML");
        assert_eq!(infer_kind("public/logo.webp"), "Image");
        assert_eq!(infer_kind("package.json"), "JSON");
    }

    #[test]
    fn test_dotfiles() {
        assert_eq!(infer_kind(".env"), "Env");
        assert_eq!(infer_kind("app/.gitignore"), "GitIgnore");
    }

    #[test]
    fn test_well_known_names() {
        assert_eq!(infer_kind("Dockerfile"), "Dockerfile");
        assert_eq!(infer_kind("vite.config.mjs"), "Config");
    }

    #[test]
    fn test_unknown_defaults() {
        assert_eq!(infer_kind("LICENSE"), UNKNOWN_KIND);
        assert_eq!(infer_kind("bin/tool.exe"), UNKNOWN_KIND);
    }

    #[test]
    fn test_json_kind_is_case_insensitive() {
        assert!(is_json_kind("json"));
        assert!(is_json_kind("JSON"));
        assert!(!is_json_kind("jsonc"));
    }
}
