use std::path::{Component, Path};

/// Canonical form of a model-supplied relative path.
///
/// Backslashes count as separators and `.` segments are dropped, so
/// `./src\App.tsx` becomes `src/App.tsx`. Returns `None` when the path is
/// absolute, contains a `..` segment, or names no file at all.
pub fn normalized_path(raw: &str) -> Option<String> {
    let forward = raw.replace('\\', "/");
    let mut parts = Vec::new();

    for component in Path::new(&forward).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_spellings() {
        assert_eq!(normalized_path("a.txt").as_deref(), Some("a.txt"));
        assert_eq!(normalized_path("./a.txt").as_deref(), Some("a.txt"));
        assert_eq!(normalized_path("src\\components\\Nav.tsx").as_deref(), Some("src/components/Nav.tsx"));
        assert_eq!(normalized_path("src//./App.tsx").as_deref(), Some("src/App.tsx"));
    }

    #[test]
    fn test_rejects_escaping_and_empty() {
        assert_eq!(normalized_path("../evil.sh"), None);
        assert_eq!(normalized_path("a/../../evil.sh"), None);
        assert_eq!(normalized_path("/etc/passwd"), None);
        assert_eq!(normalized_path("./"), None);
        assert_eq!(normalized_path(""), None);
    }
}
