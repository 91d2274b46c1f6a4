use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One external process invocation in a deployment pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub name: String,
    /// Program followed by its arguments
    pub command: Vec<String>,
    /// Relative paths are resolved against the pipeline root
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    /// Path that must exist after the stage succeeds, relative to its working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_path: Option<PathBuf>,
    /// Overrides the pipeline's default stage timeout
    #[serde(
        default,
        rename = "timeout_secs",
        with = "optional_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

impl PipelineStage {
    pub fn new<I, S>(name: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            command: command.into_iter().map(Into::into).collect(),
            working_directory: default_working_directory(),
            expect_path: None,
            timeout: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn expecting(mut self, path: impl Into<PathBuf>) -> Self {
        self.expect_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    pub fn resolve_working_directory(&self, root: &Path) -> PathBuf {
        if self.working_directory.is_absolute() {
            self.working_directory.clone()
        } else {
            root.join(&self.working_directory)
        }
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_u64(duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let stage = PipelineStage::new("build", ["npm", "run", "build"]).expecting("dist");
        assert_eq!(stage.program(), Some("npm"));
        assert_eq!(stage.command_line(), "npm run build");
        assert_eq!(stage.expect_path, Some(PathBuf::from("dist")));
        assert_eq!(stage.working_directory, PathBuf::from("."));
    }

    #[test]
    fn test_resolve_working_directory() {
        let root = Path::new("/work/site");
        let relative = PipelineStage::new("a", ["true"]).in_dir("app");
        assert_eq!(
            relative.resolve_working_directory(root),
            PathBuf::from("/work/site/app")
        );

        let absolute = PipelineStage::new("a", ["true"]).in_dir("/opt/tool");
        assert_eq!(
            absolute.resolve_working_directory(root),
            PathBuf::from("/opt/tool")
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let stage: PipelineStage =
            serde_yaml::from_str("name: publish\ncommand: [walrus, store, .]\ntimeout_secs: 30\n")
                .unwrap();
        assert_eq!(stage.working_directory, PathBuf::from("."));
        assert_eq!(stage.timeout, Some(Duration::from_secs(30)));
        assert!(stage.expect_path.is_none());
    }
}
