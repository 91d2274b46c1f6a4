//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sitesmith::deploy::{PipelineStage, StageFailure, StageOutput, StageRunner, Termination};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Stage runner that replays canned outputs keyed by stage name.
///
/// Stages without a canned output succeed with empty output. Every
/// invocation is recorded so tests can assert which stages ran.
#[derive(Default)]
pub struct CannedRunner {
    outputs: Mutex<HashMap<String, StageOutput>>,
    invocations: Mutex<Vec<(String, PathBuf)>>,
}

impl CannedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(self, stage: &str, stdout: &str) -> Self {
        self.canned(stage, Termination::Exited(Some(0)), stdout, "")
    }

    pub fn fail(self, stage: &str, code: i32, stderr: &str) -> Self {
        self.canned(stage, Termination::Exited(Some(code)), "", stderr)
    }

    pub fn canned(self, stage: &str, termination: Termination, stdout: &str, stderr: &str) -> Self {
        self.outputs.lock().unwrap().insert(
            stage.to_string(),
            StageOutput {
                termination,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    /// Stage names in invocation order
    pub fn invoked(&self) -> Vec<String> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn working_directories(&self) -> Vec<PathBuf> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cwd)| cwd.clone())
            .collect()
    }
}

#[async_trait]
impl StageRunner for CannedRunner {
    async fn run(
        &self,
        stage: &PipelineStage,
        cwd: &Path,
        _timeout: Duration,
        _cancel: &CancellationToken,
    ) -> Result<StageOutput, StageFailure> {
        self.invocations
            .lock()
            .unwrap()
            .push((stage.name.clone(), cwd.to_path_buf()));

        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(&stage.name)
            .cloned()
            .unwrap_or(StageOutput {
                termination: Termination::Exited(Some(0)),
                stdout: String::new(),
                stderr: String::new(),
            }))
    }
}

/// The install/build/publish stage list used by the site-builder flow.
pub fn site_stages() -> Vec<PipelineStage> {
    vec![
        PipelineStage::new("install", ["npm", "install"]),
        PipelineStage::new("build", ["npm", "run", "build"]),
        PipelineStage::new("publish", ["site-builder", "publish", "dist"]),
    ]
}

/// Model output for a small but complete site.
pub fn site_response() -> String {
    serde_json::json!({
        "files": [
            {"filename": "package.json", "type": "json", "content": "{\"name\":\"bakery\",\"scripts\":{\"build\":\"vite build\"}}"},
            {"filename": "index.html", "type": "html", "content": "<div id=\"root\"></div>"},
            {"filename": "src/App.tsx", "type": "typescript", "content": "export default function App() { return <h1>Bakery</h1>; }"}
        ]
    })
    .to_string()
}
