//! End-to-end site service flows with a mock completion backend and canned stages

mod support;

use async_trait::async_trait;
use sitesmith::collab::{
    CollabError, FsProjectStore, OwnershipCriteria, OwnershipVerifier, PolicyRegistry,
    ProjectStore,
};
use sitesmith::completion::{CompletionClient, RetryPolicy};
use sitesmith::deploy::{
    DeployProfile, DeployProfileKind, DeploymentPipeline, ScrapeStrategy, SITE_OBJECT_MARKER,
};
use sitesmith::generation::{GenerationParams, ProjectId};
use sitesmith::llm::{BackendError, MockLLMClient, MockResponse};
use sitesmith::service::{AccessControl, ServiceError, SiteRequest, SiteService};
use sitesmith::workspace::MaterializeError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::{site_response, site_stages, CannedRunner};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Harness {
    _dir: TempDir,
    llm: Arc<MockLLMClient>,
    runner: Arc<CannedRunner>,
    store: Arc<FsProjectStore>,
    workspaces: std::path::PathBuf,
}

impl Harness {
    fn new(runner: CannedRunner) -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            llm: Arc::new(MockLLMClient::new()),
            runner: Arc::new(runner),
            store: Arc::new(FsProjectStore::new(dir.path().join("projects"), 64 * 1024)),
            workspaces: dir.path().join("workspaces"),
            _dir: dir,
        }
    }

    fn service(&self) -> SiteService {
        let profile = DeployProfile {
            kind: DeployProfileKind::Custom,
            stages: site_stages(),
            scrape: vec![ScrapeStrategy::labeled(SITE_OBJECT_MARKER)],
            stage_timeout: Duration::from_secs(60),
        };
        let pipeline = DeploymentPipeline::new(self.runner.clone(), profile.scrape.clone());
        let completion = CompletionClient::with_policy(self.llm.clone(), RetryPolicy::immediate());

        SiteService::new(
            completion,
            GenerationParams::default(),
            self.store.clone(),
            pipeline,
            profile,
            self.workspaces.clone(),
        )
    }
}

fn published_runner() -> CannedRunner {
    CannedRunner::new().succeed("publish", "Created new site\nNew site object ID: 0xabc123\n")
}

struct FixedVerifier(bool);

#[async_trait]
impl OwnershipVerifier for FixedVerifier {
    async fn verify_ownership(&self, _wallet: &str, _asset_type: &str) -> Result<bool, CollabError> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct RecordingRegistry {
    policies: Mutex<Vec<(String, OwnershipCriteria)>>,
}

#[async_trait]
impl PolicyRegistry for RecordingRegistry {
    async fn register_policy(
        &self,
        identifier: &str,
        criteria: &OwnershipCriteria,
    ) -> Result<(), CollabError> {
        self.policies
            .lock()
            .unwrap()
            .push((identifier.to_string(), criteria.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn test_create_site_end_to_end() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text(site_response()));

    let outcome = harness
        .service()
        .create_site(&SiteRequest::new("A bakery landing page"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.files.files.len(), 3);
    assert_eq!(outcome.publish.as_ref().unwrap().identifier, "0xabc123");
    assert_eq!(outcome.workspace, harness.workspaces.join(outcome.project_id.to_string()));
    assert!(outcome.workspace.join("src/App.tsx").exists());

    let package = std::fs::read_to_string(outcome.workspace.join("package.json")).unwrap();
    assert!(package.starts_with("{\n  \"name\": \"bakery\""));

    let stored = harness.store.load(outcome.project_id).await.unwrap();
    assert_eq!(stored.len(), 3);

    assert_eq!(harness.runner.invoked(), vec!["install", "build", "publish"]);
    assert!(harness
        .runner
        .working_directories()
        .iter()
        .all(|cwd| cwd.starts_with(&outcome.workspace)));

    let requests = harness.llm.requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].json_mode);
    assert!(requests[0]
        .messages
        .iter()
        .any(|m| m.content.contains("A bakery landing page")));
}

#[tokio::test]
async fn test_create_site_without_deploy() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text(site_response()));

    let outcome = harness
        .service()
        .create_site(
            &SiteRequest::new("A bakery landing page").without_deploy(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(outcome.publish.is_none());
    assert!(harness.runner.invoked().is_empty());
}

#[tokio::test]
async fn test_transient_error_retried_in_structured_mode() {
    let harness = Harness::new(published_runner());
    harness.llm.add_responses([
        MockResponse::error(BackendError::ApiError {
            message: "503 service unavailable".to_string(),
            status_code: Some(503),
        }),
        MockResponse::text(site_response()),
    ]);

    let outcome = harness
        .service()
        .create_site(&SiteRequest::new("A bakery").without_deploy(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.files.files.len(), 3);
    let requests = harness.llm.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].json_mode);
    assert!(requests[1].json_mode);
}

#[tokio::test]
async fn test_unparseable_output_surfaces_generic_message() {
    let harness = Harness::new(published_runner());
    harness
        .llm
        .add_response(MockResponse::text("Sure! I'd love to help you build a bakery site."));

    let err = harness
        .service()
        .create_site(&SiteRequest::new("A bakery"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Generate(_)));
    assert!(!err.public_message().contains("bakery"));
    assert!(harness.runner.invoked().is_empty());
    assert!(!harness.workspaces.exists());
}

#[tokio::test]
async fn test_empty_generation() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text("[]"));

    let err = harness
        .service()
        .create_site(&SiteRequest::new("A bakery"), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ServiceError::Generate(e) => assert!(e.is_empty_generation()),
        other => panic!("Expected empty generation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_build_failure_surfaces_stage() {
    let harness = Harness::new(CannedRunner::new().fail("build", 2, "tsc: error TS2304"));
    harness.llm.add_response(MockResponse::text(site_response()));

    let err = harness
        .service()
        .create_site(&SiteRequest::new("A bakery"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(harness.runner.invoked(), vec!["install", "build"]);
    match &err {
        ServiceError::Publish(e) => assert_eq!(e.stage(), Some("build")),
        other => panic!("Expected publish failure, got {:?}", other),
    }
    assert!(err.help_message().contains("tsc: error TS2304"));
    assert!(!err.public_message().contains("tsc"));
}

#[tokio::test]
async fn test_cancelled_before_generation() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text(site_response()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .service()
        .create_site(&SiteRequest::new("A bakery"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(harness.llm.call_count(), 0);
}

#[tokio::test]
async fn test_ownership_gate_and_policy_registration() {
    let harness = Harness::new(published_runner());
    let registry = Arc::new(RecordingRegistry::default());

    let denied = harness.service().with_access(
        AccessControl::new("0x2::nft::Badge").with_verifier(Arc::new(FixedVerifier(false))),
    );
    let err = denied
        .create_site(
            &SiteRequest::new("A bakery").with_wallet("0xwallet"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied { .. }));
    assert_eq!(err.public_message(), "Access denied.");
    assert_eq!(harness.llm.call_count(), 0);

    let err = denied
        .create_site(&SiteRequest::new("A bakery"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::WalletRequired { .. }));

    harness.llm.add_response(MockResponse::text(site_response()));
    let allowed = harness.service().with_access(
        AccessControl::new("0x2::nft::Badge")
            .with_verifier(Arc::new(FixedVerifier(true)))
            .with_registry(registry.clone()),
    );
    allowed
        .create_site(
            &SiteRequest::new("A bakery").with_wallet("0xwallet"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let policies = registry.policies.lock().unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].0, "0xabc123");
    assert_eq!(policies[0].1.asset_type, "0x2::nft::Badge");
    assert_eq!(policies[0].1.wallet_address.as_deref(), Some("0xwallet"));
}

#[tokio::test]
async fn test_refine_and_apply() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text(site_response()));
    let service = harness.service();

    let created = service
        .create_site(&SiteRequest::new("A bakery").without_deploy(), &CancellationToken::new())
        .await
        .unwrap();

    harness.llm.add_response(MockResponse::text(
        r#"{"files": [{"filename": "src/App.tsx", "content": "export default function App() { return <h1>Fresh Bread</h1>; }"}]}"#,
    ));
    let refined = service
        .refine_project(created.project_id, "Change the App heading", true, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(refined.files.paths(), vec!["src/App.tsx"]);
    assert!(refined.applied.is_some());

    let app = std::fs::read_to_string(created.workspace.join("src/App.tsx")).unwrap();
    assert!(app.contains("Fresh Bread"));

    let stored = harness.store.load(created.project_id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.get("src/App.tsx").unwrap().content.contains("Fresh Bread"));

    let requests = harness.llm.requests();
    let refine_request = requests.last().unwrap();
    assert!(refine_request.json_mode);
    assert!(refine_request
        .messages
        .iter()
        .any(|m| m.content.contains("--- src/App.tsx ---")));
}

#[tokio::test]
async fn test_refine_with_escaping_path_leaves_project_untouched() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text(site_response()));
    let service = harness.service();

    let created = service
        .create_site(&SiteRequest::new("A bakery").without_deploy(), &CancellationToken::new())
        .await
        .unwrap();

    harness.llm.add_response(MockResponse::text(
        r#"{"files": [{"filename": "src/App.tsx", "content": "hijacked"}, {"filename": "../../evil.sh", "content": "rm -rf ~"}]}"#,
    ));
    let err = service
        .refine_project(created.project_id, "Add a deploy script", true, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Materialize(MaterializeError::PathEscape { ref path }) if path == "../../evil.sh"
    ));

    let stored = harness.store.load(created.project_id).await.unwrap();
    assert_eq!(stored.paths(), vec!["package.json", "index.html", "src/App.tsx"]);
    assert!(!stored.get("src/App.tsx").unwrap().content.contains("hijacked"));

    let app = std::fs::read_to_string(created.workspace.join("src/App.tsx")).unwrap();
    assert!(!app.contains("hijacked"));
}

#[tokio::test]
async fn test_generated_escaping_path_is_never_stored() {
    let harness = Harness::new(published_runner());
    harness.llm.add_response(MockResponse::text(
        r#"[{"filename": "index.html", "content": "<h1>Hi</h1>"}, {"filename": "../outside.txt", "content": "x"}]"#,
    ));

    let err = harness
        .service()
        .create_site(&SiteRequest::new("A bakery"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Materialize(MaterializeError::PathEscape { .. })));
    let stored = std::fs::read_dir(harness.store.dir())
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(stored, 0);
    assert!(!harness.workspaces.exists());
    assert!(harness.runner.invoked().is_empty());
}

#[tokio::test]
async fn test_refine_without_changes() {
    let harness = Harness::new(published_runner());
    let id = ProjectId::new();
    harness
        .store
        .save(id, &sitesmith::normalize::normalize(&site_response()).unwrap())
        .await
        .unwrap();
    harness.llm.add_response(MockResponse::text(r#"{"files": []}"#));

    let refined = harness
        .service()
        .refine_project(id, "Anything to fix?", true, &CancellationToken::new())
        .await
        .unwrap();

    assert!(refined.files.is_empty());
    assert!(refined.applied.is_none());
}

#[tokio::test]
async fn test_refine_unknown_project() {
    let harness = Harness::new(published_runner());

    let err = harness
        .service()
        .refine_project(ProjectId::new(), "Make it blue", false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Collab(CollabError::ProjectNotFound(_))));
    assert_eq!(err.public_message(), "Project not found.");
    assert_eq!(harness.llm.call_count(), 0);
}
