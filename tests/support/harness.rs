// ABOUTME: Orchestrator wired to in-memory collaborators for integration tests.

use super::fake_fetcher::FakeFetcher;
use super::fake_runtime::FakeRuntime;
use cloudnest::app::{AppRecord, AppSpec, AppStatus};
use cloudnest::build::{BuildRegistry, BuildSettings};
use cloudnest::deploy::{DeployError, DeploySettings, Orchestrator};
use cloudnest::runtime::ContainerSupervisor;
use cloudnest::store::{AppFilter, AppStore, MemoryStore};
use cloudnest::types::{AppId, AppName, OwnerId};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub runtime: Arc<FakeRuntime>,
    pub fetcher: Arc<FakeFetcher>,
    pub store: Arc<MemoryStore>,
    pub owner: OwnerId,
    pub root: TempDir,
}

impl Harness {
    /// Fake runtime available, build tools that always succeed.
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::build(files, true, |_, _| {})
    }

    pub fn without_runtime(files: &[(&str, &str)]) -> Self {
        Self::build(files, false, |_, _| {})
    }

    pub fn build(
        files: &[(&str, &str)],
        with_runtime: bool,
        configure: impl FnOnce(&mut DeploySettings, &mut BuildSettings),
    ) -> Self {
        super::init_tracing();
        let root = tempfile::tempdir().unwrap();
        let runtime = FakeRuntime::new();
        let fetcher = Arc::new(FakeFetcher::with_files(files));
        let store = Arc::new(MemoryStore::new());

        let mut deploy = DeploySettings {
            deploy_root: root.path().join("apps"),
            fetch_timeout: Duration::from_secs(10),
            build_timeout: Duration::from_secs(10),
            log_tail: 100,
        };
        let mut build = BuildSettings {
            pip: "true".to_string(),
            npm: "true".to_string(),
            ..BuildSettings::default()
        };
        configure(&mut deploy, &mut build);

        let supervisor = if with_runtime {
            runtime.supervisor()
        } else {
            ContainerSupervisor::unavailable()
        };
        let builds = BuildRegistry::standard(&build, supervisor.clone());
        let orchestrator = Orchestrator::new(
            store.clone(),
            fetcher.clone(),
            supervisor,
            builds,
            deploy,
        );

        Self {
            orchestrator,
            runtime,
            fetcher,
            store,
            owner: OwnerId::new("alice"),
            root,
        }
    }

    /// Another orchestrator over the same store, runtime and deploy root, with its own
    /// lock table. Stands in for a second cloudnest process.
    pub fn sibling(&self) -> Orchestrator {
        let supervisor = self.orchestrator.supervisor().clone();
        let build = BuildSettings {
            pip: "true".to_string(),
            npm: "true".to_string(),
            ..BuildSettings::default()
        };
        Orchestrator::new(
            self.store.clone(),
            self.fetcher.clone(),
            supervisor.clone(),
            BuildRegistry::standard(&build, supervisor),
            self.orchestrator.settings().clone(),
        )
    }

    pub fn spec(name: &str) -> AppSpec {
        AppSpec::new(
            AppName::parse(name).unwrap(),
            format!("https://git.example.com/{name}.git"),
        )
    }

    pub async fn create(&self, name: &str) -> AppRecord {
        self.orchestrator
            .create_app(&self.owner, Self::spec(name))
            .await
            .unwrap()
    }

    /// Trigger a deploy and wait for it to settle.
    pub async fn deploy(&self, id: &AppId) -> Result<AppRecord, DeployError> {
        self.orchestrator
            .trigger_deploy(&self.owner, id)
            .await?
            .wait()
            .await
    }

    /// Create and deploy, expecting success.
    pub async fn deployed(&self, name: &str) -> AppRecord {
        let record = self.create(name).await;
        self.deploy(&record.id).await.unwrap()
    }

    pub async fn record(&self, id: &AppId) -> AppRecord {
        self.store
            .find_one(&AppFilter::by_id(id))
            .await
            .unwrap()
            .expect("record should exist")
    }

    /// Poll until the record reaches `status`.
    pub async fn wait_for(&self, id: &AppId, status: AppStatus) {
        for _ in 0..200 {
            if self.record(id).await.status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("app never reached {status}");
    }
}
