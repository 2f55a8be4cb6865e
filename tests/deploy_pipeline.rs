// ABOUTME: Integration tests for the deploy pipeline: fetch, detect, build, settle.
// ABOUTME: Runs the orchestrator against a fake runtime and fetcher.

mod support;

use cloudnest::app::{AppStatus, RuntimeKind};
use cloudnest::deploy::{DeployError, DeployErrorKind};
use cloudnest::types::{AppId, OwnerId};
use std::time::Duration;
use support::harness::Harness;

const DOCKERFILE: &[(&str, &str)] = &[("Dockerfile", "FROM scratch\n")];

mod outcomes {
    use super::*;

    #[tokio::test]
    async fn dockerfile_ends_running_with_container() {
        let h = Harness::new(DOCKERFILE);
        let record = h.deployed("web").await;

        assert_eq!(record.status, AppStatus::Running);
        assert_eq!(record.runtime_kind, Some(RuntimeKind::ContainerImage));
        assert!(record.deployed_at.is_some());
        assert!(record.error.is_none());

        let descriptor = record.container.expect("running app has a container");
        assert_eq!(descriptor.image, "cloudnest/web:latest");
        assert_eq!(
            descriptor.name,
            format!("cloudnest-web-{}", record.id.short())
        );

        let container = h.runtime.container(&descriptor.id).unwrap();
        assert!(container.running);
        assert_eq!(container.labels["cloudnest.app"], record.id.as_str());
        assert_eq!(container.labels["cloudnest.owner"], "alice");
        assert!(h.runtime.has_image("cloudnest/web:latest"));
    }

    #[tokio::test]
    async fn container_gets_app_env() {
        let h = Harness::new(DOCKERFILE);
        let spec = Harness::spec("api").env("PORT", "8080");
        let record = h.orchestrator.create_app(&h.owner, spec).await.unwrap();
        let record = h.deploy(&record.id).await.unwrap();

        let container = h.runtime.container(&record.container.unwrap().id).unwrap();
        assert_eq!(container.env["PORT"], "8080");
    }

    #[tokio::test]
    async fn static_site_is_deployed_without_container() {
        let h = Harness::new(&[("index.html", "<h1>hi</h1>")]);
        let record = h.deployed("site").await;

        assert_eq!(record.status, AppStatus::Deployed);
        assert_eq!(record.runtime_kind, Some(RuntimeKind::StaticSite));
        assert!(record.container.is_none());
        assert!(record.deployed_at.is_some());
        assert!(h.runtime.containers().is_empty());
    }

    #[tokio::test]
    async fn python_installs_and_ends_deployed() {
        let h = Harness::new(&[("requirements.txt", "flask\n"), ("app.py", "")]);
        let record = h.deployed("py").await;

        assert_eq!(record.status, AppStatus::Deployed);
        assert_eq!(record.runtime_kind, Some(RuntimeKind::PythonRuntime));
        assert!(record.container.is_none());
    }

    #[tokio::test]
    async fn bot_detected_separately() {
        let h = Harness::new(&[("requirements.txt", ""), ("bot.py", "")]);
        let record = h.deployed("bot").await;
        assert_eq!(record.runtime_kind, Some(RuntimeKind::PythonBot));
        assert_eq!(record.status, AppStatus::Deployed);
    }

    #[tokio::test]
    async fn node_app_is_deployed() {
        let h = Harness::new(&[("package.json", "{}")]);
        let record = h.deployed("node").await;
        assert_eq!(record.runtime_kind, Some(RuntimeKind::NodeRuntime));
        assert_eq!(record.status, AppStatus::Deployed);
    }

    #[tokio::test]
    async fn unrecognised_workspace_is_unknown_type() {
        let h = Harness::new(&[("README.md", "# nothing")]);
        let record = h.deployed("mystery").await;

        assert_eq!(record.status, AppStatus::UnknownType);
        assert_eq!(record.runtime_kind, Some(RuntimeKind::Unknown));
        assert!(record.error.is_none());
        assert!(record.deployed_at.is_none());
    }

    #[tokio::test]
    async fn workspace_lives_under_owner_and_name() {
        let h = Harness::new(&[("index.html", "")]);
        h.deployed("site").await;
        assert!(h.root.path().join("apps/alice/site/index.html").is_file());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn fetch_failure_marks_failed_with_cause() {
        let h = Harness::new(DOCKERFILE);
        h.fetcher.fail_with("repository not found");
        let record = h.create("web").await;

        let err = h.deploy(&record.id).await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Fetch);

        let record = h.record(&record.id).await;
        assert_eq!(record.status, AppStatus::Failed);
        assert!(record.error.unwrap().contains("repository not found"));
        assert!(record.runtime_kind.is_none());
    }

    #[tokio::test]
    async fn build_failure_keeps_detected_kind() {
        let h = Harness::new(DOCKERFILE);
        h.runtime.fail_builds("step 2/3 failed");
        let record = h.create("web").await;

        let err = h.deploy(&record.id).await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Build);

        let record = h.record(&record.id).await;
        assert_eq!(record.status, AppStatus::Failed);
        assert_eq!(record.runtime_kind, Some(RuntimeKind::ContainerImage));
        assert!(record.error.unwrap().contains("step 2/3 failed"));
        assert!(record.container.is_none());
    }

    #[tokio::test]
    async fn failing_install_marks_failed() {
        let h = Harness::build(&[("package.json", "{}")], true, |_, build| {
            build.npm = "false".to_string();
        });
        let record = h.create("node").await;

        let err = h.deploy(&record.id).await.unwrap_err();
        assert!(matches!(err, DeployError::Build(_)));
        assert_eq!(h.record(&record.id).await.status, AppStatus::Failed);
    }

    #[tokio::test]
    async fn dockerfile_without_runtime_fails() {
        let h = Harness::without_runtime(DOCKERFILE);
        let record = h.create("web").await;

        let err = h.deploy(&record.id).await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::RuntimeUnavailable);

        let record = h.record(&record.id).await;
        assert_eq!(record.status, AppStatus::Failed);
        assert!(record.error.unwrap().contains("no container runtime"));
    }

    #[tokio::test]
    async fn fetch_timeout_is_reported() {
        let h = Harness::build(DOCKERFILE, true, |deploy, _| {
            deploy.fetch_timeout = Duration::from_millis(50);
        });
        h.fetcher.set_delay(Duration::from_secs(5));
        let record = h.create("web").await;

        let err = h.deploy(&record.id).await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Timeout);

        let record = h.record(&record.id).await;
        assert_eq!(record.status, AppStatus::Failed);
        assert!(record.error.unwrap().contains("fetch timed out"));
    }

    #[tokio::test]
    async fn build_timeout_is_reported() {
        let h = Harness::build(DOCKERFILE, true, |deploy, _| {
            deploy.build_timeout = Duration::from_millis(50);
        });
        h.runtime.slow_builds(Duration::from_secs(5));
        let record = h.create("web").await;

        let err = h.deploy(&record.id).await.unwrap_err();
        assert!(matches!(err, DeployError::Timeout { stage: "build", .. }));
        assert!(h.runtime.containers().is_empty());
    }

    #[tokio::test]
    async fn failed_app_can_be_redeployed() {
        let h = Harness::new(DOCKERFILE);
        h.runtime.fail_builds("boom");
        let record = h.create("web").await;
        h.deploy(&record.id).await.unwrap_err();

        h.runtime.succeed_builds();
        let record = h.deploy(&record.id).await.unwrap();
        assert_eq!(record.status, AppStatus::Running);
        assert!(record.error.is_none());
    }
}

mod triggering {
    use super::*;

    #[tokio::test]
    async fn missing_app_is_not_found() {
        let h = Harness::new(DOCKERFILE);
        let err = h
            .orchestrator
            .trigger_deploy(&h.owner, &AppId::new("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::NotFound);
        assert_eq!(h.fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn other_owners_app_is_not_found() {
        let h = Harness::new(DOCKERFILE);
        let record = h.create("web").await;
        let err = h
            .orchestrator
            .trigger_deploy(&OwnerId::new("mallory"), &record.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::NotFound);
    }

    #[tokio::test]
    async fn trigger_returns_before_deploy_finishes() {
        let h = Harness::new(DOCKERFILE);
        h.fetcher.set_delay(Duration::from_millis(200));
        let record = h.create("web").await;

        let handle = h
            .orchestrator
            .trigger_deploy(&h.owner, &record.id)
            .await
            .unwrap();
        assert!(!handle.is_finished());
        assert_eq!(handle.app_id(), &record.id);

        let record = handle.wait().await.unwrap();
        assert_eq!(record.status, AppStatus::Running);
    }

    #[tokio::test]
    async fn deploy_of_deleted_record_is_not_found() {
        let h = Harness::new(DOCKERFILE);
        let err = h
            .orchestrator
            .deploy(&AppId::new("ghost"), Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::NotFound(_)));
    }
}

mod redeploy {
    use super::*;

    #[tokio::test]
    async fn redeploy_replaces_container() {
        let h = Harness::new(DOCKERFILE);
        let first = h.deployed("web").await;
        let old = first.container.unwrap().id;

        let second = h.deploy(&first.id).await.unwrap();
        let new = second.container.unwrap().id;

        assert_ne!(old, new);
        assert!(h.runtime.container(&old).is_none());
        assert_eq!(h.runtime.containers().len(), 1);
    }

    #[tokio::test]
    async fn redeploy_after_stop_works() {
        let h = Harness::new(DOCKERFILE);
        let record = h.deployed("web").await;
        h.orchestrator.stop(&h.owner, &record.id).await.unwrap();

        let record = h.deploy(&record.id).await.unwrap();
        assert_eq!(record.status, AppStatus::Running);
        assert_eq!(h.runtime.containers().len(), 1);
    }

    #[tokio::test]
    async fn switching_to_static_drops_container() {
        let h = Harness::new(DOCKERFILE);
        let record = h.deployed("web").await;

        h.fetcher.set_files(&[("index.html", "")]);
        let record = h.deploy(&record.id).await.unwrap();
        assert_eq!(record.status, AppStatus::Deployed);
        assert!(record.container.is_none());
        assert!(h.runtime.containers().is_empty());
    }

    #[tokio::test]
    async fn concurrent_deploys_are_serialized() {
        let h = Harness::new(DOCKERFILE);
        h.fetcher.set_delay(Duration::from_millis(50));
        let record = h.create("web").await;

        let first = h
            .orchestrator
            .trigger_deploy(&h.owner, &record.id)
            .await
            .unwrap();
        let second = h
            .orchestrator
            .trigger_deploy(&h.owner, &record.id)
            .await
            .unwrap();

        first.wait().await.unwrap();
        let last = second.wait().await.unwrap();

        assert_eq!(last.status, AppStatus::Running);
        assert_eq!(h.fetcher.fetches(), 2);
        assert_eq!(h.runtime.containers().len(), 1);
    }

    #[tokio::test]
    async fn different_apps_deploy_concurrently() {
        let h = Harness::new(DOCKERFILE);
        h.fetcher.set_delay(Duration::from_millis(200));
        let a = h.create("a").await;
        let b = h.create("b").await;

        let started = std::time::Instant::now();
        let ha = h.orchestrator.trigger_deploy(&h.owner, &a.id).await.unwrap();
        let hb = h.orchestrator.trigger_deploy(&h.owner, &b.id).await.unwrap();
        ha.wait().await.unwrap();
        hb.wait().await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(390));
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn cancel_deploy_marks_failed() {
        let h = Harness::new(DOCKERFILE);
        h.fetcher.set_delay(Duration::from_secs(5));
        let record = h.create("web").await;

        let handle = h
            .orchestrator
            .trigger_deploy(&h.owner, &record.id)
            .await
            .unwrap();
        h.wait_for(&record.id, AppStatus::Building).await;

        assert!(h.orchestrator.cancel_deploy(&h.owner, &record.id).await.unwrap());
        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.kind(), DeployErrorKind::Cancelled);

        let record = h.record(&record.id).await;
        assert_eq!(record.status, AppStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("deploy cancelled"));
    }

    #[tokio::test]
    async fn handle_cancel_only_stops_its_deploy() {
        let h = Harness::new(DOCKERFILE);
        h.fetcher.set_delay(Duration::from_millis(100));
        let record = h.create("web").await;

        let first = h
            .orchestrator
            .trigger_deploy(&h.owner, &record.id)
            .await
            .unwrap();
        let second = h
            .orchestrator
            .trigger_deploy(&h.owner, &record.id)
            .await
            .unwrap();
        h.wait_for(&record.id, AppStatus::Building).await;

        first.cancel();
        assert_eq!(first.wait().await.unwrap_err().kind(), DeployErrorKind::Cancelled);
        assert_eq!(second.wait().await.unwrap().status, AppStatus::Running);
    }

    #[tokio::test]
    async fn cancel_without_deploy_returns_false() {
        let h = Harness::new(DOCKERFILE);
        let record = h.create("web").await;
        assert!(!h.orchestrator.cancel_deploy(&h.owner, &record.id).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_after_finish_returns_false() {
        let h = Harness::new(DOCKERFILE);
        let record = h.deployed("web").await;
        assert!(!h.orchestrator.cancel_deploy(&h.owner, &record.id).await.unwrap());
    }
}
