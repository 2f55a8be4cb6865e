// ABOUTME: Command dispatch for the cloudnest CLI.
// ABOUTME: Builds the orchestrator from config and routes each subcommand.

mod apps;
mod control;
mod deploy;
mod runtime;

use crate::cli::{Cli, Commands};
use cloudnest::build::BuildRegistry;
use cloudnest::config::{self, Config};
use cloudnest::deploy::{DeployError, Orchestrator};
use cloudnest::error::Result;
use cloudnest::output::Output;
use cloudnest::runtime::ContainerSupervisor;
use cloudnest::source::GitFetcher;
use cloudnest::store::JsonFileStore;
use cloudnest::types::{AppId, AppName, OwnerId};
use std::env;
use std::sync::Arc;

/// What every app command needs.
pub struct Context {
    pub orchestrator: Orchestrator,
    pub owner: OwnerId,
}

impl Context {
    async fn new(config: &Config, owner: OwnerId) -> Result<Self> {
        let supervisor = ContainerSupervisor::connect_or_unavailable(&config.runtime)
            .await
            .with_stop_timeout(config.stop_timeout);
        let state_file = config.state_file()?;
        tracing::debug!(state_file = %state_file.display(), "opening app store");

        let builds = BuildRegistry::standard(&config.build_settings()?, supervisor.clone());
        let orchestrator = Orchestrator::new(
            Arc::new(JsonFileStore::open(state_file)),
            Arc::new(GitFetcher::new()),
            supervisor,
            builds,
            config.deploy_settings()?,
        );
        Ok(Self {
            orchestrator,
            owner,
        })
    }

    /// Look an app up by id or by name.
    pub async fn resolve(&self, app: &str) -> Result<AppId> {
        let name = AppName::parse(app).ok();
        self.orchestrator
            .list(&self.owner)
            .await?
            .into_iter()
            .find(|r| r.id.as_str() == app || Some(r.name()) == name.as_ref())
            .map(|r| r.id)
            .ok_or_else(|| DeployError::NotFound(AppId::new(app)).into())
    }
}

pub async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init { deploy_root, force } = &cli.command {
        config::init_config(&cwd, deploy_root.as_deref(), *force)?;
        output.success(&format!("Created {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover_or_default(&cwd)?,
    };

    if let Commands::Runtime = cli.command {
        return runtime::report(&config, output).await;
    }

    let ctx = Context::new(&config, owner(cli.owner)).await?;

    match cli.command {
        Commands::Create {
            name,
            git_url,
            branch,
            env,
            no_deploy,
        } => apps::create(&ctx, &name, git_url, branch, env, no_deploy, output).await,
        Commands::Deploy { app } => deploy::deploy(&ctx, &app, output).await,
        Commands::Status { app } => apps::status(&ctx, &app, output).await,
        Commands::List => apps::list(&ctx, output).await,
        Commands::Logs { app, tail } => control::logs(&ctx, &app, tail, output).await,
        Commands::Stop { app } => control::stop(&ctx, &app, output).await,
        Commands::Start { app } => control::start(&ctx, &app, output).await,
        Commands::Delete { app } => apps::delete(&ctx, &app, output).await,
        Commands::Init { .. } | Commands::Runtime => Ok(()),
    }
}

fn owner(flag: Option<String>) -> OwnerId {
    let name = flag
        .or_else(|| env::var("USER").ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "local".to_string());
    OwnerId::new(name)
}
