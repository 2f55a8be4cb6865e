// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cloudnest")]
#[command(about = "Fetch apps from git, build them, and keep their containers running")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: cloudnest.yml in the current directory or a parent)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Owner whose apps are managed (default: $USER)
    #[arg(long, global = true, env = "CLOUDNEST_OWNER")]
    pub owner: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new cloudnest.yml configuration file
    Init {
        /// Directory apps are checked out into
        #[arg(long)]
        deploy_root: Option<String>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Register an app and deploy it
    Create {
        /// App name (lowercase letters, digits and hyphens)
        name: String,

        /// Repository to deploy from
        git_url: String,

        #[arg(short, long, default_value = "main")]
        branch: String,

        /// Container environment variable, repeatable
        #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,

        /// Register without deploying
        #[arg(long)]
        no_deploy: bool,
    },

    /// Fetch, build and run an app again
    Deploy {
        /// App name or id
        app: String,
    },

    /// Show one app
    Status {
        /// App name or id
        app: String,
    },

    /// List apps
    List,

    /// Show container output
    Logs {
        /// App name or id
        app: String,

        /// Number of lines (default from config)
        #[arg(short = 'n', long)]
        tail: Option<u64>,
    },

    /// Stop an app's container
    Stop {
        /// App name or id
        app: String,
    },

    /// Start a stopped app's container
    Start {
        /// App name or id
        app: String,
    },

    /// Remove an app, its container and its workspace
    Delete {
        /// App name or id
        app: String,
    },

    /// Report the container runtime in use
    Runtime,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_pairs_split_on_first_equals() {
        assert_eq!(
            parse_env_pair("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert!(parse_env_pair("=x").is_err());
        assert!(parse_env_pair("novalue").is_err());
    }

    #[test]
    fn create_collects_repeated_env() {
        let cli = Cli::try_parse_from([
            "cloudnest", "create", "web", "https://example.com/web.git", "-e", "A=1", "--env",
            "B=2", "--no-deploy",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { env, no_deploy, branch, .. } => {
                assert_eq!(env.len(), 2);
                assert!(no_deploy);
                assert_eq!(branch, "main");
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn quiet_conflicts_with_json() {
        assert!(Cli::try_parse_from(["cloudnest", "--quiet", "--json", "list"]).is_err());
    }
}
