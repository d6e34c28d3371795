use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use issue_relay_dispatch::RelaySettings;

mod commands;
mod logging;
use commands::{execute_config_command, execute_inspect_command, execute_serve_command, InspectArgs, ServeArgs};
use logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "issue-relay")]
#[command(about = "Receive GitLab issue webhooks and relay them onward")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the webhook receiver
    Serve(ServeCommandArgs),
    /// Run the extractor over a payload file without relaying
    Inspect(InspectCommandArgs),
    /// Show the resolved relay configuration
    Config(RelayArgs),
}

/// Relay settings shared by every command that needs them.
#[derive(Args, Debug, Clone, Default)]
pub struct RelayArgs {
    /// Generic relay endpoint receiving the issue as JSON
    #[arg(long, env = "RELAY_TARGET_URL")]
    pub target_url: Option<String>,
    /// Numeric GitLab project id for pipeline triggers
    #[arg(long, env = "GITLAB_PROJECT_ID")]
    pub project_id: Option<String>,
    /// Pipeline trigger token
    #[arg(long, env = "GITLAB_TRIGGER_TOKEN", hide_env_values = true)]
    pub trigger_token: Option<String>,
    /// Branch or tag the triggered pipeline runs on
    #[arg(long = "ref", env = "GITLAB_REF")]
    pub ref_name: Option<String>,
    /// GitLab base URL, e.g. https://gitlab.example.com
    #[arg(long, env = "GITLAB_BASE_URL")]
    pub base_url: Option<String>,
    /// Accept invalid TLS certificates on the pipeline trigger call
    #[arg(long, env = "GITLAB_INSECURE_SKIP_TLS_VERIFY")]
    pub insecure_skip_tls_verify: bool,
}

impl From<RelayArgs> for RelaySettings {
    fn from(args: RelayArgs) -> Self {
        RelaySettings {
            target_url: args.target_url,
            project_id: args.project_id,
            trigger_token: args.trigger_token,
            ref_name: args.ref_name,
            base_url: args.base_url,
            insecure_skip_tls_verify: args.insecure_skip_tls_verify,
        }
    }
}

#[derive(Args)]
pub struct ServeCommandArgs {
    /// Address to bind
    #[arg(long, env = "WEBHOOK_HOST", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to listen on
    #[arg(short, long, env = "WEBHOOK_PORT", default_value = "5000")]
    pub port: u16,
    #[command(flatten)]
    pub relay: RelayArgs,
}

#[derive(Args)]
pub struct InspectCommandArgs {
    /// Path to a webhook payload (JSON)
    pub payload: String,
    #[command(flatten)]
    pub relay: RelayArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal outside development.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match cli.command {
        Commands::Serve(args) => {
            let serve_args = ServeArgs {
                host: args.host,
                port: args.port,
                relay: args.relay.into(),
            };
            execute_serve_command(serve_args).await
        }
        Commands::Inspect(args) => {
            let inspect_args = InspectArgs {
                payload: args.payload,
                relay: args.relay.into(),
            };
            execute_inspect_command(inspect_args)
        }
        Commands::Config(args) => execute_config_command(args.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "issue-relay",
            "serve",
            "--port",
            "8080",
            "--project-id",
            "123",
            "--ref",
            "main",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, 8080);
                let settings: RelaySettings = args.relay.into();
                assert_eq!(settings.project_id.as_deref(), Some("123"));
                assert_eq!(settings.ref_name.as_deref(), Some("main"));
                assert!(!settings.insecure_skip_tls_verify);
            }
            _ => panic!("expected serve command"),
        }
    }
}
