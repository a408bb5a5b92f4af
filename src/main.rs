use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opsgate_core::directory::{DirectoryClient, StaticDirectory};
use opsgate_core::notify::{LogNotifier, NotificationSink, SlackNotifier};
use opsgate_core::policy::ConfigurationStore;
use opsgate_core::slack::SlackClient;
use opsgate_core::{telemetry, Config, PermissionEngine};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "opsgate-core",
    about = "Access control decisions for chat-driven database operations"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decide whether an identity may run an operation.
    Check {
        identity: String,
        operation: String,

        /// Identity the operation acts on (self-service checks).
        #[arg(long)]
        target: Option<String>,
    },

    /// Show the operation sets of the live policy.
    Permissions { identity: String },

    /// List configured admins and admin groups.
    Admins,

    /// Print the policy report.
    Report,

    /// Show which class an operation belongs to.
    Category { operation: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    telemetry::init(&config.telemetry)?;

    let cli = Cli::parse();
    let engine = build_engine(&config)?;

    match cli.command {
        Command::Check {
            identity,
            operation,
            target,
        } => {
            let decision = engine
                .check_permission(&identity, &operation, target.as_deref())
                .await;
            print_json(&decision)?;
            // Denial alerts run in the background; let them finish before exit
            engine.wait_for_notifications().await;
        }
        Command::Permissions { identity } => {
            print_json(&engine.list_permissions(&identity))?;
        }
        Command::Admins => {
            print_json(&engine.admin_roster().await)?;
        }
        Command::Report => {
            println!("{}", engine.policy_report());
        }
        Command::Category { operation } => {
            println!("{}", engine.operation_category(&operation));
        }
    }

    Ok(())
}

fn build_engine(config: &Config) -> Result<PermissionEngine> {
    let store = Arc::new(ConfigurationStore::load(&config.policy));

    if config.slack.bot_token.is_none() {
        info!("SLACK_BOT_TOKEN not set, only canonical IDs will resolve");
        let directory: Arc<dyn DirectoryClient> = Arc::new(StaticDirectory::new());
        let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotifier);
        return Ok(PermissionEngine::new(store, directory, &config.engine).with_notifier(notifier));
    }

    let client = SlackClient::new(&config.slack).context("Failed to create Slack client")?;
    info!(api_url = %config.slack.api_url, "Using Slack directory");
    let directory: Arc<dyn DirectoryClient> = Arc::new(client.clone());
    let notifier: Arc<dyn NotificationSink> = Arc::new(SlackNotifier::new(client));

    Ok(PermissionEngine::new(store, directory, &config.engine).with_notifier(notifier))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}
