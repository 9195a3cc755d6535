//! Firewatch Binary
//!
//! `firewatch serve` runs the trigger API; the other subcommands are
//! one-shot tools for operators.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use firewatch_core::{AlertPayload, IncidentState, RecipientDirectory};
use firewatch_feishu::FeishuGateway;
use firewatch_server::{serve, AppConfig, AppState};

#[derive(Parser)]
#[command(name = "firewatch", version, about = "Tiered alarm escalation over Feishu")]
struct Cli {
    /// Config file (default: <config_dir>/firewatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP trigger API
    Serve {
        /// Listen address, overrides [server].addr
        #[arg(long)]
        addr: Option<String>,
    },
    /// Raise one alert and follow it until it is acknowledged or escalated
    Alert {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Scene snapshot to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Resolve the configured admin phone numbers and print the result
    Directory,
    /// List group chats the bot belongs to
    Chats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let gateway = Arc::new(FeishuGateway::new(config.feishu.clone())?);

    match cli.command {
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            let (state, _) = AppState::build(&config, gateway).await?;
            serve(&addr, Arc::new(state)).await?;
        }
        Command::Alert {
            title,
            description,
            image,
        } => {
            let (state, _) = AppState::build(&config, gateway).await?;
            let mut payload = AlertPayload::new(
                title.unwrap_or_else(|| config.core.alert.title.clone()),
                description.unwrap_or_else(|| config.core.alert.description.clone()),
            );
            if let Some(image) = image {
                payload = payload.with_image(image);
            }

            let handle = state.dispatcher.trigger(payload)?;
            println!("Incident {} started", handle.id());
            let report = handle.wait().await?;

            println!(
                "Incident {} finished: {} at tier {} after {} checks",
                report.id, report.state, report.tier, report.checks
            );
            if let Some(e) = &report.escalation_error {
                println!("Escalation failed: {}", e);
            }
            if report.state == IncidentState::TerminalEscalated {
                std::process::exit(2);
            }
        }
        Command::Directory => {
            let (directory, failures) = RecipientDirectory::resolve_all(
                gateway.as_ref(),
                &config.core.directory.admin_phones,
            )
            .await;
            for entry in directory.entries() {
                println!("{}\t{}", entry.identity, entry.recipient);
            }
            for failure in &failures {
                println!("{}\tunresolved: {}", failure.identity, failure.error);
            }
        }
        Command::Chats => {
            for chat in gateway.list_chats().await? {
                println!("{}\t{}", chat.chat_id, chat.name);
            }
        }
    }

    Ok(())
}
