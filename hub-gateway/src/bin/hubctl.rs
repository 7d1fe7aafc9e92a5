use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common_observability::DispatchMetrics;
use hub_gateway::{Dispatcher, HubService, ServiceConfig};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Send messages and membership commands to a real-time hub", long_about = None)]
struct Options {
    /// Print the dispatch metrics in Prometheus text format to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke a client method on every connection of the hub
    Broadcast {
        hub: String,
        method: String,
        /// Method arguments; each is parsed as JSON, falling back to a plain string
        args: Vec<String>,
    },
    /// Invoke a client method on every connection in a group
    SendGroup {
        hub: String,
        group: String,
        method: String,
        args: Vec<String>,
    },
    /// Invoke a client method on every connection of a user
    SendUser {
        hub: String,
        user: String,
        method: String,
        args: Vec<String>,
    },
    /// Add a user to a group
    AddToGroup {
        hub: String,
        group: String,
        user: String,
    },
    /// Remove a user from a group
    RemoveFromGroup {
        hub: String,
        group: String,
        user: String,
    },
    /// Print the connection URL and access token a client would use
    Connect {
        hub: String,
        #[arg(long)]
        user: Option<String>,
    },
}

fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|item| serde_json::from_str(item).unwrap_or_else(|_| Value::String(item.clone())))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Options::parse();
    let config = ServiceConfig::from_env().context("Failed to load hub service configuration")?;
    info!(
        endpoint = config.endpoint(),
        identity = ?config.identity(),
        lifetime_secs = config.token_lifetime().as_secs(),
        "loaded hub service configuration"
    );

    let metrics = DispatchMetrics::new().context("Failed to register dispatch metrics")?;
    let dispatcher = Dispatcher::new(&config)?.with_metrics(metrics.clone());

    match opts.command {
        Command::Broadcast { hub, method, args } => {
            dispatcher.broadcast(&hub, &method, parse_args(&args)).await?;
            info!(hub = %hub, method = %method, "broadcast delivered");
        }
        Command::SendGroup {
            hub,
            group,
            method,
            args,
        } => {
            dispatcher
                .send_to_group(&hub, &group, &method, parse_args(&args))
                .await?;
            info!(hub = %hub, group = %group, method = %method, "group message delivered");
        }
        Command::SendUser {
            hub,
            user,
            method,
            args,
        } => {
            dispatcher
                .send_to_user(&hub, &user, &method, parse_args(&args))
                .await?;
            info!(hub = %hub, user = %user, method = %method, "user message delivered");
        }
        Command::AddToGroup { hub, group, user } => {
            dispatcher.add_user_to_group(&hub, &group, &user).await?;
            info!(hub = %hub, group = %group, user = %user, "user added to group");
        }
        Command::RemoveFromGroup { hub, group, user } => {
            dispatcher.remove_user_from_group(&hub, &group, &user).await?;
            info!(hub = %hub, group = %group, user = %user, "user removed from group");
        }
        Command::Connect { hub, user } => {
            let descriptor = dispatcher.get_client_connection(&hub, user.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
    }

    if opts.metrics {
        eprint!("{}", metrics.render().context("Failed to render dispatch metrics")?);
    }

    Ok(())
}
