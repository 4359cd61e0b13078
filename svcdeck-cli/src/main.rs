mod client;
mod ops;

use clap::{Parser, Subcommand};
use ops::{
    control, list_services, refresh_services, run_action, status_service, ControlAction,
    OutputFormat, ServiceAction,
};
use svcdeck_core::ServiceCategory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI wrapper around the svcdeck HTTP API.
#[derive(Parser)]
#[command(name = "svcdeck", author, version, about = "Control database and broker services through svcdeck-api")]
struct Cli {
    /// API base url
    #[arg(long, env = "SD_API_BASE", default_value = "http://127.0.0.1:7878")]
    api_base: String,

    /// Bearer token for authentication
    #[arg(long, env = "SD_API_TOKEN")]
    token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List detected services grouped by category
    List {
        /// sql, nosql, cache, search, message or other
        #[arg(long, short)]
        category: Option<ServiceCategory>,
    },
    /// Re-detect services, ignoring the daemon cache
    Refresh,
    /// Show live status of one service
    Status { name: String },
    /// Start a service and wait until it runs
    Start { name: String },
    /// Stop a service and wait until it stops
    Stop { name: String },
    /// Restart a service
    Restart { name: String },
    /// Allow manual start (startup type manual)
    Enable { name: String },
    /// Forbid starting (startup type disabled)
    Disable { name: String },
    /// Show or change the global service-control switch
    Control {
        #[arg(value_enum)]
        action: Option<ControlAction>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载 .env 文件（如果存在），忽略错误
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    let client = client::build_client(&cli.token)?;
    let base = cli.api_base.trim_end_matches('/');

    match cli.command {
        Commands::List { category } => list_services(&client, base, category, cli.output).await?,
        Commands::Refresh => refresh_services(&client, base, cli.output).await?,
        Commands::Status { name } => status_service(&client, base, &name, cli.output).await?,
        Commands::Start { name } => {
            run_action(&client, base, &name, ServiceAction::Start, cli.output).await?
        }
        Commands::Stop { name } => {
            run_action(&client, base, &name, ServiceAction::Stop, cli.output).await?
        }
        Commands::Restart { name } => {
            run_action(&client, base, &name, ServiceAction::Restart, cli.output).await?
        }
        Commands::Enable { name } => {
            run_action(&client, base, &name, ServiceAction::Enable, cli.output).await?
        }
        Commands::Disable { name } => {
            run_action(&client, base, &name, ServiceAction::Disable, cli.output).await?
        }
        Commands::Control { action } => control(&client, base, action, cli.output).await?,
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
