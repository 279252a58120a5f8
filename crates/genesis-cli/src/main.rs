use anyhow::Result;
use clap::{Parser, Subcommand};
use genesis_infrastructure::{ConfigService, logging};

mod commands;

#[derive(Parser)]
#[command(name = "genesis")]
#[command(about = "GENESIS CLI - drive the client-side sync core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted sync session against the in-memory backend
    Demo,
    /// Sign in against the configured backend, load every store and print a summary
    Status {
        /// User id to sign in as
        #[arg(long)]
        user: String,
    },
    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_service = ConfigService::new()?;
    let config = config_service.get_config();
    let _log_guard = logging::init(&config.logging)?;

    match cli.command {
        Commands::Demo => commands::demo::run(&config).await?,
        Commands::Status { user } => commands::status::run(&config, &user).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config)?,
            ConfigAction::Path => commands::config::path(&config_service),
        },
    }

    Ok(())
}
