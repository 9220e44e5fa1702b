//! chatdb CLI: bootstrap, verify and inspect the conversation store.
//!
//! ```bash
//! # Create the admin user, validated collection and indexes
//! CHATDB_ADMIN__PASSWORD=... chatdb-cli init
//!
//! # Check a deployment without changing it
//! chatdb-cli --uri mongodb://root:pw@mongo:27017/ verify
//!
//! # Print the collection `create` command as Extended JSON
//! chatdb-cli schema
//! ```

use anyhow::Context;
use bson::Bson;
use chatdb_init::modules::conversations::schema;
use chatdb_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatdb-cli")]
#[command(version, about = "Conversation store bootstrap tools")]
struct Cli {
    /// MongoDB connection string, overriding configuration
    #[arg(long, global = true)]
    uri: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the admin user, validated collection and indexes exist
    Init,
    /// Report differences from the bootstrap target state without changing anything
    Verify,
    /// Print the collection create command, validator included
    Schema,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(cli.uri) {
        Ok(settings) => settings,
        Err(e) => {
            // Telemetry settings are unknown at this point; use the defaults.
            chatdb_telemetry::init(&Default::default());
            tracing::error!("failed to load chatdb settings: {:#}", e);
            std::process::exit(1);
        }
    };
    chatdb_telemetry::init(&settings.telemetry);

    match run(cli.command, &settings).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!("command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn load_settings(uri: Option<String>) -> anyhow::Result<Settings> {
    let mut settings = Settings::load()?;
    if let Some(uri) = uri {
        settings.database.uri = uri;
    }
    Ok(settings)
}

/// Returns `Ok(false)` when verification found problems.
async fn run(command: Commands, settings: &Settings) -> anyhow::Result<bool> {
    match command {
        Commands::Init => {
            tracing::info!(env = ?settings.environment, "running bootstrap");
            chatdb_init::bootstrap(settings).await?;
        }
        Commands::Verify => {
            let report = chatdb_init::verify(settings).await?;
            for finding in &report.findings {
                println!("{}: {}", finding.module, finding.problem);
            }
            if !report.is_clean() {
                return Ok(false);
            }
            println!("database matches the bootstrap target state");
        }
        Commands::Schema => {
            let spec = schema::collection_spec(&settings.database);
            let command = Bson::Document(schema::create_command(&spec)).into_relaxed_extjson();
            let rendered =
                serde_json::to_string_pretty(&command).context("failed to render schema")?;
            println!("{}", rendered);
        }
    }
    Ok(true)
}
