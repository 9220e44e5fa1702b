//! MongoDB client factory and the driver-backed `DatabaseAdmin`.

use std::time::Duration;

use anyhow::Context;
use bson::doc;
use chatdb_kernel::settings::DatabaseSettings;
use mongodb::{options::ClientOptions, Client};

mod admin;
pub mod codes;

pub use admin::MongoAdmin;

/// Build a client from settings and confirm the server answers a `ping`
/// on the admin namespace.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Client> {
    let mut options = ClientOptions::parse(&settings.uri)
        .await
        .context("failed to parse MongoDB connection string")?;

    let timeout = Duration::from_millis(settings.connect_timeout_ms);
    options.app_name = Some(settings.app_name.clone());
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);

    let hosts = options
        .hosts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    tracing::info!(target: "chatdb-db", hosts = %hosts, "connecting to MongoDB");

    let client = Client::with_options(options).context("failed to create MongoDB client")?;

    client
        .database(&settings.admin_database)
        .run_command(doc! { "ping": 1 })
        .await
        .with_context(|| format!("failed to ping MongoDB at {}", hosts))?;

    tracing::info!(target: "chatdb-db", "successfully connected to MongoDB");
    Ok(client)
}
