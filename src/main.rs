use anyhow::Context;
use chatdb_kernel::settings::Settings;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // No-op when settings loaded and telemetry is already up.
        chatdb_telemetry::init(&Default::default());
        tracing::error!("bootstrap failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load chatdb settings")?;
    chatdb_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        admin_db = %settings.database.admin_database,
        app_db = %settings.database.app_database,
        "chatdb-init bootstrap starting"
    );

    chatdb_init::bootstrap(&settings).await
}
