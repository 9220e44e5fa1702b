//! Conversation store bootstrap.
//!
//! Brings a MongoDB deployment to the state the conversation service
//! expects: an administrative user, a schema-validated `conversations`
//! collection, and its secondary indexes. Every step is idempotent.

pub mod modules;

use anyhow::Context;
use chatdb_db::MongoAdmin;
use chatdb_kernel::settings::Settings;
use chatdb_kernel::{DatabaseAdmin, InitCtx, ModuleRegistry, VerifyReport};
use secrecy::SecretString;

pub use modules::conversations::models::{Conversation, Message};

/// Connect using `settings` and apply every bootstrap module.
///
/// The admin password is resolved before connecting so configuration
/// mistakes surface without touching the server.
pub async fn bootstrap(settings: &Settings) -> anyhow::Result<()> {
    let password = settings
        .admin
        .resolve_password()
        .context("invalid admin credentials configuration")?;

    let client = chatdb_db::connect(&settings.database).await?;
    let admin = MongoAdmin::new(client);

    apply(settings, &admin, password).await?;

    tracing::info!(
        database = %settings.database.app_database,
        collection = %settings.database.collection,
        "bootstrap complete"
    );
    Ok(())
}

/// Apply every bootstrap module through an existing admin handle.
pub async fn apply(
    settings: &Settings,
    admin: &dyn DatabaseAdmin,
    admin_password: SecretString,
) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, Some(admin_password));

    let ctx = InitCtx { settings, admin };
    registry.apply_all(&ctx).await
}

/// Connect using `settings` and report how the database differs from the
/// bootstrap target state. Makes no changes.
pub async fn verify(settings: &Settings) -> anyhow::Result<VerifyReport> {
    let client = chatdb_db::connect(&settings.database).await?;
    let admin = MongoAdmin::new(client);
    check(settings, &admin).await
}

/// Verify every bootstrap module through an existing admin handle.
pub async fn check(settings: &Settings, admin: &dyn DatabaseAdmin) -> anyhow::Result<VerifyReport> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, None);

    let ctx = InitCtx { settings, admin };
    registry.verify_all(&ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdb_kernel::memory::MemoryAdmin;

    fn password() -> SecretString {
        SecretString::from("example".to_string())
    }

    #[tokio::test]
    async fn fresh_database_reaches_target_state() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();

        let before = check(&settings, &admin).await.unwrap();
        assert_eq!(before.findings.len(), 2);

        apply(&settings, &admin, password()).await.unwrap();
        assert!(check(&settings, &admin).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();

        apply(&settings, &admin, password()).await.unwrap();
        apply(&settings, &admin, password()).await.unwrap();

        assert_eq!(admin.users().len(), 1);
        assert_eq!(admin.calls("create_user"), 1);
        assert_eq!(admin.calls("create_collection"), 1);
        assert_eq!(admin.calls("create_index"), 4);
        assert!(check(&settings, &admin).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn collection_failure_keeps_user_and_rerun_recovers() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        admin.fail_on("create_collection", "disk full");

        let err = apply(&settings, &admin, password()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("conversations"));
        assert_eq!(admin.users().len(), 1);
        assert_eq!(admin.calls("create_index"), 0);

        admin.clear_failures();
        apply(&settings, &admin, password()).await.unwrap();
        assert_eq!(admin.calls("create_user"), 1);
        assert!(check(&settings, &admin).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn unreachable_user_lookup_aborts_before_collection_step() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        admin.fail_on("find_user", "connection refused");

        let err = apply(&settings, &admin, password()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection refused"));
        assert_eq!(admin.calls("collection_exists"), 0);
    }
}
