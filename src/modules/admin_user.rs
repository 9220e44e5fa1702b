use async_trait::async_trait;
use chatdb_kernel::admin::{CreateOutcome, RoleGrant, UserSpec};
use chatdb_kernel::settings::SettingsError;
use chatdb_kernel::{Finding, InitCtx, Module};
use secrecy::SecretString;

/// Built-in role with full privileges, granted on the admin namespace.
pub const ADMIN_ROLE: &str = "root";

/// Ensures the administrative user exists. An existing user is never
/// modified: no password rotation, no role changes.
pub struct AdminUserModule {
    password: Option<SecretString>,
}

impl AdminUserModule {
    /// `password` may be `None` when the module is only verified.
    pub fn new(password: Option<SecretString>) -> Self {
        Self { password }
    }

    fn grant(admin_database: &str) -> RoleGrant {
        RoleGrant::new(ADMIN_ROLE, admin_database)
    }
}

#[async_trait]
impl Module for AdminUserModule {
    fn name(&self) -> &'static str {
        "admin-user"
    }

    async fn apply(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let database = &ctx.settings.database.admin_database;
        let username = &ctx.settings.admin.username;

        if let Some(existing) = ctx.admin.find_user(database, username).await? {
            if !existing.has_role(&Self::grant(database)) {
                tracing::warn!(
                    module = self.name(),
                    user = %username,
                    "existing admin user lacks the {} role; leaving it unchanged",
                    ADMIN_ROLE
                );
            }
            tracing::info!(
                module = self.name(),
                user = %username,
                database = %database,
                "admin user already exists"
            );
            return Ok(());
        }

        let password = self.password.clone().ok_or(SettingsError::MissingPassword)?;
        let spec = UserSpec {
            database: database.clone(),
            username: username.clone(),
            password,
            roles: vec![Self::grant(database)],
        };

        match ctx.admin.create_user(&spec).await? {
            CreateOutcome::Created => tracing::info!(
                module = self.name(),
                user = %username,
                database = %database,
                role = ADMIN_ROLE,
                "created admin user"
            ),
            CreateOutcome::AlreadyExists => tracing::info!(
                module = self.name(),
                user = %username,
                "admin user appeared before create; treating as present"
            ),
        }

        Ok(())
    }

    async fn verify(&self, ctx: &InitCtx<'_>) -> anyhow::Result<Vec<Finding>> {
        let database = &ctx.settings.database.admin_database;
        let username = &ctx.settings.admin.username;

        let problem = match ctx.admin.find_user(database, username).await? {
            None => Some(format!("user '{}' not found in '{}'", username, database)),
            Some(user) if !user.has_role(&Self::grant(database)) => Some(format!(
                "user '{}' lacks role '{}' on '{}'",
                username, ADMIN_ROLE, database
            )),
            Some(_) => None,
        };

        Ok(problem
            .map(|problem| Finding {
                module: self.name(),
                problem,
            })
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdb_kernel::memory::MemoryAdmin;
    use chatdb_kernel::settings::Settings;

    fn password() -> Option<SecretString> {
        Some(SecretString::from("example".to_string()))
    }

    #[tokio::test]
    async fn creates_root_user_once() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };
        let module = AdminUserModule::new(password());

        module.apply(&ctx).await.unwrap();
        module.apply(&ctx).await.unwrap();

        let users = admin.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "root");
        assert_eq!(users[0].database, "admin");
        assert_eq!(users[0].roles, vec![RoleGrant::new("root", "admin")]);
        assert_eq!(admin.calls("create_user"), 1);
        assert!(module.verify(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_user_needs_no_password() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };
        AdminUserModule::new(password()).apply(&ctx).await.unwrap();

        AdminUserModule::new(None).apply(&ctx).await.unwrap();
        assert_eq!(admin.calls("create_user"), 1);
    }

    #[tokio::test]
    async fn missing_password_fails_only_when_creating() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };

        let err = AdminUserModule::new(None).apply(&ctx).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SettingsError>(),
            Some(SettingsError::MissingPassword)
        ));
        assert_eq!(admin.calls("create_user"), 0);
    }

    #[tokio::test]
    async fn user_created_between_check_and_create_is_accepted() {
        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };
        let module = AdminUserModule::new(password());
        module.apply(&ctx).await.unwrap();

        admin.report_stale_existence();
        module.apply(&ctx).await.unwrap();
        assert_eq!(admin.users().len(), 1);
    }

    #[tokio::test]
    async fn verify_reports_absent_user() {
        let mut settings = Settings::default();
        settings.admin.username = "ops".to_string();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };

        let findings = AdminUserModule::new(None).verify(&ctx).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].problem, "user 'ops' not found in 'admin'");
    }
}
