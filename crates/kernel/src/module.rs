use async_trait::async_trait;

use crate::admin::DatabaseAdmin;

/// Context provided to modules while applying or verifying
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub admin: &'a dyn DatabaseAdmin,
}

/// A problem found while verifying a module's target state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub module: &'static str,
    pub problem: String,
}

/// Core trait every bootstrap module implements
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Bring the database to this module's target state.
    /// Must be safe to call against a database that is already there.
    async fn apply(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()>;

    /// Report how the database differs from this module's target state,
    /// without changing it
    async fn verify(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<Vec<Finding>> {
        Ok(vec![])
    }
}
