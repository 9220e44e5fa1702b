pub mod models;
pub mod schema;

use async_trait::async_trait;
use chatdb_kernel::admin::CreateOutcome;
use chatdb_kernel::{Finding, InitCtx, Module};

/// Creates the validated conversations collection and its indexes
pub struct ConversationsModule;

impl ConversationsModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for ConversationsModule {
    fn name(&self) -> &'static str {
        "conversations"
    }

    async fn apply(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let spec = schema::collection_spec(&ctx.settings.database);

        if ctx.admin.collection_exists(&spec.database, &spec.name).await? {
            tracing::info!(
                module = self.name(),
                database = %spec.database,
                collection = %spec.name,
                "collection already exists; leaving its validator unchanged"
            );
        } else {
            match ctx.admin.create_collection(&spec).await? {
                CreateOutcome::Created => tracing::info!(
                    module = self.name(),
                    database = %spec.database,
                    collection = %spec.name,
                    "created validated collection"
                ),
                CreateOutcome::AlreadyExists => tracing::info!(
                    module = self.name(),
                    database = %spec.database,
                    collection = %spec.name,
                    "collection appeared before create; treating as present"
                ),
            }
        }

        for index in schema::indexes() {
            let name = ctx
                .admin
                .create_index(&spec.database, &spec.name, &index)
                .await?;
            tracing::info!(module = self.name(), index = %name, "index ensured");
        }

        Ok(())
    }

    async fn verify(&self, ctx: &InitCtx<'_>) -> anyhow::Result<Vec<Finding>> {
        let spec = schema::collection_spec(&ctx.settings.database);
        let mut findings = Vec::new();
        let mut finding = |problem: String| {
            findings.push(Finding {
                module: self.name(),
                problem,
            })
        };

        if !ctx.admin.collection_exists(&spec.database, &spec.name).await? {
            finding(format!(
                "collection '{}.{}' does not exist",
                spec.database, spec.name
            ));
            return Ok(findings);
        }

        match ctx
            .admin
            .collection_validator(&spec.database, &spec.name)
            .await?
        {
            Some(validator) if validator == spec.validator => {}
            Some(_) => finding(format!(
                "collection '{}.{}' has a different validator",
                spec.database, spec.name
            )),
            None => finding(format!(
                "collection '{}.{}' has no validator",
                spec.database, spec.name
            )),
        }

        let keys = ctx
            .admin
            .list_index_keys(&spec.database, &spec.name)
            .await?;
        for index in schema::indexes() {
            if !keys.iter().any(|existing| index.matches_keys(existing)) {
                finding(format!(
                    "index {} missing on '{}.{}'",
                    index.keys(),
                    spec.database,
                    spec.name
                ));
            }
        }

        Ok(findings)
    }
}

/// Create a new instance of the conversations module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ConversationsModule::new())
}
