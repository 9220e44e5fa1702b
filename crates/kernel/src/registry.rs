use anyhow::Context;
use std::sync::Arc;

use crate::module::{Finding, InitCtx, Module};

/// Core module order. The admin user must exist before anything in the
/// application namespace is touched.
pub const CORE_MODULE_ORDER: &[&str] = &[
    "admin-user",    // Administrative credential in the admin namespace
    "conversations", // Validated collection and its indexes
];

/// Outcome of verifying every registered module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub findings: Vec<Finding>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Module registry for running bootstrap modules with core/custom separation
pub struct ModuleRegistry {
    core_modules: Vec<Arc<dyn Module>>,
    custom_modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            core_modules: Vec::new(),
            custom_modules: Vec::new(),
        }
    }

    /// Register a core module with the registry
    pub fn register_core(&mut self, module: Arc<dyn Module>) {
        if !CORE_MODULE_ORDER.contains(&module.name()) {
            tracing::warn!(
                module = module.name(),
                "core module is not listed in CORE_MODULE_ORDER; it will run after the listed ones"
            );
        }
        self.core_modules.push(module);
    }

    /// Register a custom module with the registry
    pub fn register_custom(&mut self, module: Arc<dyn Module>) {
        self.custom_modules.push(module);
    }

    /// Modules in execution order: listed core modules, unlisted core
    /// modules, then custom modules in registration order
    pub fn ordered(&self) -> Vec<&Arc<dyn Module>> {
        let mut ordered = Vec::with_capacity(self.core_modules.len() + self.custom_modules.len());

        for &module_name in CORE_MODULE_ORDER {
            ordered.extend(self.core_modules.iter().filter(|m| m.name() == module_name));
        }
        ordered.extend(
            self.core_modules
                .iter()
                .filter(|m| !CORE_MODULE_ORDER.contains(&m.name())),
        );
        ordered.extend(self.custom_modules.iter());
        ordered
    }

    /// Apply every module in order, stopping at the first failure
    pub async fn apply_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let modules = self.ordered();
        tracing::info!("applying {} bootstrap modules", modules.len());

        for module in modules {
            tracing::info!(module = module.name(), "applying module");

            module
                .apply(ctx)
                .await
                .with_context(|| format!("failed to apply module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Verify every module and collect their findings
    pub async fn verify_all(&self, ctx: &InitCtx<'_>) -> anyhow::Result<VerifyReport> {
        let mut report = VerifyReport::default();

        for module in self.ordered() {
            tracing::info!(module = module.name(), "verifying module");

            let findings = module
                .verify(ctx)
                .await
                .with_context(|| format!("failed to verify module '{}'", module.name()))?;

            for finding in &findings {
                tracing::warn!(module = finding.module, problem = %finding.problem, "verification finding");
            }
            report.findings.extend(findings);
        }

        Ok(report)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdmin;
    use crate::settings::Settings;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl TestModule {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: Arc::clone(log),
                fail: false,
            })
        }
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn apply(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        async fn verify(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<Vec<Finding>> {
            Ok(vec![Finding {
                module: self.name,
                problem: "not there yet".to_string(),
            }])
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.ordered().is_empty());
    }

    #[tokio::test]
    async fn core_modules_run_in_declared_order_before_custom() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register_custom(TestModule::new("extra", &log));
        registry.register_core(TestModule::new("conversations", &log));
        registry.register_core(TestModule::new("admin-user", &log));

        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };

        registry.apply_all(&ctx).await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["admin-user", "conversations", "extra"]
        );
    }

    #[tokio::test]
    async fn apply_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register_core(Arc::new(TestModule {
            name: "admin-user",
            log: Arc::clone(&log),
            fail: true,
        }));
        registry.register_core(TestModule::new("conversations", &log));

        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };

        let err = registry.apply_all(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("admin-user"));
        assert_eq!(*log.lock().unwrap(), vec!["admin-user"]);
    }

    #[tokio::test]
    async fn verify_collects_findings_from_every_module() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register_core(TestModule::new("admin-user", &log));
        registry.register_core(TestModule::new("conversations", &log));

        let settings = Settings::default();
        let admin = MemoryAdmin::new();
        let ctx = InitCtx {
            settings: &settings,
            admin: &admin,
        };

        let report = registry.verify_all(&ctx).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].module, "admin-user");
    }
}
