pub mod admin;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod module;
pub mod registry;
pub mod settings;

pub use admin::DatabaseAdmin;
pub use module::{Finding, InitCtx, Module};
pub use registry::{ModuleRegistry, VerifyReport};
