pub mod admin_user;
pub mod conversations;

use std::sync::Arc;

use chatdb_kernel::ModuleRegistry;
use secrecy::SecretString;

/// Register the bootstrap modules. `admin_password` is only needed when
/// the admin user has to be created.
pub fn register_all(registry: &mut ModuleRegistry, admin_password: Option<SecretString>) {
    registry.register_core(Arc::new(admin_user::AdminUserModule::new(admin_password)));
    registry.register_core(conversations::create_module());
}
