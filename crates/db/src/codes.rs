//! Server error codes the admin operations react to.

use mongodb::error::{Error, ErrorKind};

/// `NamespaceNotFound`, e.g. listing indexes of a missing collection.
pub const NAMESPACE_NOT_FOUND: i32 = 26;
/// `NamespaceExists`, returned by `create` for an existing collection.
pub const NAMESPACE_EXISTS: i32 = 48;
/// `createUser` for a name that is already taken.
pub const USER_ALREADY_EXISTS: i32 = 51003;

/// Server error code carried by a command failure, if any.
pub fn command_code(err: &Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        _ => None,
    }
}

pub fn is_namespace_exists(code: Option<i32>) -> bool {
    code == Some(NAMESPACE_EXISTS)
}

pub fn is_namespace_not_found(code: Option<i32>) -> bool {
    code == Some(NAMESPACE_NOT_FOUND)
}

pub fn is_user_already_exists(code: Option<i32>) -> bool {
    code == Some(USER_ALREADY_EXISTS)
}
