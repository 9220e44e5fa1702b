//! Database administration seam used by bootstrap modules.
//!
//! Modules describe what they want with the `*Spec` types below and
//! never talk to a driver directly; `chatdb-db` provides the MongoDB
//! implementation.

use async_trait::async_trait;
use bson::{doc, Document};
use secrecy::SecretString;

/// A role granted on a specific database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }

    pub fn to_document(&self) -> Document {
        doc! { "role": self.role.as_str(), "db": self.db.as_str() }
    }
}

/// A user as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub username: String,
    pub database: String,
    pub roles: Vec<RoleGrant>,
}

impl UserInfo {
    pub fn has_role(&self, grant: &RoleGrant) -> bool {
        self.roles.iter().any(|role| role == grant)
    }
}

/// A user to create.
#[derive(Debug, Clone)]
pub struct UserSpec {
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub roles: Vec<RoleGrant>,
}

/// A collection to create, with its server-side validator.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub database: String,
    pub name: String,
    pub validator: Document,
    pub validation_level: ValidationLevel,
    pub validation_action: ValidationAction,
}

/// Which writes the validator applies to. Only full enforcement is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    #[default]
    Strict,
}

impl ValidationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
        }
    }
}

/// What the server does with a write that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationAction {
    #[default]
    Error,
}

impl ValidationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
}

impl IndexDirection {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// A single-field, non-unique secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: String,
    pub direction: IndexDirection,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>, direction: IndexDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Key document in the form the server stores, e.g. `{ start_time: -1 }`.
    pub fn keys(&self) -> Document {
        let mut keys = Document::new();
        keys.insert(self.field.clone(), self.direction.as_i32());
        keys
    }

    /// Whether a key document listed by the server describes this index.
    ///
    /// The server may report the direction as int32, int64 or double
    /// depending on how the index was created.
    pub fn matches_keys(&self, keys: &Document) -> bool {
        if keys.len() != 1 {
            return false;
        }
        let expected = f64::from(self.direction.as_i32());
        match keys.get(&self.field) {
            Some(bson::Bson::Int32(value)) => f64::from(*value) == expected,
            Some(bson::Bson::Int64(value)) => *value as f64 == expected,
            Some(bson::Bson::Double(value)) => *value == expected,
            _ => false,
        }
    }
}

/// Result of an idempotent create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Administrative operations a bootstrap module may perform.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    /// Look up a user by name in the given database.
    async fn find_user(&self, database: &str, username: &str) -> anyhow::Result<Option<UserInfo>>;

    /// Create a user. A server reply saying the user already exists maps to
    /// [`CreateOutcome::AlreadyExists`].
    async fn create_user(&self, spec: &UserSpec) -> anyhow::Result<CreateOutcome>;

    async fn collection_exists(&self, database: &str, name: &str) -> anyhow::Result<bool>;

    /// Create a validated collection. A namespace-exists reply maps to
    /// [`CreateOutcome::AlreadyExists`].
    async fn create_collection(&self, spec: &CollectionSpec) -> anyhow::Result<CreateOutcome>;

    /// The validator stored on a collection, `None` if the collection is
    /// missing or unvalidated.
    async fn collection_validator(
        &self,
        database: &str,
        name: &str,
    ) -> anyhow::Result<Option<Document>>;

    /// Create an index and return the name the server assigned.
    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> anyhow::Result<String>;

    /// Key documents of every index on a collection.
    async fn list_index_keys(&self, database: &str, collection: &str)
        -> anyhow::Result<Vec<Document>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_keys_encode_direction() {
        let asc = IndexSpec::new("user_id", IndexDirection::Ascending);
        let desc = IndexSpec::new("start_time", IndexDirection::Descending);
        assert_eq!(asc.keys(), doc! { "user_id": 1 });
        assert_eq!(desc.keys(), doc! { "start_time": -1 });
    }

    #[test]
    fn index_matching_accepts_numeric_variants() {
        let desc = IndexSpec::new("start_time", IndexDirection::Descending);
        assert!(desc.matches_keys(&doc! { "start_time": -1 }));
        assert!(desc.matches_keys(&doc! { "start_time": -1_i64 }));
        assert!(desc.matches_keys(&doc! { "start_time": -1.0 }));
        assert!(!desc.matches_keys(&doc! { "start_time": 1 }));
        assert!(!desc.matches_keys(&doc! { "start_time": -1, "user_id": 1 }));
        assert!(!desc.matches_keys(&doc! { "_id": 1 }));
    }

    #[test]
    fn user_role_lookup() {
        let user = UserInfo {
            username: "root".to_string(),
            database: "admin".to_string(),
            roles: vec![RoleGrant::new("root", "admin")],
        };
        assert!(user.has_role(&RoleGrant::new("root", "admin")));
        assert!(!user.has_role(&RoleGrant::new("root", "my_database")));
    }
}
