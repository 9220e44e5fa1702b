//! In-memory [`DatabaseAdmin`] that mimics the server's replies, for tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bson::{doc, Bson, Document};

use crate::admin::{
    CollectionSpec, CreateOutcome, DatabaseAdmin, IndexSpec, UserInfo, UserSpec,
};

#[derive(Debug, Default)]
struct CollectionState {
    validator: Option<Document>,
    indexes: Vec<(String, Document)>,
}

impl CollectionState {
    fn new(validator: Option<Document>) -> Self {
        Self {
            validator,
            indexes: vec![("_id_".to_string(), doc! { "_id": 1 })],
        }
    }
}

#[derive(Debug, Default)]
struct State {
    users: Vec<UserInfo>,
    collections: BTreeMap<(String, String), CollectionState>,
    calls: BTreeMap<&'static str, usize>,
    failures: BTreeMap<&'static str, String>,
    stale_existence_checks: bool,
}

/// Server stand-in holding users, collections and indexes in memory.
#[derive(Debug, Default)]
pub struct MemoryAdmin {
    state: Mutex<State>,
}

impl MemoryAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call to `operation` fail with `message`.
    pub fn fail_on(&self, operation: &'static str, message: impl Into<String>) {
        self.lock().failures.insert(operation, message.into());
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Make existence checks report nothing, as if another process created
    /// the objects between the check and the create call.
    pub fn report_stale_existence(&self) {
        self.lock().stale_existence_checks = true;
    }

    /// Number of times `operation` was invoked.
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn users(&self) -> Vec<UserInfo> {
        self.lock().users.clone()
    }

    /// Add a collection without a validator, as an older deployment might have.
    pub fn seed_collection(&self, database: &str, name: &str) {
        self.lock()
            .collections
            .entry((database.to_string(), name.to_string()))
            .or_insert_with(|| CollectionState::new(None));
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, operation: &'static str) -> anyhow::Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_default() += 1;
        if let Some(message) = state.failures.get(operation) {
            anyhow::bail!("{}", message);
        }
        Ok(state)
    }
}

fn key_pair(database: &str, name: &str) -> (String, String) {
    (database.to_string(), name.to_string())
}

fn default_index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, direction)| match direction {
            Bson::Int32(value) => format!("{}_{}", field, value),
            other => format!("{}_{}", field, other),
        })
        .collect::<Vec<_>>()
        .join("_")
}

#[async_trait]
impl DatabaseAdmin for MemoryAdmin {
    async fn find_user(&self, database: &str, username: &str) -> anyhow::Result<Option<UserInfo>> {
        let state = self.enter("find_user")?;
        if state.stale_existence_checks {
            return Ok(None);
        }
        Ok(state
            .users
            .iter()
            .find(|user| user.database == database && user.username == username)
            .cloned())
    }

    async fn create_user(&self, spec: &UserSpec) -> anyhow::Result<CreateOutcome> {
        let mut state = self.enter("create_user")?;
        let exists = state
            .users
            .iter()
            .any(|user| user.database == spec.database && user.username == spec.username);
        if exists {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state.users.push(UserInfo {
            username: spec.username.clone(),
            database: spec.database.clone(),
            roles: spec.roles.clone(),
        });
        Ok(CreateOutcome::Created)
    }

    async fn collection_exists(&self, database: &str, name: &str) -> anyhow::Result<bool> {
        let state = self.enter("collection_exists")?;
        if state.stale_existence_checks {
            return Ok(false);
        }
        Ok(state.collections.contains_key(&key_pair(database, name)))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> anyhow::Result<CreateOutcome> {
        let mut state = self.enter("create_collection")?;
        let key = key_pair(&spec.database, &spec.name);
        if state.collections.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        state
            .collections
            .insert(key, CollectionState::new(Some(spec.validator.clone())));
        Ok(CreateOutcome::Created)
    }

    async fn collection_validator(
        &self,
        database: &str,
        name: &str,
    ) -> anyhow::Result<Option<Document>> {
        let state = self.enter("collection_validator")?;
        Ok(state
            .collections
            .get(&key_pair(database, name))
            .and_then(|collection| collection.validator.clone()))
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> anyhow::Result<String> {
        let mut state = self.enter("create_index")?;
        let keys = index.keys();
        // Like the server, building an index creates the collection if needed.
        let target = state
            .collections
            .entry(key_pair(database, collection))
            .or_insert_with(|| CollectionState::new(None));

        if let Some((name, _)) = target.indexes.iter().find(|(_, existing)| *existing == keys) {
            return Ok(name.clone());
        }
        let name = default_index_name(&keys);
        target.indexes.push((name.clone(), keys));
        Ok(name)
    }

    async fn list_index_keys(
        &self,
        database: &str,
        collection: &str,
    ) -> anyhow::Result<Vec<Document>> {
        let state = self.enter("list_index_keys")?;
        Ok(state
            .collections
            .get(&key_pair(database, collection))
            .map(|target| target.indexes.iter().map(|(_, keys)| keys.clone()).collect())
            .unwrap_or_default())
    }
}
