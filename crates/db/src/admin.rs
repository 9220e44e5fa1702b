use anyhow::Context;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use chatdb_kernel::admin::{
    CollectionSpec, CreateOutcome, DatabaseAdmin, IndexSpec, RoleGrant, UserInfo, UserSpec,
    ValidationAction, ValidationLevel,
};
use futures::TryStreamExt;
use mongodb::{options, Client, IndexModel};
use secrecy::ExposeSecret;

use crate::codes;

/// `DatabaseAdmin` backed by a live MongoDB client.
#[derive(Clone, Debug)]
pub struct MongoAdmin {
    client: Client,
}

impl MongoAdmin {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Extract the requested user from a `usersInfo` reply.
fn parse_users_info(reply: &Document, username: &str) -> anyhow::Result<Option<UserInfo>> {
    let users = reply
        .get_array("users")
        .context("usersInfo reply has no 'users' array")?;

    for entry in users {
        let Bson::Document(user) = entry else {
            continue;
        };
        if user.get_str("user").ok() != Some(username) {
            continue;
        }

        let roles = user
            .get_array("roles")
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Bson::as_document)
                    .filter_map(|role| {
                        Some(RoleGrant::new(
                            role.get_str("role").ok()?,
                            role.get_str("db").ok()?,
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();

        return Ok(Some(UserInfo {
            username: username.to_string(),
            database: user.get_str("db").unwrap_or_default().to_string(),
            roles,
        }));
    }

    Ok(None)
}

fn driver_level(level: ValidationLevel) -> options::ValidationLevel {
    match level {
        ValidationLevel::Strict => options::ValidationLevel::Strict,
    }
}

fn driver_action(action: ValidationAction) -> options::ValidationAction {
    match action {
        ValidationAction::Error => options::ValidationAction::Error,
    }
}

#[async_trait]
impl DatabaseAdmin for MongoAdmin {
    async fn find_user(&self, database: &str, username: &str) -> anyhow::Result<Option<UserInfo>> {
        let reply = self
            .client
            .database(database)
            .run_command(doc! { "usersInfo": { "user": username, "db": database } })
            .await
            .with_context(|| format!("usersInfo for '{}' in '{}' failed", username, database))?;

        parse_users_info(&reply, username)
    }

    async fn create_user(&self, spec: &UserSpec) -> anyhow::Result<CreateOutcome> {
        let roles: Vec<Bson> = spec
            .roles
            .iter()
            .map(|grant| Bson::Document(grant.to_document()))
            .collect();

        let command = doc! {
            "createUser": spec.username.as_str(),
            "pwd": spec.password.expose_secret(),
            "roles": roles,
        };

        match self.client.database(&spec.database).run_command(command).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if codes::is_user_already_exists(codes::command_code(&err)) => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => Err(err).with_context(|| {
                format!("createUser '{}' in '{}' failed", spec.username, spec.database)
            }),
        }
    }

    async fn collection_exists(&self, database: &str, name: &str) -> anyhow::Result<bool> {
        let names = self
            .client
            .database(database)
            .list_collection_names()
            .filter(doc! { "name": name })
            .await
            .with_context(|| format!("listing collections in '{}' failed", database))?;

        Ok(names.iter().any(|existing| existing == name))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> anyhow::Result<CreateOutcome> {
        let result = self
            .client
            .database(&spec.database)
            .create_collection(&spec.name)
            .validator(spec.validator.clone())
            .validation_level(driver_level(spec.validation_level))
            .validation_action(driver_action(spec.validation_action))
            .await;

        match result {
            Ok(()) => Ok(CreateOutcome::Created),
            Err(err) if codes::is_namespace_exists(codes::command_code(&err)) => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(err) => Err(err).with_context(|| {
                format!("creating collection '{}.{}' failed", spec.database, spec.name)
            }),
        }
    }

    async fn collection_validator(
        &self,
        database: &str,
        name: &str,
    ) -> anyhow::Result<Option<Document>> {
        let mut cursor = self
            .client
            .database(database)
            .list_collections()
            .filter(doc! { "name": name })
            .await
            .with_context(|| format!("listing collections in '{}' failed", database))?;

        let spec = cursor
            .try_next()
            .await
            .with_context(|| format!("reading collection info for '{}.{}' failed", database, name))?;

        Ok(spec.and_then(|spec| spec.options.validator))
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        index: &IndexSpec,
    ) -> anyhow::Result<String> {
        let model = IndexModel::builder().keys(index.keys()).build();

        let result = self
            .client
            .database(database)
            .collection::<Document>(collection)
            .create_index(model)
            .await
            .with_context(|| {
                format!(
                    "creating index {} on '{}.{}' failed",
                    index.keys(),
                    database,
                    collection
                )
            })?;

        Ok(result.index_name)
    }

    async fn list_index_keys(
        &self,
        database: &str,
        collection: &str,
    ) -> anyhow::Result<Vec<Document>> {
        let cursor = match self
            .client
            .database(database)
            .collection::<Document>(collection)
            .list_indexes()
            .await
        {
            Ok(cursor) => cursor,
            Err(err) if codes::is_namespace_not_found(codes::command_code(&err)) => {
                return Ok(vec![]);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("listing indexes on '{}.{}' failed", database, collection)
                });
            }
        };

        let models: Vec<IndexModel> = cursor
            .try_collect()
            .await
            .with_context(|| format!("reading indexes on '{}.{}' failed", database, collection))?;

        Ok(models.into_iter().map(|model| model.keys).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_info_reply_is_parsed_with_roles() {
        let reply = doc! {
            "users": [{
                "_id": "admin.root",
                "user": "root",
                "db": "admin",
                "roles": [{ "role": "root", "db": "admin" }],
            }],
            "ok": 1.0,
        };

        let user = parse_users_info(&reply, "root").unwrap().unwrap();
        assert_eq!(user.database, "admin");
        assert_eq!(user.roles, vec![RoleGrant::new("root", "admin")]);
    }

    #[test]
    fn empty_users_info_reply_means_absent() {
        let reply = doc! { "users": [], "ok": 1.0 };
        assert!(parse_users_info(&reply, "root").unwrap().is_none());
    }

    #[test]
    fn users_info_ignores_other_names() {
        let reply = doc! {
            "users": [{ "user": "app", "db": "admin", "roles": [] }],
            "ok": 1.0,
        };
        assert!(parse_users_info(&reply, "root").unwrap().is_none());
    }

    #[test]
    fn malformed_users_info_reply_is_an_error() {
        let reply = doc! { "ok": 1.0 };
        assert!(parse_users_info(&reply, "root").is_err());
    }
}
