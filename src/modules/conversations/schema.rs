//! Validator and index definitions for the conversations collection.

use bson::{doc, Document};
use chatdb_kernel::admin::{
    CollectionSpec, IndexDirection, IndexSpec, ValidationAction, ValidationLevel,
};
use chatdb_kernel::settings::DatabaseSettings;

/// `$jsonSchema` validator the server enforces on every write.
pub fn validator() -> Document {
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["user_id", "start_time", "messages"],
            "properties": {
                "user_id": {
                    "bsonType": "string",
                    "description": "must be a string and is required"
                },
                "start_time": {
                    "bsonType": "date",
                    "description": "must be a date and is required"
                },
                "end_time": {
                    "bsonType": ["date", "null"],
                    "description": "must be a date or null"
                },
                "messages": {
                    "bsonType": "array",
                    "description": "must be an array and is required",
                    "items": {
                        "bsonType": "object",
                        "required": ["user_id", "sender", "text", "timestamp"],
                        "properties": {
                            "user_id": { "bsonType": "string" },
                            "sender": { "bsonType": "string" },
                            "text": { "bsonType": "string" },
                            "timestamp": { "bsonType": "date" }
                        }
                    }
                }
            }
        }
    }
}

pub fn collection_spec(settings: &DatabaseSettings) -> CollectionSpec {
    CollectionSpec {
        database: settings.app_database.clone(),
        name: settings.collection.clone(),
        validator: validator(),
        validation_level: ValidationLevel::Strict,
        validation_action: ValidationAction::Error,
    }
}

/// Lookups by owner, and newest-first listing.
pub fn indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec::new("user_id", IndexDirection::Ascending),
        IndexSpec::new("start_time", IndexDirection::Descending),
    ]
}

/// The `create` command equivalent to [`collection_spec`], as an operator
/// would run it by hand.
pub fn create_command(spec: &CollectionSpec) -> Document {
    doc! {
        "create": spec.name.as_str(),
        "validator": spec.validator.clone(),
        "validationLevel": spec.validation_level.as_str(),
        "validationAction": spec.validation_action.as_str(),
    }
}
