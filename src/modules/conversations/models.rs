use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// One chat message, embedded in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Owner of the conversation the message belongs to
    pub user_id: String,
    /// Who wrote the message (e.g. `user`, `assistant`)
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime,
}

/// Document shape accepted by the `conversations` validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub start_time: DateTime,
    /// Unset while the conversation is open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime>,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Start an open conversation with no messages.
    pub fn start(user_id: impl Into<String>, start_time: DateTime) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            start_time,
            end_time: None,
            messages: Vec::new(),
        }
    }

    pub fn push_message(
        &mut self,
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime,
    ) {
        self.messages.push(Message {
            user_id: self.user_id.clone(),
            sender: sender.into(),
            text: text.into(),
            timestamp,
        });
    }

    pub fn end(&mut self, end_time: DateTime) {
        self.end_time = Some(end_time);
    }
}
