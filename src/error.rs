//! Record-level failures collected during a migration run.
//!
//! None of these abort the run: the migrator turns each into a line in the
//! session's error list and moves on to the next record or group.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("skipping invalid bot under owner {owner}: bot_username and token must be non-empty strings ({record})")]
    MissingBotFields { owner: String, record: String },
    #[error("bot @{bot}: unknown mode {mode:?}")]
    UnknownMode { bot: String, mode: String },
    #[error("bot @{bot}: owner id {owner:?} is not an integer")]
    InvalidOwner { bot: String, owner: String },
    #[error("bot @{bot}: forum_group_id {value} is not an integer")]
    InvalidForumId { bot: String, value: String },
    #[error("{context}: malformed record: {reason}")]
    Malformed { context: String, reason: String },
    #[error("bot @{bot} not found, skipping its {what}")]
    BotNotFound { bot: String, what: &'static str },
    #[error("bot @{bot}: invalid user id {value}")]
    InvalidUserId { bot: String, value: String },
    #[error("bot @{bot}: invalid {kind} target id {value} for source {source_id}")]
    InvalidMessageId {
        bot: String,
        kind: &'static str,
        source_id: String,
        value: String,
    },
    #[error("{context}: {cause}")]
    Store { context: String, cause: String },
}

impl RecordError {
    pub fn malformed(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        RecordError::Malformed {
            context: context.into(),
            reason: err.to_string(),
        }
    }

    pub fn store(context: impl Into<String>, err: &anyhow::Error) -> Self {
        RecordError::Store {
            context: context.into(),
            cause: format!("{err:#}"),
        }
    }
}
