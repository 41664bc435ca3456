//! Typed view of the legacy JSON state files.
//!
//! The legacy bot wrote four files (`bots.json`, `msg_map.json`,
//! `verified_users.json`, `blacklist.json`), all keyed by a string at the top
//! level. Top-level documents are kept as ordered JSON maps and each group is
//! decoded on its own, so one malformed group never hides the rest of a file.
use crate::error::RecordError;
use crate::model::MappingKind;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A top-level legacy document: `{ "<key>": <group>, ... }` in file order.
pub type Document = Map<String, Value>;

/// An id as the legacy files stored it: sometimes a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Int(i64),
    Text(String),
}

impl LegacyId {
    pub fn from_value(value: &Value) -> Option<Self> {
        LegacyId::deserialize(value).ok()
    }

    /// Integer user id; numeric strings are accepted.
    pub fn to_user_id(&self) -> Option<i64> {
        match self {
            LegacyId::Int(id) => Some(*id),
            LegacyId::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Message ids are stored as opaque strings.
    pub fn to_message_id(&self) -> String {
        match self {
            LegacyId::Int(id) => id.to_string(),
            LegacyId::Text(s) => s.clone(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            LegacyId::Int(id) => *id != 0,
            LegacyId::Text(s) => !s.is_empty(),
        }
    }
}

/// `bots.json`: owner id → `{ "bots": [ ... ] }`.
#[derive(Debug, Default, Deserialize)]
pub struct LegacyOwner {
    #[serde(default)]
    pub bots: Vec<Value>,
}

/// One bot record. Fields stay loosely typed so a wrong type on one field is
/// reported against that field instead of rejecting the whole record.
#[derive(Debug, Default, Deserialize)]
pub struct LegacyBot {
    pub bot_username: Option<Value>,
    pub token: Option<Value>,
    pub welcome_msg: Option<Value>,
    pub mode: Option<Value>,
    pub forum_group_id: Option<Value>,
}

impl LegacyBot {
    /// Non-empty string handle; anything else counts as missing.
    pub fn handle(&self) -> Option<String> {
        non_empty_str(&self.bot_username)
    }

    pub fn token(&self) -> Option<String> {
        non_empty_str(&self.token)
    }

    /// Welcome text; numbers are kept as their text, other shapes become empty.
    pub fn welcome_msg(&self) -> String {
        match &self.welcome_msg {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Raw mode text, `None` when absent or empty. Non-string values are
    /// returned as their JSON text so they surface as an unknown mode.
    pub fn mode(&self) -> Option<String> {
        match &self.mode {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Forum group id when present and truthy. `Err` carries the offending
    /// value when it is not an integer.
    pub fn forum_group_id(&self) -> Result<Option<i64>, String> {
        let Some(raw) = self.forum_group_id.as_ref().filter(|v| !v.is_null()) else {
            return Ok(None);
        };
        match LegacyId::from_value(raw) {
            Some(id) if !id.is_truthy() => Ok(None),
            Some(id) => id.to_user_id().map(Some).ok_or_else(|| raw.to_string()),
            None if raw == &Value::Bool(false) => Ok(None),
            None => Err(raw.to_string()),
        }
    }
}

fn non_empty_str(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `msg_map.json`: bot handle → up to five id maps. Both the current kind
/// names and the legacy key names are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct LegacyMappingGroup {
    pub direct: Option<Map<String, Value>>,
    #[serde(alias = "topics")]
    pub topic: Option<Map<String, Value>>,
    #[serde(alias = "user_to_forward")]
    pub user_forward: Option<Map<String, Value>>,
    #[serde(alias = "forward_to_user")]
    pub forward_user: Option<Map<String, Value>>,
    #[serde(alias = "owner_to_user")]
    pub owner_user: Option<Map<String, Value>>,
}

impl LegacyMappingGroup {
    /// Present sub-maps in fixed kind order.
    pub fn into_kinds(self) -> Vec<(MappingKind, Map<String, Value>)> {
        [
            (MappingKind::Direct, self.direct),
            (MappingKind::Topic, self.topic),
            (MappingKind::UserForward, self.user_forward),
            (MappingKind::ForwardUser, self.forward_user),
            (MappingKind::OwnerUser, self.owner_user),
        ]
        .into_iter()
        .filter_map(|(kind, entries)| entries.map(|e| (kind, e)))
        .collect()
    }
}

/// `verified_users.json` groups come in two shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VerifiedUsers {
    RawIdList(Vec<Value>),
    DetailedUserMap(Map<String, Value>),
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifiedUserDetail {
    pub user_name: Option<String>,
    pub user_username: Option<String>,
}

/// One verified user ready to be written, whichever shape it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUserInput {
    pub user_id: i64,
    pub user_name: String,
    pub user_username: String,
}

impl VerifiedUsers {
    pub fn into_entries(self, bot: &str) -> Vec<Result<VerifiedUserInput, RecordError>> {
        match self {
            VerifiedUsers::RawIdList(ids) => ids
                .iter()
                .map(|raw| -> Result<VerifiedUserInput, RecordError> {
                    let user_id = user_id_from_value(bot, raw)?;
                    Ok(VerifiedUserInput {
                        user_id,
                        user_name: String::new(),
                        user_username: String::new(),
                    })
                })
                .collect(),
            VerifiedUsers::DetailedUserMap(users) => users
                .into_iter()
                .map(|(raw_id, detail)| -> Result<VerifiedUserInput, RecordError> {
                    let user_id = raw_id.trim().parse::<i64>().map_err(|_| {
                        RecordError::InvalidUserId {
                            bot: bot.to_string(),
                            value: raw_id.clone(),
                        }
                    })?;
                    let detail: Option<VerifiedUserDetail> = serde_json::from_value(detail)
                        .map_err(|e| {
                            RecordError::malformed(
                                format!("bot @{bot}: verified user {raw_id}"),
                                e,
                            )
                        })?;
                    let detail = detail.unwrap_or_default();
                    Ok(VerifiedUserInput {
                        user_id,
                        user_name: detail.user_name.unwrap_or_default(),
                        user_username: detail.user_username.unwrap_or_default(),
                    })
                })
                .collect(),
        }
    }
}

/// Coerce a raw JSON id (number or numeric string) into an integer user id.
pub fn user_id_from_value(bot: &str, raw: &Value) -> Result<i64, RecordError> {
    LegacyId::from_value(raw)
        .and_then(|id| id.to_user_id())
        .ok_or_else(|| RecordError::InvalidUserId {
            bot: bot.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_id_accepts_numbers_and_strings() {
        assert_eq!(LegacyId::from_value(&json!(200)), Some(LegacyId::Int(200)));
        assert_eq!(
            LegacyId::from_value(&json!("200")).and_then(|id| id.to_user_id()),
            Some(200)
        );
        assert_eq!(LegacyId::from_value(&json!(1.5)), None);
        assert_eq!(LegacyId::Int(200).to_message_id(), "200");
        assert!(!LegacyId::Int(0).is_truthy());
        assert!(!LegacyId::Text(String::new()).is_truthy());
    }

    #[test]
    fn bot_fields_tolerate_wrong_types() {
        let bot: LegacyBot = serde_json::from_value(json!({
            "bot_username": 12345,
            "token": "T",
            "welcome_msg": {"text": "hi"},
            "mode": 7,
            "forum_group_id": "-100200"
        }))
        .unwrap();
        assert_eq!(bot.handle(), None);
        assert_eq!(bot.token().as_deref(), Some("T"));
        assert_eq!(bot.welcome_msg(), "");
        assert_eq!(bot.mode().as_deref(), Some("7"));
        assert_eq!(bot.forum_group_id(), Ok(Some(-100200)));

        let bot: LegacyBot = serde_json::from_value(json!({
            "bot_username": "b", "welcome_msg": 42, "mode": "", "forum_group_id": "general"
        }))
        .unwrap();
        assert_eq!(bot.welcome_msg(), "42");
        assert_eq!(bot.mode(), None);
        assert_eq!(bot.forum_group_id(), Err("\"general\"".to_string()));

        let bot: LegacyBot = serde_json::from_value(json!({"forum_group_id": 0})).unwrap();
        assert_eq!(bot.forum_group_id(), Ok(None));
    }

    #[test]
    fn mapping_group_accepts_legacy_key_names() {
        let group: LegacyMappingGroup = serde_json::from_value(json!({
            "direct": {"1": 2},
            "topics": {"10": 20},
            "user_to_forward": {},
            "owner_to_user": {"5": "6"}
        }))
        .unwrap();
        let kinds: Vec<MappingKind> = group.into_kinds().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                MappingKind::Direct,
                MappingKind::Topic,
                MappingKind::UserForward,
                MappingKind::OwnerUser
            ]
        );
    }

    #[test]
    fn verified_users_list_and_map_shapes_agree() {
        let list: VerifiedUsers = serde_json::from_value(json!([7, "8"])).unwrap();
        assert!(matches!(list, VerifiedUsers::RawIdList(_)));
        let list: Vec<_> = list.into_entries("b").into_iter().map(|r| r.unwrap()).collect();

        let map: VerifiedUsers = serde_json::from_value(json!({
            "7": {"user_name": "Seven", "user_username": "seven"},
            "8": {}
        }))
        .unwrap();
        assert!(matches!(map, VerifiedUsers::DetailedUserMap(_)));
        let map: Vec<_> = map.into_entries("b").into_iter().map(|r| r.unwrap()).collect();

        let ids = |v: &[VerifiedUserInput]| v.iter().map(|u| u.user_id).collect::<Vec<_>>();
        assert_eq!(ids(&list), ids(&map));
        assert_eq!(list[0].user_name, "");
        assert_eq!(map[0].user_name, "Seven");
        assert_eq!(map[1].user_username, "");
    }

    #[test]
    fn bad_verified_ids_fail_individually() {
        let users: VerifiedUsers = serde_json::from_value(json!({
            "abc": {},
            "9": {"user_name": "Nine"}
        }))
        .unwrap();
        let entries = users.into_entries("b");
        assert!(matches!(entries[0], Err(RecordError::InvalidUserId { .. })));
        assert_eq!(entries[1].as_ref().unwrap().user_id, 9);
    }
}
