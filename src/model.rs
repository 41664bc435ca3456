use serde::{Deserialize, Serialize};

/// How a bot relays messages between users and its owner.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BotMode {
    #[default]
    Direct,
    Forum,
}

impl BotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotMode::Direct => "direct",
            BotMode::Forum => "forum",
        }
    }

    pub fn parse_mode(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(BotMode::Direct),
            "forum" => Some(BotMode::Forum),
            _ => None,
        }
    }
}

/// The five id→id namespaces a bot keeps per relay side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Direct,
    Topic,
    UserForward,
    ForwardUser,
    OwnerUser,
}

impl MappingKind {
    pub const ALL: [MappingKind; 5] = [
        MappingKind::Direct,
        MappingKind::Topic,
        MappingKind::UserForward,
        MappingKind::ForwardUser,
        MappingKind::OwnerUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKind::Direct => "direct",
            MappingKind::Topic => "topic",
            MappingKind::UserForward => "user_forward",
            MappingKind::ForwardUser => "forward_user",
            MappingKind::OwnerUser => "owner_user",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotConfig {
    pub bot_username: String,
    pub token: String,
    pub owner: i64,
    pub welcome_msg: String,
    pub mode: BotMode,
    pub forum_group_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageMapping {
    pub bot_username: String,
    pub kind: MappingKind,
    pub source_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedUser {
    pub bot_username: String,
    pub user_id: i64,
    pub user_name: String,
    pub user_username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub bot_username: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_kind_names_round_trip() {
        for kind in MappingKind::ALL {
            assert_eq!(MappingKind::parse_kind(kind.as_str()), Some(kind));
        }
        assert_eq!(MappingKind::parse_kind("topics"), None);
    }

    #[test]
    fn bot_mode_defaults_to_direct() {
        assert_eq!(BotMode::default(), BotMode::Direct);
        assert_eq!(BotMode::parse_mode("forum"), Some(BotMode::Forum));
        assert_eq!(BotMode::parse_mode("FORUM"), None);
    }
}
