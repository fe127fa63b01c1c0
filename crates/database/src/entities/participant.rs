//! Participant entity definitions

use serde::{Deserialize, Serialize};

/// A user's membership record within a chat.
///
/// Exactly one row exists per (chat, user); removal flips `is_active` and a
/// later re-add reuses the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Database primary key
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub role: ParticipantRole,
    /// Soft-removal flag; false means logically removed but retained for history.
    pub is_active: bool,
    /// Cached unread counter. The authoritative count is recomputed from
    /// message timestamps against `last_seen`.
    pub unread_count: i64,
    pub last_seen: String,
    pub muted: bool,
    pub joined_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Member,
    Admin,
    Owner,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Member => "member",
            ParticipantRole::Admin => "admin",
            ParticipantRole::Owner => "owner",
        }
    }

    /// Whether this role may manage participants and post in
    /// admin-restricted group chats.
    pub fn is_privileged(&self) -> bool {
        matches!(self, ParticipantRole::Admin | ParticipantRole::Owner)
    }
}

impl From<&str> for ParticipantRole {
    fn from(s: &str) -> Self {
        match s {
            "admin" => ParticipantRole::Admin,
            "owner" => ParticipantRole::Owner,
            _ => ParticipantRole::Member,
        }
    }
}

impl ToString for ParticipantRole {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        assert_eq!(ParticipantRole::from("member"), ParticipantRole::Member);
        assert_eq!(ParticipantRole::from("admin"), ParticipantRole::Admin);
        assert_eq!(ParticipantRole::from("owner"), ParticipantRole::Owner);
        assert_eq!(ParticipantRole::from("unknown"), ParticipantRole::Member);

        assert_eq!(ParticipantRole::Owner.to_string(), "owner");
    }

    #[test]
    fn test_privileged_roles() {
        assert!(!ParticipantRole::Member.is_privileged());
        assert!(ParticipantRole::Admin.is_privileged());
        assert!(ParticipantRole::Owner.is_privileged());
    }
}
