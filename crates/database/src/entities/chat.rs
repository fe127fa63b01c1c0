//! Chat entity definitions

use serde::{Deserialize, Serialize};

/// A conversation between two users or a group of users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Database primary key
    pub id: i64,
    /// Publicly accessible id
    pub public_id: String,
    pub chat_type: ChatType,
    pub status: ChatStatus,
    pub name: String,
    pub avatar_url: Option<String>,
    /// User id of the chat creator
    pub created_by: i64,
    pub is_public: bool,
    /// Persisted for clients; the core does not act on it.
    pub approval_required: bool,
    pub only_admins_can_send: bool,
    /// Public id of the most recent message (weak reference, listing aid)
    pub last_message_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to insert a new chat row.
#[derive(Debug, Clone)]
pub struct NewChat {
    pub chat_type: ChatType,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_by: i64,
    pub is_public: bool,
    pub approval_required: bool,
    pub only_admins_can_send: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Individual,
    Group,
    General,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::Individual => "individual",
            ChatType::Group => "group",
            ChatType::General => "general",
        }
    }
}

impl From<&str> for ChatType {
    fn from(s: &str) -> Self {
        match s {
            "group" => ChatType::Group,
            "general" => ChatType::General,
            _ => ChatType::Individual,
        }
    }
}

impl ToString for ChatType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Active,
    Archived,
    Deleted,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Active => "active",
            ChatStatus::Archived => "archived",
            ChatStatus::Deleted => "deleted",
        }
    }
}

impl From<&str> for ChatStatus {
    fn from(s: &str) -> Self {
        match s {
            "archived" => ChatStatus::Archived,
            "deleted" => ChatStatus::Deleted,
            _ => ChatStatus::Active,
        }
    }
}

impl ToString for ChatStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

impl Chat {
    /// Whether new messages and joins are allowed.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ChatStatus::Active)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.chat_type, ChatType::Group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_type_conversion() {
        assert_eq!(ChatType::from("individual"), ChatType::Individual);
        assert_eq!(ChatType::from("group"), ChatType::Group);
        assert_eq!(ChatType::from("general"), ChatType::General);
        assert_eq!(ChatType::from("unknown"), ChatType::Individual);

        assert_eq!(ChatType::Individual.to_string(), "individual");
        assert_eq!(ChatType::Group.to_string(), "group");
        assert_eq!(ChatType::General.to_string(), "general");
    }

    #[test]
    fn test_chat_status_conversion() {
        assert_eq!(ChatStatus::from("active"), ChatStatus::Active);
        assert_eq!(ChatStatus::from("archived"), ChatStatus::Archived);
        assert_eq!(ChatStatus::from("deleted"), ChatStatus::Deleted);
        assert_eq!(ChatStatus::from("unknown"), ChatStatus::Active);
    }
}
