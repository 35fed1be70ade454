use serde::{Deserialize, Serialize};

use super::record::{optional_relation, relation_list, Record, RecordMeta};

pub const COLLECTION: &str = "users";

/// Residents and staff share one auth collection and differ by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Resident,
    Staff,
    Guard,
    Admin,
    #[serde(other)]
    Other,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Resident => "resident",
            UserRole::Staff => "staff",
            UserRole::Guard => "guard",
            UserRole::Admin => "admin",
            UserRole::Other => "other",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Staff | UserRole::Guard | UserRole::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: UserRole,
    #[serde(default)]
    pub phone: String,
    #[serde(default, deserialize_with = "optional_relation")]
    pub house: Option<String>,
    #[serde(default, deserialize_with = "relation_list")]
    pub authorized_area: Vec<String>,
}

fn default_role() -> UserRole {
    UserRole::Other
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

impl Record for User {
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
