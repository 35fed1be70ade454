//! The backend a request is addressed to, and who is making it.

use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Prefix for principals synthesized from a VMS project.
pub const EXTERNAL_ID_PREFIX: &str = "external-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Default,
    External,
}

/// The authenticated actor used for access gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub display_name: String,
    pub role: String,
    #[serde(default)]
    pub affiliated_entity_id: Option<String>,
    #[serde(default)]
    pub authorized_area_ids: BTreeSet<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    /// Build a principal from a native auth record.
    ///
    /// Display name falls back from `name` to `first_name last_name` to
    /// `email` to the record id.
    pub fn from_auth_record(record: &serde_json::Value) -> Option<Self> {
        let id = record.get("id")?.as_str()?.to_string();
        let text = |key: &str| {
            record
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let full_name = [text("first_name"), text("last_name")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let email = text("email");
        let display_name = text("name")
            .or_else(|| (!full_name.is_empty()).then_some(full_name))
            .or_else(|| email.clone())
            .unwrap_or_else(|| id.clone());

        Some(Self {
            display_name,
            role: text("role").unwrap_or_default(),
            affiliated_entity_id: text("house"),
            authorized_area_ids: crate::models::relation_ids(record.get("authorized_area"))
                .into_iter()
                .collect(),
            email,
            id,
        })
    }
}

/// Identity claims returned by the federated `my-project` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityInfo {
    pub my_project_id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub role_name: String,
    #[serde(default)]
    pub vms_url: Option<String>,
    #[serde(default)]
    pub vms_token: Option<String>,
}

/// Local construction of an external principal. Nothing beyond the bearer
/// token vouches for these claims.
pub fn synthesize(info: &IdentityInfo) -> Principal {
    Principal {
        id: format!("{}{}", EXTERNAL_ID_PREFIX, info.my_project_id),
        display_name: info.project_name.clone(),
        role: info.role_name.clone(),
        affiliated_entity_id: Some(info.my_project_id.clone()),
        authorized_area_ids: BTreeSet::new(),
        email: None,
    }
}

/// The backend every request of a given moment is sent to.
///
/// Values are immutable; switching produces a new one.
#[derive(Debug, Clone)]
pub struct BackendContext {
    pub base_url: String,
    pub auth_token: Option<Secret<String>>,
    pub identity: Option<Principal>,
    pub mode: BackendMode,
}

impl BackendContext {
    pub fn default_for(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            auth_token: None,
            identity: None,
            mode: BackendMode::Default,
        }
    }

    pub fn is_external(&self) -> bool {
        self.mode == BackendMode::External
    }

    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Same backend, same credentials, same identity.
    pub fn equivalent(&self, other: &BackendContext) -> bool {
        self.mode == other.mode
            && self.base_url == other.base_url
            && self.token() == other.token()
            && self.identity == other.identity
    }
}

/// Surrounding whitespace only. A trailing `/` is kept; URL building copes
/// with either form.
pub(crate) fn normalize_base_url(url: &str) -> String {
    url.trim().to_string()
}
