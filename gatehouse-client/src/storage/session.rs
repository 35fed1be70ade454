//! The persisted session: one record, read and written as a unit.

use gatehouse_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::secure_store::SecureStore;
use crate::context::Principal;

pub const SESSION_KEY: &str = "session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    Password,
    Vms,
}

/// On-disk mirror of an external backend context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedContext {
    pub base_url: String,
    pub token: String,
    pub identity: Principal,
}

/// Native backend session after password login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeSession {
    pub token: String,
    pub record: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Present iff the active context is external.
    #[serde(default)]
    pub external: Option<PersistedContext>,
    #[serde(default)]
    pub native: Option<NativeSession>,
    #[serde(default)]
    pub current_user: Option<serde_json::Value>,
    #[serde(default)]
    pub is_logged: bool,
    #[serde(default)]
    pub login_method: Option<LoginMethod>,
    #[serde(default)]
    pub role: Option<String>,
}

pub struct SessionStore {
    store: SecureStore,
}

impl SessionStore {
    pub fn new(store: SecureStore) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<SessionRecord, AppError> {
        Ok(self
            .store
            .get_json::<SessionRecord>(SESSION_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<(), AppError> {
        self.store.set_json(SESSION_KEY, record).await
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        self.store.remove(SESSION_KEY).await
    }
}
