//! The single authority over which backend is active.
//!
//! Two states, default and external. Every transition succeeds locally;
//! persistence is best effort and its failures are only logged.
//!
//! Transitions run one at a time, each holding the transition lock across
//! its in-memory replace and its write to storage. Storage therefore always
//! reflects the last transition to commit.

use gatehouse_core::error::AppError;
use secrecy::Secret;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

use crate::context::{normalize_base_url, synthesize, BackendContext, BackendMode, IdentityInfo, Principal};
use crate::storage::{LoginMethod, NativeSession, PersistedContext, SessionRecord, SessionStore};

pub struct ContextSwitcher {
    current: RwLock<Arc<BackendContext>>,
    transition: Mutex<()>,
    default_url: String,
    sessions: Arc<SessionStore>,
}

impl ContextSwitcher {
    /// Start in default mode without credentials, ignoring anything persisted.
    pub fn new(default_url: &str, sessions: Arc<SessionStore>) -> Self {
        Self {
            current: RwLock::new(Arc::new(BackendContext::default_for(default_url))),
            transition: Mutex::new(()),
            default_url: normalize_base_url(default_url),
            sessions,
        }
    }

    /// Rebuild the active context from the persisted session.
    ///
    /// An external record wins over a native session. Storage errors leave
    /// the switcher in plain default mode.
    pub async fn restore(default_url: &str, sessions: Arc<SessionStore>) -> Self {
        let switcher = Self::new(default_url, sessions);

        let record = match switcher.sessions.load().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load persisted session, starting in default mode");
                return switcher;
            }
        };

        let restored = if let Some(external) = record.external {
            Some(BackendContext {
                base_url: normalize_base_url(&external.base_url),
                auth_token: Some(Secret::new(external.token)),
                identity: Some(external.identity),
                mode: BackendMode::External,
            })
        } else {
            record.native.map(|native| BackendContext {
                base_url: switcher.default_url.clone(),
                identity: Principal::from_auth_record(&native.record),
                auth_token: Some(Secret::new(native.token)),
                mode: BackendMode::Default,
            })
        };

        if let Some(ctx) = restored {
            tracing::info!(
                mode = ?ctx.mode,
                base_url = %ctx.base_url,
                "Restored backend context from storage"
            );
            switcher.replace(ctx);
        }

        switcher
    }

    /// Point every subsequent request at an external backend.
    ///
    /// Does not check that `base_url` is reachable.
    pub async fn switch_to_external(
        &self,
        base_url: &str,
        token: &str,
        info: &IdentityInfo,
    ) -> Result<Principal, AppError> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(AppError::invalid_input("External base URL is required"));
        }
        if token.trim().is_empty() {
            return Err(AppError::invalid_input("External token is required"));
        }

        let identity = synthesize(info);
        let _transition = self.transition.lock().await;
        self.replace(BackendContext {
            base_url: base_url.clone(),
            auth_token: Some(Secret::new(token.to_string())),
            identity: Some(identity.clone()),
            mode: BackendMode::External,
        });

        tracing::info!(
            base_url = %base_url,
            principal = %identity.id,
            role = %identity.role,
            "Switched to external backend"
        );

        let record = SessionRecord {
            external: Some(PersistedContext {
                base_url,
                token: token.to_string(),
                identity: identity.clone(),
            }),
            native: None,
            current_user: serde_json::to_value(&identity).ok(),
            is_logged: true,
            login_method: Some(LoginMethod::Vms),
            role: Some(identity.role.clone()),
        };
        if let Err(e) = self.sessions.save(&record).await {
            tracing::warn!(error = %e, "Failed to persist external context; switch is in memory only");
        }

        Ok(identity)
    }

    /// Back to the configured default backend with no session. Idempotent.
    pub async fn switch_to_default(&self) {
        let _transition = self.transition.lock().await;
        self.reset().await;
    }

    async fn reset(&self) {
        let was_external = self.is_external();
        self.replace(BackendContext::default_for(&self.default_url));

        if let Err(e) = self.sessions.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }

        tracing::info!(was_external, base_url = %self.default_url, "Switched to default backend");
    }

    /// Install a native session obtained from password login.
    pub async fn set_native_session(
        &self,
        token: &str,
        record: serde_json::Value,
    ) -> Result<Principal, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::invalid_input("Session token is required"));
        }
        let principal = Principal::from_auth_record(&record)
            .ok_or_else(|| AppError::invalid_input("Auth record has no id"))?;

        let _transition = self.transition.lock().await;
        self.replace(BackendContext {
            base_url: self.default_url.clone(),
            auth_token: Some(Secret::new(token.to_string())),
            identity: Some(principal.clone()),
            mode: BackendMode::Default,
        });

        let session = SessionRecord {
            external: None,
            current_user: Some(record.clone()),
            native: Some(NativeSession {
                token: token.to_string(),
                record,
            }),
            is_logged: true,
            login_method: Some(LoginMethod::Password),
            role: Some(principal.role.clone()).filter(|r| !r.is_empty()),
        };
        if let Err(e) = self.sessions.save(&session).await {
            tracing::warn!(error = %e, "Failed to persist native session");
        }

        tracing::info!(principal = %principal.id, role = %principal.role, "Native session established");
        Ok(principal)
    }

    /// Any 401 ends the session, whichever backend produced it.
    pub async fn handle_unauthorized(&self) {
        let _transition = self.transition.lock().await;
        let ctx = self.snapshot();
        tracing::warn!(
            mode = ?ctx.mode,
            base_url = %ctx.base_url,
            "Backend rejected credentials, clearing session"
        );
        self.reset().await;
    }

    /// End the session only if `rejected` is still the active context.
    /// Returns whether it was.
    pub async fn handle_unauthorized_from(&self, rejected: &Arc<BackendContext>) -> bool {
        let _transition = self.transition.lock().await;
        if !Arc::ptr_eq(rejected, &self.snapshot()) {
            tracing::debug!(base_url = %rejected.base_url, "Ignoring 401 from a superseded context");
            return false;
        }

        tracing::warn!(
            mode = ?rejected.mode,
            base_url = %rejected.base_url,
            "Backend rejected credentials, clearing session"
        );
        self.reset().await;
        true
    }

    pub fn is_external(&self) -> bool {
        self.snapshot().is_external()
    }

    pub fn identity(&self) -> Option<Principal> {
        self.snapshot().identity.clone()
    }

    /// The context in effect right now. Requests hold on to the returned
    /// value for their whole lifetime.
    pub fn snapshot(&self) -> Arc<BackendContext> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    pub async fn persisted(&self) -> Result<SessionRecord, AppError> {
        self.sessions.load().await
    }

    fn replace(&self, ctx: BackendContext) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(ctx);
    }
}
