//! Password login against the default backend.

use gatehouse_core::error::AppError;
use gatehouse_core::observability::inject_trace_headers;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::collections::build_url;
use super::switcher::ContextSwitcher;
use super::transport::{HttpRequest, Transport};
use crate::context::Principal;
use crate::utils::validation::not_blank;

#[derive(Serialize, Validate)]
struct PasswordAuth {
    #[validate(custom(function = "not_blank", message = "Email or username is required"))]
    identity: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    password: String,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    record: serde_json::Value,
}

pub struct SessionManager {
    transport: Arc<dyn Transport>,
    switcher: Arc<ContextSwitcher>,
    users_collection: String,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, switcher: Arc<ContextSwitcher>, users_collection: &str) -> Self {
        Self {
            transport,
            switcher,
            users_collection: users_collection.to_string(),
        }
    }

    /// Authenticate against the default backend and make that session
    /// active, leaving external mode if it was on.
    pub async fn login_with_password(&self, identity: &str, password: &str) -> Result<Principal, AppError> {
        let auth = PasswordAuth {
            identity: identity.trim().to_string(),
            password: password.to_string(),
        };
        auth.validate()?;

        let url = build_url(
            self.switcher.default_url(),
            &[
                "api",
                "collections",
                self.users_collection.as_str(),
                "auth-with-password",
            ],
            &[],
        )?;
        let body = serde_json::to_value(&auth).map_err(|e| AppError::InternalError(e.into()))?;
        let mut request = HttpRequest::new(Method::POST, url).json(body);
        inject_trace_headers(&mut request.headers, None);

        let response = self.transport.execute(request).await.map_err(|e| {
            tracing::error!(error = %e, "Password login request failed");
            e
        })?;
        let auth: AuthResponse = response.into_result()?;

        self.switcher.set_native_session(&auth.token, auth.record).await
    }

    pub async fn logout(&self) {
        self.switcher.switch_to_default().await;
    }

    pub fn current_user(&self) -> Option<Principal> {
        self.switcher.identity()
    }

    pub fn is_logged_in(&self) -> bool {
        self.switcher.snapshot().token().is_some()
    }
}
