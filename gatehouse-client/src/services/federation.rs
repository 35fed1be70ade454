use gatehouse_core::error::AppError;
use gatehouse_core::observability::inject_trace_headers;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::switcher::ContextSwitcher;
use super::transport::{HttpRequest, Transport};
use crate::config::FederationSettings;
use crate::context::{IdentityInfo, Principal};
use crate::utils::validation::not_blank;

/// Tokens issued by the federated login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBundle {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "tokenType")]
    pub token_type: Option<String>,
    #[serde(default, alias = "expiresIn")]
    pub expires_in: Option<u64>,
}

#[derive(Serialize, Validate)]
struct Credentials {
    #[validate(custom(function = "not_blank", message = "Username is required"))]
    username: String,
    #[validate(custom(function = "not_blank", message = "Password is required"))]
    password: String,
}

impl Credentials {
    fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Exchanges portal credentials for a VMS project and switches to it.
pub struct FederationClient {
    transport: Arc<dyn Transport>,
    switcher: Arc<ContextSwitcher>,
    settings: FederationSettings,
}

impl FederationClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        switcher: Arc<ContextSwitcher>,
        settings: FederationSettings,
    ) -> Self {
        Self {
            transport,
            switcher,
            settings,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenBundle, AppError> {
        let credentials = Credentials::new(username, password);
        credentials.validate()?;

        let mut request = HttpRequest::new(Method::POST, &self.settings.login_url)
            .json(serde_json::to_value(&credentials).map_err(|e| AppError::InternalError(e.into()))?);
        inject_trace_headers(&mut request.headers, None);

        let bundle: TokenBundle = self.transport.execute(request).await?.into_result()?;
        if bundle.access_token.trim().is_empty() {
            return Err(AppError::Server {
                status: 200,
                message: "Login response carried no access token".to_string(),
                data: None,
            });
        }

        tracing::info!(username = %username, "Federated login succeeded");
        Ok(bundle)
    }

    pub async fn my_project(&self, access_token: &str) -> Result<IdentityInfo, AppError> {
        if access_token.trim().is_empty() {
            return Err(AppError::invalid_input("Access token is required"));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| AppError::invalid_input("Access token is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        inject_trace_headers(&mut headers, None);

        let mut request = HttpRequest::new(Method::GET, &self.settings.project_url);
        request.headers = headers;

        self.transport.execute(request).await?.into_result()
    }

    /// Log in, look up the caller's project and switch to its VMS backend.
    ///
    /// On any failure the switcher is left in default mode.
    pub async fn connect(&self, username: &str, password: &str) -> Result<Principal, AppError> {
        Credentials::new(username, password).validate()?;

        match self.try_connect(username, password).await {
            Ok(principal) => Ok(principal),
            Err(e) => {
                tracing::warn!(username = %username, kind = ?e.kind(), error = %e, "VMS connect failed");
                self.switcher.switch_to_default().await;
                Err(e)
            }
        }
    }

    async fn try_connect(&self, username: &str, password: &str) -> Result<Principal, AppError> {
        let bundle = self.login(username, password).await?;
        let project = self.my_project(&bundle.access_token).await?;

        let vms_url = project
            .vms_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("Project has no VMS URL"))?;
        let vms_token = project
            .vms_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("Project has no VMS token"))?;

        self.switcher
            .switch_to_external(vms_url, vms_token, &project)
            .await
    }
}
