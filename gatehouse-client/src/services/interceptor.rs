//! Credential and tracing headers for every outbound backend call.

use gatehouse_core::observability::inject_trace_headers;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::context::BackendContext;

/// How the external token is written into `Authorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthHeaderStyle {
    /// The token as-is.
    #[default]
    Raw,
    /// `Bearer <token>`.
    Bearer,
}

impl AuthHeaderStyle {
    pub fn format(&self, token: &str) -> String {
        match self {
            AuthHeaderStyle::Raw => token.to_string(),
            AuthHeaderStyle::Bearer => format!("Bearer {}", token),
        }
    }
}

/// Mutates headers only. Never blocks, retries or refreshes tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestInterceptor {
    external_style: AuthHeaderStyle,
}

impl RequestInterceptor {
    pub fn new(external_style: AuthHeaderStyle) -> Self {
        Self { external_style }
    }

    pub fn apply(&self, ctx: &BackendContext, headers: &mut HeaderMap) {
        if let Some(token) = ctx.token() {
            // The native backend takes its session token unprefixed
            let value = if ctx.is_external() {
                self.external_style.format(token)
            } else {
                token.to_string()
            };

            match HeaderValue::from_str(&value) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Auth token is not a valid header value, sending without it"),
            }
        }

        if ctx.is_external() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        inject_trace_headers(headers, None);
    }
}
