use gatehouse_core::error::AppError;
use gatehouse_core::retry::RetryConfig;
use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::interceptor::AuthHeaderStyle;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub backend: BackendSettings,
    #[serde(default)]
    pub external: ExternalSettings,
    pub federation: FederationSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct BackendSettings {
    /// Base URL of the application's own backend (default mode).
    pub default_url: String,
    /// Auth collection used for password login.
    #[serde(default = "default_users_collection")]
    pub users_collection: String,
    /// Left unset, requests use the HTTP stack's defaults.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn default_users_collection() -> String {
    "users".to_string()
}

#[derive(Deserialize, Clone, Default)]
pub struct ExternalSettings {
    /// How the external token is written into `Authorization`.
    #[serde(default)]
    pub auth_header_style: AuthHeaderStyle,
}

#[derive(Deserialize, Clone)]
pub struct FederationSettings {
    /// `POST` endpoint taking `{username, password}`.
    pub login_url: String,
    /// `GET` endpoint returning the caller's VMS project.
    pub project_url: String,
}

#[derive(Deserialize, Clone)]
pub struct StorageSettings {
    /// Directory holding the persisted session.
    pub path: PathBuf,
    /// Without a key the session is stored in plain JSON.
    #[serde(default)]
    pub encryption_key: Option<Secret<String>>,
}

#[derive(Deserialize, Clone)]
pub struct RetrySettings {
    #[serde(default = "default_autocancel_delay_ms")]
    pub autocancel_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            autocancel_delay_ms: default_autocancel_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// The `list_all` policy: one retry, only after an auto-cancellation.
    pub fn autocancel_policy(&self) -> RetryConfig {
        RetryConfig::autocancel(Duration::from_millis(self.autocancel_delay_ms))
    }
}

fn default_autocancel_delay_ms() -> u64 {
    100
}

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_service_name() -> String {
    "gatehouse-client".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir()?;

    // Either run from the crate directory or from the workspace root
    let configuration_directory = if base_path.ends_with("gatehouse-client") {
        base_path.join("config")
    } else {
        base_path.join("gatehouse-client").join("config")
    };

    gatehouse_core::config::load_settings(&configuration_directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_shipped_base_config_parses() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let settings: Settings = gatehouse_core::config::load_settings(&dir).unwrap();

        assert_eq!(settings.backend.users_collection, "users");
        assert_eq!(settings.retry.autocancel_delay_ms, 100);
        assert_eq!(settings.external.auth_header_style, AuthHeaderStyle::Raw);
        assert!(settings.backend.request_timeout().is_none());
    }

    #[test]
    #[serial]
    fn test_encryption_key_from_environment() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        std::env::set_var("APP_STORAGE__ENCRYPTION_KEY", "correct horse battery staple");
        let settings: Result<Settings, _> = gatehouse_core::config::load_settings(&dir);
        std::env::remove_var("APP_STORAGE__ENCRYPTION_KEY");

        let key = settings.unwrap().storage.encryption_key.unwrap();
        assert_eq!(key.expose_secret(), "correct horse battery staple");
    }
}
