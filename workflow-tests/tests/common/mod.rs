#![allow(dead_code)]

use gatehouse_client::config::{
    BackendSettings, ExternalSettings, FederationSettings, RetrySettings, Settings, StorageSettings,
    TelemetrySettings,
};
use gatehouse_client::Gatehouse;
use secrecy::Secret;
use serde_json::json;
use std::path::Path;
use workflow_tests::MockBackend;

pub const GUARD_EMAIL: &str = "guard@example.com";
pub const GUARD_PASSWORD: &str = "hunter2";
pub const PORTAL_USER: &str = "acme-admin";
pub const PORTAL_PASSWORD: &str = "portal-pass";
pub const VMS_TOKEN: &str = "tok-123";

pub struct TestEnv {
    /// The application's own backend.
    pub native: MockBackend,
    /// The VMS project backend reached after federation.
    pub vms: MockBackend,
    /// The federation portal.
    pub portal: MockBackend,
    pub storage: tempfile::TempDir,
}

impl TestEnv {
    pub async fn spawn() -> Self {
        workflow_tests::init_tracing();

        let native = MockBackend::spawn().await.expect("native backend");
        let vms = MockBackend::spawn().await.expect("vms backend");
        let portal = MockBackend::spawn().await.expect("portal");

        native.add_user(
            GUARD_EMAIL,
            GUARD_PASSWORD,
            "native-tok",
            json!({
                "id": "u1",
                "email": GUARD_EMAIL,
                "first_name": "Malee",
                "last_name": "Srisuk",
                "role": "guard",
                "authorized_area": ["a1"]
            }),
        );
        native.seed("area", vec![json!({"id": "a1", "name": "North gate"}), json!({"id": "a2", "name": "South gate"})]);

        vms.allow_token(VMS_TOKEN);
        portal.add_portal_account(
            PORTAL_USER,
            PORTAL_PASSWORD,
            json!({
                "myProjectId": "P1",
                "projectName": "Acme",
                "roleName": "guard",
                "vmsUrl": vms.address,
                "vmsToken": VMS_TOKEN
            }),
        );

        Self {
            native,
            vms,
            portal,
            storage: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            backend: BackendSettings {
                default_url: self.native.address.clone(),
                users_collection: "users".to_string(),
                request_timeout_secs: Some(5),
            },
            external: ExternalSettings::default(),
            federation: FederationSettings {
                login_url: self.portal.url("/auth/dashboard/login"),
                project_url: self.portal.url("/my-project"),
            },
            storage: StorageSettings {
                path: self.storage.path().to_path_buf(),
                encryption_key: Some(Secret::new("workflow-test-key".to_string())),
            },
            retry: RetrySettings {
                autocancel_delay_ms: 10,
            },
            telemetry: TelemetrySettings::default(),
        }
    }

    /// A fresh client over the same storage, as after an app restart.
    pub async fn client(&self) -> Gatehouse {
        Gatehouse::build(&self.settings()).await.expect("client")
    }

    pub fn storage_path(&self) -> &Path {
        self.storage.path()
    }
}
