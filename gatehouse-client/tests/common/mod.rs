#![allow(dead_code)]

use async_trait::async_trait;
use gatehouse_client::config::{
    BackendSettings, ExternalSettings, FederationSettings, RetrySettings, Settings, StorageSettings,
    TelemetrySettings,
};
use gatehouse_client::services::{HttpRequest, HttpResponse, Transport};
use gatehouse_client::storage::{KeyValueStore, MemoryStore};
use gatehouse_client::{Gatehouse, IdentityInfo};
use gatehouse_core::AppError;
use reqwest::StatusCode;
use secrecy::Secret;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://127.0.0.1:8090";

/// Records every request it sees. Answers from a route whose pattern the
/// URL contains, else from the queue in order.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<(String, u16, Value)>>,
    script: Mutex<VecDeque<Result<HttpResponse, AppError>>>,
    stalls: Mutex<VecDeque<Duration>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.script.lock().unwrap().push_back(Ok(HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: serde_json::to_vec(&body).unwrap(),
        }));
    }

    /// Answer every request whose URL contains `pattern`.
    pub fn route(&self, pattern: &str, status: u16, body: Value) {
        self.routes.lock().unwrap().push((pattern.to_string(), status, body));
    }

    /// Hold the next request for `delay` before answering it.
    pub fn stall_next(&self, delay: Duration) {
        self.stalls.lock().unwrap().push_back(delay);
    }

    pub fn push_error(&self, err: AppError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests.lock().unwrap().last().cloned().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        self.requests.lock().unwrap().push(request.clone());

        let stall = self.stalls.lock().unwrap().pop_front();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }

        let routed = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _, _)| request.url.contains(pattern.as_str()))
            .map(|(_, status, body)| (*status, body.clone()));
        if let Some((status, body)) = routed {
            return Ok(HttpResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: serde_json::to_vec(&body).unwrap(),
            });
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Transport(format!("no scripted response for {}", request.url))))
    }
}

pub fn settings(storage: &Path, encryption_key: Option<&str>) -> Settings {
    Settings {
        backend: BackendSettings {
            default_url: DEFAULT_URL.to_string(),
            users_collection: "users".to_string(),
            request_timeout_secs: None,
        },
        external: ExternalSettings::default(),
        federation: FederationSettings {
            login_url: "https://portal.example/api/v1/auth/dashboard/login".to_string(),
            project_url: "https://portal.example/api/v1/my-project".to_string(),
        },
        storage: StorageSettings {
            path: storage.to_path_buf(),
            encryption_key: encryption_key.map(|k| Secret::new(k.to_string())),
        },
        retry: RetrySettings {
            autocancel_delay_ms: 10,
        },
        telemetry: TelemetrySettings::default(),
    }
}

/// In-memory storage, no encryption.
pub async fn gatehouse(transport: &Arc<MockTransport>) -> Gatehouse {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    Gatehouse::build_with(&settings(Path::new("unused"), None), store, transport.clone())
        .await
        .expect("failed to build client")
}

pub fn acme() -> IdentityInfo {
    IdentityInfo {
        my_project_id: "P1".to_string(),
        project_name: "Acme".to_string(),
        role_name: "guard".to_string(),
        vms_url: None,
        vms_token: None,
    }
}

pub fn page(page: u32, total_pages: i64, items: Vec<Value>) -> Value {
    json!({
        "page": page,
        "perPage": 500,
        "totalItems": items.len(),
        "totalPages": total_pages,
        "items": items
    })
}
