//! In-process stand-ins for the backends a gatehouse client talks to.
//!
//! [`MockBackend`] serves the collection REST surface, password auth and
//! the federated portal endpoints from one axum router on a random local
//! port. Tests point client settings at one or more of them.

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once, PoisonError};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,gatehouse_client=debug,workflow_tests=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

struct PasswordUser {
    identity: String,
    password: String,
    token: String,
    record: Value,
}

struct PortalAccount {
    username: String,
    password: String,
    access_token: String,
    project: Value,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Value>>,
    tokens: HashSet<String>,
    users: Vec<PasswordUser>,
    portal: Vec<PortalAccount>,
    requests: Vec<RecordedRequest>,
    next_id: u64,
}

#[derive(Clone, Default)]
struct BackendState(Arc<Mutex<Inner>>);

impl BackendState {
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner)
    }
}

pub struct MockBackend {
    pub address: String,
    state: BackendState,
}

impl MockBackend {
    pub async fn spawn() -> Result<Self> {
        let state = BackendState::default();
        let app = Router::new()
            .route(
                "/api/collections/:collection/records",
                get(list_records).post(create_record),
            )
            .route(
                "/api/collections/:collection/records/:id",
                get(get_record).patch(update_record).delete(delete_record),
            )
            .route(
                "/api/collections/:collection/auth-with-password",
                post(auth_with_password),
            )
            .route("/auth/dashboard/login", post(portal_login))
            .route("/my-project", get(my_project))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind mock backend")?;
        let address = format!("http://{}", listener.local_addr()?);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self { address, state })
    }

    pub fn seed(&self, collection: &str, records: Vec<Value>) {
        self.state.with(|inner| {
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .extend(records)
        });
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.state
            .with(|inner| inner.collections.get(collection).cloned().unwrap_or_default())
    }

    pub fn allow_token(&self, token: &str) {
        self.state.with(|inner| inner.tokens.insert(token.to_string()));
    }

    pub fn revoke_token(&self, token: &str) {
        self.state.with(|inner| inner.tokens.remove(token));
    }

    /// A user that can log in with a password; the issued token is accepted
    /// for collection access.
    pub fn add_user(&self, identity: &str, password: &str, token: &str, record: Value) {
        self.allow_token(token);
        self.state.with(|inner| {
            inner.users.push(PasswordUser {
                identity: identity.to_string(),
                password: password.to_string(),
                token: token.to_string(),
                record,
            })
        });
    }

    /// A portal account whose `my-project` answer is `project`.
    pub fn add_portal_account(&self, username: &str, password: &str, project: Value) {
        self.state.with(|inner| {
            inner.portal.push(PortalAccount {
                username: username.to_string(),
                password: password.to_string(),
                access_token: format!("portal-{}", uuid::Uuid::new_v4()),
                project,
            })
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.with(|inner| inner.requests.clone())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

fn record_request(state: &BackendState, method: Method, path: String, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = RecordedRequest {
        method,
        path,
        authorization: header("authorization"),
        content_type: header("content-type"),
    };
    state.with(|inner| inner.requests.push(request));
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"code": status.as_u16(), "message": message, "data": {}})),
    )
        .into_response()
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if state.with(|inner| inner.tokens.contains(token)) {
        Ok(())
    } else {
        Err(error(
            StatusCode::UNAUTHORIZED,
            "The request requires valid record authorization token to be set.",
        ))
    }
}

#[derive(Deserialize)]
struct ListParams {
    page: Option<usize>,
    #[serde(rename = "perPage")]
    per_page: Option<usize>,
    filter: Option<String>,
}

async fn list_records(
    State(state): State<BackendState>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> Response {
    record_request(&state, Method::GET, format!("/api/collections/{}/records", collection), &headers);
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    let matching: Vec<Value> = state.with(|inner| {
        inner
            .collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches_filter(r, params.filter.as_deref()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    });

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(30).max(1);
    let total_pages = matching.len().div_ceil(per_page);
    let items: Vec<Value> = matching
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect();

    Json(json!({
        "page": page,
        "perPage": per_page,
        "totalItems": matching.len(),
        "totalPages": total_pages,
        "items": items
    }))
    .into_response()
}

async fn get_record(
    State(state): State<BackendState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record_request(&state, Method::GET, format!("/api/collections/{}/records/{}", collection, id), &headers);
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    let found = state.with(|inner| {
        inner
            .collections
            .get(&collection)
            .and_then(|records| records.iter().find(|r| r["id"] == id.as_str()).cloned())
    });
    match found {
        Some(record) => Json(record).into_response(),
        None => error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
    }
}

async fn create_record(
    State(state): State<BackendState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    record_request(&state, Method::POST, format!("/api/collections/{}/records", collection), &headers);
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }
    let Some(fields) = body.as_object_mut() else {
        return error(StatusCode::BAD_REQUEST, "Failed to load the submitted data.");
    };

    let record = state.with(|inner| {
        inner.next_id += 1;
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ").to_string();
        fields.insert("id".to_string(), json!(format!("r{:014}", inner.next_id)));
        fields.insert("collectionName".to_string(), json!(collection));
        fields.insert("created".to_string(), json!(now));
        fields.insert("updated".to_string(), json!(now));
        let record = Value::Object(fields.clone());
        inner
            .collections
            .entry(collection.clone())
            .or_default()
            .push(record.clone());
        record
    });
    Json(record).into_response()
}

async fn update_record(
    State(state): State<BackendState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record_request(&state, Method::PATCH, format!("/api/collections/{}/records/{}", collection, id), &headers);
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    let updated = state.with(|inner| {
        let record = inner
            .collections
            .get_mut(&collection)?
            .iter_mut()
            .find(|r| r["id"] == id.as_str())?;
        if let (Some(target), Some(changes)) = (record.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Some(record.clone())
    });
    match updated {
        Some(record) => Json(record).into_response(),
        None => error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
    }
}

async fn delete_record(
    State(state): State<BackendState>,
    Path((collection, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record_request(&state, Method::DELETE, format!("/api/collections/{}/records/{}", collection, id), &headers);
    if let Err(rejection) = authorize(&state, &headers) {
        return rejection;
    }

    let removed = state.with(|inner| {
        let records = inner.collections.get_mut(&collection)?;
        let before = records.len();
        records.retain(|r| r["id"] != id.as_str());
        Some(records.len() < before)
    });
    match removed {
        Some(true) => StatusCode::NO_CONTENT.into_response(),
        _ => error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
    }
}

#[derive(Deserialize)]
struct PasswordLogin {
    identity: String,
    password: String,
}

async fn auth_with_password(
    State(state): State<BackendState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(login): Json<PasswordLogin>,
) -> Response {
    record_request(
        &state,
        Method::POST,
        format!("/api/collections/{}/auth-with-password", collection),
        &headers,
    );

    let session = state.with(|inner| {
        inner
            .users
            .iter()
            .find(|u| u.identity == login.identity && u.password == login.password)
            .map(|u| json!({"token": u.token, "record": u.record}))
    });
    match session {
        Some(body) => Json(body).into_response(),
        None => error(StatusCode::BAD_REQUEST, "Failed to authenticate."),
    }
}

#[derive(Deserialize)]
struct PortalLogin {
    username: String,
    password: String,
}

async fn portal_login(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(login): Json<PortalLogin>,
) -> Response {
    record_request(&state, Method::POST, "/auth/dashboard/login".to_string(), &headers);

    let token = state.with(|inner| {
        inner
            .portal
            .iter()
            .find(|a| a.username == login.username && a.password == login.password)
            .map(|a| a.access_token.clone())
    });
    match token {
        Some(access_token) => Json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600
        }))
        .into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Invalid username or password"),
    }
}

async fn my_project(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    record_request(&state, Method::GET, "/my-project".to_string(), &headers);

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    let project = state.with(|inner| {
        inner
            .portal
            .iter()
            .find(|a| a.access_token == bearer)
            .map(|a| a.project.clone())
    });
    match project {
        Some(project) => Json(project).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Invalid access token"),
    }
}

/// Just enough of the filter language for the client's own queries:
/// `field = "value"` clauses joined by `&&` or `||`. Other operators match
/// everything.
fn matches_filter(record: &Value, filter: Option<&str>) -> bool {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return true;
    };
    let cleaned: String = filter.chars().filter(|c| *c != '(' && *c != ')').collect();

    let clause = |clause: &str| {
        let Some((field, value)) = clause.split_once(" = ") else {
            return true;
        };
        let value = value.trim().trim_matches('"');
        match &record[field.trim()] {
            Value::String(s) => s == value,
            Value::Bool(b) => b.to_string() == value,
            Value::Array(items) => items.iter().any(|i| i == value),
            _ => false,
        }
    };

    if cleaned.contains("&&") {
        cleaned.split("&&").all(|c| clause(c.trim()))
    } else {
        cleaned.split("||").any(|c| clause(c.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_filter() {
        let record = json!({"id": "a1", "role": "resident", "active": true});
        assert!(matches_filter(&record, None));
        assert!(matches_filter(&record, Some(r#"(id = "a1" || id = "a2")"#)));
        assert!(!matches_filter(&record, Some(r#"id = "a2""#)));
        assert!(matches_filter(&record, Some(r#"(role = "resident" && active = true)"#)));
        assert!(!matches_filter(&record, Some(r#"(role = "guard" && active = true)"#)));
    }
}
