//! The collection facade.
//!
//! Default and external mode share one REST surface; the active
//! [`BackendContext`] only decides the base URL and credentials.

use gatehouse_core::error::AppError;
use gatehouse_core::retry::{retry_call, RetryConfig};
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::cancellation::AutoCancelRegistry;
use super::interceptor::RequestInterceptor;
use super::switcher::ContextSwitcher;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::context::BackendContext;
use crate::models::ListResult;
use crate::utils::Filter;

/// Page size used when walking a whole collection.
pub const FULL_LIST_PAGE_SIZE: u32 = 500;

/// Query options for reads.
///
/// `get_one` only looks at `expand`, `fields` and the cancellation
/// settings.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub sort: Option<String>,
    pub filter: Option<String>,
    pub expand: Option<String>,
    pub fields: Option<String>,
    /// Overrides the default `"{METHOD} {path}"` key.
    pub request_key: Option<String>,
    pub auto_cancel: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            sort: None,
            filter: None,
            expand: None,
            fields: None,
            request_key: None,
            auto_cancel: true,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn maybe_filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter.map(String::from);
        self
    }

    pub fn expand(mut self, expand: impl Into<String>) -> Self {
        self.expand = Some(expand.into());
        self
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = Some(key.into());
        self
    }

    /// Never cancel this request, and never let a newer one cancel it.
    pub fn no_auto_cancel(mut self) -> Self {
        self.request_key = None;
        self.auto_cancel = false;
        self
    }

    fn cancellation_key(&self, method: &Method, path: &str) -> Option<String> {
        match (&self.request_key, self.auto_cancel) {
            (Some(key), _) => Some(key.clone()),
            (None, true) => Some(format!("{} {}", method, path)),
            (None, false) => None,
        }
    }

    fn query(&self, page: Option<(u32, u32)>) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some((page, per_page)) = page {
            query.push(("page", page.to_string()));
            query.push(("perPage", per_page.to_string()));
        }
        let optional = [
            ("sort", &self.sort),
            ("filter", &self.filter),
            ("expand", &self.expand),
            ("fields", &self.fields),
        ];
        for (name, value) in optional {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                query.push((name, value.clone()));
            }
        }
        query
    }
}

/// `{base}/{segments...}?{query}` with every segment percent-encoded.
pub(crate) fn build_url(
    base_url: &str,
    segments: &[&str],
    query: &[(&str, String)],
) -> Result<String, AppError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::invalid_input(format!("Invalid backend URL '{}': {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| AppError::invalid_input(format!("Backend URL '{}' cannot take a path", base_url)))?
        .pop_if_empty()
        .extend(segments);

    if !query.is_empty() {
        let encoded = serde_urlencoded::to_string(query)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode query: {}", e)))?;
        url.set_query(Some(&encoded));
    }

    Ok(url.to_string())
}

/// Sends requests on behalf of every collection.
pub struct CollectionClient {
    switcher: Arc<ContextSwitcher>,
    transport: Arc<dyn Transport>,
    interceptor: RequestInterceptor,
    cancellations: Arc<AutoCancelRegistry>,
    list_all_retry: RetryConfig,
}

impl CollectionClient {
    pub fn new(
        switcher: Arc<ContextSwitcher>,
        transport: Arc<dyn Transport>,
        interceptor: RequestInterceptor,
        list_all_retry: RetryConfig,
    ) -> Self {
        Self {
            switcher,
            transport,
            interceptor,
            cancellations: Arc::new(AutoCancelRegistry::new()),
            list_all_retry,
        }
    }

    pub fn collection<T>(self: &Arc<Self>, name: &str) -> RecordService<T> {
        RecordService {
            client: Arc::clone(self),
            name: name.to_string(),
            _record: PhantomData,
        }
    }

    pub fn switcher(&self) -> &Arc<ContextSwitcher> {
        &self.switcher
    }

    pub fn cancellations(&self) -> &Arc<AutoCancelRegistry> {
        &self.cancellations
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send one request against the context active right now.
    ///
    /// The snapshot taken here supplies both URL and credentials, so a
    /// switch while the request is in flight cannot mix two contexts.
    pub async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
        cancel_key: Option<String>,
    ) -> Result<HttpResponse, AppError> {
        let ctx = self.switcher.snapshot();
        let url = build_url(&ctx.base_url, segments, query)?;

        let mut headers = HeaderMap::new();
        self.interceptor.apply(&ctx, &mut headers);

        let request = HttpRequest {
            method: method.clone(),
            url: url.clone(),
            headers,
            body,
        };

        tracing::debug!(
            method = %method,
            url = %url,
            mode = ?ctx.mode,
            request_key = cancel_key.as_deref().unwrap_or("-"),
            "Sending backend request"
        );

        let response = match cancel_key {
            Some(key) => {
                self.cancellations
                    .run(&key, self.transport.execute(request))
                    .await?
            }
            None => self.transport.execute(request).await?,
        };

        if response.is_success() {
            return Ok(response);
        }

        let err = response.into_error();
        if err.kind() == gatehouse_core::ErrorKind::Unauthorized {
            self.on_unauthorized(&ctx).await;
        }
        Err(err)
    }

    async fn on_unauthorized(&self, ctx: &Arc<BackendContext>) {
        // A newer session may already have replaced the rejected one
        self.switcher.handle_unauthorized_from(ctx).await;
    }
}

/// Typed CRUD over one collection.
pub struct RecordService<T> {
    client: Arc<CollectionClient>,
    name: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordService<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            name: self.name.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> RecordService<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn list(&self, page: u32, per_page: u32, opts: &QueryOptions) -> Result<ListResult<T>, AppError> {
        let segments = self.records();
        let key = opts.cancellation_key(&Method::GET, &self.path(&segments));
        self.client
            .send(Method::GET, &segments, &opts.query(Some((page, per_page))), None, key)
            .await?
            .into_result()
    }

    /// Every record matching `opts`, walking pages of 500.
    ///
    /// An auto-cancelled attempt is retried once, after the configured
    /// delay and under a fresh request key. A second failure propagates.
    pub async fn list_all(&self, opts: &QueryOptions) -> Result<Vec<T>, AppError> {
        retry_call(&self.client.list_all_retry, "list_all", |attempt| {
            let mut opts = opts.clone();
            if attempt > 0 {
                opts.request_key = Some(Uuid::new_v4().to_string());
            }
            async move { self.fetch_all(&opts).await }
        })
        .await
    }

    async fn fetch_all(&self, opts: &QueryOptions) -> Result<Vec<T>, AppError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let result = self.list(page, FULL_LIST_PAGE_SIZE, opts).await?;
            let last = result.is_last_page() || result.items.is_empty();
            items.extend(result.items);
            if last {
                return Ok(items);
            }
            page += 1;
        }
    }

    pub async fn get_one(&self, id: &str, opts: &QueryOptions) -> Result<T, AppError> {
        let segments = self.record(id)?;
        let key = opts.cancellation_key(&Method::GET, &self.path(&segments));
        let query: Vec<_> = opts
            .query(None)
            .into_iter()
            .filter(|(name, _)| matches!(*name, "expand" | "fields"))
            .collect();
        self.client
            .send(Method::GET, &segments, &query, None, key)
            .await?
            .into_result()
    }

    pub async fn create<P: Serialize + ?Sized>(&self, payload: &P) -> Result<T, AppError> {
        let body = to_body(payload)?;
        self.client
            .send(Method::POST, &self.records(), &[], Some(body), None)
            .await?
            .into_result()
    }

    pub async fn update<P: Serialize + ?Sized>(&self, id: &str, payload: &P) -> Result<T, AppError> {
        let body = to_body(payload)?;
        self.client
            .send(Method::PATCH, &self.record(id)?, &[], Some(body), None)
            .await?
            .into_result()
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.client
            .send(Method::DELETE, &self.record(id)?, &[], None, None)
            .await?;
        Ok(())
    }

    fn records(&self) -> Vec<&str> {
        vec!["api", "collections", self.name.as_str(), "records"]
    }

    fn record<'a>(&'a self, id: &'a str) -> Result<Vec<&'a str>, AppError> {
        if id.trim().is_empty() {
            return Err(AppError::invalid_input("Record id is required"));
        }
        let mut segments = self.records();
        segments.push(id);
        Ok(segments)
    }

    fn path(&self, segments: &[&str]) -> String {
        format!("/{}", segments.join("/"))
    }
}

fn to_body<P: Serialize + ?Sized>(payload: &P) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(payload)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to serialize payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_encodes_segments_and_query() {
        let url = build_url(
            "https://vms.example/api/",
            &["api", "collections", "visitor", "records", "a b/c"],
            &[("filter", r#"name = "x""#.to_string())],
        )
        .unwrap();

        assert_eq!(
            url,
            "https://vms.example/api/api/collections/visitor/records/a%20b%2Fc?filter=name+%3D+%22x%22"
        );
    }

    #[test]
    fn test_build_url_on_bare_host() {
        let url = build_url("http://127.0.0.1:8090", &["api", "collections", "area", "records"], &[]).unwrap();
        assert_eq!(url, "http://127.0.0.1:8090/api/collections/area/records");
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        assert!(build_url("not a url", &["api"], &[]).is_err());
    }

    #[test]
    fn test_query_only_includes_set_options() {
        let opts = QueryOptions::new().sort("-created").filter("");
        assert_eq!(
            opts.query(Some((2, 50))),
            vec![
                ("page", "2".to_string()),
                ("perPage", "50".to_string()),
                ("sort", "-created".to_string())
            ]
        );
    }

    #[test]
    fn test_cancellation_key() {
        let path = "/api/collections/visitor/records";
        assert_eq!(
            QueryOptions::new().cancellation_key(&Method::GET, path).as_deref(),
            Some("GET /api/collections/visitor/records")
        );
        assert_eq!(
            QueryOptions::new()
                .request_key("mine")
                .cancellation_key(&Method::GET, path)
                .as_deref(),
            Some("mine")
        );
        assert_eq!(QueryOptions::new().no_auto_cancel().cancellation_key(&Method::GET, path), None);
    }
}
