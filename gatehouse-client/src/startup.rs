use gatehouse_core::error::AppError;
use reqwest::Url;
use std::sync::Arc;

use crate::config::{Settings, TelemetrySettings};
use crate::repositories::{
    AccessEventRepository, AreaRepository, Dashboard, HouseRepository, InvitationRepository,
    PassageLogRepository, UserRepository, VehicleRepository, VisitorRepository,
};
use crate::services::{
    CollectionClient, ContextSwitcher, FederationClient, ReqwestTransport, RequestInterceptor,
    SessionManager, Transport,
};
use crate::storage::{FileStore, KeyValueStore, SecureStore, SessionStore};

/// Install the global tracing subscriber described by `settings`.
pub fn init_telemetry(settings: &TelemetrySettings) -> anyhow::Result<()> {
    gatehouse_core::observability::init_tracing(
        &settings.service_name,
        &settings.log_level,
        settings.otlp_endpoint.as_deref(),
    )
}

/// The assembled client: one switcher shared by every component.
pub struct Gatehouse {
    switcher: Arc<ContextSwitcher>,
    collections: Arc<CollectionClient>,
    federation: FederationClient,
    session: SessionManager,
    dashboard: Dashboard,
    pub areas: AreaRepository,
    pub houses: HouseRepository,
    pub users: UserRepository,
    pub visitors: VisitorRepository,
    pub invitations: InvitationRepository,
    pub vehicles: VehicleRepository,
    pub passages: PassageLogRepository,
    pub access_events: AccessEventRepository,
}

impl Gatehouse {
    /// File-backed session storage and a `reqwest` transport.
    pub async fn build(settings: &Settings) -> Result<Self, AppError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(settings.storage.path.clone()));
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(settings.backend.request_timeout())?);
        Self::build_with(settings, store, transport).await
    }

    /// Restores any persisted session before returning.
    pub async fn build_with(
        settings: &Settings,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, AppError> {
        Url::parse(&settings.backend.default_url).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "backend.default_url '{}' is not a URL: {}",
                settings.backend.default_url,
                e
            ))
        })?;

        let secure = SecureStore::new(store, settings.storage.encryption_key.as_ref());
        if !secure.is_encrypted() {
            tracing::warn!("No storage encryption key configured, session is stored in plain JSON");
        }
        let sessions = Arc::new(SessionStore::new(secure));
        let switcher = Arc::new(ContextSwitcher::restore(&settings.backend.default_url, sessions).await);

        let collections = Arc::new(CollectionClient::new(
            Arc::clone(&switcher),
            Arc::clone(&transport),
            RequestInterceptor::new(settings.external.auth_header_style),
            settings.retry.autocancel_policy(),
        ));

        let users_collection = settings.backend.users_collection.as_str();

        Ok(Self {
            federation: FederationClient::new(
                Arc::clone(&transport),
                Arc::clone(&switcher),
                settings.federation.clone(),
            ),
            session: SessionManager::new(transport, Arc::clone(&switcher), users_collection),
            dashboard: Dashboard::new(&collections, users_collection),
            areas: AreaRepository::new(&collections),
            houses: HouseRepository::new(&collections),
            users: UserRepository::new(&collections, users_collection),
            visitors: VisitorRepository::new(&collections),
            invitations: InvitationRepository::new(&collections),
            vehicles: VehicleRepository::new(&collections),
            passages: PassageLogRepository::new(&collections),
            access_events: AccessEventRepository::new(&collections),
            collections,
            switcher,
        })
    }

    pub fn switcher(&self) -> &Arc<ContextSwitcher> {
        &self.switcher
    }

    /// Untyped access to any collection.
    pub fn collections(&self) -> &Arc<CollectionClient> {
        &self.collections
    }

    pub fn federation(&self) -> &FederationClient {
        &self.federation
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }
}
