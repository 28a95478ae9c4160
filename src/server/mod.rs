//! Folio HTTP gateway
//!
//! Thin handlers over the asset API, the bundled catalog and the
//! registration service. Every collaborator is built once by the caller and
//! injected through [`AppState`].

pub mod assets;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod registrar;
pub mod registration;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{LicenseSummary, StorySummary};
use crate::error::FolioError;

pub use assets::{AssetSource, StoryApiClient};
pub use cache::{SharedCache, TtlCache};
pub use catalog::Catalog;
pub use config::{Config, LogFormat, Network, WalletKey};
pub use registrar::{DryRunRegistrar, IpRegistrar, RelayRegistrar};
pub use registration::RegistrationService;

/// How often the caches are swept
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` when no asset API key is configured
    pub assets: Option<Arc<dyn AssetSource>>,
    pub catalog: Arc<Catalog>,
    pub registration: Arc<RegistrationService>,
    pub story_cache: SharedCache<StorySummary>,
    pub license_cache: SharedCache<LicenseSummary>,
}

impl AppState {
    pub fn new(
        assets: Option<Arc<dyn AssetSource>>,
        catalog: Catalog,
        registration: RegistrationService,
        story_ttl: Duration,
        license_ttl: Duration,
    ) -> Self {
        Self {
            assets,
            catalog: Arc::new(catalog),
            registration: Arc::new(registration),
            story_cache: cache::shared(story_ttl),
            license_cache: cache::shared(license_ttl),
        }
    }

    pub fn assets(&self) -> Result<&Arc<dyn AssetSource>, FolioError> {
        self.assets.as_ref().ok_or(FolioError::MissingConfig("STORY_API_KEY"))
    }

    pub fn story_ttl_secs(&self) -> u64 {
        self.story_cache.lock().unwrap_or_else(|e| e.into_inner()).ttl().as_secs()
    }

    pub fn license_ttl_secs(&self) -> u64 {
        self.license_cache.lock().unwrap_or_else(|e| e.into_inner()).ttl().as_secs()
    }
}

/// Create the gateway router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/stories/:ip_id", get(routes::get_story))
        .route("/api/stories/:ip_id/licenses", get(routes::get_story_licenses))
        .route("/api/licenses/:ip_id", get(routes::get_licenses))
        .route("/api/register-story", post(routes::register_story))
        .route("/api/register-derivative", post(routes::register_derivative))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn run(listen: SocketAddr, state: AppState) -> Result<(), FolioError> {
    let story_sweeper = cache::spawn_cleanup_task(state.story_cache.clone(), "stories", CACHE_SWEEP_INTERVAL);
    let license_sweeper = cache::spawn_cleanup_task(state.license_cache.clone(), "licenses", CACHE_SWEEP_INTERVAL);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listen, "Folio gateway listening");

    let result = axum::serve(listener, router(state)).await;

    story_sweeper.abort();
    license_sweeper.abort();
    result.map_err(FolioError::from)
}
