pub mod auth;
pub mod catalog;
pub mod debounce;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod live_search;
pub mod models;
pub mod openapi;
pub mod sample_data;
pub mod search;
pub mod session;
pub mod settings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use handlers::{
    confirm_verification, create_class, delete_class, field_suggestions, get_class, healthz_live,
    healthz_ready, login, logout, me, resend_verification, root, search_classes, signup,
    suggestions, teacher_classes, update_class, vocabulary,
};
use tokio::sync::RwLock;
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::catalog::{Catalog, Vocabulary};
use crate::identity::{IdentityProvider, InMemoryIdentityProvider};
use crate::live_search::LiveSearch;
use crate::openapi::ApiDoc;
use crate::session::SessionStore;
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub(crate) settings: Settings,
    pub(crate) catalog: Arc<RwLock<Catalog>>,
    pub(crate) sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(settings: Settings, catalog: Catalog, provider: Arc<dyn IdentityProvider>) -> Self {
        let sessions = SessionStore::new(provider).with_ttl(settings.session_ttl());
        Self {
            settings,
            catalog: Arc::new(RwLock::new(catalog)),
            sessions: Arc::new(sessions),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> Arc<RwLock<Catalog>> {
        self.catalog.clone()
    }

    /// A search-as-you-type controller over this state's catalog.
    pub fn live_search(&self) -> LiveSearch {
        LiveSearch::new(self.catalog.clone(), self.settings.search_debounce())
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let catalog = if settings.seed_sample_data {
        Catalog::with_records(Vocabulary::default(), sample_data::sample_classes())
    } else {
        Catalog::new(Vocabulary::default())
    };
    info!(classes = catalog.len(), "catalog loaded");

    let provider = Arc::new(InMemoryIdentityProvider::new(settings.min_password_length));
    let state = AppState::new(settings, catalog, provider);

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Tutor Marketplace API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/classes", get(search_classes).post(create_class))
        .route(
            "/classes/{id}",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/teachers/{teacher_id}/classes", get(teacher_classes))
        .route("/suggestions", get(suggestions))
        .route("/suggestions/{field}", get(field_suggestions))
        .route("/vocabulary", get(vocabulary))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/verification", post(resend_verification))
        .route("/auth/verification/confirm", post(confirm_verification))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(CorsLayer::permissive()).layer(trace_layer)
}
