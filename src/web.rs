//! HTTP surface: shared state, middleware and the listener. Resource routes
//! live in `crate::api`; this module only assembles them.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use miette::IntoDiagnostic;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::codes::CountryCode;
use crate::country::CountryRegistry;
use crate::errors::LincError;
use crate::session::Tenant;
use crate::settings::Settings;
use crate::storage::Tenants;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<CountryRegistry>,
    pub tenants: Tenants,
}

impl AppState {
    pub fn new(settings: Settings, registry: CountryRegistry, tenants: Tenants) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
            tenants,
        }
    }

    /// Resolve a country path segment. Unknown, malformed and
    /// known-but-disabled countries are all `UnknownCountry`.
    pub fn tenant(&self, raw: &str) -> Result<Tenant, LincError> {
        let unknown = || LincError::UnknownCountry(raw.to_string());
        let country = CountryCode::parse(&raw.to_ascii_uppercase()).map_err(|_| unknown())?;
        let config = self.registry.get(&country).ok_or_else(unknown)?;
        let db = self.tenants.get(&country)?.clone();
        Ok(Tenant {
            country,
            config,
            db,
        })
    }
}

async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    // JSON only; nothing should ever be loaded from a response
    headers.insert(
        HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store"),
    );

    response
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct CountrySummary {
    code: String,
    name: &'static str,
    currency: &'static str,
}

async fn list_countries(State(state): State<AppState>) -> Json<Vec<CountrySummary>> {
    let countries = state
        .tenants
        .countries()
        .filter_map(|code| {
            state.registry.get(code).map(|c| CountrySummary {
                code: code.to_string(),
                name: c.name,
                currency: c.currency,
            })
        })
        .collect();
    Json(countries)
}

async fn get_country(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, LincError> {
    let tenant = state.tenant(&code)?;
    Ok(Json(tenant.config.as_ref().clone()))
}

/// The complete application router. Tests drive this directly.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/countries", get(list_countries))
        .route("/api/v1/countries/{code}", get(get_country))
        .merge(crate::api::router())
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> miette::Result<()> {
    let addr: SocketAddr = state
        .settings
        .listen_addr()
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let router = app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "LINC API listening");
    axum::serve(listener, router).await.into_diagnostic()?;
    Ok(())
}
