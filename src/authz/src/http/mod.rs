//! HTTP boundary for the authorization engine
//!
//! Exposes decisions over REST and maps denials to status codes: 401 when
//! the principal is unauthenticated, 403 otherwise. Response bodies are
//! generic and never name the failing check.
//!
//! ## Endpoints
//!
//! - `POST /v1/authorize` - Authorize an action
//! - `POST /v1/scope` - Resolve the row filter for a listing
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics (served on the metrics router)

pub mod metrics;

pub use metrics::{BoundaryMetrics, MetricsCollector};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use crate::engine::{Authorizer, Decision, DenyReason};
use crate::scope::RowFilter;
use crate::types::{Action, Owned, Principal, ResourceType, TargetRef};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub metrics: Arc<MetricsCollector>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(authorizer: Authorizer) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
            metrics: Arc::new(MetricsCollector::new()),
            start_time: Instant::now(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Rejection returned by handlers when a decision is a deny
///
/// Carries only the status; the deny reason stays in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthzRejection {
    status: StatusCode,
}

impl AuthzRejection {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DenyReason> for AuthzRejection {
    fn from(reason: DenyReason) -> Self {
        let status =
            StatusCode::from_u16(reason.status_code()).unwrap_or(StatusCode::FORBIDDEN);
        Self { status }
    }
}

impl IntoResponse for AuthzRejection {
    fn into_response(self) -> Response {
        let error = if self.status == StatusCode::UNAUTHORIZED {
            "unauthenticated"
        } else {
            "forbidden"
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: "not authorized".to_string(),
        });

        (self.status, body).into_response()
    }
}

impl Decision {
    /// Turn the decision into a handler result
    ///
    /// ```
    /// use fitcoach_authz::{Authorizer, Principal, ResourceType};
    /// use fitcoach_authz::types::actions;
    ///
    /// let authorizer = Authorizer::standard().unwrap();
    /// let rejection = authorizer
    ///     .authorize(&Principal::anonymous(), ResourceType::Activity, actions::CREATE, None)
    ///     .into_response_result()
    ///     .unwrap_err();
    /// assert_eq!(rejection.status().as_u16(), 401);
    /// ```
    pub fn into_response_result(self) -> std::result::Result<RowFilter, AuthzRejection> {
        self.into_result().map_err(AuthzRejection::from)
    }
}

/// `POST /v1/authorize` body
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    /// Absent for requests without a credential
    #[serde(default)]
    pub principal: Option<Principal>,
    pub resource: ResourceType,
    pub action: Action,
    #[serde(default)]
    pub target: Option<TargetRef>,
}

/// `POST /v1/authorize` success body
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub allowed: bool,
    pub row_filter: RowFilter,
}

/// `POST /v1/scope` body
#[derive(Debug, Deserialize)]
pub struct ScopeRequest {
    pub principal: Principal,
    pub resource: ResourceType,
}

/// `POST /v1/scope` response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ScopeResponse {
    pub resource: ResourceType,
    pub scoped: bool,
    pub row_filter: RowFilter,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub declared_rules: usize,
}

/// Metrics response (Prometheus format)
struct MetricsResponse {
    metrics: String,
}

impl IntoResponse for MetricsResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            self.metrics,
        )
            .into_response()
    }
}

/// POST /v1/authorize - Authorize an action
async fn authorize(
    State(state): State<AppState>,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, AuthzRejection> {
    let start = Instant::now();
    let principal = req.principal.unwrap_or_else(Principal::anonymous);
    let decision = {
        let target = req.target.as_ref().map(|t| t as &dyn Owned);
        state
            .authorizer
            .authorize_action(&principal, req.resource, &req.action, target)
    };

    state.metrics.record_decision(&decision).await;
    state.metrics.record_latency(start.elapsed()).await;

    match decision {
        Decision::Allow { row_filter } => {
            info!(
                "ALLOW {}.{} for principal={} ({})",
                req.resource, req.action, principal.id, row_filter
            );
            Ok(Json(AuthorizeResponse {
                allowed: true,
                row_filter,
            }))
        }
        Decision::Deny { reason } => {
            warn!(
                "DENY {}.{} for principal={}: {}",
                req.resource, req.action, principal.id, reason
            );
            Err(reason.into())
        }
    }
}

/// POST /v1/scope - Resolve the row filter for a listing
async fn resolve_scope(
    State(state): State<AppState>,
    Json(req): Json<ScopeRequest>,
) -> Json<ScopeResponse> {
    let row_filter = state.authorizer.resolve_scope(&req.principal, req.resource);

    Json(ScopeResponse {
        resource: req.resource,
        scoped: state.authorizer.scopes().is_scoped(req.resource),
        row_filter,
    })
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: crate::VERSION.to_string(),
        declared_rules: state.authorizer.policy().len(),
    })
}

/// GET /metrics - Prometheus metrics endpoint
async fn export_metrics(State(state): State<AppState>) -> MetricsResponse {
    let uptime = state.start_time.elapsed().as_secs();
    MetricsResponse {
        metrics: state.metrics.export_prometheus(uptime).await,
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/authorize", post(authorize))
        .route("/v1/scope", post(resolve_scope))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(trace)
                .layer(cors)
        )
        .with_state(state)
}

/// Create the metrics router
pub fn create_metrics_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(export_metrics))
        .with_state(state)
}
