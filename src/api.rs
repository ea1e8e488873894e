//! HTTP transport for the ledger service
//!
//! Thin axum layer over [`LedgerService`]: routing, JSON extraction, CORS,
//! request logging and counters. All ledger semantics live in the service.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::service::{LedgerService, ServiceResponse, MSG_INVALID_FIELDS};
use crate::transaction::TransferRequest;

/// Shared state handed to every handler.
pub struct ApiNode {
    pub service: LedgerService,
    api_stats: RwLock<ApiStats>,
}

#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transfers_applied: u64,
    transfers_rejected: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transfers_applied: u64,
    pub transfers_rejected: u64,
    pub uptime_seconds: u64,
}

impl ApiNode {
    pub fn new(service: LedgerService) -> Self {
        ApiNode {
            service,
            api_stats: RwLock::new(ApiStats::new()),
        }
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transfers_applied: stats.transfers_applied,
            transfers_rejected: stats.transfers_rejected,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    InvalidBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::InvalidBody(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        tracing::debug!(detail = %detail, "api.invalid_body");

        (status, Json(ServiceResponse::error(MSG_INVALID_FIELDS))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(node): State<Arc<ApiNode>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    node.api_stats.write().await.record_request(success);

    response
}

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Builds the router with every endpoint (also used by tests).
pub fn build_api_router(node: Arc<ApiNode>) -> Router {
    // Browsers served from another origin call this API directly.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/balance/:address", get(get_balance))
        .route("/verify", post(verify_signature))
        .route("/send", post(send_transaction))
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // last layer is outermost: logging timing covers the counter update
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn run_api_server(node: Arc<ApiNode>, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(addr = %addr, "api.listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn get_balance(State(node): State<Arc<ApiNode>>, Path(address): Path<String>) -> Json<ServiceResponse> {
    Json(node.service.get_balance(&address))
}

async fn verify_signature(
    State(node): State<Arc<ApiNode>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(node.service.verify(&request)))
}

async fn send_transaction(
    State(node): State<Arc<ApiNode>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let Json(request) = payload?;
    let response = node.service.submit(&request);

    {
        let mut stats = node.api_stats.write().await;
        if response.is_success() {
            stats.transfers_applied += 1;
        } else {
            stats.transfers_rejected += 1;
        }
    }

    Ok(Json(response))
}

async fn health_check(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "accounts": node.service.ledger().len(),
        "scheme": node.service.scheme().as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_api_stats(State(node): State<Arc<ApiNode>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}
