use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dirsvc_directory::{DirectoryError, DirectoryStore, Group, User, UserId};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::validation::{
    validate_group_form, validate_member_list, validate_user_form, ValidationError,
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: DirectoryStore,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(store: DirectoryStore) -> Self {
        Self {
            store,
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    users: usize,
    groups: usize,
    memberships: usize,
    req_total: u64,
}

/// Error surfaced to the client as a status code and a plain-text message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        debug!("Request failed with {}: {}", self.status, self.message.trim_end());
        (self.status, self.message).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(format!("{err}\n"))
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UserNotFound { .. } => ApiError::not_found("User not found.\n"),
            DirectoryError::UserAlreadyExists { .. } => {
                ApiError::bad_request("User already exists!\n")
            }
            DirectoryError::GroupNotFound { .. } => ApiError::not_found("Group not found.\n"),
            DirectoryError::GroupAlreadyExists { .. } => ApiError::bad_request(err.to_string()),
        }
    }
}

pub async fn start_server<F>(state: AppState, addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(Arc::new(state));
    let listener = bind_listener(addr).await?;
    info!(
        "Directory API listening on http://{}",
        listener.local_addr().context("failed to read listener address")?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("directory server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/users", post(handle_create_user))
        .route(
            "/users/:userid",
            get(handle_get_user)
                .put(handle_replace_user)
                .delete(handle_delete_user),
        )
        .route("/groups", post(handle_create_group))
        .route(
            "/groups/:name",
            get(handle_get_group)
                .put(handle_replace_group)
                .delete(handle_delete_group),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serialise a bare JSON array with an explicit content type.
fn json_array_response(members: &[UserId]) -> Result<Response, ApiError> {
    let json = serde_json::to_vec(members)
        .map_err(|err| ApiError::internal(format!("failed to serialize members: {err}\n")))?;

    let mut response = Response::new(Body::from(json));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

async fn handle_index(State(state): State<SharedState>) -> &'static str {
    state.record_request();
    "Well, hello there.\n"
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    let stats = state.store.stats();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_seconds(),
        users: stats.users,
        groups: stats.groups,
        memberships: stats.memberships,
        req_total,
    })
}

async fn handle_get_user(
    State(state): State<SharedState>,
    AxumPath(userid): AxumPath<String>,
) -> Result<Json<User>, ApiError> {
    state.record_request();
    Ok(Json(state.store.get_user(&userid)?))
}

async fn handle_create_user(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    state.record_request();
    let form = validate_user_form(&body)?;
    Ok(Json(state.store.create_user(form)?))
}

async fn handle_replace_user(
    State(state): State<SharedState>,
    AxumPath(userid): AxumPath<String>,
    body: Bytes,
) -> Result<Json<User>, ApiError> {
    state.record_request();
    let form = validate_user_form(&body)?;
    Ok(Json(state.store.replace_user(&userid, form)?))
}

async fn handle_delete_user(
    State(state): State<SharedState>,
    AxumPath(userid): AxumPath<String>,
) -> Result<String, ApiError> {
    state.record_request();
    state.store.delete_user(&userid)?;
    Ok(format!("User {userid} has been deleted\n"))
}

async fn handle_get_group(
    State(state): State<SharedState>,
    AxumPath(name): AxumPath<String>,
) -> Result<Response, ApiError> {
    state.record_request();
    let members = state.store.get_group(&name)?;
    json_array_response(&members)
}

async fn handle_create_group(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<Group>, ApiError> {
    state.record_request();
    let name = validate_group_form(&body)?;
    Ok(Json(state.store.create_group(&name)?))
}

async fn handle_replace_group(
    State(state): State<SharedState>,
    AxumPath(name): AxumPath<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    state.record_request();
    let members = validate_member_list(&body)?;

    // Unknown group is a 400 on this route.
    let members = state
        .store
        .replace_group_members(&name, members)
        .map_err(|err| match err {
            DirectoryError::GroupNotFound { .. } => ApiError::bad_request("Group not found.\n"),
            other => ApiError::from(other),
        })?;
    json_array_response(&members)
}

async fn handle_delete_group(
    State(state): State<SharedState>,
    AxumPath(name): AxumPath<String>,
) -> Result<String, ApiError> {
    state.record_request();
    state.store.delete_group(&name)?;
    Ok(format!("Group {name} has been deleted\n"))
}
