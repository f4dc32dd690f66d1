//! Purpose: Provide the HTTP/JSON server hosting a taskdeck store.
//! Exports: `ServeConfig`, `serve`, `router`, `validate_config`.
//! Role: Axum-based loopback server mapping REST routes onto `Store` operations.
//! Invariants: JSON envelopes use the collection name as the key; error kinds remain stable.
//! Invariants: Loopback-only unless explicitly allowed.
//! Invariants: Handlers never await while holding the store lock.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Path as AxumPath, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::future::IntoFuture;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use taskdeck::api::{
    Error, ErrorKind, Label, LabelPatch, ListRequest, NewLabel, NewProject, NewTask, Page,
    Project, ProjectPatch, Store, StoreOptions, Task, TaskPatch, UpdateMask,
};
use taskdeck::core::collection::Resource;

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub store: StoreOptions,
    pub allow_non_loopback: bool,
    pub cors_allowed_origins: Vec<String>,
    pub enable_reset: bool,
    pub max_body_bytes: u64,
}

struct AppState {
    store: Store,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let store = Store::new(config.store)?;
    let app = router(store, &config)?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    tracing::info!(bind = %config.bind, reset = config.enable_reset, "taskdeck listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("server failed")
                    .with_source(err)
            })?;
        }
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(Duration::from_secs(10), &mut server).await {
                Ok(result) => result.map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("server failed")
                        .with_source(err)
                })?,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Io).with_message("server shutdown timed out"));
                }
            }
        }
    };
    tracing::info!("taskdeck stopped");
    Ok(())
}

pub fn router(store: Store, config: &ServeConfig) -> Result<Router, Error> {
    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;
    let cors = cors_layer(&config.cors_allowed_origins)?;

    let mut app = Router::new().route("/healthz", get(healthz));
    app = collection_routes::<Task>(app);
    app = collection_routes::<Project>(app);
    app = collection_routes::<Label>(app);
    app = app
        .route("/v1/tasks/:id/complete", post(complete_task))
        .route("/v1/tasks/:id/uncomplete", post(uncomplete_task))
        .route("/v1/projects/:id/archive", post(archive_project))
        .route("/v1/projects/:id/unarchive", post(unarchive_project));
    if config.enable_reset {
        app = app.route("/v1/admin/reset", post(reset_store));
    }
    let mut app = app
        .fallback(unknown_route)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(AppState { store }));
    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    Ok(app)
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

pub fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 1048576."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    cors_layer(&config.cors_allowed_origins)?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>, Error> {
    if origins.is_empty() {
        return Ok(None);
    }
    let mut values = Vec::with_capacity(origins.len());
    for origin in origins {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --cors-origin {origin:?}"))
                .with_hint("Use a full origin like http://localhost:5173."));
        }
        let value = HeaderValue::from_str(origin).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid --cors-origin {origin:?}"))
                .with_source(err)
        })?;
        values.push(value);
    }
    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(values))
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        signal.recv().await;
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

/// Binds one collection's request types to its `Store` operations so the
/// route handlers can be written once.
trait Endpoint: Resource + Serialize + Send + 'static {
    type New: DeserializeOwned + Send + 'static;
    type Patch: DeserializeOwned + Send + 'static;

    fn create(store: &Store, new: Self::New) -> Result<Self, Error>;
    fn get(store: &Store, name: &str) -> Result<Self, Error>;
    fn update(
        store: &Store,
        name: String,
        patch: Self::Patch,
        mask: &UpdateMask,
    ) -> Result<Self, Error>;
    fn delete(store: &Store, name: &str) -> Result<(), Error>;
    fn list(store: &Store, request: &ListRequest) -> Result<Page<Self>, Error>;
}

impl Endpoint for Task {
    type New = NewTask;
    type Patch = TaskPatch;

    fn create(store: &Store, new: NewTask) -> Result<Self, Error> {
        store.create_task(new)
    }

    fn get(store: &Store, name: &str) -> Result<Self, Error> {
        store.get_task(name)
    }

    fn update(
        store: &Store,
        name: String,
        patch: TaskPatch,
        mask: &UpdateMask,
    ) -> Result<Self, Error> {
        store.update_task(TaskPatch { name, ..patch }, mask)
    }

    fn delete(store: &Store, name: &str) -> Result<(), Error> {
        store.delete_task(name)
    }

    fn list(store: &Store, request: &ListRequest) -> Result<Page<Self>, Error> {
        store.list_tasks(request)
    }
}

impl Endpoint for Project {
    type New = NewProject;
    type Patch = ProjectPatch;

    fn create(store: &Store, new: NewProject) -> Result<Self, Error> {
        store.create_project(new)
    }

    fn get(store: &Store, name: &str) -> Result<Self, Error> {
        store.get_project(name)
    }

    fn update(
        store: &Store,
        name: String,
        patch: ProjectPatch,
        mask: &UpdateMask,
    ) -> Result<Self, Error> {
        store.update_project(ProjectPatch { name, ..patch }, mask)
    }

    fn delete(store: &Store, name: &str) -> Result<(), Error> {
        store.delete_project(name)
    }

    fn list(store: &Store, request: &ListRequest) -> Result<Page<Self>, Error> {
        store.list_projects(request)
    }
}

impl Endpoint for Label {
    type New = NewLabel;
    type Patch = LabelPatch;

    fn create(store: &Store, new: NewLabel) -> Result<Self, Error> {
        store.create_label(new)
    }

    fn get(store: &Store, name: &str) -> Result<Self, Error> {
        store.get_label(name)
    }

    fn update(
        store: &Store,
        name: String,
        patch: LabelPatch,
        mask: &UpdateMask,
    ) -> Result<Self, Error> {
        store.update_label(LabelPatch { name, ..patch }, mask)
    }

    fn delete(store: &Store, name: &str) -> Result<(), Error> {
        store.delete_label(name)
    }

    fn list(store: &Store, request: &ListRequest) -> Result<Page<Self>, Error> {
        store.list_labels(request)
    }
}

fn collection_routes<R: Endpoint>(app: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    let base = format!("/v1/{}", R::COLLECTION);
    let item = format!("{base}/:id");
    app.route(&base, post(create_record::<R>).get(list_records::<R>))
        .route(
            &item,
            get(get_record::<R>)
                .patch(update_record::<R>)
                .delete(delete_record::<R>),
        )
}

#[derive(Debug, Deserialize)]
struct UpdateBody<P> {
    #[serde(flatten)]
    patch: P,
    #[serde(default)]
    update_mask: UpdateMask,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

async fn healthz() -> Response {
    json_response(json!({ "ok": true }))
}

async fn unknown_route() -> Response {
    error_response(Error::new(ErrorKind::NotFound).with_message("no such route"))
}

async fn create_record<R: Endpoint>(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<R::New>, JsonRejection>,
) -> Response {
    let new = match payload {
        Ok(Json(new)) => new,
        Err(rejection) => return error_response(rejected_body(rejection.body_text())),
    };
    match R::create(&state.store, new) {
        Ok(record) => record_response(&record),
        Err(err) => error_response(err),
    }
}

async fn get_record<R: Endpoint>(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let name = format!("{}/{id}", R::COLLECTION);
    match R::get(&state.store, &name) {
        Ok(record) => record_response(&record),
        Err(err) => error_response(err),
    }
}

async fn update_record<R: Endpoint>(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<UpdateBody<R::Patch>>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return error_response(rejected_body(rejection.body_text())),
    };
    let name = format!("{}/{id}", R::COLLECTION);
    match R::update(&state.store, name, body.patch, &body.update_mask) {
        Ok(record) => record_response(&record),
        Err(err) => error_response(err),
    }
}

async fn delete_record<R: Endpoint>(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    let name = format!("{}/{id}", R::COLLECTION);
    match R::delete(&state.store, &name) {
        Ok(()) => json_response(json!({ "ok": true })),
        Err(err) => error_response(err),
    }
}

async fn list_records<R: Endpoint>(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListRequest>, QueryRejection>,
) -> Response {
    let request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => return error_response(rejected_body(rejection.body_text())),
    };
    let page = match R::list(&state.store, &request) {
        Ok(page) => page,
        Err(err) => return error_response(err),
    };
    let items = match serde_json::to_value(&page.items) {
        Ok(items) => items,
        Err(err) => return error_response(encode_error(err)),
    };
    let mut body = Map::new();
    body.insert(R::COLLECTION.to_string(), items);
    body.insert("next_page_token".to_string(), json!(page.next_page_token));
    json_response(Value::Object(body))
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    change_state::<Task>(&state.store, &id, Store::complete_task)
}

async fn uncomplete_task(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    change_state::<Task>(&state.store, &id, Store::uncomplete_task)
}

async fn archive_project(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    change_state::<Project>(&state.store, &id, Store::archive_project)
}

async fn unarchive_project(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Response {
    change_state::<Project>(&state.store, &id, Store::unarchive_project)
}

fn change_state<R: Endpoint>(
    store: &Store,
    id: &str,
    change: impl FnOnce(&Store, &str) -> Result<R, Error>,
) -> Response {
    let name = format!("{}/{id}", R::COLLECTION);
    match change(store, &name) {
        Ok(record) => record_response(&record),
        Err(err) => error_response(err),
    }
}

async fn reset_store(State(state): State<Arc<AppState>>) -> Response {
    state.store.reset();
    json_response(json!({ "ok": true }))
}

fn record_response<R: Endpoint>(record: &R) -> Response {
    match serde_json::to_value(record) {
        Ok(value) => {
            let mut body = Map::new();
            body.insert(R::SINGULAR.to_string(), value);
            json_response(Value::Object(body))
        }
        Err(err) => error_response(encode_error(err)),
    }
}

fn rejected_body(detail: String) -> Error {
    Error::new(ErrorKind::InvalidArgument).with_message(detail)
}

fn encode_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to encode response")
        .with_source(err)
}

fn json_response(payload: Value) -> Response {
    let mut response = Json(payload).into_response();
    response
        .headers_mut()
        .insert("taskdeck-version", HeaderValue::from_static("1"));
    response
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::InvalidArgument | ErrorKind::Usage => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Internal | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::warn!(error = %err, "request failed");
    }
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            name: err.name().map(str::to_string),
        },
    };
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert("taskdeck-version", HeaderValue::from_static("1"));
    response
}
