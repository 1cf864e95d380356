// REST API endpoints for the job board

use axum::{
    Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::auth::{AuthContext, AuthState, IssueRequest, Owner, require_auth};
use crate::db::{
    ApplicationDocument, DeleteResult, InsertResult, JobBoardStore, JobDocument,
    JobWithApplicationCount, UpdateResult,
};

pub const BANNER: &str = "Career Code Server is Running!";

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: JobBoardStore,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(store: JobBoardStore, auth: AuthState) -> Self {
        Self { store, auth }
    }
}

/// Full API: public routes, routes behind credential verification, and the
/// trace and CORS layers around both.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(create_public_router())
        .merge(create_protected_router(state.auth.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn create_public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/jwt", post(issue_token))
        .route("/logout", post(logout))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/applications/job/{job_id}", get(list_applications_for_job))
}

fn create_protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/applications", get(list_my_jobs_with_counts))
        .route(
            "/applications",
            get(list_my_applications).post(create_application),
        )
        .route(
            "/applications/{id}",
            delete(delete_application).patch(update_application),
        )
        .route_layer(middleware::from_fn_with_state(auth, require_auth))
}

async fn banner() -> &'static str {
    BANNER
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn issue_token(
    State(state): State<AppState>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<impl IntoResponse, StatusCode> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected issuance request: {}", e.body_text());
        StatusCode::BAD_REQUEST
    })?;

    let token = state.auth.codec().issue(&request).map_err(|e| {
        error!("Failed to issue credential: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut headers = HeaderMap::new();
    state
        .auth
        .cookies()
        .attach(&mut headers, &token)
        .map_err(|e| {
            error!("Failed to build credential cookie: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    info!(
        identity = %request.identity,
        kid = %state.auth.codec().key_id(),
        "Issued credential"
    );
    Ok((headers, Json(json!({ "success": true }))))
}

async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let mut headers = HeaderMap::new();
    state.auth.cookies().clear(&mut headers).map_err(|e| {
        error!("Failed to build clearing cookie: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok((headers, Json(json!({ "success": true }))))
}

#[derive(Debug, Deserialize)]
struct JobsQuery {
    email: Option<String>,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<JobDocument>>, StatusCode> {
    let jobs = state
        .store
        .list_jobs(query.email.as_deref())
        .await
        .map_err(internal_error)?;
    Ok(Json(jobs))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDocument>, StatusCode> {
    match state.store.get_job(&id).await.map_err(internal_error)? {
        Some(job) => Ok(Json(job)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

async fn list_my_jobs_with_counts(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<JobWithApplicationCount>>, StatusCode> {
    let jobs = state
        .store
        .list_jobs_with_application_counts(owner.identity().as_str())
        .await
        .map_err(internal_error)?;
    Ok(Json(jobs))
}

async fn create_job(
    State(state): State<AppState>,
    ctx: AuthContext,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InsertResult>, StatusCode> {
    let body = object_body(payload)?;
    let inserted = state.store.create_job(body).await.map_err(|e| {
        warn!(identity = %ctx.identity(), "Failed to create job: {:#}", e);
        StatusCode::BAD_REQUEST
    })?;
    info!(identity = %ctx.identity(), job_id = %inserted.inserted_id, "Job posted");
    Ok(Json(inserted))
}

async fn list_applications_for_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<ApplicationDocument>>, StatusCode> {
    let applications = state
        .store
        .list_applications_for_job(&job_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(applications))
}

async fn list_my_applications(
    State(state): State<AppState>,
    owner: Owner,
) -> Result<Json<Vec<ApplicationDocument>>, StatusCode> {
    let applications = state
        .store
        .list_applications_by_applicant(owner.identity().as_str())
        .await
        .map_err(internal_error)?;
    Ok(Json(applications))
}

async fn create_application(
    State(state): State<AppState>,
    ctx: AuthContext,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InsertResult>, StatusCode> {
    let body = object_body(payload)?;
    let inserted = state.store.create_application(body).await.map_err(|e| {
        warn!(identity = %ctx.identity(), "Failed to create application: {:#}", e);
        StatusCode::BAD_REQUEST
    })?;
    Ok(Json(inserted))
}

async fn delete_application(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, StatusCode> {
    let deleted = state
        .store
        .delete_application(&id)
        .await
        .map_err(internal_error)?;
    info!(
        identity = %ctx.identity(),
        application_id = %id,
        deleted = deleted.deleted_count,
        "Delete application"
    );
    Ok(Json(deleted))
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<UpdateResult>, StatusCode> {
    let Json(update) = payload.map_err(|e| {
        warn!("Rejected status update: {}", e.body_text());
        StatusCode::BAD_REQUEST
    })?;

    let updated = state
        .store
        .update_application_status(&id, &update.status)
        .await
        .map_err(internal_error)?;
    Ok(Json(updated))
}

fn object_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, StatusCode> {
    match payload {
        Ok(Json(Value::Object(body))) => Ok(body),
        Ok(_) => {
            warn!("Rejected request body: expected a JSON object");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(e) => {
            warn!("Rejected request body: {}", e.body_text());
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    error!("Store error: {:#}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}
