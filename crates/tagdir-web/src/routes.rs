//! Web routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use tagdir_directory::{Caller, DirectoryService, ListQuery, TagListing, TagMutations};
use tagdir_store::{NewTag, TagId, TagPatch};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::Authorizer;
use crate::error::WebError;
use crate::response::success;

/// Shared state for the web server.
pub struct AppState {
    pub directory: Arc<DirectoryService>,
    pub mutations: Arc<TagMutations>,
    pub auth: Arc<dyn Authorizer>,
}

impl AppState {
    fn caller(&self, headers: &HeaderMap) -> Caller {
        if self.auth.is_authorized(headers) {
            Caller::Authorized
        } else {
            Caller::Public
        }
    }

    fn require_authorized(&self, headers: &HeaderMap) -> Result<(), WebError> {
        match self.caller(headers) {
            Caller::Authorized => Ok(()),
            Caller::Public => Err(WebError::Unauthorized),
        }
    }
}

/// Create the web router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/api/tags",
            get(list_tags).post(create_tag).delete(delete_tags),
        )
        .route("/api/tags/{id}", put(update_tag).delete(delete_tag))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Body of a bulk delete.
#[derive(Deserialize)]
struct BulkDelete {
    #[serde(default)]
    tags: Vec<TagId>,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn list_tags(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, WebError> {
    let caller = state.caller(&headers);
    // Public callers always get the canonical listing, whatever they asked for.
    let query = match caller {
        Caller::Authorized => query?.0,
        Caller::Public => ListQuery::default(),
    };
    let page = state.directory.list(caller, &query).await?;
    Ok(success("tag list fetched", TagListing::from(page.as_ref())))
}

async fn create_tag(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    tag: Result<Json<NewTag>, JsonRejection>,
) -> Result<Response, WebError> {
    state.require_authorized(&headers)?;
    let Json(tag) = tag?;
    let tag = state.mutations.create(tag).await?;
    Ok(success("tag created", tag))
}

async fn update_tag(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<TagId>, PathRejection>,
    patch: Result<Json<TagPatch>, JsonRejection>,
) -> Result<Response, WebError> {
    state.require_authorized(&headers)?;
    let Path(id) = id?;
    let Json(patch) = patch?;
    let tag = state.mutations.update(id, patch).await?;
    Ok(success("tag updated", tag))
}

async fn delete_tag(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    id: Result<Path<TagId>, PathRejection>,
) -> Result<Response, WebError> {
    state.require_authorized(&headers)?;
    let Path(id) = id?;
    let deleted = state.mutations.delete(id).await?;
    Ok(success("tag deleted", json!({ "deleted": deleted })))
}

async fn delete_tags(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<BulkDelete>, JsonRejection>,
) -> Result<Response, WebError> {
    state.require_authorized(&headers)?;
    let Json(body) = body?;
    let deleted = state.mutations.delete_many(&body.tags).await?;
    Ok(success("tags deleted", json!({ "deleted": deleted })))
}
