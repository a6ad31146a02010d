use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use service::taxonomy::domain::{Category, CategoryBulkSync, Cluster, ClusterReplace, NewCluster};
use service::taxonomy::query::{Labeled, TaxonomyTree};

use crate::errors::{ApiJson, JsonApiError};
use crate::observability::record_mutation;
use crate::routes::{auth::ServerState, LocaleQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderClusters {
    pub cluster_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCategories {
    pub category_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[utoipa::path(get, path = "/clusters", tag = "clusters", params(LocaleQuery), responses((status = 200, description = "Active tree")))]
pub async fn tree(State(state): State<ServerState>, Query(q): Query<LocaleQuery>) -> Result<Json<TaxonomyTree>, JsonApiError> {
    Ok(Json(state.taxonomy.tree(q.locale.as_deref()).await?))
}

#[utoipa::path(get, path = "/clusters/{id}", tag = "clusters", params(("id" = Uuid, Path, description = "Cluster id"), LocaleQuery), responses((status = 200, description = "Cluster"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Query(q): Query<LocaleQuery>,
) -> Result<Json<Labeled<Cluster>>, JsonApiError> {
    Ok(Json(state.taxonomy.cluster(id, q.locale.as_deref()).await?))
}

#[utoipa::path(
    post, path = "/clusters", tag = "clusters",
    request_body = crate::openapi::NewClusterDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 401, description = "Unauthorized"))
)]
pub async fn create(State(state): State<ServerState>, ApiJson(input): ApiJson<NewCluster>) -> Result<(StatusCode, Json<Cluster>), JsonApiError> {
    let created = record_mutation("create_cluster", state.taxonomy.create_cluster(input).await)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/clusters/{id}", tag = "clusters",
    params(("id" = Uuid, Path, description = "Cluster id")),
    request_body = crate::openapi::ClusterReplaceDoc,
    responses((status = 200, description = "Replaced"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"))
)]
pub async fn replace(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ClusterReplace>,
) -> Result<Json<Cluster>, JsonApiError> {
    Ok(Json(record_mutation("replace_cluster", state.taxonomy.replace_cluster(id, input).await)?))
}

#[utoipa::path(
    delete, path = "/clusters/{id}", tag = "clusters",
    params(("id" = Uuid, Path, description = "Cluster id")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"), (status = 409, description = "Order Conflict"))
)]
pub async fn delete(State(state): State<ServerState>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    record_mutation("delete_cluster", state.taxonomy.delete_cluster(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reorder the top-level cluster list.
///
/// `/clusters/reorder` is a static path and shadows `/clusters/{id}` for
/// every method: anything but `PUT` answers 405, never a cluster lookup.
#[utoipa::path(
    put, path = "/clusters/reorder", tag = "clusters",
    request_body = crate::openapi::ReorderClustersDoc,
    responses((status = 200, description = "Reordered"), (status = 409, description = "Order Conflict"))
)]
pub async fn reorder(State(state): State<ServerState>, ApiJson(input): ApiJson<ReorderClusters>) -> Result<Json<Vec<Cluster>>, JsonApiError> {
    let out = state.taxonomy.reorder_clusters(&input.cluster_ids, input.expected_version).await;
    Ok(Json(record_mutation("reorder_clusters", out)?))
}

#[utoipa::path(
    put, path = "/clusters/{id}/categories/bulk", tag = "clusters",
    params(("id" = Uuid, Path, description = "Cluster id")),
    request_body = crate::openapi::CategoryBulkSyncDoc,
    responses(
        (status = 200, description = "Active categories after sync"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order Conflict"),
        (status = 422, description = "Scope Mismatch")
    )
)]
pub async fn sync_categories(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<CategoryBulkSync>,
) -> Result<Json<Vec<Category>>, JsonApiError> {
    Ok(Json(record_mutation("sync_categories", state.taxonomy.sync_categories(id, input).await)?))
}

#[utoipa::path(
    put, path = "/clusters/{id}/categories/reorder", tag = "clusters",
    params(("id" = Uuid, Path, description = "Cluster id")),
    request_body = crate::openapi::ReorderCategoriesDoc,
    responses((status = 200, description = "Reordered"), (status = 404, description = "Not Found"), (status = 409, description = "Order Conflict"))
)]
pub async fn reorder_categories(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ReorderCategories>,
) -> Result<Json<Vec<Category>>, JsonApiError> {
    let out = state.taxonomy.reorder_categories(id, &input.category_ids, input.expected_version).await;
    Ok(Json(record_mutation("reorder_categories", out)?))
}
