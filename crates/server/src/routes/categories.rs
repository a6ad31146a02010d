use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use service::taxonomy::domain::{Category, CategoryReplace, NewCategory, NewService, Reassign, Service, ServiceBulkSync};
use service::taxonomy::query::Labeled;

use crate::errors::{ApiJson, JsonApiError};
use crate::observability::record_mutation;
use crate::routes::{auth::ServerState, LocaleQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderServices {
    pub service_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[utoipa::path(get, path = "/categories/{id}", tag = "categories", params(("id" = Uuid, Path, description = "Category id"), LocaleQuery), responses((status = 200, description = "Category"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Query(q): Query<LocaleQuery>,
) -> Result<Json<Labeled<Category>>, JsonApiError> {
    Ok(Json(state.taxonomy.category(id, q.locale.as_deref()).await?))
}

#[utoipa::path(get, path = "/categories/unassigned", tag = "categories", params(LocaleQuery), responses((status = 200, description = "Unassigned categories"), (status = 401, description = "Unauthorized")))]
pub async fn unassigned(State(state): State<ServerState>, Query(q): Query<LocaleQuery>) -> Result<Json<Vec<Labeled<Category>>>, JsonApiError> {
    Ok(Json(state.taxonomy.unassigned(q.locale.as_deref()).await?))
}

#[utoipa::path(get, path = "/categories/deleted", tag = "categories", params(LocaleQuery), responses((status = 200, description = "Soft-deleted categories"), (status = 401, description = "Unauthorized")))]
pub async fn deleted(State(state): State<ServerState>, Query(q): Query<LocaleQuery>) -> Result<Json<Vec<Labeled<Category>>>, JsonApiError> {
    Ok(Json(state.taxonomy.soft_deleted(q.locale.as_deref()).await?))
}

#[utoipa::path(
    post, path = "/categories", tag = "categories",
    request_body = crate::openapi::NewCategoryDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 404, description = "Cluster Not Found"))
)]
pub async fn create(State(state): State<ServerState>, ApiJson(input): ApiJson<NewCategory>) -> Result<(StatusCode, Json<Category>), JsonApiError> {
    let created = record_mutation("create_category", state.taxonomy.create_category(input).await)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/categories/{id}", tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = crate::openapi::CategoryReplaceDoc,
    responses((status = 200, description = "Replaced"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"))
)]
pub async fn replace(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<CategoryReplace>,
) -> Result<Json<Category>, JsonApiError> {
    Ok(Json(record_mutation("replace_category", state.taxonomy.replace_category(id, input).await)?))
}

#[utoipa::path(
    delete, path = "/categories/{id}", tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Soft-deleted"), (status = 404, description = "Not Found"))
)]
pub async fn soft_delete(State(state): State<ServerState>, Path(id): Path<Uuid>) -> Result<Json<Category>, JsonApiError> {
    Ok(Json(record_mutation("soft_delete_category", state.taxonomy.soft_delete_category(id).await)?))
}

#[utoipa::path(
    post, path = "/categories/{id}/restore", tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    responses((status = 200, description = "Restored to the unassigned pool"), (status = 400, description = "Not deleted"), (status = 404, description = "Not Found"))
)]
pub async fn restore(State(state): State<ServerState>, Path(id): Path<Uuid>) -> Result<Json<Category>, JsonApiError> {
    Ok(Json(record_mutation("restore_category", state.taxonomy.restore_category(id).await)?))
}

#[utoipa::path(
    put, path = "/categories/{id}/reassign", tag = "categories",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = crate::openapi::ReassignDoc,
    responses((status = 200, description = "Reassigned"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"), (status = 409, description = "Order Conflict"))
)]
pub async fn reassign(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<Reassign>,
) -> Result<Json<Category>, JsonApiError> {
    Ok(Json(record_mutation("reassign_category", state.taxonomy.reassign_category(id, input).await)?))
}

#[utoipa::path(
    post, path = "/categories/{id}/services", tag = "services",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = crate::openapi::NewServiceDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"))
)]
pub async fn create_service(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<NewService>,
) -> Result<(StatusCode, Json<Service>), JsonApiError> {
    let created = record_mutation("create_service", state.taxonomy.create_service(id, input).await)?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/categories/{id}/services/bulk", tag = "services",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = crate::openapi::ServiceBulkSyncDoc,
    responses(
        (status = 200, description = "Services after sync"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order Conflict"),
        (status = 422, description = "Scope Mismatch")
    )
)]
pub async fn sync_services(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ServiceBulkSync>,
) -> Result<Json<Vec<Service>>, JsonApiError> {
    Ok(Json(record_mutation("sync_services", state.taxonomy.sync_services(id, input).await)?))
}

#[utoipa::path(
    put, path = "/categories/{id}/services/reorder", tag = "services",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = crate::openapi::ReorderServicesDoc,
    responses((status = 200, description = "Reordered"), (status = 404, description = "Not Found"), (status = 409, description = "Order Conflict"))
)]
pub async fn reorder_services(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ReorderServices>,
) -> Result<Json<Vec<Service>>, JsonApiError> {
    let out = state.taxonomy.reorder_services(id, &input.service_ids, input.expected_version).await;
    Ok(Json(record_mutation("reorder_services", out)?))
}
