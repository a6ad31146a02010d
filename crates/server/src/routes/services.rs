use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use uuid::Uuid;

use service::taxonomy::domain::{Service, ServiceReplace};
use service::taxonomy::query::Labeled;

use crate::errors::{ApiJson, JsonApiError};
use crate::observability::record_mutation;
use crate::routes::{auth::ServerState, LocaleQuery};

#[utoipa::path(get, path = "/services/{id}", tag = "services", params(("id" = Uuid, Path, description = "Service id"), LocaleQuery), responses((status = 200, description = "Service"), (status = 404, description = "Not Found")))]
pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Query(q): Query<LocaleQuery>,
) -> Result<Json<Labeled<Service>>, JsonApiError> {
    Ok(Json(state.taxonomy.service(id, q.locale.as_deref()).await?))
}

#[utoipa::path(
    put, path = "/services/{id}", tag = "services",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = crate::openapi::ServiceReplaceDoc,
    responses((status = 200, description = "Replaced"), (status = 400, description = "Validation Error"), (status = 404, description = "Not Found"))
)]
pub async fn replace(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<ServiceReplace>,
) -> Result<Json<Service>, JsonApiError> {
    Ok(Json(record_mutation("replace_service", state.taxonomy.replace_service(id, input).await)?))
}

#[utoipa::path(
    delete, path = "/services/{id}", tag = "services",
    params(("id" = Uuid, Path, description = "Service id")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete(State(state): State<ServerState>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    record_mutation("delete_service", state.taxonomy.delete_service(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}
