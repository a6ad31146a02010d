use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Error envelope returned by every failing endpoint.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub detail: Option<String>,
    pub code: u16,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntryDoc {
    pub language_code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewClusterDoc {
    pub icon: String,
    pub is_active: Option<bool>,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReplaceDoc {
    pub icon: String,
    pub is_active: bool,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCategoryDoc {
    pub icon: String,
    pub cluster_id: Option<Uuid>,
    pub order_in_cluster: Option<u32>,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReplaceDoc {
    pub icon: String,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewServiceDoc {
    pub order_in_category: Option<u32>,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReplaceDoc {
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpsertDoc {
    /// Omit to create a new category.
    pub id: Option<Uuid>,
    pub icon: Option<String>,
    pub order_in_cluster: Option<u32>,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBulkSyncDoc {
    pub categories: Vec<CategoryUpsertDoc>,
    /// Soft-deleted; recoverable through restore.
    pub remove_category_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpsertDoc {
    pub id: Option<Uuid>,
    pub order_in_category: Option<u32>,
    pub translations: Vec<TranslationEntryDoc>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBulkSyncDoc {
    pub services: Vec<ServiceUpsertDoc>,
    pub delete_service_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignDoc {
    /// Omit to move the category to the unassigned pool.
    pub new_cluster_id: Option<Uuid>,
    pub order_in_cluster: Option<u32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderClustersDoc {
    pub cluster_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderCategoriesDoc {
    pub category_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderServicesDoc {
    pub service_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::clusters::tree,
        crate::routes::clusters::get,
        crate::routes::clusters::create,
        crate::routes::clusters::replace,
        crate::routes::clusters::delete,
        crate::routes::clusters::reorder,
        crate::routes::clusters::sync_categories,
        crate::routes::clusters::reorder_categories,
        crate::routes::categories::get,
        crate::routes::categories::unassigned,
        crate::routes::categories::deleted,
        crate::routes::categories::create,
        crate::routes::categories::replace,
        crate::routes::categories::soft_delete,
        crate::routes::categories::restore,
        crate::routes::categories::reassign,
        crate::routes::categories::create_service,
        crate::routes::categories::sync_services,
        crate::routes::categories::reorder_services,
        crate::routes::services::get,
        crate::routes::services::replace,
        crate::routes::services::delete,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            TranslationEntryDoc,
            NewClusterDoc,
            ClusterReplaceDoc,
            NewCategoryDoc,
            CategoryReplaceDoc,
            NewServiceDoc,
            ServiceReplaceDoc,
            CategoryUpsertDoc,
            CategoryBulkSyncDoc,
            ServiceUpsertDoc,
            ServiceBulkSyncDoc,
            ReassignDoc,
            ReorderClustersDoc,
            ReorderCategoriesDoc,
            ReorderServicesDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "clusters"),
        (name = "categories"),
        (name = "services")
    )
)]
pub struct ApiDoc;
