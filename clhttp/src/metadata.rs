//! `GET /api/metadata?q=...`

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub title: String,
    pub duration: f64,
    pub source_url: String,
    pub thumbnail_url: Option<String>,
}

impl From<clmetadata::TrackMetadata> for MetadataResponse {
    fn from(m: clmetadata::TrackMetadata) -> Self {
        Self {
            title: m.title,
            duration: m.duration,
            source_url: m.source_url,
            thumbnail_url: m.thumbnail_url,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/metadata",
    tag = "metadata",
    params(("q" = String, Query, description = "Source url or search query")),
    responses(
        (status = 200, description = "Resolved track metadata", body = MetadataResponse),
        (status = 400, description = "Missing q", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found upstream", body = crate::error::ErrorResponse),
        (status = 500, description = "Upstream fetcher failure", body = crate::error::ErrorResponse),
    )
)]
pub async fn metadata(
    State(state): State<AppState>,
    Query(params): Query<MetadataQuery>,
) -> Result<Json<MetadataResponse>, AppError> {
    let q = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::Validation("q is required".to_string()))?;

    let metadata = state.gateway.fetch_metadata(&q).await?;
    Ok(Json(metadata.into()))
}
