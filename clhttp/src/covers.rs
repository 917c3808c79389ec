//! `GET /api/covers/:id?fallback=...`

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CoverQuery {
    pub fallback: Option<String>,
}

pub async fn cover(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<CoverQuery>,
) -> Response {
    if let Some((path, content_type)) = state.gateway.covers.get_cached_cover(&id).await {
        return match tokio::fs::read(&path).await {
            Ok(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                bytes,
            )
                .into_response(),
            Err(e) => {
                warn!(song_id = %id, "cover file vanished after cache hit: {e}");
                StatusCode::NOT_FOUND.into_response()
            }
        };
    }

    let Some(fallback) = params.fallback else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // Cache the fallback in the background so a later request hits the LRU
    // directly instead of redirecting again.
    let covers = std::sync::Arc::clone(&state.gateway.covers);
    let id_for_task = id.clone();
    let fallback_for_task = fallback.clone();
    tokio::spawn(async move {
        if let Err(e) = covers.cache_cover(&id_for_task, &fallback_for_task).await {
            warn!(song_id = %id_for_task, "failed to cache fallback cover: {e}");
        }
    });

    Redirect::temporary(&fallback).into_response()
}
