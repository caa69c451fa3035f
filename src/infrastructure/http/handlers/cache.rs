//! Cache Handlers - 缓存统计与预取

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::commands::PrefetchResponse;
use crate::application::queries::{CacheStatsResponse, CacheTaskInfo};
use crate::application::{GetCacheStatsQuery, ListCacheTasksQuery, PrefetchCommand};
use crate::infrastructure::http::dto::{ApiResponse, PrefetchRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn cache_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CacheStatsResponse>>, ApiError> {
    let stats = state.cache_stats_handler.handle(GetCacheStatsQuery).await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub async fn cache_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CacheTaskInfo>>>, ApiError> {
    let tasks = state.cache_tasks_handler.handle(ListCacheTasksQuery).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// 预取：只下载并归一化，不加入任何队列
pub async fn prefetch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PrefetchRequest>,
) -> Result<Json<ApiResponse<PrefetchResponse>>, ApiError> {
    let result = state
        .prefetch_handler
        .handle(PrefetchCommand { query: req.url })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
