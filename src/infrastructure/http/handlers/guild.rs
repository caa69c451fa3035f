//! Guild Handlers - 服务器配置

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{GetGuildConfigQuery, UpdateGuildConfigCommand};
use crate::domain::guild::GuildConfig;
use crate::infrastructure::http::dto::{ApiResponse, GuildRequest, UpdateGuildConfigRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn get_guild_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> Result<Json<ApiResponse<GuildConfig>>, ApiError> {
    let config = state
        .guild_config_handler
        .handle(GetGuildConfigQuery {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(config)))
}

pub async fn update_guild_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateGuildConfigRequest>,
) -> Result<Json<ApiResponse<GuildConfig>>, ApiError> {
    let cmd = UpdateGuildConfigCommand {
        guild_id: req.guild_id,
        min_repeat_interval: req.min_repeat_interval,
        max_cached_duration: req.max_cached_duration,
    };
    let config = state.update_guild_config_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(config)))
}
