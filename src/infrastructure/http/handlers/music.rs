//! Music Handlers - 播放控制与状态查询

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::commands::{PlayAllResponse, PlayResponse, SetModeResponse};
use crate::application::queries::{QueueResponse, SessionStatusResponse};
use crate::application::{
    ClearCommand, ControlResponse, GetQueueQuery, GetSessionStatusQuery, PauseCommand,
    PlayAllCommand, PlayCommand, ResetCommand, ResumeCommand, SetModeCommand, SkipCommand,
    StopCommand,
};
use crate::infrastructure::http::dto::{ApiResponse, GuildRequest, PlayRequest, SetModeRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub async fn play(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlayRequest>,
) -> ApiResult<PlayResponse> {
    let cmd = PlayCommand {
        guild_id: req.guild_id,
        query: req.url,
    };
    let result = state.play_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn play_all(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<PlayAllResponse> {
    let cmd = PlayAllCommand {
        guild_id: req.guild_id,
    };
    let result = state.play_all_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetModeRequest>,
) -> ApiResult<SetModeResponse> {
    let cmd = SetModeCommand {
        guild_id: req.guild_id,
        shuffle: req.shuffle,
        radio: req.radio,
    };
    let result = state.set_mode_handler.handle(cmd).await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn skip(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<ControlResponse> {
    let result = state
        .skip_handler
        .handle(SkipCommand {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn pause(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<ControlResponse> {
    let result = state
        .pause_handler
        .handle(PauseCommand {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn resume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<ControlResponse> {
    let result = state
        .resume_handler
        .handle(ResumeCommand {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<ControlResponse> {
    let result = state
        .stop_handler
        .handle(StopCommand {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn clear(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<ControlResponse> {
    let result = state
        .clear_handler
        .handle(ClearCommand {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<ControlResponse> {
    let result = state
        .reset_handler
        .handle(ResetCommand {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<SessionStatusResponse> {
    let result = state
        .session_status_handler
        .handle(GetSessionStatusQuery {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

pub async fn queue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GuildRequest>,
) -> ApiResult<QueueResponse> {
    let result = state
        .queue_handler
        .handle(GetQueueQuery {
            guild_id: req.guild_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
