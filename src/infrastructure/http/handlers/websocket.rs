//! WebSocket Handlers
//!
//! - /ws/guild/:guild_id 推送单个服务器的播放事件
//! - /ws/events 推送全局缓存任务事件

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::domain::guild::GuildId;
use crate::infrastructure::events::WsEvent;
use crate::infrastructure::http::state::AppState;

/// 服务器 WebSocket 连接处理
pub async fn guild_websocket_handler(
    ws: WebSocketUpgrade,
    Path(guild_id): Path<u64>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let guild_id = GuildId::new(guild_id);
    ws.on_upgrade(move |socket| handle_guild_socket(socket, guild_id, state))
}

/// 全局 WebSocket 连接处理
pub async fn global_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_global_socket(socket, state))
}

/// 将广播事件转发给客户端，直到任一端关闭
async fn forward_events(
    mut sender: SplitSink<WebSocket, Message>,
    mut event_rx: broadcast::Receiver<WsEvent>,
) {
    loop {
        let event = match event_rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "WebSocket subscriber lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let msg = match serde_json::to_string(&event) {
            Ok(json) => Message::Text(json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize event");
                continue;
            }
        };

        if let Err(e) = sender.send(msg).await {
            tracing::debug!(error = %e, "Failed to send WebSocket message");
            break;
        }
    }
}

async fn handle_guild_socket(socket: WebSocket, guild_id: GuildId, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    if let Err(e) = state.sessions.ensure(guild_id).await {
        tracing::warn!(guild_id = %guild_id, error = %e, "WebSocket connection rejected");
        return;
    }

    let event_rx = state.event_publisher.subscribe_guild(guild_id);
    tracing::info!(guild_id = %guild_id, "Guild WebSocket connected");

    let mut forward_task = tokio::spawn(forward_events(sender, event_rx));

    // 客户端消息视为活跃心跳
    let session_manager = state.sessions.manager().clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!(guild_id = %guild_id, "Guild WebSocket closed by client");
                    break;
                }
                Ok(_) => session_manager.touch(guild_id),
                Err(e) => {
                    tracing::debug!(guild_id = %guild_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    tracing::info!(guild_id = %guild_id, "Guild WebSocket disconnected");
}

async fn handle_global_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let event_rx = state.event_publisher.subscribe_global();

    tracing::info!("Global WebSocket connected");

    let mut forward_task = tokio::spawn(forward_events(sender, event_rx));
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!("Global WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Global WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    }

    tracing::info!("Global WebSocket disconnected");
}
