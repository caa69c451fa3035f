//! Stream Handler - 服务器实时音频流
//!
//! 每个打开的响应就是一个听众，音频来自播放任务的广播通道

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::application::ports::PlaybackPort;
use crate::domain::guild::GuildId;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn stream_guild(
    State(state): State<Arc<AppState>>,
    Path(guild_id): Path<u64>,
) -> Result<Response, ApiError> {
    let guild_id = GuildId::new(guild_id);
    state.sessions.ensure(guild_id).await?;

    let rx = state.player.subscribe(guild_id);
    tracing::info!(
        guild_id = %guild_id,
        listeners = state.player.listener_count(guild_id),
        "Listener connected"
    );

    let body = Body::from_stream(listener_stream(guild_id, rx));
    Ok((
        [
            (header::CONTENT_TYPE, state.player.content_type()),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// 广播接收端转为响应体流，落后的听众跳过丢失的分片
fn listener_stream(
    guild_id: GuildId,
    rx: broadcast::Receiver<Bytes>,
) -> impl futures_util::Stream<Item = Result<Bytes, Infallible>> {
    futures_util::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(chunk) => return Some((Ok(chunk), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(guild_id = %guild_id, skipped, "Listener lagged");
                }
                Err(RecvError::Closed) => {
                    tracing::info!(guild_id = %guild_id, "Guild stream closed");
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_listener_stream_skips_lag_and_ends_on_close() {
        let (tx, rx) = broadcast::channel(2);
        for i in 0..4u8 {
            tx.send(Bytes::from(vec![i])).unwrap();
        }
        drop(tx);

        let chunks: Vec<Bytes> = listener_stream(GuildId::new(1), rx)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![Bytes::from(vec![2u8]), Bytes::from(vec![3u8])]);
    }
}
