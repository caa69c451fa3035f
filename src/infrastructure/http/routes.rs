//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                 GET   健康检查
//! - /api/music/play           POST  解析链接并加入队列
//! - /api/music/playall        POST  服务器歌单全部入队
//! - /api/music/mode           POST  切换随机/电台
//! - /api/music/skip           POST  跳过当前歌曲
//! - /api/music/pause          POST  暂停
//! - /api/music/resume         POST  继续
//! - /api/music/stop           POST  停止（保留队列）
//! - /api/music/clear          POST  清空队列
//! - /api/music/reset          POST  重置选曲状态
//! - /api/music/status         POST  播放状态
//! - /api/music/queue          POST  队列内容
//! - /api/guild/config/get     POST  服务器配置
//! - /api/guild/config/update  POST  更新服务器配置
//! - /api/cache/stats          GET   缓存统计
//! - /api/cache/tasks          GET   缓存任务列表
//! - /api/cache/prefetch       POST  预取链接到缓存
//! - /stream/{guild_id}        GET   服务器实时音频流
//! - /ws/guild/{guild_id}      WS    服务器播放事件
//! - /ws/events                WS    全局缓存事件

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/stream/:guild_id", get(handlers::stream_guild))
        .route("/ws/guild/:guild_id", get(handlers::guild_websocket_handler))
        .route("/ws/events", get(handlers::global_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/music", music_routes())
        .nest("/guild", guild_routes())
        .nest("/cache", cache_routes())
}

/// Music 路由
fn music_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/play", post(handlers::play))
        .route("/playall", post(handlers::play_all))
        .route("/mode", post(handlers::set_mode))
        .route("/skip", post(handlers::skip))
        .route("/pause", post(handlers::pause))
        .route("/resume", post(handlers::resume))
        .route("/stop", post(handlers::stop))
        .route("/clear", post(handlers::clear))
        .route("/reset", post(handlers::reset))
        .route("/status", post(handlers::status))
        .route("/queue", post(handlers::queue))
}

/// Guild 路由
fn guild_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/config/get", post(handlers::get_guild_config))
        .route("/config/update", post(handlers::update_guild_config))
}

/// Cache 路由
fn cache_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats", get(handlers::cache_stats))
        .route("/tasks", get(handlers::cache_tasks))
        .route("/prefetch", post(handlers::prefetch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{song, FakePlayer, FakeResolver, MusicFixture};
    use crate::infrastructure::http::state::AppDeps;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::util::ServiceExt;

    const PLAYLIST: &str = "https://www.youtube.com/playlist?list=abc";

    async fn app() -> (Router, MusicFixture) {
        let resolver = FakeResolver::new().with_query(
            PLAYLIST,
            vec![song("a", 100), song("b", 200)],
            1,
        );
        let fx = MusicFixture::new(resolver, FakePlayer::new(50, Duration::from_millis(20))).await;
        let state = AppState::new(AppDeps {
            sessions: fx.guild_sessions.clone(),
            player: fx.playback.clone(),
            resolver: fx.resolver.clone(),
            song_repo: fx.song_repo.clone(),
            guild_repo: fx.guild_repo.clone(),
            audio_cache: fx.cache.clone(),
            task_manager: fx.task_manager.clone(),
            audio_source: fx.audio_source.clone(),
            event_publisher: fx.events.clone(),
        });
        (create_routes().with_state(Arc::new(state)), fx)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (app, _fx) = app().await;
        let json = call(&app, "GET", "/api/ping", None).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_play_then_status() {
        let (app, _fx) = app().await;

        let json = call(
            &app,
            "POST",
            "/api/music/play",
            Some(json!({ "guild_id": 42, "url": PLAYLIST })),
        )
        .await;
        assert_eq!(json["errno"], 0);
        assert_eq!(json["data"]["queued"].as_array().unwrap().len(), 2);
        assert_eq!(json["data"]["unplayable"], 1);
        assert_eq!(json["data"]["started"], true);

        let json = call(&app, "POST", "/api/music/status", Some(json!({ "guild_id": 42 }))).await;
        assert_eq!(json["errno"], 0);
        assert_eq!(json["data"]["set_size"], 2);
    }

    #[tokio::test]
    async fn test_unplayable_url_uses_errno() {
        let (app, _fx) = app().await;
        let json = call(
            &app,
            "POST",
            "/api/music/play",
            Some(json!({ "guild_id": 42, "url": "https://example.com/nope" })),
        )
        .await;
        assert_eq!(json["errno"], 422);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_pause_when_idle() {
        let (app, _fx) = app().await;
        let json = call(&app, "POST", "/api/music/pause", Some(json!({ "guild_id": 7 }))).await;
        assert_eq!(json["errno"], 400);
        assert_eq!(json["error"], "I'm not playing anything.");
    }

    #[tokio::test]
    async fn test_guild_config_update_validates() {
        let (app, _fx) = app().await;

        let json = call(
            &app,
            "POST",
            "/api/guild/config/update",
            Some(json!({ "guild_id": 7, "min_repeat_interval": 0 })),
        )
        .await;
        assert_eq!(json["errno"], 400);

        let json = call(
            &app,
            "POST",
            "/api/guild/config/update",
            Some(json!({ "guild_id": 7, "min_repeat_interval": 8 })),
        )
        .await;
        assert_eq!(json["errno"], 0);

        let json = call(&app, "POST", "/api/guild/config/get", Some(json!({ "guild_id": 7 }))).await;
        assert_eq!(json["data"]["min_repeat_interval"], 8);
    }

    #[tokio::test]
    async fn test_prefetch_and_cache_listing() {
        let (app, _fx) = app().await;

        let json = call(&app, "POST", "/api/cache/prefetch", Some(json!({ "url": PLAYLIST }))).await;
        assert_eq!(json["errno"], 0);
        assert_eq!(json["data"]["submitted"].as_array().unwrap().len(), 2);

        let json = call(&app, "GET", "/api/cache/tasks", None).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 2);

        let json = call(&app, "GET", "/api/cache/stats", None).await;
        assert_eq!(json["data"]["tasks_in_flight"], 2);
    }

    #[tokio::test]
    async fn test_stream_sets_content_type() {
        let (app, _fx) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stream/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "audio/mpeg"
        );
    }
}
