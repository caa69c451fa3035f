//! Bottica - 服务器音乐播放服务
//!
//! 启动流程：配置 -> 日志 -> 存储 -> 适配器 -> 后台任务 -> 会话恢复 -> HTTP

use std::sync::Arc;

use bottica::application::ports::{AudioCachePort, LoudnessNormalizerPort};
use bottica::application::{
    GuildSessions, AudioSourceService, PersistSessionsCommand, PersistSessionsHandler,
    RestoreSessionsCommand, RestoreSessionsHandler,
};
use bottica::config::{load_config, print_config, AppConfig};
use bottica::infrastructure::adapters::{
    FfmpegNormalizer, FfmpegNormalizerConfig, FfmpegPlayer, FfmpegPlayerConfig, YtDlpConfig,
    YtDlpResolver,
};
use bottica::infrastructure::events::EventPublisher;
use bottica::infrastructure::http::{AppDeps, AppState, HttpServer};
use bottica::infrastructure::memory::{InMemorySessionManager, InMemoryTaskManager};
use bottica::infrastructure::persistence::sled::{SledAudioCache, SledCacheConfig};
use bottica::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteGuildRepository, SqliteSessionRepository,
    SqliteSongRepository,
};
use bottica::infrastructure::playback::{SessionPlayer, SessionPlayerConfig};
use bottica::infrastructure::worker::{CacheWorker, CacheWorkerConfig, Janitor, JanitorConfig};
use tokio::sync::mpsc;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},bottica={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    init_tracing(&config);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Bottica starting");
    print_config(&config);

    // 确保数据目录存在
    tokio::fs::create_dir_all(&config.storage.audio_dir).await?;
    tokio::fs::create_dir_all(&config.storage.download_dir).await?;
    if let Some(parent) = config.storage.cache_index.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 数据库与仓储
    let db_config = DatabaseConfig::new(&config.database.path, config.database.max_connections);
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let song_repo = Arc::new(SqliteSongRepository::new(pool.clone()));
    let guild_repo = Arc::new(SqliteGuildRepository::new(pool.clone()));
    let session_repo = Arc::new(SqliteSessionRepository::new(pool));

    // 外部工具适配器
    let resolver = Arc::new(YtDlpResolver::new(YtDlpConfig {
        binary: config.tools.ytdlp_path.clone(),
        cookie_file: config.tools.cookie_file.clone(),
        cache_dir: config.tools.ytdlp_cache_dir.clone(),
        timeout_secs: config.tools.resolve_timeout_secs,
        download_timeout_secs: config.tools.download_timeout_secs,
    }));
    let normalizer: Arc<dyn LoudnessNormalizerPort> =
        Arc::new(FfmpegNormalizer::new(FfmpegNormalizerConfig {
            binary: config.tools.ffmpeg_path.clone(),
            target: config.audio.loudness_target(),
            bitrate: config.audio.cache_bitrate.clone(),
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            keep_source: config.audio.keep_source,
            timeout_secs: config.audio.normalize_timeout_secs,
        }));
    let player = Arc::new(FfmpegPlayer::new(
        FfmpegPlayerConfig {
            binary: config.tools.ffmpeg_path.clone(),
            format: config.audio.stream_format,
            bitrate: config.audio.stream_bitrate.clone(),
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
        },
        normalizer.clone(),
    ));

    // Sled 音频缓存
    let audio_cache = Arc::new(SledAudioCache::new(&SledCacheConfig {
        db_path: config.storage.cache_index.to_string_lossy().into_owned(),
        audio_dir: config.storage.audio_dir.clone(),
        max_size_bytes: config.storage.max_cache_bytes,
    })?);

    let event_publisher = EventPublisher::new().arc();

    // 缓存任务队列与内存管理器
    let (task_tx, task_rx) = mpsc::channel(config.worker.queue_capacity);
    let session_manager = InMemorySessionManager::new().arc();
    let task_manager = InMemoryTaskManager::new(task_tx).arc();

    let audio_source = AudioSourceService::new(
        audio_cache.clone(),
        resolver.clone(),
        task_manager.clone(),
        event_publisher.clone(),
    )
    .arc();
    let guild_sessions = GuildSessions::new(
        session_manager.clone(),
        guild_repo.clone(),
        session_repo.clone(),
        song_repo.clone(),
        config.guild_defaults.to_guild_config()?,
    )
    .arc();
    let session_player = SessionPlayer::new(
        SessionPlayerConfig {
            max_consecutive_failures: config.playback.max_consecutive_failures,
            require_listeners: config.playback.require_listeners,
            channel_capacity: config.playback.channel_capacity,
        },
        session_manager.clone(),
        audio_source.clone(),
        player,
        event_publisher.clone(),
    )
    .arc();

    // 后台任务
    let worker = CacheWorker::new(
        CacheWorkerConfig {
            max_concurrent: config.worker.max_concurrent,
            staging_dir: config.storage.download_dir.clone(),
        },
        task_rx,
        task_manager.clone(),
        resolver.clone(),
        normalizer,
        audio_cache.clone(),
        event_publisher.clone(),
    );
    tokio::spawn(worker.run());

    if config.gc.enabled {
        let janitor = Janitor::new(
            JanitorConfig {
                interval_secs: config.gc.interval_secs,
                session_expire_secs: config.gc.session_expire_secs,
                task_retention_secs: config.gc.task_retention_secs,
            },
            session_manager.clone(),
            session_repo.clone(),
            task_manager.clone(),
            event_publisher.clone(),
        );
        tokio::spawn(janitor.run());
    }

    // 恢复上次关闭前的会话
    let restore = RestoreSessionsHandler::new(
        guild_sessions.clone(),
        session_repo.clone(),
        session_player.clone(),
    );
    match restore.handle(RestoreSessionsCommand).await {
        Ok(resp) => tracing::info!(
            restored = resp.restored,
            resumed = resp.resumed,
            missing_songs = resp.missing_songs,
            "Sessions restored"
        ),
        Err(e) => tracing::error!(error = %e, "Failed to restore sessions"),
    }

    let persist = PersistSessionsHandler::new(
        session_manager.clone(),
        session_repo,
        session_player.clone(),
    );

    let state = AppState::new(AppDeps {
        sessions: guild_sessions,
        player: session_player,
        resolver,
        song_repo,
        guild_repo,
        audio_cache: audio_cache.clone(),
        task_manager,
        audio_source,
        event_publisher,
    });

    HttpServer::new(&config.server, Arc::new(state))
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    // 保存会话并落盘缓存索引
    if let Err(e) = persist.handle(PersistSessionsCommand).await {
        tracing::error!(error = %e, "Failed to persist sessions");
    }
    if let Err(e) = audio_cache.flush().await {
        tracing::error!(error = %e, "Failed to flush cache index");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
