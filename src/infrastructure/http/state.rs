//! Application State
//!
//! 持有所有 Command/Query Handlers 以及流媒体需要的播放器

use std::sync::Arc;

use crate::application::{
    // Command handlers
    ClearHandler, PauseHandler, PlayAllHandler, PlayHandler, PrefetchHandler, ResetHandler,
    ResumeHandler, SetModeHandler, SkipHandler, StopHandler, UpdateGuildConfigHandler,
    // Query handlers
    GetCacheStatsHandler, GetGuildConfigHandler, GetQueueHandler, GetSessionStatusHandler,
    ListCacheTasksHandler,
    // Services
    AudioSourceService, GuildSessions,
};
use crate::application::ports::{
    AudioCachePort, CacheTaskManagerPort, GuildRepositoryPort, PlaybackPort, SongRepositoryPort,
    SongResolverPort,
};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::playback::SessionPlayer;

/// 构建 AppState 所需的依赖
pub struct AppDeps {
    pub sessions: Arc<GuildSessions>,
    pub player: Arc<SessionPlayer>,
    pub resolver: Arc<dyn SongResolverPort>,
    pub song_repo: Arc<dyn SongRepositoryPort>,
    pub guild_repo: Arc<dyn GuildRepositoryPort>,
    pub audio_cache: Arc<dyn AudioCachePort>,
    pub task_manager: Arc<dyn CacheTaskManagerPort>,
    pub audio_source: Arc<AudioSourceService>,
    pub event_publisher: Arc<EventPublisher>,
}

/// 应用状态
pub struct AppState {
    // ========== Shared ==========
    pub sessions: Arc<GuildSessions>,
    pub player: Arc<SessionPlayer>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub play_handler: PlayHandler,
    pub play_all_handler: PlayAllHandler,
    pub set_mode_handler: SetModeHandler,
    pub skip_handler: SkipHandler,
    pub pause_handler: PauseHandler,
    pub resume_handler: ResumeHandler,
    pub stop_handler: StopHandler,
    pub clear_handler: ClearHandler,
    pub reset_handler: ResetHandler,
    pub update_guild_config_handler: UpdateGuildConfigHandler,
    pub prefetch_handler: PrefetchHandler,

    // ========== Query Handlers ==========
    pub session_status_handler: GetSessionStatusHandler,
    pub queue_handler: GetQueueHandler,
    pub guild_config_handler: GetGuildConfigHandler,
    pub cache_stats_handler: GetCacheStatsHandler,
    pub cache_tasks_handler: ListCacheTasksHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(deps: AppDeps) -> Self {
        let AppDeps {
            sessions,
            player,
            resolver,
            song_repo,
            guild_repo,
            audio_cache,
            task_manager,
            audio_source,
            event_publisher,
        } = deps;
        let playback: Arc<dyn PlaybackPort> = player.clone();

        Self {
            // Command handlers
            play_handler: PlayHandler::new(
                sessions.clone(),
                playback.clone(),
                resolver.clone(),
                song_repo.clone(),
                guild_repo.clone(),
                event_publisher.clone(),
            ),
            play_all_handler: PlayAllHandler::new(
                sessions.clone(),
                playback.clone(),
                event_publisher.clone(),
            ),
            set_mode_handler: SetModeHandler::new(
                sessions.clone(),
                playback.clone(),
                event_publisher.clone(),
            ),
            skip_handler: SkipHandler::new(sessions.clone(), playback.clone()),
            pause_handler: PauseHandler::new(playback.clone()),
            resume_handler: ResumeHandler::new(playback.clone()),
            stop_handler: StopHandler::new(playback.clone()),
            clear_handler: ClearHandler::new(
                sessions.clone(),
                playback.clone(),
                event_publisher.clone(),
            ),
            reset_handler: ResetHandler::new(
                sessions.clone(),
                playback.clone(),
                event_publisher.clone(),
            ),
            update_guild_config_handler: UpdateGuildConfigHandler::new(
                sessions.clone(),
                guild_repo,
            ),
            prefetch_handler: PrefetchHandler::new(resolver, song_repo, audio_source),

            // Query handlers
            session_status_handler: GetSessionStatusHandler::new(sessions.clone(), playback),
            queue_handler: GetQueueHandler::new(sessions.clone()),
            guild_config_handler: GetGuildConfigHandler::new(sessions.clone()),
            cache_stats_handler: GetCacheStatsHandler::new(audio_cache, task_manager.clone()),
            cache_tasks_handler: ListCacheTasksHandler::new(task_manager),

            // Shared
            sessions,
            player,
            event_publisher,
        }
    }
}
