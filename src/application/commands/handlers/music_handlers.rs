//! Music Command Handlers

use rand::Rng;
use std::sync::Arc;

use crate::application::commands::music_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    GuildRepositoryPort, PlaybackPort, SongRepositoryPort, SongResolverPort,
};
use crate::application::services::GuildSessions;
use crate::domain::guild::GuildId;
use crate::domain::playback::PlaybackMode;
use crate::infrastructure::events::EventPublisher;

/// 队列变化后的公共收尾：发布事件并在空闲时启动播放
fn queue_and_start(
    sessions: &GuildSessions,
    playback: &dyn PlaybackPort,
    events: &EventPublisher,
    guild_id: GuildId,
    added: usize,
) -> Result<(usize, u64, bool), ApplicationError> {
    let session = sessions.manager().get(guild_id)?;
    let queue = session.selector.queue();
    events.publish_queue_updated(guild_id, added, queue.len(), queue.duration());

    let started = !playback.is_active(guild_id) && playback.start(guild_id);
    Ok((queue.len(), queue.duration(), started))
}

/// Play Handler - 解析请求、登记歌曲并加入队列
pub struct PlayHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
    resolver: Arc<dyn SongResolverPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    guild_repo: Arc<dyn GuildRepositoryPort>,
    event_publisher: Arc<EventPublisher>,
}

impl PlayHandler {
    pub fn new(
        sessions: Arc<GuildSessions>,
        playback: Arc<dyn PlaybackPort>,
        resolver: Arc<dyn SongResolverPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        guild_repo: Arc<dyn GuildRepositoryPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            playback,
            resolver,
            song_repo,
            guild_repo,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: PlayCommand) -> Result<PlayResponse, ApplicationError> {
        let guild_id = cmd.guild_id;
        self.sessions.ensure(guild_id).await?;

        let resolved = self.resolver.resolve(cmd.query.trim()).await?;
        if resolved.songs.is_empty() {
            return Err(ApplicationError::nothing_playable());
        }

        let mode = self.sessions.manager().get(guild_id)?.mode();
        let mut songs = resolved.songs;

        // 随机模式下首首歌曲也随机
        if mode.shuffle && !self.playback.is_active(guild_id) && songs.len() > 1 {
            let idx = rand::thread_rng().gen_range(0..songs.len());
            songs.swap(0, idx);
        }

        let mut queued = Vec::with_capacity(songs.len());
        for song in songs {
            self.song_repo.save(&song).await?;
            let is_new = self.sessions.manager().add_to_set(guild_id, song.clone())?;
            if is_new {
                self.guild_repo.add_to_set(guild_id, &song.key()).await?;
            }
            queued.push(song);
        }

        self.sessions.manager().enqueue(guild_id, queued.clone())?;
        let (queue_len, queue_duration, started) = queue_and_start(
            &self.sessions,
            self.playback.as_ref(),
            &self.event_publisher,
            guild_id,
            queued.len(),
        )?;

        tracing::info!(
            guild_id = %guild_id,
            queued = queued.len(),
            unplayable = resolved.unplayable,
            queue_len,
            started,
            "Play request handled"
        );

        Ok(PlayResponse {
            queued,
            unplayable: resolved.unplayable,
            queue_len,
            queue_duration,
            started,
        })
    }
}

/// PlayAll Handler - 将服务器歌单全部加入队列
pub struct PlayAllHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
    event_publisher: Arc<EventPublisher>,
}

impl PlayAllHandler {
    pub fn new(
        sessions: Arc<GuildSessions>,
        playback: Arc<dyn PlaybackPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            playback,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: PlayAllCommand) -> Result<PlayAllResponse, ApplicationError> {
        let guild_id = cmd.guild_id;
        self.sessions.ensure(guild_id).await?;
        let session = self.sessions.manager().get(guild_id)?;
        let mode = session.mode();

        let songs: Vec<_> = session.song_set.iter().cloned().collect();
        let queued = songs.len();
        self.sessions.manager().enqueue(guild_id, songs)?;
        let (_, _, started) = queue_and_start(
            &self.sessions,
            self.playback.as_ref(),
            &self.event_publisher,
            guild_id,
            queued,
        )?;

        tracing::info!(guild_id = %guild_id, queued, mode = %mode, "Guild set queued");
        Ok(PlayAllResponse {
            queued,
            mode,
            started,
        })
    }
}

/// SetMode Handler - 切换随机/电台
pub struct SetModeHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
    event_publisher: Arc<EventPublisher>,
}

impl SetModeHandler {
    pub fn new(
        sessions: Arc<GuildSessions>,
        playback: Arc<dyn PlaybackPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            playback,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: SetModeCommand) -> Result<SetModeResponse, ApplicationError> {
        let guild_id = cmd.guild_id;
        self.sessions.ensure(guild_id).await?;

        let current = self.sessions.manager().get(guild_id)?.mode();
        let mode = PlaybackMode::new(
            cmd.shuffle.unwrap_or(current.shuffle),
            cmd.radio.unwrap_or(current.radio),
        );
        if mode != current {
            self.sessions.manager().set_mode(guild_id, mode)?;
            self.event_publisher.publish_mode_changed(guild_id, mode);
            tracing::info!(guild_id = %guild_id, mode = %mode, "Playback mode changed");
        }

        let started = cmd.radio == Some(true)
            && !self.playback.is_active(guild_id)
            && self.playback.start(guild_id);

        Ok(SetModeResponse {
            mode,
            message: mode_message(mode),
            started,
        })
    }
}

/// 模式描述
pub(crate) fn mode_message(mode: PlaybackMode) -> String {
    let order = if mode.shuffle { "shuffle" } else { "queue" };
    if mode.radio {
        format!("Music mode is `{}` with `radio`", order)
    } else {
        format!("Music mode is `{}`", order)
    }
}

/// Skip Handler
pub struct SkipHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
}

impl SkipHandler {
    pub fn new(sessions: Arc<GuildSessions>, playback: Arc<dyn PlaybackPort>) -> Self {
        Self { sessions, playback }
    }

    pub async fn handle(&self, cmd: SkipCommand) -> Result<ControlResponse, ApplicationError> {
        let guild_id = cmd.guild_id;
        if self.playback.is_active(guild_id) {
            self.playback.skip(guild_id)?;
            return Ok(ControlResponse::new("Skipped."));
        }

        // 电台模式下没有播放时直接开始
        self.sessions.ensure(guild_id).await?;
        if self.sessions.manager().get(guild_id)?.mode().radio {
            self.playback.start(guild_id);
            return Ok(ControlResponse::new("Skipped."));
        }
        Err(ApplicationError::nothing_playing())
    }
}

/// Pause Handler
pub struct PauseHandler {
    playback: Arc<dyn PlaybackPort>,
}

impl PauseHandler {
    pub fn new(playback: Arc<dyn PlaybackPort>) -> Self {
        Self { playback }
    }

    pub async fn handle(&self, cmd: PauseCommand) -> Result<ControlResponse, ApplicationError> {
        self.playback.pause(cmd.guild_id)?;
        Ok(ControlResponse::new("Paused."))
    }
}

/// Resume Handler
pub struct ResumeHandler {
    playback: Arc<dyn PlaybackPort>,
}

impl ResumeHandler {
    pub fn new(playback: Arc<dyn PlaybackPort>) -> Self {
        Self { playback }
    }

    pub async fn handle(&self, cmd: ResumeCommand) -> Result<ControlResponse, ApplicationError> {
        self.playback.resume(cmd.guild_id)?;
        Ok(ControlResponse::new("Resumed."))
    }
}

/// Stop Handler - 停止播放，保留队列
pub struct StopHandler {
    playback: Arc<dyn PlaybackPort>,
}

impl StopHandler {
    pub fn new(playback: Arc<dyn PlaybackPort>) -> Self {
        Self { playback }
    }

    pub async fn handle(&self, cmd: StopCommand) -> Result<ControlResponse, ApplicationError> {
        // 没有播放任务时停止是空操作
        let _ = self.playback.stop(cmd.guild_id);
        Ok(ControlResponse::new("Stopped."))
    }
}

/// Clear Handler - 清空队列并停止，播放模式保持不变
pub struct ClearHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
    event_publisher: Arc<EventPublisher>,
}

impl ClearHandler {
    pub fn new(
        sessions: Arc<GuildSessions>,
        playback: Arc<dyn PlaybackPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            playback,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ClearCommand) -> Result<ControlResponse, ApplicationError> {
        let guild_id = cmd.guild_id;
        self.sessions.ensure(guild_id).await?;

        let _ = self.playback.stop(guild_id);
        self.sessions.manager().clear_queue(guild_id)?;

        self.event_publisher.publish_queue_updated(guild_id, 0, 0, 0);
        tracing::info!(guild_id = %guild_id, "Queue cleared");
        Ok(ControlResponse::new("Queue cleared."))
    }
}

/// Reset Handler - 清空选曲器状态并停止
pub struct ResetHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
    event_publisher: Arc<EventPublisher>,
}

impl ResetHandler {
    pub fn new(
        sessions: Arc<GuildSessions>,
        playback: Arc<dyn PlaybackPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            sessions,
            playback,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ResetCommand) -> Result<ControlResponse, ApplicationError> {
        let guild_id = cmd.guild_id;
        self.sessions.ensure(guild_id).await?;

        let _ = self.playback.stop(guild_id);
        self.sessions.manager().reset(guild_id)?;

        self.event_publisher.publish_queue_updated(guild_id, 0, 0, 0);
        self.event_publisher
            .publish_mode_changed(guild_id, PlaybackMode::default());
        tracing::info!(guild_id = %guild_id, "Session reset");
        Ok(ControlResponse::new("Let me gather my thoughts."))
    }
}
