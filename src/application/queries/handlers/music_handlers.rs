//! Music Query Handlers

use std::sync::Arc;

use crate::application::commands::handlers::mode_message;
use crate::application::error::ApplicationError;
use crate::application::ports::PlaybackPort;
use crate::application::queries::music_queries::*;
use crate::application::services::GuildSessions;
use crate::domain::song::{format_duration, SongInfo};

/// 歌曲的可读描述
fn describe(song: &SongInfo) -> String {
    song.pretty_link().unwrap_or_else(|_| song.title.clone())
}

/// GetSessionStatus Handler
pub struct GetSessionStatusHandler {
    sessions: Arc<GuildSessions>,
    playback: Arc<dyn PlaybackPort>,
}

impl GetSessionStatusHandler {
    pub fn new(sessions: Arc<GuildSessions>, playback: Arc<dyn PlaybackPort>) -> Self {
        Self { sessions, playback }
    }

    pub async fn handle(
        &self,
        query: GetSessionStatusQuery,
    ) -> Result<SessionStatusResponse, ApplicationError> {
        let guild_id = query.guild_id;
        self.sessions.ensure(guild_id).await?;
        let session = self.sessions.manager().get(guild_id)?;

        // 任务结束后 current 仍保留最后一首，仅在播放中展示
        let current = session
            .current()
            .filter(|_| session.state.is_active())
            .cloned();
        let now_playing = match &current {
            Some(song) => describe(song),
            None => "Not playing anything at the moment.".to_string(),
        };
        let mode = session.mode();
        let queue = session.selector.queue();

        Ok(SessionStatusResponse {
            guild_id,
            state: session.state,
            current,
            now_playing,
            queue_len: queue.len(),
            queue_duration: queue.duration(),
            mode,
            set_size: session.song_set.len(),
            listeners: self.playback.listener_count(guild_id),
            summary: vec![
                format!("{} songs in guild set", session.song_set.len()),
                mode_message(mode),
            ],
        })
    }
}

/// GetQueue Handler
pub struct GetQueueHandler {
    sessions: Arc<GuildSessions>,
}

impl GetQueueHandler {
    pub fn new(sessions: Arc<GuildSessions>) -> Self {
        Self { sessions }
    }

    pub async fn handle(&self, query: GetQueueQuery) -> Result<QueueResponse, ApplicationError> {
        self.sessions.ensure(query.guild_id).await?;
        let session = self.sessions.manager().get(query.guild_id)?;
        let queue = session.selector.queue();

        let summary = if !queue.is_empty() {
            format!(
                "I have {} songs queued at the moment. ({})",
                queue.len(),
                format_duration(queue.duration())
            )
        } else if session.mode().radio {
            format!("My radio set consists of {} songs.", session.song_set.len())
        } else {
            "Nothing queued at the moment.".to_string()
        };

        Ok(QueueResponse {
            songs: queue.iter().cloned().collect(),
            duration: queue.duration(),
            summary,
        })
    }
}
