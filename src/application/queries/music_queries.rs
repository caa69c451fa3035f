//! Music Queries - 播放状态查询

use serde::Serialize;

use crate::domain::guild::GuildId;
use crate::domain::playback::{PlaybackMode, PlaybackState};
use crate::domain::song::SongInfo;

/// 获取会话状态
#[derive(Debug, Clone)]
pub struct GetSessionStatusQuery {
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    pub guild_id: GuildId,
    pub state: PlaybackState,
    pub current: Option<SongInfo>,
    /// 当前歌曲描述
    pub now_playing: String,
    pub queue_len: usize,
    pub queue_duration: u64,
    pub mode: PlaybackMode,
    pub set_size: usize,
    pub listeners: usize,
    /// 状态摘要行
    pub summary: Vec<String>,
}

/// 获取播放队列
#[derive(Debug, Clone)]
pub struct GetQueueQuery {
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    pub songs: Vec<SongInfo>,
    pub duration: u64,
    pub summary: String,
}
