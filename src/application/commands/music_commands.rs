//! Music Commands - 播放控制命令

use serde::Serialize;

use crate::domain::guild::GuildId;
use crate::domain::playback::PlaybackMode;
use crate::domain::song::SongInfo;

/// 播放命令 - 解析请求并加入队列
#[derive(Debug, Clone)]
pub struct PlayCommand {
    pub guild_id: GuildId,
    /// 歌曲或播放列表链接
    pub query: String,
}

/// 播放响应
#[derive(Debug, Clone, Serialize)]
pub struct PlayResponse {
    /// 新加入队列的歌曲
    pub queued: Vec<SongInfo>,
    /// 解析到但无法播放的条目数
    pub unplayable: usize,
    pub queue_len: usize,
    pub queue_duration: u64,
    /// 本次命令是否启动了播放任务
    pub started: bool,
}

/// 播放服务器歌单中的全部歌曲
#[derive(Debug, Clone)]
pub struct PlayAllCommand {
    pub guild_id: GuildId,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayAllResponse {
    pub queued: usize,
    pub mode: PlaybackMode,
    pub started: bool,
}

/// 切换播放模式，未提供的开关保持不变
#[derive(Debug, Clone)]
pub struct SetModeCommand {
    pub guild_id: GuildId,
    pub shuffle: Option<bool>,
    pub radio: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetModeResponse {
    pub mode: PlaybackMode,
    pub message: String,
    pub started: bool,
}

/// 跳过当前歌曲
#[derive(Debug, Clone)]
pub struct SkipCommand {
    pub guild_id: GuildId,
}

#[derive(Debug, Clone)]
pub struct PauseCommand {
    pub guild_id: GuildId,
}

#[derive(Debug, Clone)]
pub struct ResumeCommand {
    pub guild_id: GuildId,
}

/// 停止播放，保留队列
#[derive(Debug, Clone)]
pub struct StopCommand {
    pub guild_id: GuildId,
}

/// 清空队列并停止播放
#[derive(Debug, Clone)]
pub struct ClearCommand {
    pub guild_id: GuildId,
}

/// 重置选曲器（队列、历史、模式）并停止播放
#[derive(Debug, Clone)]
pub struct ResetCommand {
    pub guild_id: GuildId,
}

/// 播放控制类命令的通用响应
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    pub message: String,
}

impl ControlResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
