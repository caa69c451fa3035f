//! Playback Port - 服务器播放任务控制

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::guild::GuildId;

/// Playback 错误
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Nothing is playing in guild {0}")]
    NotActive(GuildId),
}

/// 播放控制消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackControl {
    Skip,
    Pause,
    Resume,
    Stop,
    /// 新听众加入
    Wake,
}

/// Playback Port
///
/// 每个活跃服务器一个播放任务，音频通过广播通道推送给听众
pub trait PlaybackPort: Send + Sync {
    /// 启动播放任务，已在运行时返回 false
    fn start(&self, guild_id: GuildId) -> bool;

    /// 播放任务是否存活
    fn is_active(&self, guild_id: GuildId) -> bool;

    fn skip(&self, guild_id: GuildId) -> Result<(), PlaybackError>;

    fn pause(&self, guild_id: GuildId) -> Result<(), PlaybackError>;

    fn resume(&self, guild_id: GuildId) -> Result<(), PlaybackError>;

    /// 停止播放任务，保留队列
    fn stop(&self, guild_id: GuildId) -> Result<(), PlaybackError>;

    /// 订阅服务器音频流，并唤醒等待中的播放任务
    fn subscribe(&self, guild_id: GuildId) -> broadcast::Receiver<Bytes>;

    /// 当前听众数
    fn listener_count(&self, guild_id: GuildId) -> usize;
}
