//! Session Manager Port - 服务器播放会话管理
//!
//! 定义会话管理的抽象接口，具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::guild::{GuildConfig, GuildId};
use crate::domain::playback::{PlaybackMode, PlaybackState, SongSelector};
use crate::domain::song::{SongInfo, SongKey, SongSet};

/// Session Manager 错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(GuildId),

    #[error("Session already exists: {0}")]
    AlreadyExists(GuildId),
}

/// 服务器会话（in-memory）
#[derive(Debug, Clone)]
pub struct Session {
    pub guild_id: GuildId,
    pub selector: SongSelector,
    pub song_set: SongSet,
    pub config: GuildConfig,
    pub state: PlaybackState,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(guild_id: GuildId, config: GuildConfig, song_set: SongSet) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            selector: SongSelector::new(),
            song_set,
            config,
            state: PlaybackState::Idle,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.selector.mode()
    }

    pub fn current(&self) -> Option<&SongInfo> {
        self.selector.current()
    }
}

/// Session Manager Port
///
/// 每个服务器一个会话，所有状态存储在内存中；`get` 返回快照
pub trait SessionManagerPort: Send + Sync {
    /// 创建新会话
    fn create(&self, session: Session) -> Result<(), SessionError>;

    /// 获取会话快照
    fn get(&self, guild_id: GuildId) -> Result<Session, SessionError>;

    /// 检查会话是否存在
    fn exists(&self, guild_id: GuildId) -> bool;

    /// 追加歌曲到请求队列
    fn enqueue(&self, guild_id: GuildId, songs: Vec<SongInfo>) -> Result<(), SessionError>;

    /// 选择下一首歌曲并设为当前歌曲
    fn select_next(&self, guild_id: GuildId) -> Result<Option<SongInfo>, SessionError>;

    /// 将被打断的当前歌曲放回队首
    fn requeue_current(&self, guild_id: GuildId) -> Result<Option<SongKey>, SessionError>;

    /// 设置播放模式
    fn set_mode(&self, guild_id: GuildId, mode: PlaybackMode) -> Result<(), SessionError>;

    /// 设置播放状态
    fn set_state(&self, guild_id: GuildId, state: PlaybackState) -> Result<(), SessionError>;

    /// 清空请求队列并丢弃当前歌曲
    fn clear_queue(&self, guild_id: GuildId) -> Result<(), SessionError>;

    /// 清空队列、历史与模式
    fn reset(&self, guild_id: GuildId) -> Result<(), SessionError>;

    /// 更新服务器配置
    fn set_config(&self, guild_id: GuildId, config: GuildConfig) -> Result<(), SessionError>;

    /// 加入服务器歌单，仅当歌曲为新增时返回 true
    fn add_to_set(&self, guild_id: GuildId, song: SongInfo) -> Result<bool, SessionError>;

    /// 更新最后活动时间
    fn touch(&self, guild_id: GuildId);

    /// 获取空闲超时的会话
    fn get_expired_sessions(&self, idle_timeout_secs: u64) -> Vec<GuildId>;

    /// 获取所有会话
    fn list_all(&self) -> Vec<GuildId>;

    /// 关闭会话
    fn close(&self, guild_id: GuildId) -> Result<(), SessionError>;
}
