//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（如 SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::Session;
use crate::domain::guild::{GuildConfig, GuildId};
use crate::domain::playback::PlaybackMode;
use crate::domain::song::{SongInfo, SongKey};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Song Repository
// ============================================================================

/// Song Repository Port - 歌曲注册表
#[async_trait]
pub trait SongRepositoryPort: Send + Sync {
    /// 保存歌曲（存在时更新标题与时长）
    async fn save(&self, song: &SongInfo) -> Result<(), RepositoryError>;

    /// 根据 key 查找歌曲
    async fn find(&self, key: &SongKey) -> Result<Option<SongInfo>, RepositoryError>;

    /// 注册歌曲总数
    async fn count(&self) -> Result<u64, RepositoryError>;
}

// ============================================================================
// Guild Repository
// ============================================================================

/// Guild Repository Port - 服务器歌单与配置
#[async_trait]
pub trait GuildRepositoryPort: Send + Sync {
    /// 加入服务器歌单，仅当为新增时返回 true
    async fn add_to_set(&self, guild_id: GuildId, key: &SongKey) -> Result<bool, RepositoryError>;

    /// 加载服务器歌单
    async fn load_set(&self, guild_id: GuildId) -> Result<Vec<SongInfo>, RepositoryError>;

    /// 服务器歌单大小
    async fn set_size(&self, guild_id: GuildId) -> Result<u64, RepositoryError>;

    /// 加载服务器配置
    async fn load_config(&self, guild_id: GuildId) -> Result<Option<GuildConfig>, RepositoryError>;

    /// 保存服务器配置
    async fn save_config(&self, guild_id: GuildId, config: &GuildConfig) -> Result<(), RepositoryError>;
}

// ============================================================================
// Session Repository
// ============================================================================

/// 播放会话实体（用于持久化）
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub guild_id: GuildId,
    pub mode: PlaybackMode,
    /// 保存时播放任务是否存活
    pub active: bool,
    /// 待播队列，中断的当前歌曲位于队首
    pub queue: Vec<SongKey>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn from_session(session: &Session, active: bool) -> Self {
        let queue = session
            .current()
            .map(SongInfo::key)
            .into_iter()
            .chain(session.selector.queue().keys())
            .collect();
        Self {
            guild_id: session.guild_id,
            mode: session.mode(),
            active,
            queue,
            updated_at: Utc::now(),
        }
    }
}

/// Session Repository Port
#[async_trait]
pub trait SessionRepositoryPort: Send + Sync {
    /// 保存会话（存在时覆盖）
    async fn save(&self, session: &SessionRecord) -> Result<(), RepositoryError>;

    /// 获取单个服务器的会话
    async fn find(&self, guild_id: GuildId) -> Result<Option<SessionRecord>, RepositoryError>;

    /// 获取所有会话
    async fn find_all(&self) -> Result<Vec<SessionRecord>, RepositoryError>;

    /// 获取保存时仍在播放的会话
    async fn find_active(&self) -> Result<Vec<SessionRecord>, RepositoryError>;

    /// 删除会话
    async fn delete(&self, guild_id: GuildId) -> Result<(), RepositoryError>;
}
