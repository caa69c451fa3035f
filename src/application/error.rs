//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{
    CacheError, PlaybackError, RepositoryError, ResolveError, SessionError, TaskError,
};
use crate::domain::guild::GuildConfigError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 请求无法解析出任何可播放歌曲
    #[error("{0}")]
    UnplayableQuery(String),

    /// 验证错误
    #[error("{0}")]
    ValidationError(String),

    /// 状态无效
    #[error("{0}")]
    InvalidState(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 缓存错误
    #[error("Cache error: {0}")]
    CacheError(String),

    /// 外部工具错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 没有正在播放的内容
    pub fn nothing_playing() -> Self {
        Self::InvalidState("I'm not playing anything.".to_string())
    }

    /// 请求中没有可播放的歌曲
    pub fn nothing_playable() -> Self {
        Self::UnplayableQuery("I couldn't find anything playable at that url.".to_string())
    }

    /// 无效的请求链接
    pub fn invalid_url() -> Self {
        Self::UnplayableQuery(
            "Heya, that does not look like a youtube url, try again with a different link."
                .to_string(),
        )
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}

impl From<CacheError> for ApplicationError {
    fn from(err: CacheError) -> Self {
        Self::CacheError(err.to_string())
    }
}

impl From<SessionError> for ApplicationError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(guild_id) => Self::not_found("Session", guild_id),
            SessionError::AlreadyExists(guild_id) => {
                Self::invalid_state(format!("Session already exists: {}", guild_id))
            }
        }
    }
}

impl From<TaskError> for ApplicationError {
    fn from(err: TaskError) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<PlaybackError> for ApplicationError {
    fn from(_: PlaybackError) -> Self {
        Self::nothing_playing()
    }
}

impl From<ResolveError> for ApplicationError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidQuery(_) | ResolveError::UnsupportedDomain(_) => {
                Self::invalid_url()
            }
            other => Self::ExternalServiceError(other.to_string()),
        }
    }
}

impl From<GuildConfigError> for ApplicationError {
    fn from(err: GuildConfigError) -> Self {
        Self::ValidationError(err.to_string())
    }
}
