//! Song Resolver Port - 歌曲解析
//!
//! 将用户请求（链接或搜索词）解析为可播放歌曲，并提供流地址与下载能力
//! 具体实现在 infrastructure/adapters 层（yt-dlp）

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::song::SongInfo;

/// Resolver 错误
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unsupported song domain: {0}")]
    UnsupportedDomain(String),

    #[error("Tool failed: {0}")]
    ToolFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(String),
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct ResolvedRequest {
    /// 可播放的歌曲，保持原始顺序
    pub songs: Vec<SongInfo>,
    /// 被跳过的不可播放条目数
    pub unplayable: usize,
}

/// Song Resolver Port
#[async_trait]
pub trait SongResolverPort: Send + Sync {
    /// 解析请求，不下载任何音频
    async fn resolve(&self, query: &str) -> Result<ResolvedRequest, ResolveError>;

    /// 获取可直接播放的音频流地址
    async fn stream_url(&self, song: &SongInfo) -> Result<String, ResolveError>;

    /// 下载原始音频到 `dir`，文件名以 `stem` 开头，返回下载文件路径
    async fn download(
        &self,
        song: &SongInfo,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ResolveError>;
}
