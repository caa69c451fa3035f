//! Audio Player Port - 音频播放
//!
//! 将缓存文件或远程流转码为可推送给听众的字节流

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;

/// Player 错误
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Failed to spawn player: {0}")]
    SpawnFailed(String),

    #[error("Player exited with error: {0}")]
    ProcessFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 音频来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// 已归一化的缓存文件
    Cached { path: PathBuf },
    /// 远程流，播放时在线归一化
    Stream { url: String },
}

impl AudioSource {
    pub fn is_cached(&self) -> bool {
        matches!(self, AudioSource::Cached { .. })
    }
}

/// 音频字节流
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, PlayerError>> + Send>>;

/// Audio Player Port
#[async_trait]
pub trait AudioPlayerPort: Send + Sync {
    /// 打开音频来源，返回实时速率的编码字节流
    async fn open(&self, source: &AudioSource) -> Result<AudioStream, PlayerError>;

    /// 输出流的 MIME 类型
    fn content_type(&self) -> &'static str;
}
