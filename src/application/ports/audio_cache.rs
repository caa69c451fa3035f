//! Audio Cache Port - 音频缓存管理
//!
//! 定义归一化音频缓存的抽象接口，索引使用 Sled (LRU)，音频文件存放在缓存目录

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::song::{SongKey, SONG_EXTENSION};

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 缓存元数据
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    pub song: SongKey,
    pub duration_secs: u32,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Audio Cache Port
///
/// - 缓存 key: 见 [`generate_cache_key`]
/// - 文件内容在写入前已完成响度归一化
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 缓存 key 对应的音频文件路径（不保证存在）
    fn path_for(&self, cache_key: &str) -> PathBuf;

    /// 登记已归一化的音频文件
    ///
    /// 文件不在缓存目录时会被移入；自动执行 LRU 淘汰以保持缓存大小在限制内
    async fn put(
        &self,
        cache_key: &str,
        file: &Path,
        metadata: CacheMetadata,
    ) -> Result<PathBuf, CacheError>;

    /// 查找缓存文件
    ///
    /// 同时更新 last_accessed 时间戳（LRU touch）
    async fn get(&self, cache_key: &str) -> Result<Option<PathBuf>, CacheError>;

    /// 检查缓存是否存在
    async fn exists(&self, cache_key: &str) -> Result<bool, CacheError>;

    /// 删除缓存条目及文件
    async fn remove(&self, cache_key: &str) -> Result<(), CacheError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;

    /// 将索引刷写到磁盘
    async fn flush(&self) -> Result<(), CacheError>;
}

/// 生成缓存 key
///
/// ID 只含 `[A-Za-z0-9_-]` 时直接使用 `{domain}_{id}`，否则对 ID 取 md5
pub fn generate_cache_key(key: &SongKey) -> String {
    let safe = !key.id.is_empty()
        && key
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if safe {
        format!("{}_{}", key.domain, key.id)
    } else {
        let digest = md5::compute(key.id.as_bytes());
        format!("{}_{:x}", key.domain, digest)
    }
}

/// 缓存 key 对应的音频文件名
pub fn cache_file_name(cache_key: &str) -> String {
    format!("{}.{}", cache_key, SONG_EXTENSION)
}
