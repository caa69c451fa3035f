//! Sled-based LRU Audio Cache Implementation
//!
//! Sled 保存索引，归一化后的音频文件存放在缓存目录

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{
    cache_file_name, AudioCachePort, CacheError, CacheMetadata, CacheStats,
};
use crate::domain::song::SongKey;

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 索引数据库路径
    pub db_path: String,
    /// 音频文件目录
    pub audio_dir: PathBuf,
    /// 最大缓存大小（字节），0 表示不限
    pub max_size_bytes: u64,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/cache.sled".to_string(),
            audio_dir: PathBuf::from("data/audio"),
            max_size_bytes: 10 * 1024 * 1024 * 1024, // 10GB
        }
    }
}

/// 内部索引条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    song_key: SongKey,
    file_name: String,
    size_bytes: u64,
    duration_secs: u32,
    last_accessed: i64,
    created_at: i64,
}

/// Sled 音频缓存
pub struct SledAudioCache {
    db: Db,
    audio_dir: PathBuf,
    max_size_bytes: u64,
    current_size: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl SledAudioCache {
    /// 创建新的缓存实例
    pub fn new(config: &SledCacheConfig) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&config.audio_dir)
            .map_err(|e| CacheError::IoError(e.to_string()))?;
        let db = sled::open(&config.db_path)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        let current_size = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            audio_dir = %config.audio_dir.display(),
            max_size_bytes = config.max_size_bytes,
            current_size = current_size,
            "SledAudioCache initialized"
        );

        Ok(Self {
            db,
            audio_dir: config.audio_dir.clone(),
            max_size_bytes: config.max_size_bytes,
            current_size: AtomicU64::new(current_size),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn record_key(cache_key: &str) -> String {
        format!("cache:{}", cache_key)
    }

    /// 计算索引中所有条目的总大小
    fn calculate_total_size(db: &Db) -> Result<u64, CacheError> {
        let mut total = 0u64;
        for item in db.scan_prefix("cache:") {
            let (_, value) = item.map_err(|e| CacheError::DatabaseError(e.to_string()))?;
            if let Ok(record) = bincode::deserialize::<CacheRecord>(&value) {
                total += record.size_bytes;
            }
        }
        Ok(total)
    }

    fn read_record(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        match self
            .db
            .get(key)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?
        {
            Some(data) => bincode::deserialize(&data)
                .map(Some)
                .map_err(|e| CacheError::SerializationError(e.to_string())),
            None => Ok(None),
        }
    }

    fn write_record(&self, key: &str, record: &CacheRecord) -> Result<(), CacheError> {
        let bytes =
            bincode::serialize(record).map_err(|e| CacheError::SerializationError(e.to_string()))?;
        self.db
            .insert(key, bytes)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// 删除索引条目，返回被删除的记录
    fn drop_record(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let removed = self
            .db
            .remove(key)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        let record = removed.and_then(|data| bincode::deserialize::<CacheRecord>(&data).ok());
        if let Some(record) = &record {
            let _ = self
                .current_size
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    Some(current.saturating_sub(record.size_bytes))
                });
        }
        Ok(record)
    }

    /// LRU 淘汰一条记录及其文件，缓存为空时返回 false
    async fn evict_lru(&self) -> Result<bool, CacheError> {
        let mut oldest: Option<(String, CacheRecord)> = None;

        for item in self.db.scan_prefix("cache:") {
            let (key, value) = item.map_err(|e| CacheError::DatabaseError(e.to_string()))?;
            if let Ok(record) = bincode::deserialize::<CacheRecord>(&value) {
                let is_older = oldest
                    .as_ref()
                    .map(|(_, r)| record.last_accessed < r.last_accessed)
                    .unwrap_or(true);

                if is_older {
                    let key_str = String::from_utf8(key.to_vec())
                        .map_err(|e| CacheError::SerializationError(e.to_string()))?;
                    oldest = Some((key_str, record));
                }
            }
        }

        let Some((key, _)) = oldest else {
            return Ok(false);
        };

        if let Some(record) = self.drop_record(&key)? {
            self.remove_file(&record.file_name).await;
            tracing::debug!(
                key = %key,
                song = %record.song_key,
                size_bytes = record.size_bytes,
                "LRU evicted cache entry"
            );
        }
        Ok(true)
    }

    async fn remove_file(&self, file_name: &str) {
        let path = self.audio_dir.join(file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove cached file");
            }
        }
    }
}

#[async_trait]
impl AudioCachePort for SledAudioCache {
    fn path_for(&self, cache_key: &str) -> PathBuf {
        self.audio_dir.join(cache_file_name(cache_key))
    }

    async fn put(
        &self,
        cache_key: &str,
        file: &Path,
        metadata: CacheMetadata,
    ) -> Result<PathBuf, CacheError> {
        let target = self.path_for(cache_key);
        if file != target.as_path() {
            tokio::fs::rename(file, &target)
                .await
                .map_err(|e| CacheError::IoError(e.to_string()))?;
        }
        let size = tokio::fs::metadata(&target)
            .await
            .map_err(|e| CacheError::IoError(e.to_string()))?
            .len();

        let key = Self::record_key(cache_key);
        // 覆盖已有条目时先扣除旧大小
        self.drop_record(&key)?;

        if self.max_size_bytes > 0 {
            while self.current_size.load(Ordering::Relaxed) + size > self.max_size_bytes {
                if !self.evict_lru().await? {
                    break;
                }
            }
        }

        let now = Utc::now().timestamp_millis();
        let record = CacheRecord {
            song_key: metadata.song,
            file_name: cache_file_name(cache_key),
            size_bytes: size,
            duration_secs: metadata.duration_secs,
            last_accessed: now,
            created_at: now,
        };
        self.write_record(&key, &record)?;
        self.current_size.fetch_add(size, Ordering::Relaxed);

        tracing::debug!(
            cache_key = %cache_key,
            size_bytes = size,
            "Audio cached"
        );

        Ok(target)
    }

    async fn get(&self, cache_key: &str) -> Result<Option<PathBuf>, CacheError> {
        let key = Self::record_key(cache_key);

        let Some(mut record) = self.read_record(&key)? else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let path = self.audio_dir.join(&record.file_name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(cache_key = %cache_key, "Cached file vanished, dropping index entry");
            self.drop_record(&key)?;
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        // 更新 last_accessed (LRU touch)
        record.last_accessed = Utc::now().timestamp_millis();
        self.write_record(&key, &record)?;

        self.hit_count.fetch_add(1, Ordering::Relaxed);
        Ok(Some(path))
    }

    async fn exists(&self, cache_key: &str) -> Result<bool, CacheError> {
        self.db
            .contains_key(Self::record_key(cache_key))
            .map_err(|e| CacheError::DatabaseError(e.to_string()))
    }

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError> {
        if let Some(record) = self.drop_record(&Self::record_key(cache_key))? {
            self.remove_file(&record.file_name).await;
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let total_entries = self.db.scan_prefix("cache:").count();

        CacheStats {
            total_entries,
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.db
            .flush_async()
            .await
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn open(dir: &TempDir, max_size_bytes: u64) -> SledAudioCache {
        let config = SledCacheConfig {
            db_path: dir.path().join("index.sled").to_string_lossy().to_string(),
            audio_dir: dir.path().join("audio"),
            max_size_bytes,
        };
        SledAudioCache::new(&config).unwrap()
    }

    fn metadata(id: &str) -> CacheMetadata {
        CacheMetadata {
            song: SongKey::new("youtube", id),
            duration_secs: 60,
        }
    }

    async fn staged_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, vec![0u8; size]).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_cache_put_get() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 1024 * 1024);

        let staged = staged_file(&dir, "staged.opus", 5).await;
        let stored = cache
            .put("youtube_a", &staged, metadata("a"))
            .await
            .unwrap();
        assert_eq!(stored, cache.path_for("youtube_a"));
        assert!(!staged.exists());

        let result = cache.get("youtube_a").await.unwrap();
        assert_eq!(result, Some(stored));
        assert!(cache.exists("youtube_a").await.unwrap());
        assert!(cache.get("youtube_b").await.unwrap().is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 5);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_put_in_place() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 0);
        let target = cache.path_for("youtube_a");
        tokio::fs::write(&target, b"opus").await.unwrap();

        let stored = cache.put("youtube_a", &target, metadata("a")).await.unwrap();
        assert_eq!(stored, target);
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_lru_eviction_removes_files() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 10);

        let a = staged_file(&dir, "a", 4).await;
        cache.put("youtube_a", &a, metadata("a")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = staged_file(&dir, "b", 4).await;
        cache.put("youtube_b", &b, metadata("b")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        // 访问 a 使 b 成为最久未使用
        cache.get("youtube_a").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let c = staged_file(&dir, "c", 4).await;
        cache.put("youtube_c", &c, metadata("c")).await.unwrap();

        assert!(cache.exists("youtube_a").await.unwrap());
        assert!(!cache.exists("youtube_b").await.unwrap());
        assert!(!cache.path_for("youtube_b").exists());
        assert!(cache.exists("youtube_c").await.unwrap());
        assert_eq!(cache.stats().await.total_size_bytes, 8);
    }

    #[tokio::test]
    async fn test_vanished_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = open(&dir, 0);
        let staged = staged_file(&dir, "staged", 3).await;
        let stored = cache.put("youtube_a", &staged, metadata("a")).await.unwrap();

        tokio::fs::remove_file(&stored).await.unwrap();

        assert!(cache.get("youtube_a").await.unwrap().is_none());
        assert!(!cache.exists("youtube_a").await.unwrap());
        let stats = cache.stats().await;
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.total_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_remove_and_reopen() {
        let dir = tempdir().unwrap();
        {
            let cache = open(&dir, 0);
            let a = staged_file(&dir, "a", 3).await;
            cache.put("youtube_a", &a, metadata("a")).await.unwrap();
            let b = staged_file(&dir, "b", 7).await;
            cache.put("youtube_b", &b, metadata("b")).await.unwrap();
            cache.remove("youtube_a").await.unwrap();
            assert!(!cache.path_for("youtube_a").exists());
            cache.flush().await.unwrap();
        }

        let cache = open(&dir, 0);
        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 7);
    }
}
