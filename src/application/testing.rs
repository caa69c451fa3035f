//! 测试用端口实现

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::ports::{
    cache_file_name, AudioCachePort, AudioPlayerPort, AudioSource, AudioStream, CacheError,
    CacheMetadata, CacheStats, LoudnessNormalizerPort, LoudnessTarget, NormalizeError,
    NormalizeOutcome, PlayerError, ResolveError, ResolvedRequest, SongResolverPort,
};
use crate::domain::song::SongInfo;

/// 预设解析结果的 Resolver
pub struct FakeResolver {
    queries: Mutex<HashMap<String, ResolvedRequest>>,
    failing_downloads: Mutex<HashSet<String>>,
    download_delay: Mutex<Duration>,
    pub downloads: AtomicUsize,
    pub stream_urls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(HashMap::new()),
            failing_downloads: Mutex::new(HashSet::new()),
            download_delay: Mutex::new(Duration::ZERO),
            downloads: AtomicUsize::new(0),
            stream_urls: AtomicUsize::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn with_query(self, query: &str, songs: Vec<SongInfo>, unplayable: usize) -> Self {
        self.queries
            .lock()
            .unwrap()
            .insert(query.to_string(), ResolvedRequest { songs, unplayable });
        self
    }

    pub fn fail_download(self, id: &str) -> Self {
        self.failing_downloads.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn with_download_delay(self, delay: Duration) -> Self {
        *self.download_delay.lock().unwrap() = delay;
        self
    }
}

#[async_trait]
impl SongResolverPort for FakeResolver {
    async fn resolve(&self, query: &str) -> Result<ResolvedRequest, ResolveError> {
        self.queries
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .ok_or_else(|| ResolveError::InvalidQuery(query.to_string()))
    }

    async fn stream_url(&self, song: &SongInfo) -> Result<String, ResolveError> {
        self.stream_urls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://stream.invalid/{}", song.id))
    }

    async fn download(
        &self,
        song: &SongInfo,
        dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, ResolveError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.download_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if self.failing_downloads.lock().unwrap().contains(&song.id) {
            return Err(ResolveError::ToolFailed("download refused".to_string()));
        }
        let path = dir.join(format!("{}.src.webm", stem));
        tokio::fs::write(&path, b"source audio")
            .await
            .map_err(|e| ResolveError::IoError(e.to_string()))?;
        Ok(path)
    }
}

/// 复制文件代替归一化
pub struct FakeNormalizer {
    pub normalized: AtomicUsize,
}

impl FakeNormalizer {
    pub fn new() -> Self {
        Self {
            normalized: AtomicUsize::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl LoudnessNormalizerPort for FakeNormalizer {
    async fn normalize(&self, src: &Path, dst: &Path) -> Result<NormalizeOutcome, NormalizeError> {
        if dst.exists() {
            return Ok(NormalizeOutcome::AlreadyNormalized);
        }
        let data = tokio::fs::read(src).await?;
        tokio::fs::write(dst, [b"normalized:".as_slice(), &data].concat()).await?;
        tokio::fs::remove_file(src).await?;
        self.normalized.fetch_add(1, Ordering::SeqCst);
        Ok(NormalizeOutcome::Normalized)
    }

    fn stream_filter(&self) -> String {
        LoudnessTarget::default().filter()
    }
}

/// 只记录 key 的缓存
pub struct FakeCache {
    dir: PathBuf,
    keys: Mutex<HashSet<String>>,
}

impl FakeCache {
    pub fn new() -> Self {
        Self {
            dir: PathBuf::from("/fake-cache"),
            keys: Mutex::new(HashSet::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn insert(&self, cache_key: &str) {
        self.keys.lock().unwrap().insert(cache_key.to_string());
    }
}

#[async_trait]
impl AudioCachePort for FakeCache {
    fn path_for(&self, cache_key: &str) -> PathBuf {
        self.dir.join(cache_file_name(cache_key))
    }

    async fn put(
        &self,
        cache_key: &str,
        _file: &Path,
        _metadata: CacheMetadata,
    ) -> Result<PathBuf, CacheError> {
        self.insert(cache_key);
        Ok(self.path_for(cache_key))
    }

    async fn get(&self, cache_key: &str) -> Result<Option<PathBuf>, CacheError> {
        Ok(self
            .keys
            .lock()
            .unwrap()
            .contains(cache_key)
            .then(|| self.path_for(cache_key)))
    }

    async fn exists(&self, cache_key: &str) -> Result<bool, CacheError> {
        Ok(self.keys.lock().unwrap().contains(cache_key))
    }

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError> {
        self.keys.lock().unwrap().remove(cache_key);
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.keys.lock().unwrap().len(),
            ..Default::default()
        }
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// 产出固定字节块的播放器
pub struct FakePlayer {
    chunks: usize,
    chunk_delay: Duration,
    failing: Mutex<HashSet<String>>,
    pub opened: Mutex<Vec<AudioSource>>,
}

impl FakePlayer {
    pub fn new(chunks: usize, chunk_delay: Duration) -> Self {
        Self {
            chunks,
            chunk_delay,
            failing: Mutex::new(HashSet::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 路径或 URL 包含该片段的来源打开失败
    pub fn fail_on(self, fragment: &str) -> Self {
        self.failing.lock().unwrap().insert(fragment.to_string());
        self
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl AudioPlayerPort for FakePlayer {
    async fn open(&self, source: &AudioSource) -> Result<AudioStream, PlayerError> {
        self.opened.lock().unwrap().push(source.clone());
        let target = match source {
            AudioSource::Cached { path } => path.to_string_lossy().into_owned(),
            AudioSource::Stream { url } => url.clone(),
        };
        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| target.contains(fragment.as_str()))
        {
            return Err(PlayerError::SpawnFailed(target));
        }

        let delay = self.chunk_delay;
        let total = self.chunks;
        let stream = futures_util::stream::unfold(0usize, move |sent| {
            async move {
                if sent >= total {
                    return None;
                }
                tokio::time::sleep(delay).await;
                Some((Ok(Bytes::from(vec![sent as u8; 4])), sent + 1))
            }
        });
        Ok(Box::pin(stream))
    }

    fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }
}

/// 命令/查询处理器测试环境：内存 SQLite + 内存会话 + 假端口
pub struct MusicFixture {
    pub sessions: Arc<crate::infrastructure::memory::InMemorySessionManager>,
    pub guild_sessions: Arc<crate::application::services::GuildSessions>,
    pub playback: Arc<crate::infrastructure::playback::SessionPlayer>,
    pub player: Arc<FakePlayer>,
    pub resolver: Arc<FakeResolver>,
    pub cache: Arc<FakeCache>,
    pub task_manager: Arc<crate::infrastructure::memory::InMemoryTaskManager>,
    pub audio_source: Arc<crate::application::services::AudioSourceService>,
    pub song_repo: Arc<crate::infrastructure::persistence::sqlite::SqliteSongRepository>,
    pub guild_repo: Arc<crate::infrastructure::persistence::sqlite::SqliteGuildRepository>,
    pub session_repo: Arc<crate::infrastructure::persistence::sqlite::SqliteSessionRepository>,
    pub events: Arc<crate::infrastructure::events::EventPublisher>,
    _queue_rx: tokio::sync::mpsc::Receiver<String>,
}

impl MusicFixture {
    pub async fn new(resolver: FakeResolver, player: FakePlayer) -> Self {
        use crate::application::services::{AudioSourceService, GuildSessions};
        use crate::domain::guild::GuildConfig;
        use crate::infrastructure::events::EventPublisher;
        use crate::infrastructure::memory::{InMemorySessionManager, InMemoryTaskManager};
        use crate::infrastructure::persistence::sqlite::{
            create_pool, run_migrations, DatabaseConfig, SqliteGuildRepository,
            SqliteSessionRepository, SqliteSongRepository,
        };
        use crate::infrastructure::playback::{SessionPlayer, SessionPlayerConfig};

        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let events = EventPublisher::new().arc();
        let sessions = InMemorySessionManager::new().arc();
        let song_repo = Arc::new(SqliteSongRepository::new(pool.clone()));
        let guild_repo = Arc::new(SqliteGuildRepository::new(pool.clone()));
        let session_repo = Arc::new(SqliteSessionRepository::new(pool));
        let guild_sessions = GuildSessions::new(
            sessions.clone(),
            guild_repo.clone(),
            session_repo.clone(),
            song_repo.clone(),
            GuildConfig::default(),
        )
        .arc();

        let resolver = resolver.arc();
        let cache = FakeCache::new().arc();
        let task_manager = InMemoryTaskManager::new(tx).arc();
        let audio_source = AudioSourceService::new(
            cache.clone(),
            resolver.clone(),
            task_manager.clone(),
            events.clone(),
        )
        .arc();

        let player = player.arc();
        let playback = SessionPlayer::new(
            SessionPlayerConfig {
                require_listeners: false,
                ..Default::default()
            },
            sessions.clone(),
            audio_source.clone(),
            player.clone(),
            events.clone(),
        )
        .arc();

        Self {
            sessions,
            guild_sessions,
            playback,
            player,
            resolver,
            cache,
            task_manager,
            audio_source,
            song_repo,
            guild_repo,
            session_repo,
            events,
            _queue_rx: rx,
        }
    }
}

/// 轮询直到条件成立
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

pub fn song(id: &str, duration: u32) -> SongInfo {
    SongInfo::new("youtube", id, duration, format!("Song {}", id))
}
