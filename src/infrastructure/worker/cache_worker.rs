//! Cache Worker - 后台下载与响度归一化

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::application::ports::{
    AudioCachePort, CacheMetadata, CacheTask, CacheTaskManagerPort, CacheTaskState,
    LoudnessNormalizerPort, NormalizeOutcome, SongResolverPort,
};
use crate::infrastructure::events::EventPublisher;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct CacheWorkerConfig {
    /// 最大并发缓存任务数
    pub max_concurrent: usize,
    /// 下载原始音频的暂存目录
    pub staging_dir: PathBuf,
}

impl Default for CacheWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            staging_dir: PathBuf::from("./data/downloads"),
        }
    }
}

/// 单个任务所需的依赖
#[derive(Clone)]
struct CacheJob {
    staging_dir: PathBuf,
    task_manager: Arc<dyn CacheTaskManagerPort>,
    resolver: Arc<dyn SongResolverPort>,
    normalizer: Arc<dyn LoudnessNormalizerPort>,
    audio_cache: Arc<dyn AudioCachePort>,
    event_publisher: Arc<EventPublisher>,
}

/// 缓存 Worker
///
/// 从队列消费缓存 key，下载源音频、归一化后登记到缓存
pub struct CacheWorker {
    config: CacheWorkerConfig,
    queue_receiver: mpsc::Receiver<String>,
    job: CacheJob,
}

impl CacheWorker {
    pub fn new(
        config: CacheWorkerConfig,
        queue_receiver: mpsc::Receiver<String>,
        task_manager: Arc<dyn CacheTaskManagerPort>,
        resolver: Arc<dyn SongResolverPort>,
        normalizer: Arc<dyn LoudnessNormalizerPort>,
        audio_cache: Arc<dyn AudioCachePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        let job = CacheJob {
            staging_dir: config.staging_dir.clone(),
            task_manager,
            resolver,
            normalizer,
            audio_cache,
            event_publisher,
        };
        Self {
            config,
            queue_receiver,
            job,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            staging_dir = %self.config.staging_dir.display(),
            "CacheWorker started"
        );

        if let Err(e) = tokio::fs::create_dir_all(&self.config.staging_dir).await {
            tracing::error!(error = %e, "Failed to create staging directory");
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));

        while let Some(cache_key) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    break;
                }
            };

            let job = self.job.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成
                job.process(&cache_key).await;
            });
        }

        // 等待进行中的任务结束
        let _ = semaphore
            .acquire_many(self.config.max_concurrent.max(1) as u32)
            .await;
        tracing::info!("CacheWorker stopped");
    }
}

impl CacheJob {
    /// 处理单个缓存任务
    async fn process(&self, cache_key: &str) {
        let task = match self.task_manager.get_task(cache_key) {
            Some(t) => t,
            None => {
                tracing::warn!(cache_key = %cache_key, "Cache task not found, skipping");
                return;
            }
        };

        if let Ok(true) = self.audio_cache.exists(cache_key).await {
            tracing::debug!(cache_key = %cache_key, "Already cached, marking as ready");
            self.transition(&task, CacheTaskState::Ready);
            return;
        }

        // 下载
        self.transition(&task, CacheTaskState::Downloading);
        let source = match self
            .resolver
            .download(&task.song, &self.staging_dir, cache_key)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                self.fail(&task, format!("Download error: {}", e));
                return;
            }
        };

        // 归一化
        self.transition(&task, CacheTaskState::Normalizing);
        let target = self.audio_cache.path_for(cache_key);
        if let Some(parent) = target.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                self.fail(&task, format!("IO error: {}", e));
                return;
            }
        }
        // 同一 key 只有一个进行中的任务，残留的临时文件来自中断的运行
        remove_stale(&target.with_extension("tmp")).await;

        match self.normalizer.normalize(&source, &target).await {
            Ok(NormalizeOutcome::Normalized) => {}
            Ok(NormalizeOutcome::AlreadyNormalized) => {
                tracing::debug!(cache_key = %cache_key, "Normalized file already present");
                remove_stale(&source).await;
            }
            Err(e) => {
                remove_stale(&source).await;
                self.fail(&task, format!("Normalize error: {}", e));
                return;
            }
        }

        // 登记到缓存
        let metadata = CacheMetadata {
            song: task.song.key(),
            duration_secs: task.song.duration,
        };
        if let Err(e) = self.audio_cache.put(cache_key, &target, metadata).await {
            self.fail(&task, format!("Cache error: {}", e));
            return;
        }

        self.transition(&task, CacheTaskState::Ready);
        tracing::info!(
            cache_key = %cache_key,
            title = %task.song.title,
            duration = task.song.duration,
            "Song cached"
        );
    }

    fn transition(&self, task: &CacheTask, state: CacheTaskState) {
        if let Err(e) = self.task_manager.set_state(&task.cache_key, state) {
            tracing::error!(cache_key = %task.cache_key, error = %e, "Failed to update task state");
        }
        self.event_publisher.publish_cache_state(task, state, None);
    }

    fn fail(&self, task: &CacheTask, error: String) {
        tracing::error!(cache_key = %task.cache_key, error = %error, "Cache task failed");
        let _ = self.task_manager.set_failed(&task.cache_key, error.clone());
        self.event_publisher
            .publish_cache_state(task, CacheTaskState::Failed, Some(error));
    }
}

async fn remove_stale(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::generate_cache_key;
    use crate::application::testing::{FakeNormalizer, FakeResolver};
    use crate::domain::song::SongInfo;
    use crate::infrastructure::memory::InMemoryTaskManager;
    use crate::infrastructure::persistence::{SledAudioCache, SledCacheConfig};
    use crate::infrastructure::events::WsEvent;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        task_manager: Arc<InMemoryTaskManager>,
        resolver: Arc<FakeResolver>,
        normalizer: Arc<FakeNormalizer>,
        cache: Arc<SledAudioCache>,
        events: Arc<EventPublisher>,
    }

    fn harness(resolver: FakeResolver) -> Harness {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel(16);
        let task_manager = InMemoryTaskManager::new(tx).arc();
        let resolver = resolver.arc();
        let normalizer = FakeNormalizer::new().arc();
        let cache = Arc::new(
            SledAudioCache::new(&SledCacheConfig {
                db_path: dir.path().join("index").to_string_lossy().into_owned(),
                audio_dir: dir.path().join("audio"),
                max_size_bytes: 0,
            })
            .unwrap(),
        );
        let events = EventPublisher::new().arc();

        let worker = CacheWorker::new(
            CacheWorkerConfig {
                max_concurrent: 2,
                staging_dir: dir.path().join("downloads"),
            },
            rx,
            task_manager.clone(),
            resolver.clone(),
            normalizer.clone(),
            cache.clone(),
            events.clone(),
        );
        tokio::spawn(worker.run());

        Harness {
            _dir: dir,
            task_manager,
            resolver,
            normalizer,
            cache,
            events,
        }
    }

    async fn wait_terminal(manager: &InMemoryTaskManager, cache_key: &str) -> CacheTask {
        for _ in 0..200 {
            if let Some(task) = manager.get_task(cache_key) {
                if task.state.is_terminal() {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} did not finish", cache_key);
    }

    #[tokio::test]
    async fn test_download_normalize_and_cache() {
        let h = harness(FakeResolver::new());
        let mut events = h.events.subscribe_global();
        let song = SongInfo::new("youtube", "abc", 120, "Abc");
        let key = generate_cache_key(&song.key());

        h.task_manager.submit(song).unwrap();
        let task = wait_terminal(&h.task_manager, &key).await;

        assert_eq!(task.state, CacheTaskState::Ready);
        let path = h.cache.get(&key).await.unwrap().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"normalized:source audio");
        assert_eq!(h.normalizer.normalized.load(Ordering::SeqCst), 1);

        let mut states = Vec::new();
        while let Ok(WsEvent::CacheTaskChanged { state, .. }) = events.try_recv() {
            states.push(state);
        }
        assert_eq!(states, vec!["downloading", "normalizing", "ready"]);
    }

    #[tokio::test]
    async fn test_download_failure_marks_task_failed() {
        let h = harness(FakeResolver::new().fail_download("bad"));
        let song = SongInfo::new("youtube", "bad", 120, "Bad");
        let key = generate_cache_key(&song.key());

        h.task_manager.submit(song).unwrap();
        let task = wait_terminal(&h.task_manager, &key).await;

        assert_eq!(task.state, CacheTaskState::Failed);
        assert!(task.error_message.unwrap().contains("download refused"));
        assert!(!h.cache.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_already_cached_skips_download() {
        let h = harness(FakeResolver::new());
        let song = SongInfo::new("youtube", "again", 60, "Again");
        let key = generate_cache_key(&song.key());

        h.task_manager.submit(song.clone()).unwrap();
        wait_terminal(&h.task_manager, &key).await;
        h.task_manager.submit(song).unwrap();
        let task = wait_terminal(&h.task_manager, &key).await;

        assert_eq!(task.state, CacheTaskState::Ready);
        assert_eq!(h.resolver.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_tmp_is_replaced() {
        let h = harness(FakeResolver::new());
        let song = SongInfo::new("youtube", "stale", 60, "Stale");
        let key = generate_cache_key(&song.key());
        let target = h.cache.path_for(&key);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target.with_extension("tmp"), b"half").unwrap();

        h.task_manager.submit(song).unwrap();
        let task = wait_terminal(&h.task_manager, &key).await;

        assert_eq!(task.state, CacheTaskState::Ready);
        assert!(!target.with_extension("tmp").exists());
        assert_eq!(std::fs::read(target).unwrap(), b"normalized:source audio");
    }
}
