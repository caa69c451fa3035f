//! Audio Source Service - 音频来源选择
//!
//! 缓存命中时播放已归一化的文件，否则直接串流并在后台提交缓存任务

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    generate_cache_key, AudioCachePort, AudioSource, CacheTaskManagerPort, SongResolverPort,
    Submitted,
};
use crate::domain::guild::GuildConfig;
use crate::domain::song::SongInfo;
use crate::infrastructure::events::EventPublisher;

pub struct AudioSourceService {
    cache: Arc<dyn AudioCachePort>,
    resolver: Arc<dyn SongResolverPort>,
    task_manager: Arc<dyn CacheTaskManagerPort>,
    event_publisher: Arc<EventPublisher>,
}

impl AudioSourceService {
    pub fn new(
        cache: Arc<dyn AudioCachePort>,
        resolver: Arc<dyn SongResolverPort>,
        task_manager: Arc<dyn CacheTaskManagerPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            cache,
            resolver,
            task_manager,
            event_publisher,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 选择歌曲的音频来源
    ///
    /// 缓存提交失败不影响播放
    pub async fn audio_source(
        &self,
        song: &SongInfo,
        config: &GuildConfig,
    ) -> Result<AudioSource, ApplicationError> {
        let cache_key = generate_cache_key(&song.key());

        if let Some(path) = self.cache.get(&cache_key).await? {
            tracing::debug!(cache_key = %cache_key, "Playing from cache");
            return Ok(AudioSource::Cached { path });
        }

        let url = self.resolver.stream_url(song).await?;

        if config.should_cache(song.duration) {
            self.request_cache(song);
        } else {
            tracing::debug!(
                cache_key = %cache_key,
                duration = song.duration,
                max_cached_duration = config.max_cached_duration(),
                "Song too long to cache"
            );
        }

        tracing::debug!(cache_key = %cache_key, "Streaming from source");
        Ok(AudioSource::Stream { url })
    }

    /// 提交缓存任务，重复提交复用进行中的任务
    pub fn request_cache(&self, song: &SongInfo) -> Option<Submitted> {
        match self.task_manager.submit(song.clone()) {
            Ok(submitted) => {
                if submitted.is_new() {
                    if let Some(task) = self.task_manager.get_task(&generate_cache_key(&song.key())) {
                        self.event_publisher.publish_cache_task(&task);
                    }
                }
                Some(submitted)
            }
            Err(e) => {
                tracing::warn!(song = %song.key(), error = %e, "Failed to submit cache task");
                None
            }
        }
    }
}
