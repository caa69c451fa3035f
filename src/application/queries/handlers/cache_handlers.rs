//! Cache Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{AudioCachePort, CacheTaskManagerPort};
use crate::application::queries::cache_queries::*;

/// GetCacheStats Handler
pub struct GetCacheStatsHandler {
    audio_cache: Arc<dyn AudioCachePort>,
    task_manager: Arc<dyn CacheTaskManagerPort>,
}

impl GetCacheStatsHandler {
    pub fn new(
        audio_cache: Arc<dyn AudioCachePort>,
        task_manager: Arc<dyn CacheTaskManagerPort>,
    ) -> Self {
        Self {
            audio_cache,
            task_manager,
        }
    }

    pub async fn handle(
        &self,
        _query: GetCacheStatsQuery,
    ) -> Result<CacheStatsResponse, ApplicationError> {
        let stats = self.audio_cache.stats().await;
        let lookups = stats.hit_count + stats.miss_count;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            stats.hit_count as f64 / lookups as f64
        };

        Ok(CacheStatsResponse {
            total_entries: stats.total_entries,
            total_size_bytes: stats.total_size_bytes,
            max_size_bytes: stats.max_size_bytes,
            hit_count: stats.hit_count,
            miss_count: stats.miss_count,
            hit_rate,
            tasks_in_flight: self.task_manager.in_flight(),
        })
    }
}

/// ListCacheTasks Handler - 最新的任务在前
pub struct ListCacheTasksHandler {
    task_manager: Arc<dyn CacheTaskManagerPort>,
}

impl ListCacheTasksHandler {
    pub fn new(task_manager: Arc<dyn CacheTaskManagerPort>) -> Self {
        Self { task_manager }
    }

    pub async fn handle(
        &self,
        _query: ListCacheTasksQuery,
    ) -> Result<Vec<CacheTaskInfo>, ApplicationError> {
        let mut tasks = self.task_manager.list();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks.into_iter().map(CacheTaskInfo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::CacheTaskState;
    use crate::application::testing::{song, FakeCache};
    use crate::infrastructure::memory::InMemoryTaskManager;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_stats_and_task_listing() {
        let (tx, _rx) = mpsc::channel(8);
        let task_manager = InMemoryTaskManager::new(tx).arc();
        task_manager.submit(song("a", 10)).unwrap();
        task_manager.submit(song("b", 10)).unwrap();
        task_manager.set_state("youtube_a", CacheTaskState::Ready).unwrap();

        let cache = FakeCache::new().arc();
        cache.insert("youtube_a");

        let stats = GetCacheStatsHandler::new(cache, task_manager.clone())
            .handle(GetCacheStatsQuery)
            .await
            .unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.tasks_in_flight, 1);
        assert_eq!(stats.hit_rate, 0.0);

        let tasks = ListCacheTasksHandler::new(task_manager)
            .handle(ListCacheTasksQuery)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().any(|t| t.state == CacheTaskState::Ready));
    }
}
