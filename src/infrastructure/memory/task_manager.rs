//! In-Memory Cache Task Manager Implementation

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::ports::{
    CacheTask, CacheTaskManagerPort, CacheTaskState, Submitted, TaskError,
};
use crate::domain::song::SongInfo;

/// 内存缓存任务管理器
pub struct InMemoryTaskManager {
    /// cache_key -> CacheTask
    tasks: DashMap<String, CacheTask>,
    /// 任务队列发送端（cache_key）
    queue_sender: mpsc::Sender<String>,
}

impl InMemoryTaskManager {
    pub fn new(queue_sender: mpsc::Sender<String>) -> Self {
        Self {
            tasks: DashMap::new(),
            queue_sender,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl CacheTaskManagerPort for InMemoryTaskManager {
    fn submit(&self, song: SongInfo) -> Result<Submitted, TaskError> {
        let task = CacheTask::new(song);
        let cache_key = task.cache_key.clone();
        let task_id = task.task_id.clone();

        match self.tasks.entry(cache_key.clone()) {
            Entry::Occupied(entry) if !entry.get().state.is_terminal() => {
                let existing = entry.get().task_id.clone();
                tracing::debug!(cache_key = %cache_key, task_id = %existing, "Cache task already in flight");
                return Ok(Submitted::InFlight(existing));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(task);
            }
            Entry::Vacant(entry) => {
                entry.insert(task);
            }
        }

        // 发送到队列
        if let Err(e) = self.queue_sender.try_send(cache_key.clone()) {
            tracing::warn!(cache_key = %cache_key, error = %e, "Failed to enqueue cache task");
            let err = match e {
                mpsc::error::TrySendError::Full(_) => TaskError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => TaskError::QueueClosed,
            };
            self.set_failed(&cache_key, err.to_string())?;
            return Err(err);
        }

        tracing::debug!(cache_key = %cache_key, task_id = %task_id, "Cache task submitted");
        Ok(Submitted::Queued(task_id))
    }

    fn get_task(&self, cache_key: &str) -> Option<CacheTask> {
        self.tasks.get(cache_key).map(|t| t.clone())
    }

    fn set_state(&self, cache_key: &str, state: CacheTaskState) -> Result<(), TaskError> {
        let mut task = self
            .tasks
            .get_mut(cache_key)
            .ok_or_else(|| TaskError::NotFound(cache_key.to_string()))?;

        let old_state = task.state;
        let now = Utc::now();
        task.state = state;
        task.updated_at = now;

        if state.is_terminal() {
            task.completed_at = Some(now);
        }

        tracing::debug!(
            cache_key = %cache_key,
            old_state = ?old_state,
            new_state = ?state,
            "Cache task state changed"
        );
        Ok(())
    }

    fn set_failed(&self, cache_key: &str, error: String) -> Result<(), TaskError> {
        let mut task = self
            .tasks
            .get_mut(cache_key)
            .ok_or_else(|| TaskError::NotFound(cache_key.to_string()))?;

        let now = Utc::now();
        task.state = CacheTaskState::Failed;
        task.error_message = Some(error);
        task.updated_at = now;
        task.completed_at = Some(now);
        Ok(())
    }

    fn list(&self) -> Vec<CacheTask> {
        let mut tasks: Vec<CacheTask> = self.tasks.iter().map(|t| t.clone()).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    fn in_flight(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| !t.state.is_terminal())
            .count()
    }

    fn cleanup_finished(&self, max_age_secs: u64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_secs as i64);
        let before = self.tasks.len();
        self.tasks.retain(|_, task| match task.completed_at {
            Some(completed) => completed > cutoff,
            None => true,
        });
        let removed = before.saturating_sub(self.tasks.len());
        if removed > 0 {
            tracing::debug!(removed, "Finished cache tasks cleaned up");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str) -> SongInfo {
        SongInfo::new("youtube", id, 100, id)
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let (tx, mut rx) = mpsc::channel(100);
        let manager = InMemoryTaskManager::new(tx);

        let submitted = manager.submit(song("abc")).unwrap();
        assert!(submitted.is_new());

        // Check queue
        assert_eq!(rx.try_recv().unwrap(), "youtube_abc");

        let task = manager.get_task("youtube_abc").unwrap();
        assert_eq!(task.task_id, submitted.task_id());
        assert_eq!(task.state, CacheTaskState::Pending);

        manager
            .set_state("youtube_abc", CacheTaskState::Downloading)
            .unwrap();
        assert_eq!(manager.in_flight(), 1);

        manager
            .set_state("youtube_abc", CacheTaskState::Ready)
            .unwrap();
        let task = manager.get_task("youtube_abc").unwrap();
        assert!(task.completed_at.is_some());
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_submit_resolves_to_existing() {
        let (tx, mut rx) = mpsc::channel(100);
        let manager = InMemoryTaskManager::new(tx);

        let first = manager.submit(song("abc")).unwrap();
        let second = manager.submit(song("abc")).unwrap();
        assert_eq!(second, Submitted::InFlight(first.task_id().to_string()));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resubmit_after_failure() {
        let (tx, mut rx) = mpsc::channel(100);
        let manager = InMemoryTaskManager::new(tx);

        let first = manager.submit(song("abc")).unwrap();
        manager
            .set_failed("youtube_abc", "boom".to_string())
            .unwrap();
        assert_eq!(
            manager.get_task("youtube_abc").unwrap().error_message.as_deref(),
            Some("boom")
        );

        let second = manager.submit(song("abc")).unwrap();
        assert!(second.is_new());
        assert_ne!(first.task_id(), second.task_id());
        assert_eq!(rx.try_recv().unwrap(), "youtube_abc");
        assert_eq!(rx.try_recv().unwrap(), "youtube_abc");
    }

    #[tokio::test]
    async fn test_full_queue_marks_task_failed() {
        let (tx, _rx) = mpsc::channel(1);
        let manager = InMemoryTaskManager::new(tx);

        manager.submit(song("a")).unwrap();
        let err = manager.submit(song("b")).unwrap_err();
        assert!(matches!(err, TaskError::QueueFull));
        assert_eq!(
            manager.get_task("youtube_b").unwrap().state,
            CacheTaskState::Failed
        );
    }

    #[tokio::test]
    async fn test_cleanup_finished() {
        let (tx, _rx) = mpsc::channel(100);
        let manager = InMemoryTaskManager::new(tx);

        manager.submit(song("a")).unwrap();
        manager.submit(song("b")).unwrap();
        manager.set_state("youtube_a", CacheTaskState::Ready).unwrap();

        assert_eq!(manager.cleanup_finished(3600), 0);
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert_eq!(manager.cleanup_finished(0), 1);
        assert!(manager.get_task("youtube_a").is_none());
        assert!(manager.get_task("youtube_b").is_some());
        assert_eq!(manager.list().len(), 1);
    }
}
