//! Janitor - 定期清理空闲会话和已结束的缓存任务

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    CacheTaskManagerPort, SessionManagerPort, SessionRecord, SessionRepositoryPort,
};
use crate::infrastructure::events::EventPublisher;

#[derive(Debug, Clone)]
pub struct JanitorConfig {
    pub interval_secs: u64,
    /// 空闲会话过期时间
    pub session_expire_secs: u64,
    /// 已结束缓存任务保留时间
    pub task_retention_secs: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            session_expire_secs: 1800,
            task_retention_secs: 600,
        }
    }
}

pub struct Janitor {
    config: JanitorConfig,
    session_manager: Arc<dyn SessionManagerPort>,
    session_repo: Arc<dyn SessionRepositoryPort>,
    task_manager: Arc<dyn CacheTaskManagerPort>,
    event_publisher: Arc<EventPublisher>,
}

impl Janitor {
    pub fn new(
        config: JanitorConfig,
        session_manager: Arc<dyn SessionManagerPort>,
        session_repo: Arc<dyn SessionRepositoryPort>,
        task_manager: Arc<dyn CacheTaskManagerPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            config,
            session_manager,
            session_repo,
            task_manager,
            event_publisher,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            session_expire_secs = self.config.session_expire_secs,
            "Janitor started"
        );
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        // 第一次 tick 立即返回
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// 执行一轮清理，返回 (关闭的会话数, 清理的任务数)
    pub async fn sweep(&self) -> (usize, usize) {
        let expired = self
            .session_manager
            .get_expired_sessions(self.config.session_expire_secs);

        let mut closed = 0;
        for guild_id in expired {
            let session = match self.session_manager.get(guild_id) {
                Ok(session) => session,
                Err(_) => continue,
            };
            // 保存失败时保留会话，下一轮重试
            if let Err(e) = self
                .session_repo
                .save(&SessionRecord::from_session(&session, false))
                .await
            {
                tracing::warn!(guild_id = %guild_id, error = %e, "Failed to persist expired session");
                continue;
            }
            if self.session_manager.close(guild_id).is_ok() {
                self.event_publisher.publish_session_closed(guild_id, "expired");
                self.event_publisher.unregister_guild(guild_id);
                closed += 1;
            }
        }

        let purged = self
            .task_manager
            .cleanup_finished(self.config.task_retention_secs);

        if closed > 0 || purged > 0 {
            tracing::info!(closed, purged, "Janitor sweep finished");
        }
        (closed, purged)
    }
}
