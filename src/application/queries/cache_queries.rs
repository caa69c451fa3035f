//! Cache Queries - 缓存状态查询

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::ports::{CacheTask, CacheTaskState};

/// 获取缓存统计
#[derive(Debug, Clone, Default)]
pub struct GetCacheStatsQuery;

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    /// 命中率（0-1），无访问时为 0
    pub hit_rate: f64,
    pub tasks_in_flight: usize,
}

/// 列出缓存任务
#[derive(Debug, Clone, Default)]
pub struct ListCacheTasksQuery;

#[derive(Debug, Clone, Serialize)]
pub struct CacheTaskInfo {
    pub task_id: String,
    pub cache_key: String,
    pub title: String,
    pub state: CacheTaskState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<CacheTask> for CacheTaskInfo {
    fn from(task: CacheTask) -> Self {
        Self {
            task_id: task.task_id,
            cache_key: task.cache_key,
            title: task.song.title,
            state: task.state,
            created_at: task.created_at,
            updated_at: task.updated_at,
            completed_at: task.completed_at,
            error: task.error_message,
        }
    }
}
