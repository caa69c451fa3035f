//! Cache Task Manager Port - 缓存任务管理
//!
//! 每个缓存 key 同时最多一个进行中的下载任务，具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::generate_cache_key;
use crate::domain::song::SongInfo;

/// Task Manager 错误
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task queue is full")]
    QueueFull,

    #[error("Task queue closed")]
    QueueClosed,
}

/// 缓存任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTaskState {
    /// 等待下载
    Pending,
    /// 正在下载原始音频
    Downloading,
    /// 正在归一化
    Normalizing,
    /// 已写入缓存
    Ready,
    /// 失败
    Failed,
}

impl CacheTaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTaskState::Pending => "pending",
            CacheTaskState::Downloading => "downloading",
            CacheTaskState::Normalizing => "normalizing",
            CacheTaskState::Ready => "ready",
            CacheTaskState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CacheTaskState::Ready | CacheTaskState::Failed)
    }
}

/// 缓存任务
#[derive(Debug, Clone)]
pub struct CacheTask {
    pub task_id: String,
    pub cache_key: String,
    pub song: SongInfo,
    pub state: CacheTaskState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl CacheTask {
    pub fn new(song: SongInfo) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4().to_string(),
            cache_key: generate_cache_key(&song.key()),
            song,
            state: CacheTaskState::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_message: None,
        }
    }
}

/// 提交结果
///
/// 重复提交不是错误，返回已有任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    /// 新任务已入队
    Queued(String),
    /// 已有进行中的任务
    InFlight(String),
}

impl Submitted {
    pub fn task_id(&self) -> &str {
        match self {
            Submitted::Queued(id) | Submitted::InFlight(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Submitted::Queued(_))
    }
}

/// Cache Task Manager Port
///
/// 任务以缓存 key 索引，所有状态存储在内存中
pub trait CacheTaskManagerPort: Send + Sync {
    /// 提交缓存任务，同一 key 已有未结束任务时去重
    fn submit(&self, song: SongInfo) -> Result<Submitted, TaskError>;

    /// 按缓存 key 获取任务
    fn get_task(&self, cache_key: &str) -> Option<CacheTask>;

    /// 设置任务状态
    fn set_state(&self, cache_key: &str, state: CacheTaskState) -> Result<(), TaskError>;

    /// 设置任务失败并记录错误
    fn set_failed(&self, cache_key: &str, error: String) -> Result<(), TaskError>;

    /// 所有任务
    fn list(&self) -> Vec<CacheTask>;

    /// 未结束的任务数
    fn in_flight(&self) -> usize;

    /// 清理结束超过 `max_age_secs` 的任务，返回清理数量
    fn cleanup_finished(&self, max_age_secs: u64) -> usize;
}
