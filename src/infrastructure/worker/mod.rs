//! Worker Layer - Background Task Processing
//!
//! - CacheWorker: 下载并归一化歌曲到缓存
//! - Janitor: 定期清理过期会话与缓存任务

mod cache_worker;
mod janitor;

pub use cache_worker::{CacheWorker, CacheWorkerConfig};
pub use janitor::{Janitor, JanitorConfig};
