//! Memory Layer - In-Memory State Management
//!
//! 实现 SessionManager 和 CacheTaskManager，管理服务器会话和缓存任务的内存状态

mod session_manager;
mod task_manager;

pub use session_manager::InMemorySessionManager;
pub use task_manager::InMemoryTaskManager;
