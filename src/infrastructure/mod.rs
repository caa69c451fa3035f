//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现：外部工具适配器、持久化、内存管理器、
//! 后台任务与 HTTP 接口

pub mod adapters;
pub mod events;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod playback;
pub mod worker;

pub use events::EventPublisher;
pub use memory::{InMemorySessionManager, InMemoryTaskManager};
pub use persistence::sled::SledAudioCache;
pub use playback::{SessionPlayer, SessionPlayerConfig};
pub use worker::{CacheWorker, CacheWorkerConfig, Janitor, JanitorConfig};
