//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod cache_queries;
mod guild_queries;
mod music_queries;

pub mod handlers;

pub use cache_queries::*;
pub use guild_queries::*;
pub use music_queries::*;
