//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod cache_handlers;
mod guild_handlers;
mod music_handlers;

pub use cache_handlers::*;
pub use guild_handlers::*;
pub use music_handlers::*;
