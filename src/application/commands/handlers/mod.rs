//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod cache_handlers;
mod guild_handlers;
mod music_handlers;
mod session_handlers;

pub use cache_handlers::*;
pub use guild_handlers::*;
pub use music_handlers::*;
pub use session_handlers::*;
