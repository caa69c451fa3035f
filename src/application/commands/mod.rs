//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod cache_commands;
mod guild_commands;
mod music_commands;
mod session_commands;

pub mod handlers;

pub use cache_commands::*;
pub use guild_commands::*;
pub use music_commands::*;
pub use session_commands::*;
