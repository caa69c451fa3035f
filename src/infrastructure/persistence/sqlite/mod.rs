//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod guild_repo;
mod session_repo;
mod song_repo;

pub use database::*;
pub use guild_repo::*;
pub use session_repo::*;
pub use song_repo::*;
