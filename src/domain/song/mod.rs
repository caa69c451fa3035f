//! Song Context - 歌曲限界上下文
//!
//! 职责:
//! - 歌曲标识与元数据
//! - 播放队列
//! - 服务器歌单

mod errors;
mod queue;
mod set;
mod value_objects;

pub use errors::SongError;
pub use queue::SongQueue;
pub use set::SongSet;
pub use value_objects::{format_duration, is_known_domain, SongInfo, SongKey, SONG_EXTENSION};
