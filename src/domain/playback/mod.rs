//! Playback Context - 播放限界上下文
//!
//! 职责:
//! - 播放模式（队列 / 随机 / 电台）
//! - 选曲与电台防重复
//! - 播放状态

mod selector;
mod value_objects;

pub use selector::SongSelector;
pub use value_objects::{PlaybackMode, PlaybackState};
