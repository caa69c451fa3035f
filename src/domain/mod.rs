//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Song Context: 歌曲、队列与歌单
//! - Guild Context: 服务器配置
//! - Playback Context: 播放模式与选曲

pub mod guild;
pub mod playback;
pub mod song;
