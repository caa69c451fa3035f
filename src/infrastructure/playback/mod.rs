//! Playback Layer - 服务器播放任务
//!
//! 实现 PlaybackPort：每个活跃服务器一个播放任务，音频块通过广播通道推送给 HTTP 听众

mod session_player;

pub use session_player::{SessionPlayer, SessionPlayerConfig};
