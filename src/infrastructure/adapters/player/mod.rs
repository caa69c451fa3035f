//! Player Adapter - ffmpeg 实时转码

mod ffmpeg_player;

pub use ffmpeg_player::{FfmpegPlayer, FfmpegPlayerConfig, StreamFormat};
