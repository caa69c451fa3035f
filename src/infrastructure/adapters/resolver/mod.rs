//! Resolver Adapter - yt-dlp 歌曲解析

mod ytdlp_resolver;

pub use ytdlp_resolver::{YtDlpConfig, YtDlpResolver};
