//! Normalizer Adapter - ffmpeg 响度归一化

mod ffmpeg_normalizer;

pub use ffmpeg_normalizer::{FfmpegNormalizer, FfmpegNormalizerConfig};
