//! Loudness Normalizer Port - 响度归一化
//!
//! 缓存音频使用两遍归一化，直播流使用单遍滤镜

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// 归一化错误
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Tool failed: {0}")]
    ToolFailed(String),

    #[error("Failed to parse loudness measurement: {0}")]
    MeasurementParse(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for NormalizeError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// 归一化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// 本次完成了归一化
    Normalized,
    /// 目标文件或临时文件已存在，跳过
    AlreadyNormalized,
}

/// 响度目标（EBU R128）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessTarget {
    /// 综合响度 (LUFS)
    pub integrated: f64,
    /// 响度范围 (LU)
    pub range: f64,
    /// 真峰值 (dBTP)
    pub true_peak: f64,
}

impl Default for LoudnessTarget {
    fn default() -> Self {
        Self {
            integrated: -15.0,
            range: 7.0,
            true_peak: -2.0,
        }
    }
}

impl LoudnessTarget {
    /// 单遍 loudnorm 滤镜
    pub fn filter(&self) -> String {
        format!(
            "loudnorm=I={}:LRA={}:TP={}",
            self.integrated, self.range, self.true_peak
        )
    }
}

/// Loudness Normalizer Port
#[async_trait]
pub trait LoudnessNormalizerPort: Send + Sync {
    /// 将 `src` 归一化并编码为 `dst`
    ///
    /// 先写入同名 `.tmp` 文件，完成后原子重命名
    async fn normalize(&self, src: &Path, dst: &Path) -> Result<NormalizeOutcome, NormalizeError>;

    /// 直播流使用的 ffmpeg 音频滤镜
    fn stream_filter(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(LoudnessTarget::default().filter(), "loudnorm=I=-15:LRA=7:TP=-2");
    }

    #[test]
    fn test_fractional_filter() {
        let target = LoudnessTarget {
            integrated: -16.5,
            range: 11.0,
            true_peak: -1.5,
        };
        assert_eq!(target.filter(), "loudnorm=I=-16.5:LRA=11:TP=-1.5");
    }
}
