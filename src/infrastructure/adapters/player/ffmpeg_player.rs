//! FFmpeg Player - 实时速率转码输出
//!
//! 实现 AudioPlayerPort trait。缓存文件已归一化，直接转码；
//! 远程流在转码时附加 loudnorm 滤镜

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::io::ReaderStream;

use crate::application::ports::{
    AudioPlayerPort, AudioSource, AudioStream, LoudnessNormalizerPort, PlayerError,
};

/// 输出流格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Mp3,
    Opus,
}

impl StreamFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            StreamFormat::Mp3 => "audio/mpeg",
            StreamFormat::Opus => "audio/ogg",
        }
    }

    fn codec_args(&self) -> [&'static str; 4] {
        match self {
            StreamFormat::Mp3 => ["-c:a", "libmp3lame", "-f", "mp3"],
            StreamFormat::Opus => ["-c:a", "libopus", "-f", "ogg"],
        }
    }
}

/// 播放器配置
#[derive(Debug, Clone)]
pub struct FfmpegPlayerConfig {
    pub binary: PathBuf,
    pub format: StreamFormat,
    pub bitrate: String,
    pub sample_rate: u32,
    pub channels: u32,
}

impl Default for FfmpegPlayerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            format: StreamFormat::Mp3,
            bitrate: "128k".to_string(),
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// FFmpeg 播放器
pub struct FfmpegPlayer {
    config: FfmpegPlayerConfig,
    normalizer: Arc<dyn LoudnessNormalizerPort>,
}

impl FfmpegPlayer {
    pub fn new(config: FfmpegPlayerConfig, normalizer: Arc<dyn LoudnessNormalizerPort>) -> Self {
        Self { config, normalizer }
    }

    fn build_args(&self, source: &AudioSource) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-loglevel", "error"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let input = match source {
            AudioSource::Cached { path } => path.to_string_lossy().into_owned(),
            AudioSource::Stream { url } => {
                args.extend(
                    [
                        "-reconnect",
                        "1",
                        "-reconnect_streamed",
                        "1",
                        "-reconnect_delay_max",
                        "5",
                    ]
                    .iter()
                    .map(|s| s.to_string()),
                );
                url.clone()
            }
        };

        args.extend(["-re".to_string(), "-i".to_string(), input, "-vn".to_string()]);

        if let AudioSource::Stream { .. } = source {
            args.push("-af".to_string());
            args.push(self.normalizer.stream_filter());
        }

        args.extend(self.config.format.codec_args().iter().map(|s| s.to_string()));
        args.extend([
            "-b:a".to_string(),
            self.config.bitrate.clone(),
            "-ar".to_string(),
            self.config.sample_rate.to_string(),
            "-ac".to_string(),
            self.config.channels.to_string(),
            "pipe:1".to_string(),
        ]);
        args
    }
}

#[async_trait]
impl AudioPlayerPort for FfmpegPlayer {
    async fn open(&self, source: &AudioSource) -> Result<AudioStream, PlayerError> {
        let mut child = Command::new(&self.config.binary)
            .args(self.build_args(source))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayerError::SpawnFailed(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlayerError::SpawnFailed("stdout not captured".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(line = %line, "ffmpeg");
                }
            });
        }

        tracing::debug!(cached = source.is_cached(), "Player opened");

        let reader = ReaderStream::new(stdout);
        let stream = futures_util::stream::unfold(Some((child, reader)), |state| async move {
            let (mut child, mut reader) = state?;
            match reader.next().await {
                Some(Ok(bytes)) => Some((Ok(bytes), Some((child, reader)))),
                Some(Err(e)) => Some((Err(PlayerError::IoError(e.to_string())), None)),
                None => match child.wait().await {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some((
                        Err(PlayerError::ProcessFailed(format!("ffmpeg exited with {}", status))),
                        None,
                    )),
                    Err(e) => Some((Err(PlayerError::IoError(e.to_string())), None)),
                },
            }
        });

        Ok(Box::pin(stream))
    }

    fn content_type(&self) -> &'static str {
        self.config.format.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::normalizer::{FfmpegNormalizer, FfmpegNormalizerConfig};

    fn player(binary: &str) -> FfmpegPlayer {
        FfmpegPlayer::new(
            FfmpegPlayerConfig {
                binary: PathBuf::from(binary),
                ..Default::default()
            },
            Arc::new(FfmpegNormalizer::new(FfmpegNormalizerConfig::default())),
        )
    }

    #[test]
    fn test_stream_source_is_normalized_inline() {
        let args = player("ffmpeg").build_args(&AudioSource::Stream {
            url: "https://example.com/audio".to_string(),
        });
        let af = args.iter().position(|a| a == "-af").unwrap();
        assert_eq!(args[af + 1], "loudnorm=I=-15:LRA=7:TP=-2");
        assert!(args.contains(&"-reconnect".to_string()));
        assert!(args.contains(&"-re".to_string()));
        assert_eq!(args.last().unwrap(), "pipe:1");
    }

    #[test]
    fn test_cached_source_skips_filter() {
        let args = player("ffmpeg").build_args(&AudioSource::Cached {
            path: PathBuf::from("/data/audio/youtube_a.opus"),
        });
        assert!(!args.contains(&"-af".to_string()));
        assert!(!args.contains(&"-reconnect".to_string()));
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input + 1], "/data/audio/youtube_a.opus");
        assert!(args.contains(&"libmp3lame".to_string()));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(player("ffmpeg").content_type(), "audio/mpeg");
        assert_eq!(StreamFormat::Opus.content_type(), "audio/ogg");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let result = player("/nonexistent/ffmpeg")
            .open(&AudioSource::Cached {
                path: PathBuf::from("x.opus"),
            })
            .await;
        assert!(matches!(result, Err(PlayerError::SpawnFailed(_))));
    }
}
