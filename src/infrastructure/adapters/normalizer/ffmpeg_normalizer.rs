//! FFmpeg Loudness Normalizer
//!
//! 实现 LoudnessNormalizerPort trait
//!
//! 两遍 loudnorm:
//! 1. 测量: ffmpeg -i src -af loudnorm=...:print_format=json -f null -
//! 2. 线性归一化并编码为 Opus，写入 `.tmp` 后重命名

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::application::ports::{
    LoudnessNormalizerPort, LoudnessTarget, NormalizeError, NormalizeOutcome,
};

/// 归一化配置
#[derive(Debug, Clone)]
pub struct FfmpegNormalizerConfig {
    /// ffmpeg 可执行文件
    pub binary: PathBuf,
    pub target: LoudnessTarget,
    /// Opus 码率，如 "96k"
    pub bitrate: String,
    pub sample_rate: u32,
    pub channels: u32,
    /// 归一化后保留下载的原始文件
    pub keep_source: bool,
    /// 单遍超时（秒）
    pub timeout_secs: u64,
}

impl Default for FfmpegNormalizerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            target: LoudnessTarget::default(),
            bitrate: "96k".to_string(),
            sample_rate: 48000,
            channels: 2,
            keep_source: false,
            timeout_secs: 600,
        }
    }
}

/// 第一遍测量结果（loudnorm 以字符串输出数值）
#[derive(Debug, Deserialize)]
struct RawMeasurement {
    input_i: String,
    input_lra: String,
    input_tp: String,
    input_thresh: String,
    target_offset: String,
}

/// 响度测量值
#[derive(Debug, Clone, Copy, PartialEq)]
struct Measurement {
    integrated: f64,
    range: f64,
    true_peak: f64,
    threshold: f64,
    offset: f64,
}

/// FFmpeg 响度归一化器
pub struct FfmpegNormalizer {
    config: FfmpegNormalizerConfig,
}

impl FfmpegNormalizer {
    pub fn new(config: FfmpegNormalizerConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-hide_banner")
            .arg("-nostdin")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, pass: &str) -> Result<String, NormalizeError> {
        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            cmd.output(),
        )
        .await
        .map_err(|_| NormalizeError::ToolFailed(format!("{} timed out", pass)))??;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(NormalizeError::ToolFailed(format!(
                "{} exited with {}: {}",
                pass,
                output.status,
                tail(&stderr, 20)
            )));
        }
        Ok(stderr)
    }

    /// 第一遍：测量
    async fn measure(&self, src: &Path) -> Result<Measurement, NormalizeError> {
        let mut cmd = self.command();
        cmd.arg("-vn")
            .arg("-sn")
            .arg("-i")
            .arg(src)
            .arg("-af")
            .arg(format!("{}:print_format=json", self.config.target.filter()))
            .arg("-f")
            .arg("null")
            .arg("-");

        let stderr = self.run(cmd, "loudness measurement").await?;
        parse_measurement(&stderr)
    }

    /// 第二遍：线性归一化并编码
    async fn encode(&self, src: &Path, tmp: &Path, m: &Measurement) -> Result<(), NormalizeError> {
        let mut cmd = self.command();
        cmd.arg("-y")
            .arg("-vn")
            .arg("-sn")
            .arg("-i")
            .arg(src)
            .arg("-af")
            .arg(second_pass_filter(&self.config.target, m))
            .arg("-map_metadata")
            .arg("-1")
            .arg("-map_chapters")
            .arg("-1")
            .arg("-c:a")
            .arg("libopus")
            .arg("-b:a")
            .arg(&self.config.bitrate)
            .arg("-ar")
            .arg(self.config.sample_rate.to_string())
            .arg("-ac")
            .arg(self.config.channels.to_string())
            .arg("-f")
            .arg("opus")
            .arg(tmp);

        self.run(cmd, "loudness normalization").await.map(|_| ())
    }
}

#[async_trait]
impl LoudnessNormalizerPort for FfmpegNormalizer {
    async fn normalize(&self, src: &Path, dst: &Path) -> Result<NormalizeOutcome, NormalizeError> {
        let tmp = dst.with_extension("tmp");
        if tokio::fs::try_exists(&tmp).await? || tokio::fs::try_exists(dst).await? {
            tracing::debug!(dst = %dst.display(), "Already normalized or in progress, skipping");
            return Ok(NormalizeOutcome::AlreadyNormalized);
        }

        tracing::debug!(src = %src.display(), "Measuring loudness");
        let measurement = self.measure(src).await?;
        tracing::debug!(
            src = %src.display(),
            input_i = measurement.integrated,
            input_lra = measurement.range,
            input_tp = measurement.true_peak,
            "Loudness measured"
        );

        if let Err(e) = self.encode(src, &tmp, &measurement).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        tokio::fs::rename(&tmp, dst).await?;

        if !self.config.keep_source {
            if let Err(e) = tokio::fs::remove_file(src).await {
                tracing::warn!(src = %src.display(), error = %e, "Failed to remove source audio");
            }
        }

        tracing::info!(dst = %dst.display(), "Audio normalized");
        Ok(NormalizeOutcome::Normalized)
    }

    fn stream_filter(&self) -> String {
        self.config.target.filter()
    }
}

/// 从 ffmpeg stderr 中提取 loudnorm 的 JSON 输出
fn parse_measurement(stderr: &str) -> Result<Measurement, NormalizeError> {
    let marker = stderr
        .find("[Parsed_loudnorm")
        .ok_or_else(|| NormalizeError::MeasurementParse("loudnorm output not found".to_string()))?;
    let rest = &stderr[marker..];
    let start = rest
        .find('{')
        .ok_or_else(|| NormalizeError::MeasurementParse("missing JSON block".to_string()))?;
    let end = rest
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| NormalizeError::MeasurementParse("unterminated JSON block".to_string()))?;

    let raw: RawMeasurement = serde_json::from_str(&rest[start..=end])
        .map_err(|e| NormalizeError::MeasurementParse(e.to_string()))?;

    Ok(Measurement {
        integrated: parse_value("input_i", &raw.input_i)?,
        range: parse_value("input_lra", &raw.input_lra)?,
        true_peak: parse_value("input_tp", &raw.input_tp)?,
        threshold: parse_value("input_thresh", &raw.input_thresh)?,
        offset: parse_value("target_offset", &raw.target_offset)?,
    })
}

fn parse_value(name: &str, value: &str) -> Result<f64, NormalizeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NormalizeError::MeasurementParse(format!("{} = {:?}", name, value)))
}

fn second_pass_filter(target: &LoudnessTarget, m: &Measurement) -> String {
    format!(
        "{}:measured_I={}:measured_LRA={}:measured_TP={}:measured_thresh={}:offset={}:linear=true:print_format=summary",
        target.filter(),
        m.integrated,
        m.range,
        m.true_peak,
        m.threshold,
        m.offset
    )
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
Input #0, matroska,webm, from 'song.webm':
  Duration: 00:03:32.00, start: -0.007000, bitrate: 127 kb/s
Output #0, null, to 'pipe:':
size=N/A time=00:03:32.00 bitrate=N/A speed= 102x
[Parsed_loudnorm_0 @ 0x55d0c2b4a1c0]
{
	"input_i" : "-9.84",
	"input_tp" : "0.47",
	"input_lra" : "5.30",
	"input_thresh" : "-20.05",
	"output_i" : "-15.05",
	"output_tp" : "-2.00",
	"output_lra" : "4.70",
	"output_thresh" : "-25.23",
	"normalization_type" : "dynamic",
	"target_offset" : "0.05"
}
"#;

    #[test]
    fn test_parse_measurement() {
        let m = parse_measurement(SAMPLE).unwrap();
        assert_eq!(m.integrated, -9.84);
        assert_eq!(m.true_peak, 0.47);
        assert_eq!(m.range, 5.3);
        assert_eq!(m.threshold, -20.05);
        assert_eq!(m.offset, 0.05);
    }

    #[test]
    fn test_missing_marker() {
        let err = parse_measurement("Input #0, no loudnorm here").unwrap_err();
        assert!(matches!(err, NormalizeError::MeasurementParse(_)));
    }

    #[test]
    fn test_silent_input_is_rejected() {
        let stderr = SAMPLE.replace("\"-9.84\"", "\"-inf\"");
        assert!(matches!(
            parse_measurement(&stderr),
            Err(NormalizeError::MeasurementParse(_))
        ));
    }

    #[test]
    fn test_second_pass_filter() {
        let m = parse_measurement(SAMPLE).unwrap();
        let filter = second_pass_filter(&LoudnessTarget::default(), &m);
        assert_eq!(
            filter,
            "loudnorm=I=-15:LRA=7:TP=-2:measured_I=-9.84:measured_LRA=5.3:measured_TP=0.47:measured_thresh=-20.05:offset=0.05:linear=true:print_format=summary"
        );
    }

    #[tokio::test]
    async fn test_existing_output_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("youtube_a.opus");
        tokio::fs::write(&dst, b"done").await.unwrap();

        let normalizer = FfmpegNormalizer::new(FfmpegNormalizerConfig {
            binary: PathBuf::from("/nonexistent/ffmpeg"),
            ..Default::default()
        });
        let outcome = normalizer
            .normalize(&dir.path().join("missing.src.webm"), &dst)
            .await
            .unwrap();
        assert_eq!(outcome, NormalizeOutcome::AlreadyNormalized);

        tokio::fs::remove_file(&dst).await.unwrap();
        tokio::fs::write(dir.path().join("youtube_a.tmp"), b"").await.unwrap();
        let outcome = normalizer
            .normalize(&dir.path().join("missing.src.webm"), &dst)
            .await
            .unwrap();
        assert_eq!(outcome, NormalizeOutcome::AlreadyNormalized);
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let normalizer = FfmpegNormalizer::new(FfmpegNormalizerConfig {
            binary: PathBuf::from("/nonexistent/ffmpeg"),
            ..Default::default()
        });
        let result = normalizer
            .normalize(&dir.path().join("src.webm"), &dir.path().join("out.opus"))
            .await;
        assert!(matches!(result, Err(NormalizeError::IoError(_))));
        assert!(!dir.path().join("out.tmp").exists());
    }
}
