//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::ports::LoudnessTarget;
use crate::domain::guild::{GuildConfig, GuildConfigError};
use crate::infrastructure::adapters::StreamFormat;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 外部工具配置
    #[serde(default)]
    pub tools: ToolsConfig,

    /// 音频配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 缓存 Worker 配置
    #[serde(default)]
    pub worker: WorkerConfig,

    /// 播放配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 新服务器的默认配置
    #[serde(default)]
    pub guild_defaults: GuildDefaultsConfig,

    /// GC 配置
    #[serde(default)]
    pub gc: GcConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 归一化音频缓存目录
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// 原始音频下载暂存目录
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// 缓存索引（sled）目录
    #[serde(default = "default_cache_index")]
    pub cache_index: PathBuf,

    /// 缓存最大空间（字节），0 表示不限制
    #[serde(default = "default_max_cache_bytes")]
    pub max_cache_bytes: u64,
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("data/audio")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_cache_index() -> PathBuf {
    PathBuf::from("data/cache.sled")
}

fn default_max_cache_bytes() -> u64 {
    10 * 1024 * 1024 * 1024 // 10 GB
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            download_dir: default_download_dir(),
            cache_index: default_cache_index(),
            max_cache_bytes: default_max_cache_bytes(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/bottica.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 外部工具配置
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// yt-dlp 可执行文件
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// ffmpeg 可执行文件
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Netscape 格式 cookie 文件
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,

    /// yt-dlp 缓存目录，未设置时禁用缓存
    #[serde(default)]
    pub ytdlp_cache_dir: Option<PathBuf>,

    /// 解析请求超时（秒）
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    /// 下载超时（秒）
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_resolve_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    600
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_path: default_ffmpeg_path(),
            cookie_file: None,
            ytdlp_cache_dir: None,
            resolve_timeout_secs: default_resolve_timeout(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

/// 音频配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 目标综合响度 (LUFS)
    #[serde(default = "default_target_i")]
    pub target_i: f64,

    /// 目标响度范围 (LU)
    #[serde(default = "default_target_lra")]
    pub target_lra: f64,

    /// 目标真峰值 (dBTP)
    #[serde(default = "default_target_tp")]
    pub target_tp: f64,

    /// 缓存文件 Opus 比特率
    #[serde(default = "default_cache_bitrate")]
    pub cache_bitrate: String,

    /// 采样率（Hz）
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// 声道数
    #[serde(default = "default_channels")]
    pub channels: u32,

    /// 归一化后保留下载的原始文件
    #[serde(default)]
    pub keep_source: bool,

    /// 归一化超时（秒）
    #[serde(default = "default_normalize_timeout")]
    pub normalize_timeout_secs: u64,

    /// 听众流格式
    /// 可选: mp3, opus
    #[serde(default = "default_stream_format")]
    pub stream_format: StreamFormat,

    /// 听众流比特率
    #[serde(default = "default_stream_bitrate")]
    pub stream_bitrate: String,
}

fn default_target_i() -> f64 {
    -15.0
}

fn default_target_lra() -> f64 {
    7.0
}

fn default_target_tp() -> f64 {
    -2.0
}

fn default_cache_bitrate() -> String {
    "96k".to_string()
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_channels() -> u32 {
    2
}

fn default_normalize_timeout() -> u64 {
    600
}

fn default_stream_format() -> StreamFormat {
    StreamFormat::Mp3
}

fn default_stream_bitrate() -> String {
    "128k".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_i: default_target_i(),
            target_lra: default_target_lra(),
            target_tp: default_target_tp(),
            cache_bitrate: default_cache_bitrate(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            keep_source: false,
            normalize_timeout_secs: default_normalize_timeout(),
            stream_format: default_stream_format(),
            stream_bitrate: default_stream_bitrate(),
        }
    }
}

impl AudioConfig {
    pub fn loudness_target(&self) -> LoudnessTarget {
        LoudnessTarget {
            integrated: self.target_i,
            range: self.target_lra,
            true_peak: self.target_tp,
        }
    }
}

/// 缓存 Worker 配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// 最大并发缓存任务数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 任务队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 播放配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 连续失败多少首后停止
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,

    /// 没有听众时暂停选曲
    #[serde(default = "default_require_listeners")]
    pub require_listeners: bool,

    /// 音频广播通道容量（块数）
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_failures() -> u32 {
    3
}

fn default_require_listeners() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_failures(),
            require_listeners: default_require_listeners(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// 新服务器默认配置
#[derive(Debug, Clone, Deserialize)]
pub struct GuildDefaultsConfig {
    #[serde(default = "default_min_repeat_interval")]
    pub min_repeat_interval: u32,

    /// 秒，-1 表示不限
    #[serde(default = "default_max_cached_duration")]
    pub max_cached_duration: i64,
}

fn default_min_repeat_interval() -> u32 {
    32
}

fn default_max_cached_duration() -> i64 {
    600
}

impl Default for GuildDefaultsConfig {
    fn default() -> Self {
        Self {
            min_repeat_interval: default_min_repeat_interval(),
            max_cached_duration: default_max_cached_duration(),
        }
    }
}

impl GuildDefaultsConfig {
    pub fn to_guild_config(&self) -> Result<GuildConfig, GuildConfigError> {
        GuildConfig::new(self.min_repeat_interval, self.max_cached_duration)
    }
}

/// GC（垃圾回收）配置
#[derive(Debug, Clone, Deserialize)]
pub struct GcConfig {
    /// 是否启用自动 GC
    #[serde(default = "default_gc_enabled")]
    pub enabled: bool,

    /// GC 间隔时间（秒）
    #[serde(default = "default_gc_interval")]
    pub interval_secs: u64,

    /// 空闲 Session 过期时间（秒）
    #[serde(default = "default_session_expire")]
    pub session_expire_secs: u64,

    /// 已结束缓存任务保留时间（秒）
    #[serde(default = "default_task_retention")]
    pub task_retention_secs: u64,
}

fn default_gc_enabled() -> bool {
    true
}

fn default_gc_interval() -> u64 {
    300
}

fn default_session_expire() -> u64 {
    3600
}

fn default_task_retention() -> u64 {
    600
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: default_gc_enabled(),
            interval_secs: default_gc_interval(),
            session_expire_secs: default_session_expire(),
            task_retention_secs: default_task_retention(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5070);
        assert_eq!(config.database.path, "data/bottica.db");
        assert_eq!(config.audio.stream_format, StreamFormat::Mp3);
        assert_eq!(config.audio.loudness_target(), LoudnessTarget::default());
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5070");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/bottica.db?mode=rwc");
    }

    #[test]
    fn test_guild_defaults_match_domain() {
        let config = GuildDefaultsConfig::default().to_guild_config().unwrap();
        assert_eq!(config, GuildConfig::default());
    }
}
