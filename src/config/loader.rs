//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `BOTTICA_SERVER__PORT=8080`
/// - `BOTTICA_TOOLS__YTDLP_PATH=/usr/local/bin/yt-dlp`
/// - `BOTTICA_AUDIO__TARGET_I=-14`
/// - `BOTTICA_PLAYBACK__REQUIRE_LISTENERS=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索当前目录下的默认配置文件
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5070)?
        .set_default("storage.audio_dir", "data/audio")?
        .set_default("storage.download_dir", "data/downloads")?
        .set_default("storage.cache_index", "data/cache.sled")?
        .set_default("storage.max_cache_bytes", 10_u64 * 1024 * 1024 * 1024)?
        .set_default("database.path", "data/bottica.db")?
        .set_default("database.max_connections", 5)?
        .set_default("tools.ytdlp_path", "yt-dlp")?
        .set_default("tools.ffmpeg_path", "ffmpeg")?
        .set_default("tools.resolve_timeout_secs", 30)?
        .set_default("tools.download_timeout_secs", 600)?
        .set_default("worker.max_concurrent", 2)?
        .set_default("worker.queue_capacity", 1000)?
        .set_default("playback.max_consecutive_failures", 3)?
        .set_default("playback.require_listeners", true)?
        .set_default("guild_defaults.min_repeat_interval", 32)?
        .set_default("guild_defaults.max_cached_duration", 600)?
        .set_default("gc.enabled", true)?
        .set_default("gc.interval_secs", 300)?
        .set_default("gc.session_expire_secs", 3600)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），层级分隔符为双下划线
    builder = builder.add_source(
        Environment::with_prefix("BOTTICA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.tools.ytdlp_path.as_os_str().is_empty()
        || config.tools.ffmpeg_path.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "Tool paths cannot be empty".to_string(),
        ));
    }

    if config.worker.max_concurrent == 0 || config.worker.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Worker concurrency and queue capacity must be positive".to_string(),
        ));
    }

    if config.playback.max_consecutive_failures == 0 {
        return Err(ConfigError::ValidationError(
            "max_consecutive_failures must be positive".to_string(),
        ));
    }

    let audio = &config.audio;
    if !(audio.target_i.is_finite() && audio.target_lra.is_finite() && audio.target_tp.is_finite())
    {
        return Err(ConfigError::ValidationError(
            "Loudness targets must be finite numbers".to_string(),
        ));
    }

    config
        .guild_defaults
        .to_guild_config()
        .map_err(|e| ConfigError::ValidationError(format!("guild_defaults: {}", e)))?;

    if config.gc.enabled && config.gc.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "GC interval cannot be 0 when GC is enabled".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Audio Directory: {:?}", config.storage.audio_dir);
    tracing::info!("Cache Limit: {} bytes", config.storage.max_cache_bytes);
    tracing::info!("yt-dlp: {:?}", config.tools.ytdlp_path);
    tracing::info!("ffmpeg: {:?}", config.tools.ffmpeg_path);
    tracing::info!(
        "Loudness Target: I={} LRA={} TP={}",
        config.audio.target_i,
        config.audio.target_lra,
        config.audio.target_tp
    );
    tracing::info!("Stream Format: {:?}", config.audio.stream_format);
    tracing::info!("Worker Concurrency: {}", config.worker.max_concurrent);
    tracing::info!("Require Listeners: {}", config.playback.require_listeners);
    tracing::info!("GC Enabled: {}", config.gc.enabled);
    if config.gc.enabled {
        tracing::info!("GC Interval: {}s", config.gc.interval_secs);
        tracing::info!("Session Expire: {}s", config.gc.session_expire_secs);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_bad_guild_defaults() {
        let mut config = AppConfig::default();
        config.guild_defaults.min_repeat_interval = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_workers() {
        let mut config = AppConfig::default();
        config.worker.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[worker]
max_concurrent = 4

[audio]
target_i = -14.0
stream_format = "opus"

[playback]
require_listeners = false
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.worker.max_concurrent, 4);
        assert_eq!(config.audio.target_i, -14.0);
        assert_eq!(
            config.audio.stream_format,
            crate::infrastructure::adapters::StreamFormat::Opus
        );
        assert!(!config.playback.require_listeners);
        assert_eq!(config.database.path, "data/bottica.db");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nport = 9000").unwrap();

        // 只有本测试修改 server.port，其它测试不依赖该值
        std::env::set_var("BOTTICA_SERVER__PORT", "6100");
        let config = load_config_from_path(Some(file.path()));
        std::env::remove_var("BOTTICA_SERVER__PORT");

        assert_eq!(config.unwrap().server.port, 6100);
    }
}
