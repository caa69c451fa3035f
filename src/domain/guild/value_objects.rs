//! Guild Context - Value Objects

use serde::{Deserialize, Serialize};

use super::GuildConfigError;

/// 服务器唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildId(u64);

impl GuildId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for GuildId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const MIN_REPEAT_INTERVAL_RANGE: (u32, u32) = (1, 1024);
pub const MAX_CACHED_DURATION_MIN: i64 = -1;

/// 服务器级配置
///
/// 不变量:
/// - min_repeat_interval 在 [1, 1024] 内
/// - max_cached_duration >= -1，-1 表示不限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    min_repeat_interval: u32,
    max_cached_duration: i64,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            min_repeat_interval: 32,
            max_cached_duration: 600,
        }
    }
}

impl GuildConfig {
    /// 使用校验后的值构造
    pub fn new(min_repeat_interval: u32, max_cached_duration: i64) -> Result<Self, GuildConfigError> {
        let mut config = Self::default();
        config.set_min_repeat_interval(min_repeat_interval)?;
        config.set_max_cached_duration(max_cached_duration)?;
        Ok(config)
    }

    pub fn min_repeat_interval(&self) -> u32 {
        self.min_repeat_interval
    }

    pub fn max_cached_duration(&self) -> i64 {
        self.max_cached_duration
    }

    pub fn set_min_repeat_interval(&mut self, value: u32) -> Result<(), GuildConfigError> {
        let (min, max) = MIN_REPEAT_INTERVAL_RANGE;
        if value < min || value > max {
            return Err(GuildConfigError::OutOfRange {
                field: "min_repeat_interval",
                message: format!("Provided value has to be between {} and {}", min, max),
            });
        }
        self.min_repeat_interval = value;
        Ok(())
    }

    pub fn set_max_cached_duration(&mut self, value: i64) -> Result<(), GuildConfigError> {
        if value < MAX_CACHED_DURATION_MIN {
            return Err(GuildConfigError::OutOfRange {
                field: "max_cached_duration",
                message: format!(
                    "Provided value has to be larger than {}",
                    MAX_CACHED_DURATION_MIN
                ),
            });
        }
        self.max_cached_duration = value;
        Ok(())
    }

    /// 给定时长的歌曲是否应当缓存
    pub fn should_cache(&self, duration: u32) -> bool {
        self.max_cached_duration == -1 || i64::from(duration) <= self.max_cached_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuildConfig::default();
        assert_eq!(config.min_repeat_interval(), 32);
        assert_eq!(config.max_cached_duration(), 600);
    }

    #[test]
    fn test_min_repeat_interval_bounds() {
        let mut config = GuildConfig::default();
        assert!(config.set_min_repeat_interval(1).is_ok());
        assert!(config.set_min_repeat_interval(1024).is_ok());

        let err = config.set_min_repeat_interval(0).unwrap_err();
        assert_eq!(err.to_string(), "Provided value has to be between 1 and 1024");
        assert!(config.set_min_repeat_interval(1025).is_err());
        assert_eq!(config.min_repeat_interval(), 1024);
    }

    #[test]
    fn test_max_cached_duration_bounds() {
        let mut config = GuildConfig::default();
        assert!(config.set_max_cached_duration(-1).is_ok());
        let err = config.set_max_cached_duration(-2).unwrap_err();
        assert_eq!(err.to_string(), "Provided value has to be larger than -1");
        assert_eq!(config.max_cached_duration(), -1);
    }

    #[test]
    fn test_should_cache() {
        let mut config = GuildConfig::default();
        assert!(config.should_cache(600));
        assert!(!config.should_cache(601));

        config.set_max_cached_duration(-1).unwrap();
        assert!(config.should_cache(u32::MAX));

        config.set_max_cached_duration(0).unwrap();
        assert!(config.should_cache(0));
        assert!(!config.should_cache(1));
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert!(GuildConfig::new(0, 600).is_err());
        assert!(GuildConfig::new(32, -5).is_err());
        assert!(GuildConfig::new(8, 120).is_ok());
    }
}
