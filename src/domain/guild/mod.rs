//! Guild Context - 服务器限界上下文
//!
//! 职责:
//! - 服务器标识
//! - 服务器级配置与校验

mod errors;
mod value_objects;

pub use errors::GuildConfigError;
pub use value_objects::{GuildConfig, GuildId, MAX_CACHED_DURATION_MIN, MIN_REPEAT_INTERVAL_RANGE};
