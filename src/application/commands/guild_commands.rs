//! Guild Commands - 服务器配置命令

use crate::domain::guild::GuildId;

/// 更新服务器配置，未提供的字段保持不变
#[derive(Debug, Clone)]
pub struct UpdateGuildConfigCommand {
    pub guild_id: GuildId,
    pub min_repeat_interval: Option<u32>,
    /// 秒，-1 表示不限
    pub max_cached_duration: Option<i64>,
}
