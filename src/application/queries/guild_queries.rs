//! Guild Queries

use crate::domain::guild::GuildId;

/// 获取服务器配置
#[derive(Debug, Clone)]
pub struct GetGuildConfigQuery {
    pub guild_id: GuildId,
}
