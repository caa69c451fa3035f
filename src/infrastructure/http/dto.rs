//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::domain::guild::GuildId;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Music DTOs
// ============================================================================

/// 只携带服务器 ID 的请求
#[derive(Debug, Deserialize)]
pub struct GuildRequest {
    pub guild_id: GuildId,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub guild_id: GuildId,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub guild_id: GuildId,
    #[serde(default)]
    pub shuffle: Option<bool>,
    #[serde(default)]
    pub radio: Option<bool>,
}

// ============================================================================
// Guild DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateGuildConfigRequest {
    pub guild_id: GuildId,
    #[serde(default)]
    pub min_repeat_interval: Option<u32>,
    #[serde(default)]
    pub max_cached_duration: Option<i64>,
}

// ============================================================================
// Cache DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PrefetchRequest {
    pub url: String,
}
