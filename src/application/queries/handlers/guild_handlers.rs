//! Guild Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::queries::guild_queries::GetGuildConfigQuery;
use crate::application::services::GuildSessions;
use crate::domain::guild::GuildConfig;

/// GetGuildConfig Handler
pub struct GetGuildConfigHandler {
    sessions: Arc<GuildSessions>,
}

impl GetGuildConfigHandler {
    pub fn new(sessions: Arc<GuildSessions>) -> Self {
        Self { sessions }
    }

    pub async fn handle(&self, query: GetGuildConfigQuery) -> Result<GuildConfig, ApplicationError> {
        self.sessions.ensure(query.guild_id).await?;
        Ok(self.sessions.manager().get(query.guild_id)?.config)
    }
}
