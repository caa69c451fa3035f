//! Guild Command Handlers

use std::sync::Arc;

use crate::application::commands::guild_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::GuildRepositoryPort;
use crate::application::services::GuildSessions;
use crate::domain::guild::GuildConfig;

/// UpdateGuildConfig Handler - 校验并保存服务器配置
pub struct UpdateGuildConfigHandler {
    sessions: Arc<GuildSessions>,
    guild_repo: Arc<dyn GuildRepositoryPort>,
}

impl UpdateGuildConfigHandler {
    pub fn new(sessions: Arc<GuildSessions>, guild_repo: Arc<dyn GuildRepositoryPort>) -> Self {
        Self {
            sessions,
            guild_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateGuildConfigCommand,
    ) -> Result<GuildConfig, ApplicationError> {
        let guild_id = cmd.guild_id;
        self.sessions.ensure(guild_id).await?;

        let mut config = self.sessions.manager().get(guild_id)?.config;
        if let Some(value) = cmd.min_repeat_interval {
            config.set_min_repeat_interval(value)?;
        }
        if let Some(value) = cmd.max_cached_duration {
            config.set_max_cached_duration(value)?;
        }

        self.guild_repo.save_config(guild_id, &config).await?;
        self.sessions.manager().set_config(guild_id, config.clone())?;

        tracing::info!(
            guild_id = %guild_id,
            min_repeat_interval = config.min_repeat_interval(),
            max_cached_duration = config.max_cached_duration(),
            "Guild config updated"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakePlayer, FakeResolver, MusicFixture};
    use crate::domain::guild::GuildId;
    use std::time::Duration;

    #[tokio::test]
    async fn test_update_persists_and_applies() {
        let f = MusicFixture::new(FakeResolver::new(), FakePlayer::new(1, Duration::ZERO)).await;
        let handler = UpdateGuildConfigHandler::new(f.guild_sessions.clone(), f.guild_repo.clone());
        let guild = GuildId::new(5);

        let config = handler
            .handle(UpdateGuildConfigCommand {
                guild_id: guild,
                min_repeat_interval: Some(4),
                max_cached_duration: None,
            })
            .await
            .unwrap();

        assert_eq!(config.min_repeat_interval(), 4);
        assert_eq!(config.max_cached_duration(), 600);
        assert_eq!(f.guild_repo.load_config(guild).await.unwrap(), Some(config.clone()));
        assert_eq!(f.guild_sessions.manager().get(guild).unwrap().config, config);
    }

    #[tokio::test]
    async fn test_update_rejects_out_of_range() {
        let f = MusicFixture::new(FakeResolver::new(), FakePlayer::new(1, Duration::ZERO)).await;
        let handler = UpdateGuildConfigHandler::new(f.guild_sessions.clone(), f.guild_repo.clone());
        let guild = GuildId::new(5);

        let err = handler
            .handle(UpdateGuildConfigCommand {
                guild_id: guild,
                min_repeat_interval: None,
                max_cached_duration: Some(-5),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Provided value has to be larger than -1");
        assert_eq!(f.guild_repo.load_config(guild).await.unwrap(), None);
    }
}
