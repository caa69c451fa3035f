//! Cache Command Handlers

use std::sync::Arc;

use crate::application::commands::cache_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{generate_cache_key, SongRepositoryPort, SongResolverPort, Submitted};
use crate::application::services::AudioSourceService;

/// Prefetch Handler - 批量提交缓存任务
pub struct PrefetchHandler {
    resolver: Arc<dyn SongResolverPort>,
    song_repo: Arc<dyn SongRepositoryPort>,
    audio_source: Arc<AudioSourceService>,
}

impl PrefetchHandler {
    pub fn new(
        resolver: Arc<dyn SongResolverPort>,
        song_repo: Arc<dyn SongRepositoryPort>,
        audio_source: Arc<AudioSourceService>,
    ) -> Self {
        Self {
            resolver,
            song_repo,
            audio_source,
        }
    }

    pub async fn handle(&self, cmd: PrefetchCommand) -> Result<PrefetchResponse, ApplicationError> {
        let resolved = self.resolver.resolve(cmd.query.trim()).await?;
        if resolved.songs.is_empty() {
            return Err(ApplicationError::nothing_playable());
        }

        let mut submitted = Vec::with_capacity(resolved.songs.len());
        for song in resolved.songs {
            self.song_repo.save(&song).await?;
            let Some(result) = self.audio_source.request_cache(&song) else {
                continue;
            };
            submitted.push(PrefetchedSong {
                cache_key: generate_cache_key(&song.key()),
                task_id: result.task_id().to_string(),
                title: song.title,
                in_flight: matches!(result, Submitted::InFlight(_)),
            });
        }

        tracing::info!(
            submitted = submitted.len(),
            unplayable = resolved.unplayable,
            "Prefetch submitted"
        );
        Ok(PrefetchResponse {
            submitted,
            unplayable: resolved.unplayable,
        })
    }
}
