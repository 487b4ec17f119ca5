use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, EventType, FilmId, Operation, UserId};
use crate::storage::{EngagementStore, EntityStore, FeedStore};

/// Like/unlike mutations. The appraisal write commits first; the feed
/// append is best-effort and symmetric across both operations.
pub struct EngagementService {
    entities: Arc<dyn EntityStore>,
    likes: Arc<dyn EngagementStore>,
    feed: Arc<dyn FeedStore>,
}

impl EngagementService {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        likes: Arc<dyn EngagementStore>,
        feed: Arc<dyn FeedStore>,
    ) -> Self {
        Self {
            entities,
            likes,
            feed,
        }
    }

    async fn ensure_refs(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        if !self.entities.film_exists(film_id).await? {
            return Err(AppError::NotFound(format!("film {} not found", film_id)));
        }
        if !self.entities.user_exists(user_id).await? {
            return Err(AppError::NotFound(format!("user {} not found", user_id)));
        }
        Ok(())
    }

    async fn log_feed(&self, user_id: UserId, film_id: FilmId, operation: Operation) {
        let result = self
            .feed
            .append(
                user_id,
                film_id,
                EventType::Like,
                operation,
                current_time_millis(),
            )
            .await;
        if let Err(err) = result {
            warn!("feed append failed for user {}: {}", user_id, err);
        }
    }

    pub async fn like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        self.ensure_refs(film_id, user_id).await?;
        self.likes.like(film_id, user_id).await?;
        info!("user {} liked film {}", user_id, film_id);
        self.log_feed(user_id, film_id, Operation::Add).await;
        Ok(())
    }

    pub async fn unlike(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        self.ensure_refs(film_id, user_id).await?;
        self.likes.unlike(film_id, user_id).await?;
        info!("user {} unliked film {}", user_id, film_id);
        self.log_feed(user_id, film_id, Operation::Remove).await;
        Ok(())
    }
}
