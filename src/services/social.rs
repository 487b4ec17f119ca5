use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, EventType, FeedEvent, Operation, UserId};
use crate::storage::{EntityStore, FeedStore, FriendStore};

/// Friendship mutations and queries plus the per-user activity feed.
///
/// Every successful mutation is followed by a best-effort feed append:
/// the primary write commits first, and a failed feed append is logged
/// but never surfaced or rolled back.
pub struct SocialService {
    entities: Arc<dyn EntityStore>,
    friends: Arc<dyn FriendStore>,
    feed: Arc<dyn FeedStore>,
}

impl SocialService {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        friends: Arc<dyn FriendStore>,
        feed: Arc<dyn FeedStore>,
    ) -> Self {
        Self {
            entities,
            friends,
            feed,
        }
    }

    async fn ensure_user(&self, id: UserId) -> AppResult<()> {
        if !self.entities.user_exists(id).await? {
            return Err(AppError::NotFound(format!("user {} not found", id)));
        }
        Ok(())
    }

    async fn log_feed(&self, user_id: UserId, entity_id: i64, operation: Operation) {
        let result = self
            .feed
            .append(
                user_id,
                entity_id,
                EventType::Friend,
                operation,
                current_time_millis(),
            )
            .await;
        if let Err(err) = result {
            warn!("feed append failed for user {}: {}", user_id, err);
        }
    }

    pub async fn add_friend(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        if user_id == friend_id {
            return Err(AppError::SelfReference(format!(
                "user {} cannot befriend themselves",
                user_id
            )));
        }
        self.ensure_user(user_id).await?;
        self.ensure_user(friend_id).await?;

        self.friends.add(user_id, friend_id).await?;
        info!("user {} added friend {}", user_id, friend_id);
        self.log_feed(user_id, friend_id, Operation::Add).await;
        Ok(())
    }

    pub async fn remove_friend(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        if user_id == friend_id {
            return Err(AppError::SelfReference(format!(
                "user {} cannot unfriend themselves",
                user_id
            )));
        }
        self.friends.remove(user_id, friend_id).await?;
        info!("user {} removed friend {}", user_id, friend_id);
        self.log_feed(user_id, friend_id, Operation::Remove).await;
        Ok(())
    }

    pub async fn friends_of(&self, user_id: UserId) -> AppResult<BTreeSet<UserId>> {
        self.ensure_user(user_id).await?;
        self.friends.friends_of(user_id).await
    }

    /// Friends both users have. For a user paired with themselves this is
    /// their full friend set; an empty intersection is not an error.
    pub async fn common_friends(
        &self,
        user_id: UserId,
        other_id: UserId,
    ) -> AppResult<BTreeSet<UserId>> {
        let friends = self.friends_of(user_id).await?;
        if user_id == other_id {
            return Ok(friends);
        }
        let other_friends = self.friends_of(other_id).await?;
        Ok(friends.intersection(&other_friends).copied().collect())
    }

    pub async fn feed_for(&self, user_id: UserId) -> AppResult<Vec<FeedEvent>> {
        self.ensure_user(user_id).await?;
        self.feed.feed_for(user_id).await
    }
}
