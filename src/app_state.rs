use std::sync::Arc;

use crate::config::Config;
use crate::services::{EngagementService, RankingService, RecommendationService, SocialService};
use crate::storage::{
    EngagementStore, EntityStore, FeedStore, FriendStore, MemoryEngagementStore,
    MemoryEntityStore, MemoryFeedStore, MemoryFriendStore, SqliteStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub entities: Arc<dyn EntityStore>,
    pub social: Arc<SocialService>,
    pub engagement: Arc<EngagementService>,
    pub ranking: Arc<RankingService>,
    pub recommendations: Arc<RecommendationService>,
}

impl AppState {
    /// SQLite-backed state from configuration.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let storage = Arc::new(SqliteStorage::connect(&config.database.url).await?);
        storage.initialize().await?;
        Ok(Self::with_stores(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            storage,
        ))
    }

    /// In-memory state, used by tests and storage-free deployments.
    pub fn in_memory() -> Self {
        Self::with_stores(
            Arc::new(MemoryEntityStore::new()),
            Arc::new(MemoryFriendStore::new()),
            Arc::new(MemoryEngagementStore::new()),
            Arc::new(MemoryFeedStore::new()),
        )
    }

    pub fn with_stores(
        entities: Arc<dyn EntityStore>,
        friends: Arc<dyn FriendStore>,
        likes: Arc<dyn EngagementStore>,
        feed: Arc<dyn FeedStore>,
    ) -> Self {
        Self {
            entities: entities.clone(),
            social: Arc::new(SocialService::new(
                entities.clone(),
                friends,
                feed.clone(),
            )),
            engagement: Arc::new(EngagementService::new(
                entities.clone(),
                likes.clone(),
                feed,
            )),
            ranking: Arc::new(RankingService::new(entities.clone(), likes.clone())),
            recommendations: Arc::new(RecommendationService::new(entities, likes)),
        }
    }
}
