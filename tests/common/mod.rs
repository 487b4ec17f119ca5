#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::Arc;

use cinegraph::models::{Director, DirectorId, Film, GenreId, User};
use cinegraph::services::{
    EngagementService, RankingService, RecommendationService, SocialService,
};
use cinegraph::storage::{
    EngagementStore, EntityStore, FeedStore, FriendStore, MemoryEngagementStore,
    MemoryEntityStore, MemoryFeedStore, MemoryFriendStore,
};

/// In-memory wiring of all stores and services, with the concrete stores
/// kept accessible for direct assertions.
pub struct TestApp {
    pub entities: Arc<MemoryEntityStore>,
    pub friends: Arc<MemoryFriendStore>,
    pub likes: Arc<MemoryEngagementStore>,
    pub feed: Arc<MemoryFeedStore>,
    pub social: SocialService,
    pub engagement: EngagementService,
    pub ranking: RankingService,
    pub recommendations: RecommendationService,
}

pub fn test_app() -> TestApp {
    let entities = Arc::new(MemoryEntityStore::new());
    let friends = Arc::new(MemoryFriendStore::new());
    let likes = Arc::new(MemoryEngagementStore::new());
    let feed = Arc::new(MemoryFeedStore::new());

    let entities_dyn: Arc<dyn EntityStore> = entities.clone();
    let friends_dyn: Arc<dyn FriendStore> = friends.clone();
    let likes_dyn: Arc<dyn EngagementStore> = likes.clone();
    let feed_dyn: Arc<dyn FeedStore> = feed.clone();

    TestApp {
        social: SocialService::new(entities_dyn.clone(), friends_dyn, feed_dyn.clone()),
        engagement: EngagementService::new(entities_dyn.clone(), likes_dyn.clone(), feed_dyn),
        ranking: RankingService::new(entities_dyn.clone(), likes_dyn.clone()),
        recommendations: RecommendationService::new(entities_dyn, likes_dyn),
        entities,
        friends,
        likes,
        feed,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn user(name: &str) -> User {
    User {
        id: 0,
        email: format!("{}@example.com", name),
        login: name.to_string(),
        name: name.to_string(),
        birthday: None,
    }
}

pub fn film(name: &str, year: i32, genres: &[GenreId], directors: &[DirectorId]) -> Film {
    Film {
        id: 0,
        name: name.to_string(),
        description: format!("{} description", name),
        release_date: date(year, 1, 1),
        duration: 120,
        genre_ids: genres.iter().copied().collect(),
        director_ids: directors.iter().copied().collect(),
    }
}

pub fn director(name: &str) -> Director {
    Director {
        id: 0,
        name: name.to_string(),
    }
}

pub async fn seed_users(store: &dyn EntityStore, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let created = store.add_user(user(&format!("user{}", i + 1))).await.unwrap();
        ids.push(created.id);
    }
    ids
}
