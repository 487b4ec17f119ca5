// Storage interfaces for the social graph and engagement engine.
//
// Each relation is owned by exactly one store: FriendStore owns friend
// edges, EngagementStore owns appraisals, FeedStore owns feed events.
// User and film records are borrowed by id from the EntityStore.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::AppResult;
use crate::models::{
    Appraisal, Director, DirectorId, EventType, FeedEvent, Film, FilmId, Operation, User, UserId,
};

pub use memory::{MemoryEngagementStore, MemoryEntityStore, MemoryFeedStore, MemoryFriendStore};
pub use sqlite::SqliteStorage;

/// Entity persistence boundary. The engines only read film metadata and
/// user existence through this interface; writes exist for the thin CRUD
/// surface and for seeding.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Inserts the user, assigning its id. The incoming id is ignored.
    async fn add_user(&self, user: User) -> AppResult<User>;
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;
    async fn all_users(&self) -> AppResult<Vec<User>>;
    async fn user_exists(&self, id: UserId) -> AppResult<bool>;

    async fn add_director(&self, director: Director) -> AppResult<Director>;
    async fn director_exists(&self, id: DirectorId) -> AppResult<bool>;

    /// Inserts the film, assigning its id. The incoming id is ignored.
    async fn add_film(&self, film: Film) -> AppResult<Film>;
    async fn get_film(&self, id: FilmId) -> AppResult<Option<Film>>;
    async fn all_films(&self) -> AppResult<Vec<Film>>;
    async fn film_exists(&self, id: FilmId) -> AppResult<bool>;
    async fn films_by_director(&self, id: DirectorId) -> AppResult<Vec<Film>>;
}

/// Friendship relation: symmetric in meaning, stored as a single canonical
/// row per unordered pair. Add/remove must be atomic per pair; the
/// implementations rely on a uniqueness constraint or a write lock held
/// across check-and-insert.
#[async_trait]
pub trait FriendStore: Send + Sync {
    /// Inserts the edge. Fails with `Conflict` if an edge between the two
    /// users already exists in either direction.
    async fn add(&self, user_id: UserId, friend_id: UserId) -> AppResult<()>;
    /// Deletes the edge. Fails with `NotFound` if no edge exists in either
    /// direction.
    async fn remove(&self, user_id: UserId, friend_id: UserId) -> AppResult<()>;
    async fn contains(&self, user_id: UserId, friend_id: UserId) -> AppResult<bool>;
    /// All ids x such that an edge (user, x) or (x, user) exists.
    async fn friends_of(&self, user_id: UserId) -> AppResult<BTreeSet<UserId>>;
}

/// Like relation between users and films, set semantics.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Fails with `Conflict` if the pair already exists.
    async fn like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()>;
    /// Fails with `NotFound` if the pair does not exist.
    async fn unlike(&self, film_id: FilmId, user_id: UserId) -> AppResult<()>;
    async fn has(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool>;
    async fn likers_of(&self, film_id: FilmId) -> AppResult<BTreeSet<UserId>>;
    async fn likes_of(&self, user_id: UserId) -> AppResult<BTreeSet<FilmId>>;
    /// Popularity score: count of distinct users who liked the film.
    async fn count_likes(&self, film_id: FilmId) -> AppResult<u64>;
    /// Full enumeration of the like relation, read by the recommendation
    /// engine for neighbor-overlap computation.
    async fn all_appraisals(&self) -> AppResult<Vec<Appraisal>>;
}

/// Append-only per-user activity log. Events have no lifecycle beyond
/// creation; they are never mutated or deleted.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn append(
        &self,
        user_id: UserId,
        entity_id: i64,
        event_type: EventType,
        operation: Operation,
        timestamp: i64,
    ) -> AppResult<()>;
    /// Events where the user is the actor, ordered by timestamp ascending,
    /// ties broken by event id ascending.
    async fn feed_for(&self, user_id: UserId) -> AppResult<Vec<FeedEvent>>;
}
