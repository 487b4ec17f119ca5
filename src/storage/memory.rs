// In-memory store implementations backed by lock-guarded collections.
// Used by tests and as a storage-free deployment mode.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{AppError, AppResult};
use crate::models::{
    canonical_pair, Appraisal, Director, DirectorId, EventType, FeedEvent, Film, FilmId,
    Operation, User, UserId,
};
use crate::storage::{EngagementStore, EntityStore, FeedStore, FriendStore};

fn read<T>(lock: &RwLock<T>) -> AppResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> AppResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| AppError::Internal("store lock poisoned".to_string()))
}

#[derive(Default)]
pub struct MemoryEntityStore {
    users: RwLock<BTreeMap<UserId, User>>,
    directors: RwLock<BTreeMap<DirectorId, Director>>,
    films: RwLock<BTreeMap<FilmId, Film>>,
    next_user_id: AtomicI64,
    next_director_id: AtomicI64,
    next_film_id: AtomicI64,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn add_user(&self, mut user: User) -> AppResult<User> {
        user.id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        write(&self.users)?.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(read(&self.users)?.get(&id).cloned())
    }

    async fn all_users(&self) -> AppResult<Vec<User>> {
        Ok(read(&self.users)?.values().cloned().collect())
    }

    async fn user_exists(&self, id: UserId) -> AppResult<bool> {
        Ok(read(&self.users)?.contains_key(&id))
    }

    async fn add_director(&self, mut director: Director) -> AppResult<Director> {
        director.id = self.next_director_id.fetch_add(1, Ordering::SeqCst) + 1;
        write(&self.directors)?.insert(director.id, director.clone());
        Ok(director)
    }

    async fn director_exists(&self, id: DirectorId) -> AppResult<bool> {
        Ok(read(&self.directors)?.contains_key(&id))
    }

    async fn add_film(&self, mut film: Film) -> AppResult<Film> {
        film.id = self.next_film_id.fetch_add(1, Ordering::SeqCst) + 1;
        write(&self.films)?.insert(film.id, film.clone());
        Ok(film)
    }

    async fn get_film(&self, id: FilmId) -> AppResult<Option<Film>> {
        Ok(read(&self.films)?.get(&id).cloned())
    }

    async fn all_films(&self) -> AppResult<Vec<Film>> {
        Ok(read(&self.films)?.values().cloned().collect())
    }

    async fn film_exists(&self, id: FilmId) -> AppResult<bool> {
        Ok(read(&self.films)?.contains_key(&id))
    }

    async fn films_by_director(&self, id: DirectorId) -> AppResult<Vec<Film>> {
        Ok(read(&self.films)?
            .values()
            .filter(|film| film.director_ids.contains(&id))
            .cloned()
            .collect())
    }
}

/// Friend edges as canonical (smaller, larger) pairs. The write lock is
/// held across check-and-insert, so concurrent adds of the same pair
/// cannot both succeed.
#[derive(Default)]
pub struct MemoryFriendStore {
    edges: RwLock<BTreeSet<(UserId, UserId)>>,
}

impl MemoryFriendStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FriendStore for MemoryFriendStore {
    async fn add(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        let pair = canonical_pair(user_id, friend_id);
        let mut edges = write(&self.edges)?;
        if !edges.insert(pair) {
            return Err(AppError::Conflict(format!(
                "users {} and {} are already friends",
                user_id, friend_id
            )));
        }
        Ok(())
    }

    async fn remove(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        let pair = canonical_pair(user_id, friend_id);
        let mut edges = write(&self.edges)?;
        if !edges.remove(&pair) {
            return Err(AppError::NotFound(format!(
                "no friendship between users {} and {}",
                user_id, friend_id
            )));
        }
        Ok(())
    }

    async fn contains(&self, user_id: UserId, friend_id: UserId) -> AppResult<bool> {
        let pair = canonical_pair(user_id, friend_id);
        Ok(read(&self.edges)?.contains(&pair))
    }

    async fn friends_of(&self, user_id: UserId) -> AppResult<BTreeSet<UserId>> {
        let edges = read(&self.edges)?;
        Ok(edges
            .iter()
            .filter_map(|&(a, b)| {
                if a == user_id {
                    Some(b)
                } else if b == user_id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryEngagementStore {
    appraisals: RwLock<BTreeSet<(FilmId, UserId)>>,
}

impl MemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngagementStore for MemoryEngagementStore {
    async fn like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let mut appraisals = write(&self.appraisals)?;
        if !appraisals.insert((film_id, user_id)) {
            return Err(AppError::Conflict(format!(
                "user {} already likes film {}",
                user_id, film_id
            )));
        }
        Ok(())
    }

    async fn unlike(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let mut appraisals = write(&self.appraisals)?;
        if !appraisals.remove(&(film_id, user_id)) {
            return Err(AppError::NotFound(format!(
                "user {} has not liked film {}",
                user_id, film_id
            )));
        }
        Ok(())
    }

    async fn has(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        Ok(read(&self.appraisals)?.contains(&(film_id, user_id)))
    }

    async fn likers_of(&self, film_id: FilmId) -> AppResult<BTreeSet<UserId>> {
        Ok(read(&self.appraisals)?
            .iter()
            .filter(|&&(f, _)| f == film_id)
            .map(|&(_, u)| u)
            .collect())
    }

    async fn likes_of(&self, user_id: UserId) -> AppResult<BTreeSet<FilmId>> {
        Ok(read(&self.appraisals)?
            .iter()
            .filter(|&&(_, u)| u == user_id)
            .map(|&(f, _)| f)
            .collect())
    }

    async fn count_likes(&self, film_id: FilmId) -> AppResult<u64> {
        Ok(read(&self.appraisals)?
            .iter()
            .filter(|&&(f, _)| f == film_id)
            .count() as u64)
    }

    async fn all_appraisals(&self) -> AppResult<Vec<Appraisal>> {
        Ok(read(&self.appraisals)?
            .iter()
            .map(|&(film_id, user_id)| Appraisal { film_id, user_id })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryFeedStore {
    events: RwLock<Vec<FeedEvent>>,
    next_event_id: AtomicI64,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn append(
        &self,
        user_id: UserId,
        entity_id: i64,
        event_type: EventType,
        operation: Operation,
        timestamp: i64,
    ) -> AppResult<()> {
        let event_id = self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1;
        write(&self.events)?.push(FeedEvent {
            event_id,
            user_id,
            entity_id,
            event_type,
            operation,
            timestamp,
        });
        Ok(())
    }

    async fn feed_for(&self, user_id: UserId) -> AppResult<Vec<FeedEvent>> {
        let events = read(&self.events)?;
        let mut feed: Vec<FeedEvent> = events
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect();
        feed.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.event_id.cmp(&b.event_id)));
        Ok(feed)
    }
}
