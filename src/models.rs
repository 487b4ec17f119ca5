// Domain models for the film catalogue social graph

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User identifier
pub type UserId = i64;
/// Film identifier
pub type FilmId = i64;
/// Director identifier
pub type DirectorId = i64;
/// Genre identifier (static reference data, ids only)
pub type GenreId = i64;
/// Feed event surrogate key
pub type EventId = i64;

/// Current time in milliseconds since Unix epoch
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Director {
    pub id: DirectorId,
    pub name: String,
}

/// Film record as consumed by the ranking engines: genres, directors and
/// release date are read-only inputs here, owned by the entity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    #[serde(default)]
    pub genre_ids: BTreeSet<GenreId>,
    #[serde(default)]
    pub director_ids: BTreeSet<DirectorId>,
}

impl Film {
    pub fn release_year(&self) -> i32 {
        self.release_date.year()
    }
}

/// A single directed row representing a symmetric friendship.
///
/// Stored once per unordered pair, smaller id first. `status` is reserved
/// for future pending/confirmed semantics and is always 0 today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendEdge {
    pub user_id: UserId,
    pub friend_id: UserId,
    pub status: i32,
}

/// Canonical storage order for a friend pair: smaller id first.
pub fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A user's like of a film; binary, no rating magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appraisal {
    pub film_id: FilmId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Like,
    Friend,
    Review,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Like => "LIKE",
            EventType::Friend => "FRIEND",
            EventType::Review => "REVIEW",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LIKE" => Some(EventType::Like),
            "FRIEND" => Some(EventType::Friend),
            "REVIEW" => Some(EventType::Review),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Add,
    Remove,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "ADD",
            Operation::Remove => "REMOVE",
            Operation::Update => "UPDATE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADD" => Some(Operation::Add),
            "REMOVE" => Some(Operation::Remove),
            "UPDATE" => Some(Operation::Update),
            _ => None,
        }
    }
}

/// Immutable activity-log record. `user_id` is the actor; `entity_id` is
/// the target film/user/review id depending on `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEvent {
    pub event_id: EventId,
    pub user_id: UserId,
    pub entity_id: i64,
    pub event_type: EventType,
    pub operation: Operation,
    pub timestamp: i64,
}

/// Sort orders for a director's filmography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorSort {
    Year,
    Likes,
}
