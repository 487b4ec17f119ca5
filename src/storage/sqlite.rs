use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{AppError, AppResult};
use crate::models::{
    canonical_pair, Appraisal, Director, DirectorId, EventType, FeedEvent, Film, FilmId,
    Operation, User, UserId,
};
use crate::storage::{EngagementStore, EntityStore, FeedStore, FriendStore};

/// SQLite implementation of all four store interfaces over a single pool.
/// Uniqueness constraints on the pair columns provide the per-pair
/// atomicity the mutation paths require.
pub struct SqliteStorage {
    pool: SqlitePool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

fn db_err(context: &str, err: sqlx::Error) -> AppError {
    AppError::DatabaseError(format!("{}: {}", context, err))
}

impl SqliteStorage {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| db_err("failed to connect to SQLite", e))?;
        Ok(Self { pool })
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        // A single connection so every query sees the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| db_err("failed to connect to in-memory SQLite", e))?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                login TEXT NOT NULL,
                name TEXT NOT NULL,
                birthday TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS directors (
                director_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS films (
                film_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                release_date TEXT NOT NULL,
                duration INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS film_genres (
                film_id INTEGER NOT NULL,
                genre_id INTEGER NOT NULL,
                PRIMARY KEY (film_id, genre_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS film_directors (
                film_id INTEGER NOT NULL,
                director_id INTEGER NOT NULL,
                PRIMARY KEY (film_id, director_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS user_friends (
                user_id INTEGER NOT NULL,
                friend_id INTEGER NOT NULL,
                status INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, friend_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS appraisers (
                film_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                PRIMARY KEY (film_id, user_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                feed_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                entity_id INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                operation TEXT NOT NULL,
                times INTEGER NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_appraisers_user ON appraisers(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_feeds_user ON feeds(user_id, times)",
            "CREATE INDEX IF NOT EXISTS idx_film_directors_dir ON film_directors(director_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| db_err("failed to initialize schema", e))?;
        }
        Ok(())
    }

    fn map_user(row: &sqlx::sqlite::SqliteRow) -> User {
        User {
            id: row.get("user_id"),
            email: row.get("email"),
            login: row.get("login"),
            name: row.get("name"),
            birthday: row.get::<Option<NaiveDate>, _>("birthday"),
        }
    }

    fn map_film(row: &sqlx::sqlite::SqliteRow) -> Film {
        Film {
            id: row.get("film_id"),
            name: row.get("name"),
            description: row.get("description"),
            release_date: row.get("release_date"),
            duration: row.get("duration"),
            genre_ids: BTreeSet::new(),
            director_ids: BTreeSet::new(),
        }
    }

    fn map_feed(row: &sqlx::sqlite::SqliteRow) -> AppResult<FeedEvent> {
        let event_type: String = row.get("event_type");
        let operation: String = row.get("operation");
        Ok(FeedEvent {
            event_id: row.get("feed_id"),
            user_id: row.get("user_id"),
            entity_id: row.get("entity_id"),
            event_type: EventType::parse(&event_type).ok_or_else(|| {
                AppError::DatabaseError(format!("unknown event type: {}", event_type))
            })?,
            operation: Operation::parse(&operation).ok_or_else(|| {
                AppError::DatabaseError(format!("unknown operation: {}", operation))
            })?,
            timestamp: row.get("times"),
        })
    }

    /// Attach genre and director id sets to the given films in two batch
    /// queries instead of one pair of queries per film.
    async fn fill_films(&self, films: &mut [Film]) -> AppResult<()> {
        if films.is_empty() {
            return Ok(());
        }
        let mut by_id: BTreeMap<FilmId, usize> = BTreeMap::new();
        for (index, film) in films.iter().enumerate() {
            by_id.insert(film.id, index);
        }

        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT film_id, genre_id FROM film_genres WHERE film_id IN (",
        );
        let mut separated = qb.separated(",");
        for id in by_id.keys() {
            separated.push_bind(*id);
        }
        qb.push(")");
        let genre_rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get film genres", e))?;
        for row in genre_rows {
            if let Some(&index) = by_id.get(&row.get::<FilmId, _>("film_id")) {
                films[index].genre_ids.insert(row.get("genre_id"));
            }
        }

        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT film_id, director_id FROM film_directors WHERE film_id IN (",
        );
        let mut separated = qb.separated(",");
        for id in by_id.keys() {
            separated.push_bind(*id);
        }
        qb.push(")");
        let director_rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get film directors", e))?;
        for row in director_rows {
            if let Some(&index) = by_id.get(&row.get::<FilmId, _>("film_id")) {
                films[index].director_ids.insert(row.get("director_id"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for SqliteStorage {
    async fn add_user(&self, mut user: User) -> AppResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (email, login, name, birthday) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("failed to create user", e))?;
        user.id = result.last_insert_rowid();
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to get user", e))?;
        Ok(row.as_ref().map(Self::map_user))
    }

    async fn all_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get users", e))?;
        Ok(rows.iter().map(Self::map_user).collect())
    }

    async fn user_exists(&self, id: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to check user existence", e))?;
        Ok(row.is_some())
    }

    async fn add_director(&self, mut director: Director) -> AppResult<Director> {
        let result = sqlx::query("INSERT INTO directors (name) VALUES (?)")
            .bind(&director.name)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("failed to create director", e))?;
        director.id = result.last_insert_rowid();
        Ok(director)
    }

    async fn director_exists(&self, id: DirectorId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM directors WHERE director_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to check director existence", e))?;
        Ok(row.is_some())
    }

    async fn add_film(&self, mut film: Film) -> AppResult<Film> {
        let result = sqlx::query(
            "INSERT INTO films (name, description, release_date, duration) VALUES (?, ?, ?, ?)",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("failed to create film", e))?;
        film.id = result.last_insert_rowid();

        for genre_id in &film.genre_ids {
            sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES (?, ?)")
                .bind(film.id)
                .bind(*genre_id)
                .execute(&self.pool)
                .await
                .map_err(|e| db_err("failed to link film genre", e))?;
        }
        for director_id in &film.director_ids {
            sqlx::query("INSERT INTO film_directors (film_id, director_id) VALUES (?, ?)")
                .bind(film.id)
                .bind(*director_id)
                .execute(&self.pool)
                .await
                .map_err(|e| db_err("failed to link film director", e))?;
        }
        Ok(film)
    }

    async fn get_film(&self, id: FilmId) -> AppResult<Option<Film>> {
        let row = sqlx::query("SELECT * FROM films WHERE film_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to get film", e))?;
        match row {
            Some(row) => {
                let mut films = vec![Self::map_film(&row)];
                self.fill_films(&mut films).await?;
                Ok(films.pop())
            }
            None => Ok(None),
        }
    }

    async fn all_films(&self) -> AppResult<Vec<Film>> {
        let rows = sqlx::query("SELECT * FROM films ORDER BY film_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get films", e))?;
        let mut films: Vec<Film> = rows.iter().map(Self::map_film).collect();
        self.fill_films(&mut films).await?;
        Ok(films)
    }

    async fn film_exists(&self, id: FilmId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM films WHERE film_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to check film existence", e))?;
        Ok(row.is_some())
    }

    async fn films_by_director(&self, id: DirectorId) -> AppResult<Vec<Film>> {
        let rows = sqlx::query(
            "SELECT f.* FROM films f \
             JOIN film_directors fd ON fd.film_id = f.film_id \
             WHERE fd.director_id = ? ORDER BY f.film_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("failed to get films by director", e))?;
        let mut films: Vec<Film> = rows.iter().map(Self::map_film).collect();
        self.fill_films(&mut films).await?;
        Ok(films)
    }
}

#[async_trait]
impl FriendStore for SqliteStorage {
    async fn add(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        let (low, high) = canonical_pair(user_id, friend_id);
        sqlx::query("INSERT INTO user_friends (user_id, friend_id, status) VALUES (?, ?, 0)")
            .bind(low)
            .bind(high)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!(
                        "users {} and {} are already friends",
                        user_id, friend_id
                    ))
                } else {
                    db_err("failed to create friendship", e)
                }
            })?;
        Ok(())
    }

    async fn remove(&self, user_id: UserId, friend_id: UserId) -> AppResult<()> {
        let (low, high) = canonical_pair(user_id, friend_id);
        let result = sqlx::query("DELETE FROM user_friends WHERE user_id = ? AND friend_id = ?")
            .bind(low)
            .bind(high)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("failed to delete friendship", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "no friendship between users {} and {}",
                user_id, friend_id
            )));
        }
        Ok(())
    }

    async fn contains(&self, user_id: UserId, friend_id: UserId) -> AppResult<bool> {
        let (low, high) = canonical_pair(user_id, friend_id);
        let row = sqlx::query("SELECT 1 FROM user_friends WHERE user_id = ? AND friend_id = ?")
            .bind(low)
            .bind(high)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to check friendship", e))?;
        Ok(row.is_some())
    }

    async fn friends_of(&self, user_id: UserId) -> AppResult<BTreeSet<UserId>> {
        let rows = sqlx::query(
            "SELECT user_id, friend_id FROM user_friends WHERE user_id = ? OR friend_id = ?",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("failed to get friends", e))?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let a: UserId = row.get("user_id");
                let b: UserId = row.get("friend_id");
                if a == user_id {
                    b
                } else {
                    a
                }
            })
            .collect())
    }
}

#[async_trait]
impl EngagementStore for SqliteStorage {
    async fn like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        sqlx::query("INSERT INTO appraisers (film_id, user_id) VALUES (?, ?)")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!(
                        "user {} already likes film {}",
                        user_id, film_id
                    ))
                } else {
                    db_err("failed to create like", e)
                }
            })?;
        Ok(())
    }

    async fn unlike(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM appraisers WHERE film_id = ? AND user_id = ?")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("failed to delete like", e))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "user {} has not liked film {}",
                user_id, film_id
            )));
        }
        Ok(())
    }

    async fn has(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM appraisers WHERE film_id = ? AND user_id = ?")
            .bind(film_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("failed to check like", e))?;
        Ok(row.is_some())
    }

    async fn likers_of(&self, film_id: FilmId) -> AppResult<BTreeSet<UserId>> {
        let rows = sqlx::query("SELECT user_id FROM appraisers WHERE film_id = ?")
            .bind(film_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get likers", e))?;
        Ok(rows.into_iter().map(|row| row.get("user_id")).collect())
    }

    async fn likes_of(&self, user_id: UserId) -> AppResult<BTreeSet<FilmId>> {
        let rows = sqlx::query("SELECT film_id FROM appraisers WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get likes", e))?;
        Ok(rows.into_iter().map(|row| row.get("film_id")).collect())
    }

    async fn count_likes(&self, film_id: FilmId) -> AppResult<u64> {
        let row = sqlx::query("SELECT COUNT(1) AS likes FROM appraisers WHERE film_id = ?")
            .bind(film_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_err("failed to count likes", e))?;
        Ok(row.get::<i64, _>("likes") as u64)
    }

    async fn all_appraisals(&self) -> AppResult<Vec<Appraisal>> {
        let rows = sqlx::query("SELECT film_id, user_id FROM appraisers ORDER BY film_id, user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_err("failed to get appraisals", e))?;
        Ok(rows
            .into_iter()
            .map(|row| Appraisal {
                film_id: row.get("film_id"),
                user_id: row.get("user_id"),
            })
            .collect())
    }
}

#[async_trait]
impl FeedStore for SqliteStorage {
    async fn append(
        &self,
        user_id: UserId,
        entity_id: i64,
        event_type: EventType,
        operation: Operation,
        timestamp: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO feeds (user_id, entity_id, event_type, operation, times) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(entity_id)
        .bind(event_type.as_str())
        .bind(operation.as_str())
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("failed to append feed event", e))?;
        Ok(())
    }

    async fn feed_for(&self, user_id: UserId) -> AppResult<Vec<FeedEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM feeds WHERE user_id = ? ORDER BY times ASC, feed_id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("failed to get feed", e))?;
        rows.iter().map(Self::map_feed).collect()
    }
}
