// HTTP surface: thin translation between transport and the services.
// Field-level validation is the outer application's concern.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Director, DirectorId, DirectorSort, Film, FilmId, GenreId, User, UserId};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CreateDirectorRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateFilmRequest {
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    #[serde(default)]
    pub genre_ids: BTreeSet<GenreId>,
    #[serde(default)]
    pub director_ids: BTreeSet<DirectorId>,
}

#[derive(Deserialize)]
pub struct PopularQuery {
    pub count: Option<usize>,
    pub genre_id: Option<GenreId>,
    pub year: Option<i32>,
}

#[derive(Deserialize)]
pub struct DirectorSortQuery {
    pub sort_by: Option<String>,
}

#[derive(Deserialize)]
pub struct SharedFilmsQuery {
    pub user_id: UserId,
    pub friend_id: UserId,
}

fn parse_director_sort(value: &str) -> AppResult<DirectorSort> {
    match value.to_lowercase().as_str() {
        "year" => Ok(DirectorSort::Year),
        "likes" => Ok(DirectorSort::Likes),
        _ => Err(AppError::Validation(format!(
            "unknown sort order: {}",
            value
        ))),
    }
}

async fn create_user_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, AppError> {
    let user = state
        .entities
        .add_user(User {
            id: 0,
            email: req.email,
            login: req.login,
            name: req.name,
            birthday: req.birthday,
        })
        .await?;
    Ok(Json(user))
}

async fn create_director_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateDirectorRequest>,
) -> Result<Json<Director>, AppError> {
    let director = state
        .entities
        .add_director(Director {
            id: 0,
            name: req.name,
        })
        .await?;
    Ok(Json(director))
}

async fn create_film_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateFilmRequest>,
) -> Result<Json<Film>, AppError> {
    let film = state
        .entities
        .add_film(Film {
            id: 0,
            name: req.name,
            description: req.description,
            release_date: req.release_date,
            duration: req.duration,
            genre_ids: req.genre_ids,
            director_ids: req.director_ids,
        })
        .await?;
    Ok(Json(film))
}

async fn add_friend_handler(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(UserId, UserId)>,
) -> Result<Json<Value>, AppError> {
    state.social.add_friend(id, friend_id).await?;
    Ok(Json(json!({"user_id": id, "friend_id": friend_id, "added": true})))
}

async fn remove_friend_handler(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(UserId, UserId)>,
) -> Result<Json<Value>, AppError> {
    state.social.remove_friend(id, friend_id).await?;
    Ok(Json(json!({"user_id": id, "friend_id": friend_id, "removed": true})))
}

async fn get_friends_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Value>, AppError> {
    let friends = state.social.friends_of(id).await?;
    Ok(Json(json!({"user_id": id, "friends": friends})))
}

async fn common_friends_handler(
    State(state): State<AppState>,
    Path((id, other_id)): Path<(UserId, UserId)>,
) -> Result<Json<Value>, AppError> {
    let friends = state.social.common_friends(id, other_id).await?;
    Ok(Json(json!({"friends": friends})))
}

async fn feed_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Value>, AppError> {
    let events = state.social.feed_for(id).await?;
    Ok(Json(json!({"events": events})))
}

async fn recommendations_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Value>, AppError> {
    let films = state.recommendations.recommend(id).await?;
    Ok(Json(json!({"films": films})))
}

async fn like_film_handler(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(FilmId, UserId)>,
) -> Result<Json<Value>, AppError> {
    state.engagement.like(id, user_id).await?;
    Ok(Json(json!({"film_id": id, "user_id": user_id, "liked": true})))
}

async fn unlike_film_handler(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(FilmId, UserId)>,
) -> Result<Json<Value>, AppError> {
    state.engagement.unlike(id, user_id).await?;
    Ok(Json(json!({"film_id": id, "user_id": user_id, "liked": false})))
}

async fn popular_films_handler(
    State(state): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> Result<Json<Value>, AppError> {
    let count = params.count.unwrap_or(10);
    let films = state
        .ranking
        .popular(count, params.genre_id, params.year)
        .await?;
    Ok(Json(json!({"films": films})))
}

async fn films_by_director_handler(
    State(state): State<AppState>,
    Path(director_id): Path<DirectorId>,
    Query(params): Query<DirectorSortQuery>,
) -> Result<Json<Value>, AppError> {
    let sort = match params.sort_by.as_deref() {
        Some(value) => parse_director_sort(value)?,
        None => DirectorSort::Year,
    };
    let films = state.ranking.by_director(director_id, sort).await?;
    Ok(Json(json!({"films": films})))
}

async fn shared_films_handler(
    State(state): State<AppState>,
    Query(params): Query<SharedFilmsQuery>,
) -> Result<Json<Value>, AppError> {
    let films = state
        .ranking
        .shared_with_friend(params.user_id, params.friend_id)
        .await?;
    Ok(Json(json!({"films": films})))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Thin record CRUD
        .route("/users", post(create_user_handler))
        .route("/directors", post(create_director_handler))
        .route("/films", post(create_film_handler))
        // Friendship
        .route("/users/{id}/friends/{friend_id}", put(add_friend_handler))
        .route(
            "/users/{id}/friends/{friend_id}",
            delete(remove_friend_handler),
        )
        .route("/users/{id}/friends", get(get_friends_handler))
        .route(
            "/users/{id}/friends/common/{other_id}",
            get(common_friends_handler),
        )
        // Activity feed and recommendations
        .route("/users/{id}/feed", get(feed_handler))
        .route("/users/{id}/recommendations", get(recommendations_handler))
        // Engagement and derived film views
        .route("/films/{id}/like/{user_id}", put(like_film_handler))
        .route("/films/{id}/like/{user_id}", delete(unlike_film_handler))
        .route("/films/popular", get(popular_films_handler))
        .route("/films/director/{director_id}", get(films_by_director_handler))
        .route("/films/common", get(shared_films_handler))
        .with_state(state)
}
