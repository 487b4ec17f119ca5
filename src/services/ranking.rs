use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{DirectorId, DirectorSort, Film, FilmId, GenreId, UserId};
use crate::storage::{EngagementStore, EntityStore};

/// Popularity-ordered and director-scoped film views derived from the
/// engagement relation. Read-only; each store read is a point-in-time
/// snapshot, no global consistency across like-sets is assumed.
pub struct RankingService {
    entities: Arc<dyn EntityStore>,
    likes: Arc<dyn EngagementStore>,
}

impl RankingService {
    pub fn new(entities: Arc<dyn EntityStore>, likes: Arc<dyn EngagementStore>) -> Self {
        Self { entities, likes }
    }

    /// Most-liked films, optionally restricted by genre and release year.
    /// Sorted by like count descending, film id ascending on ties; returns
    /// fewer than `count` entries when fewer films qualify.
    pub async fn popular(
        &self,
        count: usize,
        genre_id: Option<GenreId>,
        year: Option<i32>,
    ) -> AppResult<Vec<Film>> {
        let films = self.entities.all_films().await?;
        let mut scored: Vec<(Film, u64)> = Vec::new();
        for film in films {
            if let Some(genre_id) = genre_id {
                if !film.genre_ids.contains(&genre_id) {
                    continue;
                }
            }
            if let Some(year) = year {
                if film.release_year() != year {
                    continue;
                }
            }
            let likes = self.likes.count_likes(film.id).await?;
            scored.push((film, likes));
        }
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));
        scored.truncate(count);
        Ok(scored.into_iter().map(|(film, _)| film).collect())
    }

    /// A director's filmography, sorted by release year ascending or like
    /// count descending, film id ascending on ties. A known director with
    /// no films yields an empty list; an unknown director is an error.
    pub async fn by_director(
        &self,
        director_id: DirectorId,
        sort: DirectorSort,
    ) -> AppResult<Vec<Film>> {
        if !self.entities.director_exists(director_id).await? {
            return Err(AppError::NotFound(format!(
                "director {} not found",
                director_id
            )));
        }
        let films = self.entities.films_by_director(director_id).await?;
        match sort {
            DirectorSort::Year => {
                let mut films = films;
                films.sort_by(|a, b| {
                    a.release_year()
                        .cmp(&b.release_year())
                        .then(a.id.cmp(&b.id))
                });
                Ok(films)
            }
            DirectorSort::Likes => {
                let mut scored: Vec<(Film, u64)> = Vec::new();
                for film in films {
                    let likes = self.likes.count_likes(film.id).await?;
                    scored.push((film, likes));
                }
                scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));
                Ok(scored.into_iter().map(|(film, _)| film).collect())
            }
        }
    }

    /// Films both users liked, ascending by film id.
    pub async fn shared_with_friend(
        &self,
        user_id: UserId,
        friend_id: UserId,
    ) -> AppResult<Vec<Film>> {
        let likes = self.likes.likes_of(user_id).await?;
        let friend_likes = self.likes.likes_of(friend_id).await?;
        let shared: Vec<FilmId> = likes.intersection(&friend_likes).copied().collect();

        let mut films = Vec::with_capacity(shared.len());
        for film_id in shared {
            if let Some(film) = self.entities.get_film(film_id).await? {
                films.push(film);
            }
        }
        Ok(films)
    }
}
