use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Film, FilmId, UserId};
use crate::storage::{EngagementStore, EntityStore};

/// User-based collaborative filtering on binary like-data.
///
/// Neighbors are chosen by taste overlap alone; friendship plays no part.
/// The whole computation is a single pass over the like relation,
/// O(users x average-likes), and fully deterministic.
pub struct RecommendationService {
    entities: Arc<dyn EntityStore>,
    likes: Arc<dyn EngagementStore>,
}

impl RecommendationService {
    pub fn new(entities: Arc<dyn EntityStore>, likes: Arc<dyn EngagementStore>) -> Self {
        Self { entities, likes }
    }

    /// Films liked by the user's closest taste neighbors that the user has
    /// not liked yet, ranked by how many of those neighbors like each one
    /// (film id ascending on ties). A user with no likes gets an empty
    /// list: there is no taste signal to extrapolate from.
    pub async fn recommend(&self, user_id: UserId) -> AppResult<Vec<Film>> {
        if !self.entities.user_exists(user_id).await? {
            return Err(AppError::NotFound(format!("user {} not found", user_id)));
        }

        let target = self.likes.likes_of(user_id).await?;
        if target.is_empty() {
            return Ok(Vec::new());
        }

        let mut likes_by_user: BTreeMap<UserId, BTreeSet<FilmId>> = BTreeMap::new();
        for appraisal in self.likes.all_appraisals().await? {
            if appraisal.user_id != user_id {
                likes_by_user
                    .entry(appraisal.user_id)
                    .or_default()
                    .insert(appraisal.film_id);
            }
        }

        // Neighbors with maximal positive overlap; ties all kept.
        let mut best_overlap = 0usize;
        let mut neighbors: Vec<UserId> = Vec::new();
        for (other, other_likes) in &likes_by_user {
            let overlap = other_likes.intersection(&target).count();
            if overlap == 0 {
                continue;
            }
            if overlap > best_overlap {
                best_overlap = overlap;
                neighbors.clear();
            }
            if overlap == best_overlap {
                neighbors.push(*other);
            }
        }
        if neighbors.is_empty() {
            return Ok(Vec::new());
        }

        // Candidates: neighbor likes the user does not already have, ranked
        // by the number of selected neighbors liking each film.
        let mut votes: BTreeMap<FilmId, usize> = BTreeMap::new();
        for neighbor in &neighbors {
            for film_id in &likes_by_user[neighbor] {
                if !target.contains(film_id) {
                    *votes.entry(*film_id).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(FilmId, usize)> = votes.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut films = Vec::with_capacity(ranked.len());
        for (film_id, _) in ranked {
            if let Some(film) = self.entities.get_film(film_id).await? {
                films.push(film);
            }
        }
        Ok(films)
    }
}
