mod common;

use cinegraph::storage::EntityStore;
use cinegraph::AppError;
use common::{film, seed_users, test_app};

#[tokio::test]
async fn recommends_from_the_closest_neighbor() {
    let app = test_app();
    let users = seed_users(app.entities.as_ref(), 3).await;
    let f1 = app.entities.add_film(film("A", 2000, &[], &[])).await.unwrap();
    let f2 = app.entities.add_film(film("B", 2001, &[], &[])).await.unwrap();
    let f3 = app.entities.add_film(film("C", 2002, &[], &[])).await.unwrap();
    let f4 = app.entities.add_film(film("D", 2003, &[], &[])).await.unwrap();

    // User 1 likes {A, B}; user 2 likes {A, B, C}; user 3 likes {D}.
    // User 2 wins with overlap 2, so the only candidate is C.
    app.engagement.like(f1.id, users[0]).await.unwrap();
    app.engagement.like(f2.id, users[0]).await.unwrap();
    app.engagement.like(f1.id, users[1]).await.unwrap();
    app.engagement.like(f2.id, users[1]).await.unwrap();
    app.engagement.like(f3.id, users[1]).await.unwrap();
    app.engagement.like(f4.id, users[2]).await.unwrap();

    let films = app.recommendations.recommend(users[0]).await.unwrap();
    let ids: Vec<i64> = films.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![f3.id]);
}

#[tokio::test]
async fn user_without_likes_gets_nothing() {
    let app = test_app();
    let users = seed_users(app.entities.as_ref(), 2).await;
    let f1 = app.entities.add_film(film("A", 2000, &[], &[])).await.unwrap();
    app.engagement.like(f1.id, users[1]).await.unwrap();

    let films = app.recommendations.recommend(users[0]).await.unwrap();
    assert!(films.is_empty());
}

#[tokio::test]
async fn never_recommends_an_already_liked_film() {
    let app = test_app();
    let users = seed_users(app.entities.as_ref(), 2).await;
    let f1 = app.entities.add_film(film("A", 2000, &[], &[])).await.unwrap();
    let f2 = app.entities.add_film(film("B", 2001, &[], &[])).await.unwrap();

    app.engagement.like(f1.id, users[0]).await.unwrap();
    app.engagement.like(f2.id, users[0]).await.unwrap();
    app.engagement.like(f1.id, users[1]).await.unwrap();
    app.engagement.like(f2.id, users[1]).await.unwrap();

    // Full overlap but nothing new to suggest.
    let films = app.recommendations.recommend(users[0]).await.unwrap();
    assert!(films.is_empty());
}

#[tokio::test]
async fn tied_neighbors_rank_candidates_by_shared_votes() {
    let app = test_app();
    let users = seed_users(app.entities.as_ref(), 3).await;
    let fa = app.entities.add_film(film("A", 2000, &[], &[])).await.unwrap();
    let fb = app.entities.add_film(film("B", 2001, &[], &[])).await.unwrap();
    let fc = app.entities.add_film(film("C", 2002, &[], &[])).await.unwrap();

    // Users 2 and 3 both overlap user 1 on A; C gets two neighbor votes,
    // B only one, so C ranks first.
    app.engagement.like(fa.id, users[0]).await.unwrap();
    app.engagement.like(fa.id, users[1]).await.unwrap();
    app.engagement.like(fb.id, users[1]).await.unwrap();
    app.engagement.like(fc.id, users[1]).await.unwrap();
    app.engagement.like(fa.id, users[2]).await.unwrap();
    app.engagement.like(fc.id, users[2]).await.unwrap();

    let films = app.recommendations.recommend(users[0]).await.unwrap();
    let ids: Vec<i64> = films.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![fc.id, fb.id]);
}

#[tokio::test]
async fn recommending_for_unknown_user_is_not_found() {
    let app = test_app();
    let err = app.recommendations.recommend(42).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
