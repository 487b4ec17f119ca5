mod common;

use std::sync::Arc;

use cinegraph::app_state::AppState;
use cinegraph::models::{DirectorSort, EventType, Operation};
use cinegraph::storage::{EngagementStore, EntityStore, FeedStore, FriendStore, SqliteStorage};
use cinegraph::AppError;
use common::{director, film, user};

async fn sqlite_app() -> (Arc<SqliteStorage>, AppState) {
    let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
    let state = AppState::with_stores(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
    );
    (storage, state)
}

#[tokio::test]
async fn friendship_properties_hold_on_sqlite() {
    let (storage, app) = sqlite_app().await;
    let u1 = storage.add_user(user("alice")).await.unwrap();
    let u2 = storage.add_user(user("bob")).await.unwrap();

    app.social.add_friend(u2.id, u1.id).await.unwrap();
    assert!(app.social.friends_of(u1.id).await.unwrap().contains(&u2.id));
    assert!(app.social.friends_of(u2.id).await.unwrap().contains(&u1.id));

    // The uniqueness constraint rejects the reversed duplicate.
    let err = app.social.add_friend(u1.id, u2.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    app.social.remove_friend(u1.id, u2.id).await.unwrap();
    let err = app.social.remove_friend(u1.id, u2.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn engagement_and_popularity_hold_on_sqlite() {
    let (storage, app) = sqlite_app().await;
    let u1 = storage.add_user(user("alice")).await.unwrap();
    let u2 = storage.add_user(user("bob")).await.unwrap();
    let f1 = storage.add_film(film("A", 2000, &[1], &[])).await.unwrap();
    let f2 = storage.add_film(film("B", 2005, &[2], &[])).await.unwrap();

    app.engagement.like(f1.id, u1.id).await.unwrap();
    app.engagement.like(f1.id, u2.id).await.unwrap();
    app.engagement.like(f2.id, u1.id).await.unwrap();

    let err = app.engagement.like(f1.id, u1.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_eq!(storage.count_likes(f1.id).await.unwrap(), 2);

    let popular = app.ranking.popular(10, None, None).await.unwrap();
    let ids: Vec<i64> = popular.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![f1.id, f2.id]);

    let by_year = app.ranking.popular(10, None, Some(2005)).await.unwrap();
    let ids: Vec<i64> = by_year.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![f2.id]);

    let shared = app.ranking.shared_with_friend(u1.id, u2.id).await.unwrap();
    let ids: Vec<i64> = shared.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![f1.id]);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_friend_adds_admit_one_winner_on_sqlite() {
    let (storage, _app) = sqlite_app().await;
    let u1 = storage.add_user(user("alice")).await.unwrap();
    let u2 = storage.add_user(user("bob")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = storage.clone();
        // Alternate directions; the canonical primary key covers both.
        let (a, b) = if i % 2 == 0 { (u1.id, u2.id) } else { (u2.id, u1.id) };
        handles.push(tokio::spawn(async move { store.add(a, b).await }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(err) => assert!(matches!(err, AppError::Conflict(_))),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_likes_admit_one_winner_on_sqlite() {
    let (storage, _app) = sqlite_app().await;
    let u = storage.add_user(user("alice")).await.unwrap();
    let f = storage.add_film(film("A", 2000, &[], &[])).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = storage.clone();
        let (film_id, user_id) = (f.id, u.id);
        handles.push(tokio::spawn(async move { store.like(film_id, user_id).await }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(err) => assert!(matches!(err, AppError::Conflict(_))),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn recommendation_scenario_holds_on_sqlite() {
    let (storage, app) = sqlite_app().await;
    let u1 = storage.add_user(user("alice")).await.unwrap();
    let u2 = storage.add_user(user("bob")).await.unwrap();
    let u3 = storage.add_user(user("carol")).await.unwrap();
    let fa = storage.add_film(film("A", 2000, &[], &[])).await.unwrap();
    let fb = storage.add_film(film("B", 2001, &[], &[])).await.unwrap();
    let fc = storage.add_film(film("C", 2002, &[], &[])).await.unwrap();
    let fd = storage.add_film(film("D", 2003, &[], &[])).await.unwrap();

    // Alice likes {A, B}; Bob likes {A, B, C}; Carol likes {D}.
    // Bob wins with overlap 2, so the only candidate is C.
    app.engagement.like(fa.id, u1.id).await.unwrap();
    app.engagement.like(fb.id, u1.id).await.unwrap();
    app.engagement.like(fa.id, u2.id).await.unwrap();
    app.engagement.like(fb.id, u2.id).await.unwrap();
    app.engagement.like(fc.id, u2.id).await.unwrap();
    app.engagement.like(fd.id, u3.id).await.unwrap();

    let films = app.recommendations.recommend(u1.id).await.unwrap();
    let ids: Vec<i64> = films.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![fc.id]);

    // A user with no likes gets nothing.
    let films = app.recommendations.recommend(u3.id).await.unwrap();
    let ids: Vec<i64> = films.iter().map(|f| f.id).collect();
    assert_eq!(ids, Vec::<i64>::new());
}

#[tokio::test]
async fn store_lookups_hold_on_sqlite() {
    let (storage, app) = sqlite_app().await;
    let u1 = storage.add_user(user("alice")).await.unwrap();
    let u2 = storage.add_user(user("bob")).await.unwrap();

    let fetched = storage.get_user(u1.id).await.unwrap().unwrap();
    assert_eq!(fetched.login, "alice");
    assert!(storage.get_user(999).await.unwrap().is_none());

    let ids: Vec<i64> = storage.all_users().await.unwrap().iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![u1.id, u2.id]);

    app.social.add_friend(u1.id, u2.id).await.unwrap();
    assert!(storage.contains(u2.id, u1.id).await.unwrap());
    assert!(!storage.contains(u1.id, 999).await.unwrap());

    let f = storage.add_film(film("A", 2000, &[], &[])).await.unwrap();
    app.engagement.like(f.id, u1.id).await.unwrap();
    assert!(storage.has(f.id, u1.id).await.unwrap());
    assert!(!storage.has(f.id, u2.id).await.unwrap());
}

#[tokio::test]
async fn director_views_hold_on_sqlite() {
    let (storage, app) = sqlite_app().await;
    let d = storage.add_director(director("Kurosawa")).await.unwrap();
    let newer = storage.add_film(film("Newer", 1985, &[], &[d.id])).await.unwrap();
    let older = storage.add_film(film("Older", 1954, &[], &[d.id])).await.unwrap();

    let by_year = app.ranking.by_director(d.id, DirectorSort::Year).await.unwrap();
    let ids: Vec<i64> = by_year.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);

    let fetched = storage.get_film(newer.id).await.unwrap().unwrap();
    assert!(fetched.director_ids.contains(&d.id));

    let err = app.ranking.by_director(999, DirectorSort::Year).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn feed_ordering_holds_on_sqlite() {
    let (storage, _app) = sqlite_app().await;
    let u = storage.add_user(user("alice")).await.unwrap();

    storage
        .append(u.id, 10, EventType::Like, Operation::Add, 300)
        .await
        .unwrap();
    storage
        .append(u.id, 20, EventType::Friend, Operation::Add, 100)
        .await
        .unwrap();
    storage
        .append(u.id, 30, EventType::Like, Operation::Remove, 100)
        .await
        .unwrap();

    let feed = storage.feed_for(u.id).await.unwrap();
    let entities: Vec<i64> = feed.iter().map(|event| event.entity_id).collect();
    assert_eq!(entities, vec![20, 30, 10]);
    assert_eq!(feed[0].event_type, EventType::Friend);
}

#[tokio::test]
async fn file_backed_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("cinegraph.db").display());

    let user_id = {
        let storage = SqliteStorage::connect(&url).await.unwrap();
        storage.initialize().await.unwrap();
        storage.add_user(user("alice")).await.unwrap().id
    };

    let storage = SqliteStorage::connect(&url).await.unwrap();
    storage.initialize().await.unwrap();
    assert!(storage.user_exists(user_id).await.unwrap());
}
