use super::{Database, SqlitePersistence};
use crate::persistence::traits::{
    ConnectionRepository, LinkRepository, OptionProfileRepository, ProfileRepository,
    UserRepository,
};
use crate::persistence::{NewLink, NewOptionProfile, NewProfile, NewUser, Persistence};

async fn seeded_store() -> (Database, SqlitePersistence) {
    let db = Database::new_in_memory().await.unwrap();
    let store = SqlitePersistence::new(&db);
    (db, store)
}

async fn sample_user(store: &SqlitePersistence, email: &str) -> i64 {
    store
        .users()
        .create_user(&NewUser {
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn sample_profile(store: &SqlitePersistence, user_id: i64, icon: Option<&str>) -> i64 {
    store
        .profiles()
        .create_profile(&NewProfile {
            user_id,
            display_name: "card".to_string(),
            icon_ref: icon.map(str::to_string),
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

/// A profile with two option profiles, two links (one with an image) and
/// connections on both sides to `other`.
async fn populate(store: &SqlitePersistence, profile_id: i64, other: i64) {
    for title in ["Motto", "Food"] {
        store
            .option_profiles()
            .create_option_profile(&NewOptionProfile {
                profile_id,
                title: title.to_string(),
                content: "x".to_string(),
            })
            .await
            .unwrap();
    }
    for (title, image) in [("GitHub", Some("gh.png")), ("Blog", None)] {
        store
            .links()
            .create_link(&NewLink {
                profile_id,
                title: title.to_string(),
                url: "https://example.com".to_string(),
                description: None,
                image_ref: image.map(str::to_string),
            })
            .await
            .unwrap();
    }
    store
        .connections()
        .create_connection(profile_id, other)
        .await
        .unwrap();
    store
        .connections()
        .create_connection(other, profile_id)
        .await
        .unwrap();
}

async fn count(db: &Database, sql: &str, profile_id: i64) -> i64 {
    let (n,): (i64,) = sqlx::query_as(sql)
        .bind(profile_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    n
}

async fn profile_exists(store: &SqlitePersistence, id: i64) -> bool {
    store.profiles().get_profile(id).await.unwrap().is_some()
}

async fn profile_count(store: &SqlitePersistence, user_id: i64) -> usize {
    let profiles = store.profiles().list_profiles_by_user(user_id);
    profiles.await.unwrap().len()
}

async fn child_counts(db: &Database, profile_id: i64) -> (i64, i64, i64) {
    let options = "SELECT COUNT(*) FROM option_profiles WHERE profile_id = ?1";
    let connections =
        "SELECT COUNT(*) FROM connections WHERE ?1 IN (requester_profile_id, target_profile_id)";
    let links = "SELECT COUNT(*) FROM links WHERE profile_id = ?1";
    (
        count(db, options, profile_id).await,
        count(db, connections, profile_id).await,
        count(db, links, profile_id).await,
    )
}

#[tokio::test]
async fn test_cascade_delete_removes_all_children() {
    let (db, store) = seeded_store().await;
    let owner = sample_user(&store, "owner@example.com").await;
    let profile = sample_profile(&store, owner, Some("icon.png")).await;
    let other = sample_profile(&store, owner, None).await;
    populate(&store, profile, other).await;

    let deleted = store
        .profiles()
        .delete_profile_cascade(profile)
        .await
        .unwrap()
        .expect("profile existed");

    assert_eq!(deleted.icon_ref.as_deref(), Some("icon.png"));
    assert_eq!(deleted.link_image_refs, vec!["gh.png".to_string()]);
    assert_eq!(deleted.option_profiles, 2);
    assert_eq!(deleted.connections, 2);
    assert_eq!(deleted.links, 2);

    assert!(!profile_exists(&store, profile).await);
    assert_eq!(child_counts(&db, profile).await, (0, 0, 0));

    // The other profile survives.
    assert!(profile_exists(&store, other).await);
}

#[tokio::test]
async fn test_cascade_delete_rolls_back_when_final_step_fails() {
    let (db, store) = seeded_store().await;
    let owner = sample_user(&store, "owner@example.com").await;
    let profile = sample_profile(&store, owner, None).await;
    let other = sample_profile(&store, owner, None).await;
    populate(&store, profile, other).await;

    sqlx::query(
        "CREATE TRIGGER fail_profile_delete BEFORE DELETE ON profiles \
         BEGIN SELECT RAISE(ABORT, 'simulated failure'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let result = store.profiles().delete_profile_cascade(profile).await;
    assert!(result.is_err(), "expected failure, got {:?}", result);

    assert!(profile_exists(&store, profile).await);
    assert_eq!(child_counts(&db, profile).await, (2, 2, 2));
}

#[tokio::test]
async fn test_profiles_are_isolated_between_users() {
    let (_db, store) = seeded_store().await;
    let alice = sample_user(&store, "alice@example.com").await;
    let bob = sample_user(&store, "bob@example.com").await;
    sample_profile(&store, alice, None).await;
    sample_profile(&store, alice, None).await;
    sample_profile(&store, bob, None).await;

    assert_eq!(profile_count(&store, alice).await, 2);
    assert_eq!(profile_count(&store, bob).await, 1);
}

#[tokio::test]
async fn test_concurrent_repo_access() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let db = Database::open(&path).await.unwrap();
    let store = std::sync::Arc::new(SqlitePersistence::new(&db));

    let owner = sample_user(&store, "busy@example.com").await;
    let hub = sample_profile(&store, owner, None).await;

    let mut tasks = Vec::new();
    for i in 0..8_i64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let profile = sample_profile(&store, owner, None).await;
            store
                .connections()
                .create_connection(profile, hub)
                .await
                .unwrap();
            store
                .links()
                .create_link(&NewLink {
                    profile_id: profile,
                    title: format!("link {i}"),
                    url: "https://example.com".to_string(),
                    description: None,
                    image_ref: None,
                })
                .await
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let hub_connections = store.connections().list_connections(hub).await.unwrap();
    assert_eq!(hub_connections.len(), 8);
    assert_eq!(profile_count(&store, owner).await, 9);
}
