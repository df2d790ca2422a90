//! Concurrency and failure behaviour of `BackendUserStore`.

#![allow(clippy::expect_used, clippy::panic)]

use std::{collections::HashSet, sync::Arc};

use tokengate_storage::{
    MemoryBackend, StorageError, assert_conflict,
    testutil::{UnavailableBackend, user_record},
    users::{BackendUserStore, MemoryUserStore, NewUser, UserStore},
};

fn new_user(email: &str) -> NewUser {
    NewUser::builder()
        .name("Concurrent")
        .email(email)
        .password_hash(String::from("$argon2id$hash"))
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_of_one_email_admit_exactly_one() {
    let store = Arc::new(MemoryUserStore::new(MemoryBackend::new()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.create_user(new_user("race@example.com")).await }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => created += 1,
            Err(StorageError::Conflict) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_receive_distinct_ids() {
    let store = Arc::new(MemoryUserStore::new(MemoryBackend::new()));

    let mut handles = Vec::new();
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.create_user(new_user(&format!("user{i}@example.com"))).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let user = handle.await.expect("task panicked").expect("create_user");
        assert!(ids.insert(user.id), "id {} handed out twice", user.id);
    }
    assert_eq!(ids.len(), 32);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let store = MemoryUserStore::new(MemoryBackend::new());
    store.create_user(new_user("dup@example.com")).await.expect("first create");
    assert_conflict!(store.create_user(new_user("Dup@Example.com")).await);
}

#[tokio::test]
async fn update_to_taken_email_is_a_conflict() {
    let store = MemoryUserStore::new(MemoryBackend::new());
    store.create_user(new_user("taken@example.com")).await.expect("create");
    let mut other = store.create_user(new_user("other@example.com")).await.expect("create");

    other.email = "TAKEN@example.com".into();
    assert_conflict!(store.update_user(&other).await);

    // The original index entry survives a rejected move.
    let still = store.find_by_email("other@example.com").await.expect("lookup");
    assert_eq!(still.map(|u| u.id), Some(other.id));
}

#[tokio::test]
async fn unreachable_backend_surfaces_connection_errors() {
    let store = BackendUserStore::new(UnavailableBackend);

    let lookup = store.find_by_email("a@example.com").await;
    assert!(matches!(lookup, Err(StorageError::Connection { .. })));

    let update = store.update_user(&user_record(1, "a@example.com")).await;
    assert!(matches!(update, Err(StorageError::Connection { .. })));

    let create = store.create_user(new_user("a@example.com")).await;
    assert!(matches!(&create, Err(e) if e.is_transient()));
}
