//! Query cache and mutations driving the live mock server.

mod common;

use std::sync::Arc;

use users_core::{
    user_key, users_key, ApiError, MutationStatus, QueryClient, UserCreate, UserUpdate,
    UsersQueries,
};

async fn queries() -> (UsersQueries<Arc<common::Counting>>, Arc<common::Counting>) {
    let base_url = common::spawn_server().await;
    let (service, transport) = common::counting_service(&base_url);
    (UsersQueries::new(service, QueryClient::new()), transport)
}

#[tokio::test]
async fn same_turn_subscriptions_issue_one_list_call() {
    let (queries, transport) = queries().await;

    let mut a = queries.users();
    let mut b = queries.users();
    let sa = a.settled().await;
    let sb = b.settled().await;

    assert_eq!(transport.gets(), 1);
    assert!(sa.is_success());
    assert!(Arc::ptr_eq(sa.data.as_ref().unwrap(), sb.data.as_ref().unwrap()));
}

#[tokio::test]
async fn warm_list_is_served_from_cache() {
    let (queries, transport) = queries().await;

    let mut first = queries.users();
    let data = first.settled().await.data.unwrap();

    let second = queries.users();
    assert!(Arc::ptr_eq(&data, &second.data().unwrap()));
    assert_eq!(transport.gets(), 1);
}

#[tokio::test]
async fn create_refreshes_list_and_detail_keys() {
    let (queries, transport) = queries().await;

    let create = queries.create_user();
    let bob = create
        .mutate(UserCreate::new("Bob", "bob@example.com"))
        .await
        .unwrap();

    let mut list = queries.users();
    let mut other = queries.user(&bob.id);
    assert_eq!(list.settled().await.data().map(Vec::len), Some(1));
    assert_eq!(other.settled().await.data().map(|u| u.name.as_str()), Some("Bob"));
    let gets_before = transport.gets();

    let ada = create
        .mutate(UserCreate::new("Ada", "ada@example.com"))
        .await
        .unwrap();
    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.email, "ada@example.com");

    // Both keys were invalidated by prefix, including the untouched detail.
    assert!(list.state().is_stale);
    assert!(other.state().is_stale);

    let refreshed = list.settled().await;
    let users = refreshed.data().unwrap();
    assert_eq!(users.iter().filter(|u| u.id == ada.id).count(), 1);
    assert!(!other.settled().await.is_stale);
    assert_eq!(transport.gets(), gets_before + 2);
}

#[tokio::test]
async fn unobserved_entries_are_dropped_on_invalidation() {
    let (queries, _transport) = queries().await;
    let create = queries.create_user();
    let ada = create
        .mutate(UserCreate::new("Ada", "ada@example.com"))
        .await
        .unwrap();

    let mut detail = queries.user(&ada.id);
    detail.settled().await;
    drop(detail);
    assert!(queries.client().contains(&user_key(&ada.id)));

    create
        .mutate(UserCreate::new("Grace", "grace@example.com"))
        .await
        .unwrap();
    assert!(!queries.client().contains(&user_key(&ada.id)));
}

#[tokio::test]
async fn update_then_read_keeps_unset_fields() {
    let (queries, _transport) = queries().await;
    let created = queries
        .create_user()
        .mutate(UserCreate::new("Ada", "ada@example.com"))
        .await
        .unwrap();

    let mut detail = queries.user(&created.id);
    assert_eq!(detail.settled().await.data().map(|u| u.name.clone()), Some("Ada".to_string()));

    queries
        .update_user()
        .mutate((created.id.clone(), UserUpdate::default().with_name("Ada Lovelace")))
        .await
        .unwrap();

    let state = detail.settled().await;
    let user = state.data().unwrap();
    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.email, "ada@example.com");
}

#[tokio::test]
async fn delete_then_detail_query_errors_with_not_found() {
    let (queries, _transport) = queries().await;
    let created = queries
        .create_user()
        .mutate(UserCreate::new("Ada", "ada@example.com"))
        .await
        .unwrap();

    let mut detail = queries.user(&created.id);
    assert!(detail.settled().await.is_success());

    queries.delete_user().mutate(created.id.clone()).await.unwrap();

    let state = detail.settled().await;
    assert!(state.is_error());
    assert!(state.error().unwrap().is_not_found());
    // The last good value is still there for display.
    assert_eq!(state.data().map(|u| u.id.as_str()), Some(created.id.as_str()));
}

#[tokio::test]
async fn failed_mutation_leaves_cache_alone() {
    let (queries, transport) = queries().await;
    let create = queries.create_user();
    create
        .mutate(UserCreate::new("Ada", "ada@example.com"))
        .await
        .unwrap();

    let mut list = queries.users();
    list.settled().await;
    let gets = transport.gets();

    let mut cleared = false;
    let err = create
        .mutate_with(UserCreate::new("Imposter", "ada@example.com"), |_| cleared = true)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Conflict { .. }));
    assert!(!cleared);
    assert_eq!(create.state().status, MutationStatus::Error);
    assert!(!list.state().is_stale);
    assert_eq!(transport.gets(), gets);
}

#[tokio::test]
async fn on_success_runs_after_cache_update() {
    let (queries, _transport) = queries().await;
    let mut list = queries.users();
    list.settled().await;

    let create = queries.create_user();
    let client = queries.client().clone();
    let mut saw_stale = None;
    create
        .mutate_with(UserCreate::new("Ada", "ada@example.com"), |_| {
            saw_stale = client
                .query_state::<Vec<users_core::User>>(&users_key())
                .map(|s| s.is_stale);
        })
        .await
        .unwrap();

    assert_eq!(saw_stale, Some(true));
}

#[tokio::test]
async fn detail_query_with_empty_id_stays_idle() {
    let (queries, transport) = queries().await;
    let mut detail = queries.user("");
    let state = detail.settled().await;
    assert!(!state.is_loading());
    assert!(state.data.is_none());
    assert_eq!(transport.total(), 0);
}
