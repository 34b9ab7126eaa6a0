use crate::helpers::{assert_error_kind, get_test_pool, spawn_app_with_postgres};
use campaign_desk::domain::{
    CampaignMessage, CampaignStatus, NewSubscriber, OwnerId, Subscriber, SubscriberProfile,
    SubscriberStatus,
};
use campaign_desk::lifecycle::{
    add_subscriber, create_campaign, edit_campaign, edit_subscriber, unsubscribe,
    LifecycleError, Transition,
};
use campaign_desk::store::{PgStore, Store, StoreError};
use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

fn message(subject: &str) -> CampaignMessage {
    CampaignMessage::parse("Launch".into(), subject.into(), "Body".into()).unwrap()
}

fn subscriber(owner_id: OwnerId, email: &str) -> Subscriber {
    let new_subscriber = NewSubscriber {
        profile: SubscriberProfile::parse(email.into(), None, None).unwrap(),
        tags: BTreeSet::from(["newsletter".to_string()]),
    };
    add_subscriber(owner_id, new_subscriber, &[], Utc::now()).unwrap()
}

fn unsubscribed(subscriber: &Subscriber) -> Subscriber {
    match unsubscribe(subscriber, Utc::now()) {
        Transition::Changed(subscriber) => subscriber,
        Transition::Unchanged => panic!("an active subscriber must change state"),
    }
}

#[tokio::test]
async fn duplicate_email_returns_409_from_postgres() {
    // Arrange
    let app = spawn_app_with_postgres().await.unwrap();
    app.create_subscriber("ursula@example.com").await;

    // Act
    let response = app
        .post(
            "/api/subscribers",
            &serde_json::json!({"email": "ursula@example.com"}),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 409);
    assert_error_kind(&response.json().await.unwrap(), "duplicate_email");
}

#[tokio::test]
async fn sending_twice_returns_409_from_postgres() {
    // Arrange
    let app = spawn_app_with_postgres().await.unwrap();
    app.create_subscriber("a@example.com").await;
    let campaign = app.create_campaign("Launch").await;
    let campaign_id = campaign["id"].as_str().unwrap();

    // Act
    let first = app.send_campaign(campaign_id).await;
    let second = app.send_campaign(campaign_id).await;

    // Assert
    assert_eq!(first.status().as_u16(), 200);
    let report: serde_json::Value = first.json().await.unwrap();
    assert_eq!(report["stats_recorded"], true);
    assert_eq!(second.status().as_u16(), 409);
    assert_error_kind(&second.json().await.unwrap(), "already_sent");

    let summary = app.get_json("/api/dashboard").await;
    assert_eq!(summary["total_sent"], 1);
    assert_eq!(summary["campaigns"]["sent"], 1);
}

#[tokio::test]
async fn editing_a_sent_campaign_returns_409_from_postgres() {
    // Arrange
    let app = spawn_app_with_postgres().await.unwrap();
    app.create_subscriber("a@example.com").await;
    let campaign = app.create_campaign("Launch").await;
    let campaign_id = campaign["id"].as_str().unwrap();
    app.send_campaign(campaign_id).await;

    // Act
    let response = app
        .put(
            &format!("/api/campaigns/{}", campaign_id),
            &serde_json::json!({"name": "Launch", "subject": "Changed", "content": "Body"}),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 409);
    assert_error_kind(&response.json().await.unwrap(), "campaign_locked");
    let page = app.get_json("/api/campaigns").await;
    assert_eq!(page["campaigns"][0]["subject"], "Launch subject");
    assert_eq!(page["campaigns"][0]["stats"]["total_sent"], 1);
}

#[tokio::test]
async fn store_rejects_duplicate_email_through_the_unique_index() {
    let store = PgStore::new(get_test_pool().await);
    let owner_id = OwnerId::new(Uuid::new_v4());
    store
        .insert_subscriber(&subscriber(owner_id, "a@example.com"))
        .await
        .unwrap();

    let result = store
        .insert_subscriber(&subscriber(owner_id, "a@example.com"))
        .await;

    match result {
        Err(StoreError::UniqueViolation { constraint }) => {
            assert_eq!(constraint, "subscribers_owner_id_email_key")
        }
        other => panic!("expected a unique violation, got {:?}", other),
    }
}

#[tokio::test]
async fn profile_edit_from_a_stale_read_keeps_the_unsubscribe_in_postgres() {
    let store = PgStore::new(get_test_pool().await);
    let owner_id = OwnerId::new(Uuid::new_v4());
    store
        .insert_subscriber(&subscriber(owner_id, "a@example.com"))
        .await
        .unwrap();
    let stale = store.load_subscribers(owner_id).await.unwrap();

    assert!(store.mark_unsubscribed(&unsubscribed(&stale[0])).await.unwrap());
    let profile = SubscriberProfile::parse("b@example.com".into(), None, None).unwrap();
    let edited = edit_subscriber(&stale[0], profile, &stale).unwrap();
    let stored = store.update_subscriber_profile(&edited).await.unwrap();

    assert_eq!(stored.status(), SubscriberStatus::Unsubscribed);
    assert_eq!(stored.email.as_ref(), "b@example.com");
    assert!(stored.tags.contains("newsletter"));
    assert!(!store.mark_unsubscribed(&unsubscribed(&stale[0])).await.unwrap());
}

#[tokio::test]
async fn send_after_an_edit_goes_out_with_the_edited_message_in_postgres() {
    let store = PgStore::new(get_test_pool().await);
    let owner_id = OwnerId::new(Uuid::new_v4());
    let draft = create_campaign(owner_id, message("Old"), Utc::now());
    store.insert_campaign(&draft).await.unwrap();
    store
        .insert_subscriber(&subscriber(owner_id, "a@example.com"))
        .await
        .unwrap();
    let stale = store.load_campaigns(owner_id).await.unwrap();

    let edited = edit_campaign(&stale[0], message("New")).unwrap();
    store.update_campaign_message(&edited).await.unwrap();
    let outcome = store
        .send_campaign(owner_id, draft.id, Utc::now())
        .await
        .unwrap();

    assert_eq!(outcome.campaign.message.subject(), "New");
    let stored = store.load_campaigns(owner_id).await.unwrap();
    assert_eq!(stored[0].status(), CampaignStatus::Sent);
    assert_eq!(stored[0].message.subject(), "New");
    assert!(matches!(
        store.update_campaign_message(&edited).await,
        Err(StoreError::StaleWrite)
    ));
}

#[tokio::test]
async fn concurrent_sends_go_out_once() {
    let store = PgStore::new(get_test_pool().await);
    let owner_id = OwnerId::new(Uuid::new_v4());
    let draft = create_campaign(owner_id, message("Hi"), Utc::now());
    store.insert_campaign(&draft).await.unwrap();
    store
        .insert_subscriber(&subscriber(owner_id, "a@example.com"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        store.send_campaign(owner_id, draft.id, Utc::now()),
        store.send_campaign(owner_id, draft.id, Utc::now())
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(StoreError::Rejected(LifecycleError::AlreadySent(_)))
    )));
}

#[tokio::test]
async fn stored_rows_breaking_domain_rules_are_reported() {
    let pg_pool = get_test_pool().await;
    let store = PgStore::new(pg_pool.clone());
    let owner_id = OwnerId::new(Uuid::new_v4());
    sqlx::query("INSERT INTO subscribers (id, owner_id, email) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(*owner_id)
        .bind("not-an-email")
        .execute(&pg_pool)
        .await
        .unwrap();

    let result = store.load_subscribers(owner_id).await;

    assert!(matches!(result, Err(StoreError::InvalidRow(_))));
}

#[tokio::test]
async fn schema_rejects_sent_campaign_without_sent_at() {
    let pg_pool = get_test_pool().await;

    let result = sqlx::query(
        r#"
        INSERT INTO campaigns (id, owner_id, name, subject, content, status)
        VALUES ($1, $2, 'Launch', 'Hi', 'Body', 'sent')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .execute(&pg_pool)
    .await;

    assert!(result.is_err());
}
