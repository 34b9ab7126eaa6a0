use crate::helpers::{assert_error_kind, spawn_app};

#[tokio::test]
async fn new_subscriber_is_active() {
    // Arrange
    let app = spawn_app().await.unwrap();

    // Act
    let subscriber = app.create_subscriber("ursula@example.com").await;

    // Assert
    assert_eq!(subscriber["status"], "active");
    assert_eq!(subscriber["email"], "ursula@example.com");
    assert!(subscriber.get("unsubscribed_at").is_none());
}

#[tokio::test]
async fn invalid_email_returns_400() {
    // Arrange
    let app = spawn_app().await.unwrap();
    let test_cases = vec![
        (serde_json::json!({"email": ""}), "empty email"),
        (serde_json::json!({"email": "ursuladomain.com"}), "missing @"),
        (serde_json::json!({"first_name": "Ursula"}), "missing email"),
    ];

    for (body, error) in test_cases {
        // Act
        let response = app.post("/api/subscribers", &body).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload had {}",
            error
        );
    }
}

#[tokio::test]
async fn duplicate_email_returns_409() {
    // Arrange
    let app = spawn_app().await.unwrap();
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
    let page = app.get_json("/api/subscribers").await;
    assert_eq!(page["overview"]["total"], 1);
}

#[tokio::test]
async fn changing_email_to_a_taken_one_returns_409() {
    // Arrange
    let app = spawn_app().await.unwrap();
    app.create_subscriber("a@example.com").await;
    let b = app.create_subscriber("b@example.com").await;

    // Act
    let response = app
        .put(
            &format!("/api/subscribers/{}", b["id"].as_str().unwrap()),
            &serde_json::json!({"email": "a@example.com", "first_name": "Bea"}),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 409);
    assert_error_kind(&response.json().await.unwrap(), "duplicate_email");
}

#[tokio::test]
async fn editing_profile_updates_names() {
    // Arrange
    let app = spawn_app().await.unwrap();
    let subscriber = app.create_subscriber("a@example.com").await;

    // Act
    let response = app
        .put(
            &format!("/api/subscribers/{}", subscriber["id"].as_str().unwrap()),
            &serde_json::json!({"email": "a@example.com", "first_name": "", "last_name": "Le Guin"}),
        )
        .await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let edited: serde_json::Value = response.json().await.unwrap();
    assert!(edited["first_name"].is_null());
    assert_eq!(edited["last_name"], "Le Guin");
}

#[tokio::test]
async fn unsubscribing_twice_is_a_no_op() {
    // Arrange
    let app = spawn_app().await.unwrap();
    let subscriber = app.create_subscriber("a@example.com").await;
    let path = format!(
        "/api/subscribers/{}/unsubscribe",
        subscriber["id"].as_str().unwrap()
    );

    // Act 1
    let first = app.post(&path, &serde_json::json!({})).await;
    assert_eq!(first.status().as_u16(), 200);
    let first: serde_json::Value = first.json().await.unwrap();

    // Act 2
    let second = app.post(&path, &serde_json::json!({})).await;

    // Assert
    assert_eq!(second.status().as_u16(), 200);
    let second: serde_json::Value = second.json().await.unwrap();
    assert_eq!(first["status"], "unsubscribed");
    assert!(first["unsubscribed_at"].is_string());
    assert_eq!(first["unsubscribed_at"], second["unsubscribed_at"]);

    let page = app.get_json("/api/subscribers").await;
    assert_eq!(page["overview"]["unsubscribed"], 1);
    assert_eq!(page["overview"]["active"], 0);
}

#[tokio::test]
async fn subscriber_of_another_owner_cannot_be_deleted() {
    // Arrange
    let app = spawn_app().await.unwrap();
    let subscriber = app.create_subscriber("a@example.com").await;
    let path = format!("/api/subscribers/{}", subscriber["id"].as_str().unwrap());

    // Act
    let response = app
        .client
        .delete(&format!("{}{}", app.addr, path))
        .header("X-Owner-Id", uuid::Uuid::new_v4().to_string())
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(app.delete(&path).await.status().as_u16(), 204);
}
