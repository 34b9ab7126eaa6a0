use crate::helpers::spawn_app;

#[tokio::test]
async fn check_health_check() {
    // Arrange
    let app = spawn_app().await.unwrap();

    // Act
    let response = reqwest::Client::new()
        .get(&format!("{}/health", app.addr))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn api_without_owner_header_is_unauthorized() {
    // Arrange
    let app = spawn_app().await.unwrap();

    // Act
    let response = reqwest::Client::new()
        .get(&format!("{}/api/dashboard", app.addr))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}
