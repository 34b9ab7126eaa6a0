use campaign_desk::authentication::OWNER_HEADER;
use campaign_desk::configuration::{DatabaseSettings, Settings, StoreBackend};
use campaign_desk::startup::Application;
use campaign_desk::store::PgStore;
use campaign_desk::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use once_cell::sync::Lazy;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let test_name = "test_app";
    let default_log_level = "debug";
    if std::env::var("TEST_LOG").is_ok() {
        init_tracing_subscriber(get_tracing_subscriber(
            test_name,
            default_log_level,
            std::io::stdout,
        ));
    } else {
        init_tracing_subscriber(get_tracing_subscriber(
            test_name,
            default_log_level,
            std::io::sink,
        ));
    }
});

pub struct TestApp {
    pub addr: String,
    pub owner_id: Uuid,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.get_as(self.owner_id, path).await
    }

    pub async fn get_as(&self, owner_id: Uuid, path: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", self.addr, path))
            .header(OWNER_HEADER, owner_id.to_string())
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        let response = self.get(path).await;
        assert_eq!(response.status().as_u16(), 200, "GET {} failed", path);
        response.json().await.expect("Failed to parse JSON body")
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.addr, path))
            .header(OWNER_HEADER, self.owner_id.to_string())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .put(&format!("{}{}", self.addr, path))
            .header(OWNER_HEADER, self.owner_id.to_string())
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(&format!("{}{}", self.addr, path))
            .header(OWNER_HEADER, self.owner_id.to_string())
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_campaign(&self, name: &str) -> serde_json::Value {
        let body = serde_json::json!({
            "name": name,
            "subject": format!("{} subject", name),
            "content": "<p>Hello there</p>"
        });
        let response = self.post("/api/campaigns", &body).await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn create_subscriber(&self, email: &str) -> serde_json::Value {
        let body = serde_json::json!({ "email": email, "first_name": "Ursula" });
        let response = self.post("/api/subscribers", &body).await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn send_campaign(&self, campaign_id: &str) -> reqwest::Response {
        self.post(
            &format!("/api/campaigns/{}/send", campaign_id),
            &serde_json::json!({}),
        )
        .await
    }
}

pub async fn spawn_app() -> std::io::Result<TestApp> {
    let settings = {
        let mut settings = test_settings();
        settings.store.backend = StoreBackend::Memory;
        settings
    };
    launch(settings).await
}

/// Same app backed by a fresh Postgres database migrated for this test only.
pub async fn spawn_app_with_postgres() -> std::io::Result<TestApp> {
    let settings = {
        let mut settings = test_settings();
        settings.database.database_name = Uuid::new_v4().to_string();
        settings.store.backend = StoreBackend::Postgres;
        settings.store.run_migrations = true;
        settings
    };
    create_test_database(&settings.database).await;
    launch(settings).await
}

/// A pool on its own fresh database, migrated through `PgStore`.
pub async fn get_test_pool() -> PgPool {
    let mut database = test_settings().database;
    database.database_name = Uuid::new_v4().to_string();
    create_test_database(&database).await;

    let pg_pool = PgPool::connect_with(database.with_db())
        .await
        .expect("Failed to connect to Postgres");
    PgStore::new(pg_pool.clone())
        .migrate()
        .await
        .expect("Failed to migrate the database");
    pg_pool
}

fn test_settings() -> Settings {
    Lazy::force(&TRACING);

    let mut settings = Settings::get_configuration().expect("Failed to read configuration");
    // Use port 0 to ask the OS to pick a random free port
    settings.application.port = 0;
    settings
}

// Every test gets its own database so runs never see each other's rows.
// Test databases are not dropped afterwards.
async fn create_test_database(database: &DatabaseSettings) {
    let mut connection = PgConnection::connect_with(&database.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, database.database_name).as_str())
        .await
        .expect("Failed to create database");
}

async fn launch(settings: Settings) -> std::io::Result<TestApp> {
    let app = Application::build(settings)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let addr = format!("http://127.0.0.1:{}", app.port());

    // tokio::test drops the server together with the runtime when the test ends
    tokio::spawn(app.run_until_terminated());

    Ok(TestApp {
        addr,
        owner_id: Uuid::new_v4(),
        client: reqwest::Client::new(),
    })
}

pub fn assert_error_kind(body: &serde_json::Value, kind: &str) {
    assert_eq!(body["error"], kind, "unexpected error body: {}", body);
}
