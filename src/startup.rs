use crate::authentication::reject_anonymous_owners;
use crate::configuration::{DatabaseSettings, Settings, StoreBackend};
use crate::routes::{
    add_new_subscriber, check_health, create_campaign_draft, dashboard, delete_campaign,
    delete_subscriber, edit_campaign_draft, edit_subscriber_profile, list_campaigns,
    list_subscribers, schedule_campaign_send, send_campaign_now, unsubscribe_subscriber,
};
use crate::store::{InMemoryStore, PgStore, Store};
use actix_web::dev::Server;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use actix_web_lab::middleware::from_fn;
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(settings: Settings) -> Result<Self, anyhow::Error> {
        let store = build_store(&settings).await?;
        let app = Self::build_with_store(&settings, store)?;
        Ok(app)
    }

    pub fn build_with_store(
        settings: &Settings,
        store: Arc<dyn Store>,
    ) -> Result<Self, std::io::Error> {
        // Port 0 lets the OS pick a free port
        let listener = TcpListener::bind(settings.application.get_url())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, store)?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_terminated(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_pg_pool(database: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(database.with_db())
}

pub async fn build_store(settings: &Settings) -> Result<Arc<dyn Store>, anyhow::Error> {
    match settings.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on shutdown");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::new(get_pg_pool(&settings.database));
            if settings.store.run_migrations {
                store
                    .migrate()
                    .await
                    .context("Failed to migrate the database")?;
            }
            Ok(Arc::new(store))
        }
    }
}

pub fn run(listener: TcpListener, store: Arc<dyn Store>) -> Result<Server, std::io::Error> {
    // web::Data is an Arc, so the trait object is shared across workers as-is
    let store: Data<dyn Store> = Data::from(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health", web::get().to(check_health))
            .service(
                web::scope("/api")
                    .wrap(from_fn(reject_anonymous_owners))
                    .route("/dashboard", web::get().to(dashboard))
                    .route("/campaigns", web::get().to(list_campaigns))
                    .route("/campaigns", web::post().to(create_campaign_draft))
                    .route("/campaigns/{campaign_id}", web::put().to(edit_campaign_draft))
                    .route("/campaigns/{campaign_id}", web::delete().to(delete_campaign))
                    .route(
                        "/campaigns/{campaign_id}/schedule",
                        web::post().to(schedule_campaign_send),
                    )
                    .route(
                        "/campaigns/{campaign_id}/send",
                        web::post().to(send_campaign_now),
                    )
                    .route("/subscribers", web::get().to(list_subscribers))
                    .route("/subscribers", web::post().to(add_new_subscriber))
                    .route(
                        "/subscribers/{subscriber_id}",
                        web::put().to(edit_subscriber_profile),
                    )
                    .route(
                        "/subscribers/{subscriber_id}",
                        web::delete().to(delete_subscriber),
                    )
                    .route(
                        "/subscribers/{subscriber_id}/unsubscribe",
                        web::post().to(unsubscribe_subscriber),
                    ),
            )
            .app_data(store.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
