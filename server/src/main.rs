use std::error::Error;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use mockable::DefaultClock;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use evently_server::config::{Config, ConfigError, StorageBackend};
use evently_server::domain::SharedClock;
use evently_server::notifications::{ChannelDispatcher, LogMailer, NotificationWorker};
use evently_server::repository::{
    EventRepository, MemoryStore, PgEventRepository, PgRegistrationRepository, PgUserRepository,
    RegistrationRepository, UserRepository,
};
use evently_server::routes::create_routes;
use evently_server::state::AppState;

struct Repositories {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    registrations: Arc<dyn RegistrationRepository>,
}

async fn connect(config: &Config) -> Result<Repositories, Box<dyn Error>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            let store = Arc::new(MemoryStore::new());
            Ok(Repositories {
                users: store.clone(),
                events: store.clone(),
                registrations: store,
            })
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!("Successfully connected to database");

            sqlx::migrate!().run(&pool).await?;
            tracing::info!("Migrations run successfully");

            Ok(Repositories {
                users: Arc::new(PgUserRepository::new(pool.clone())),
                events: Arc::new(PgEventRepository::new(pool.clone())),
                registrations: Arc::new(PgRegistrationRepository::new(pool)),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let repositories = connect(&config).await?;
    let clock: SharedClock = Arc::new(DefaultClock);

    let (dispatcher, receiver) = ChannelDispatcher::channel(config.notification_queue_capacity);
    NotificationWorker::new(
        repositories.users.clone(),
        repositories.events.clone(),
        repositories.registrations.clone(),
        Arc::new(LogMailer),
        config.default_from_email.clone(),
    )
    .spawn(receiver);

    let state = AppState::new(
        repositories.users,
        repositories.events,
        repositories.registrations,
        Arc::new(dispatcher),
        clock,
    );
    let app: Router = create_routes(state, &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
