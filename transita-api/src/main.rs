use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transita_api::{
    app,
    state::{AppState, AuthConfig},
};
use transita_core::ReservationStore;
use transita_store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "transita_api=debug,transita_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = transita_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Transita API on port {}", config.server.port);

    let store: Arc<dyn ReservationStore> = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .expect("Failed to connect to Postgres");
            store.migrate().await.expect("Failed to run migrations");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(
        store,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    );

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
