use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eventmeet::config::Config;
use eventmeet::db::{create_pool, ensure_schema};
use eventmeet::events::repository::{
    EventRepository, InMemoryEventRepository, PostgresEventRepository,
};
use eventmeet::meeting::{DisabledMeetingProvider, MeetingProvider, ZoomClient};
use eventmeet::user::repository::{
    InMemoryUserRepository, PostgresUserRepository, UserRepository,
};
use eventmeet::user::token::TokenConfig;
use eventmeet::{build_router, AppState};

type UserRepo = Arc<dyn UserRepository + Send + Sync>;
type EventRepo = Arc<dyn EventRepository + Send + Sync>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventmeet=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Starting eventmeet v{}", env!("CARGO_PKG_VERSION"));

    let (user_repository, event_repository): (UserRepo, EventRepo) = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            ensure_schema(&pool).await?;
            (
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresEventRepository::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory repositories");
            (
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryEventRepository::new()),
            )
        }
    };

    let meeting_provider: Arc<dyn MeetingProvider> = match config.zoom.clone() {
        Some(zoom) => {
            info!(api_base = %zoom.api_base, "Zoom meeting sync enabled");
            Arc::new(ZoomClient::new(zoom)?)
        }
        None => {
            warn!("Zoom credentials not set, events will be created without meetings");
            Arc::new(DisabledMeetingProvider)
        }
    };

    let token_config = TokenConfig::new(config.jwt_secret.clone(), config.session_expiration_days);

    let app_state = AppState::new(
        user_repository,
        event_repository,
        meeting_provider,
        token_config,
    );

    let app = build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
