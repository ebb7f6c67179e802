pub mod config;
pub mod database;
pub mod redis_client;
pub mod error;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;
pub mod search_client;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::LogFormat;
use services::{auth::TokenService, booking::BookingService, seating::SeatGrid};

/// Логи в stdout: фильтр из RUST_LOG, формат из LOG_FORMAT.
pub fn init_tracing(app: &config::AppConfig) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(&app.rust_log));
    match app.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub search_client: search_client::SearchClient,
    pub tokens: TokenService,
    pub bookings: BookingService,
    pub grid: SeatGrid,
}

impl AppState {
    /// Подключается к БД, прогоняет миграции и, если задан REDIS_URL, к Redis.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let redis = match &config.redis.url {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(client) => {
                    info!("Redis connected");
                    Some(client)
                }
                Err(e) => {
                    warn!("Redis unavailable, caching disabled: {:?}", e);
                    None
                }
            },
            None => {
                info!("REDIS_URL not set, caching disabled");
                None
            }
        };

        Ok(Self::assemble(config, db, redis))
    }

    /// Состояние без сетевых подключений: пул ленивый, кеш выключен.
    pub fn connect_lazy(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect_lazy(&config.database)?;
        Ok(Self::assemble(config, db, None))
    }

    fn assemble(
        config: config::Config,
        db: database::Database,
        redis: Option<redis_client::RedisClient>,
    ) -> Arc<Self> {
        let grid = SeatGrid::STANDARD;
        let cache = cache::CacheService::new(redis, db.clone(), config.cache.clone());
        let search_client = search_client::SearchClient::new(db.pool.clone());
        let tokens = TokenService::new(&config.jwt);
        let bookings = BookingService::new(db.pool.clone(), grid);

        Arc::new(Self {
            db,
            cache,
            config,
            search_client,
            tokens,
            bookings,
            grid,
        })
    }
}

/// Собирает роутер со всеми маршрутами и слоями.
pub fn app(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .app
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    controllers::routes()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
