use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod ai;
mod calendar;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use ai::OpenAiClient;
use config::Config;
use services::recommendation::RecommendationCache;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub ai: Arc<OpenAiClient>,
    pub recommendations: RecommendationCache,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodify_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    // Database
    let db = db::create_pool(&config).await;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let ai = Arc::new(OpenAiClient::from_config(&config));
    if !ai.enabled() {
        tracing::warn!("OPENAI_API_KEY not set, AI features fall back to static content");
    }

    let state = AppState {
        db,
        config: config.clone(),
        ai,
        recommendations: RecommendationCache::new(),
    };

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        // Users
        .route("/api/users/register", post(handlers::users::register))
        .route("/api/users/login", post(handlers::users::login))
        .route("/api/users/:id", get(handlers::users::get_user))
        .route(
            "/api/users/:id/initialize-week",
            post(handlers::users::initialize_week),
        )
        // Daily mood entries
        .route("/api/users/:id/week", get(handlers::moods::get_upcoming_week))
        .route(
            "/api/users/:id/weeks/current",
            get(handlers::moods::get_current_week),
        )
        .route("/api/users/:id/weeks/:week", get(handlers::moods::get_week))
        .route("/api/users/:id/mood", post(handlers::moods::submit_mood_today))
        .route(
            "/api/users/:id/mood/past",
            post(handlers::moods::submit_mood_past),
        )
        // Weekly stats
        .route(
            "/api/users/:id/stats/weekly",
            get(handlers::stats::get_weekly_stats),
        )
        // Profile context
        .route(
            "/api/users/:id/info",
            get(handlers::profile::get_info).put(handlers::profile::update_info),
        )
        // Recommendations
        .route(
            "/api/recommendations/daily",
            post(handlers::recommendations::daily),
        )
        .route(
            "/api/recommendations/week",
            post(handlers::recommendations::week),
        )
        .layer(build_cors(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}

fn build_cors(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .expect("FRONTEND_URL must be a valid origin")];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for origin in extra.split(',') {
                if let Ok(hv) = origin.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}
