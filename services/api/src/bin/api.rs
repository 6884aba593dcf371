//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{AlQuranCloudAdapter, DbAdapter, OpenAiSstAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        middleware::require_auth,
        rest::{
            get_bookmarks_handler, get_progress_handler, get_surah_handler, import_handler,
            list_surahs_handler, mark_read_handler, put_bookmarks_handler,
            sync_progress_handler, toggle_bookmark_handler, ApiDoc,
        },
        state::AppState,
        ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Connecting to PostgreSQL");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db = Arc::new(DbAdapter::new(pool));
    db.run_migrations().await?;
    info!("Migrations applied");

    let verses = Arc::new(AlQuranCloudAdapter::new(
        reqwest::Client::new(),
        config.quran_api_base_url.clone(),
    ));

    // The key is optional in Config so bin/openapi works without it, but
    // the server cannot grade recitations without Whisper.
    let api_key = config
        .openai_api_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let sst_adapter = Arc::new(OpenAiSstAdapter::new(
        Client::with_config(OpenAIConfig::new().with_api_key(api_key)),
        config.stt_model.clone(),
    ));

    let app_state = Arc::new(AppState {
        db,
        config: config.clone(),
        verses,
        sst_adapter,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let public = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    let protected = Router::new()
        .route("/surahs", get(list_surahs_handler))
        .route("/surahs/{number}", get(get_surah_handler))
        .route("/progress", get(get_progress_handler))
        .route("/progress/read", post(mark_read_handler))
        .route("/progress/sync", post(sync_progress_handler))
        .route("/bookmarks", get(get_bookmarks_handler).put(put_bookmarks_handler))
        .route("/bookmarks/toggle", post(toggle_bookmark_handler))
        .route("/import", post(import_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let app = Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    info!("Listening on {} (Swagger UI at /swagger-ui)", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
