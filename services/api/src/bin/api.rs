//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, OpenAiTitleAdapter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler},
        require_auth,
        rest::ApiDoc,
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use review_portal_core::engine::ReviewEngine;
use review_portal_core::ports::TitleSuggestionService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(format!("migration failed: {}", e)))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    // Title suggestions are optional: without an API key the endpoint
    // reports itself unavailable instead of failing startup.
    let title_adapter: Option<Arc<dyn TitleSuggestionService>> = match &config.openai_api_key {
        Some(key) => {
            let openai_config = OpenAIConfig::new().with_api_key(key);
            let openai_client = Client::with_config(openai_config);
            Some(Arc::new(OpenAiTitleAdapter::new(
                openai_client,
                config.title_model.clone(),
            )))
        }
        None => {
            info!("OPENAI_API_KEY not set; title suggestions disabled");
            None
        }
    };

    // --- 4. Build the Engine and Shared AppState ---
    let engine = ReviewEngine::new(
        db_adapter.clone(),
        db_adapter.clone(),
        db_adapter.clone(),
        db_adapter.clone(),
    );
    let app_state = Arc::new(AppState {
        engine,
        articles: db_adapter.clone(),
        edits: db_adapter.clone(),
        access: db_adapter.clone(),
        contacts: db_adapter.clone(),
        auth_sessions: db_adapter.clone(),
        titles: title_adapter,
        config: config.clone(),
    });

    // --- 5. CORS for the portal frontend ---
    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/articles", get(api_lib::web::list_articles_handler))
        .route("/articles/{id}", get(api_lib::web::get_article_handler))
        .route(
            "/articles/{id}/reviewers",
            get(api_lib::web::active_reviewers_handler),
        )
        .route(
            "/articles/{id}/draft",
            put(api_lib::web::save_draft_handler)
                .get(api_lib::web::load_draft_handler)
                .delete(api_lib::web::delete_draft_handler),
        )
        .route(
            "/articles/{id}/review",
            post(api_lib::web::submit_review_handler),
        )
        .route(
            "/articles/{id}/edits",
            post(api_lib::web::record_edits_handler),
        )
        .route(
            "/articles/{id}/draft/merge",
            post(api_lib::web::merge_edits_handler),
        )
        .route(
            "/articles/{id}/title-ideas",
            post(api_lib::web::suggest_titles_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
