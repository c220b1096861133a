use crate::config::Config;
use crate::generation::{GeminiClient, ImageGenerator};
use crate::images::{AttachmentStore, HoleImageService};
use crate::state::EventBus;
use crate::stylize::{StylizeQueue, Stylizer};
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use fairway_db::pool::DbPool;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_courses;
pub mod routes_images;
pub mod routes_sse;
pub mod user;

/// Multipart framing on top of the largest accepted file.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub images: HoleImageService,
    pub events: Arc<EventBus>,
    pub queue: StylizeQueue,
}

impl AppContext {
    /// Wire the event bus, attachment store, stylization queue, and image
    /// service together.
    ///
    /// Returns the context and the queue dispatcher's task handle.
    pub fn build(
        config: Config,
        pool: DbPool,
        generator: Arc<dyn ImageGenerator>,
    ) -> (Self, JoinHandle<()>) {
        let events = EventBus::new();
        let store = AttachmentStore::new(config.storage.attachments_dir());
        let stylizer = Arc::new(Stylizer::new(
            pool.clone(),
            store.clone(),
            events.clone(),
            generator,
        ));
        let (queue, dispatcher) = StylizeQueue::start(stylizer, &config.jobs);
        let images = HoleImageService::new(
            pool,
            store,
            events.clone(),
            queue.clone(),
            config.uploads.max_bytes,
        );

        let ctx = Self {
            config: Arc::new(config),
            images,
            events,
            queue,
        };
        (ctx, dispatcher)
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(user::USER_HEADER),
        ]);

    let body_limit = usize::try_from(ctx.config.uploads.max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Uses SPA fallback: serves index.html for any route that doesn't match a file
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

fn api_routes() -> Router<AppContext> {
    routes_courses::course_routes()
        .merge(routes_images::image_routes())
        .merge(routes_sse::sse_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server with the Gemini generator.
pub async fn start_server(config: Config, pool: DbPool) -> Result<()> {
    let generator = Arc::new(GeminiClient::from_config(&config.generation)?);
    start_server_with_generator(config, pool, generator).await
}

/// Start the HTTP server with the given generator.
///
/// Uploads left unfinished by a previous run are re-enqueued before the
/// listener accepts connections.
pub async fn start_server_with_generator(
    config: Config,
    pool: DbPool,
    generator: Arc<dyn ImageGenerator>,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let static_dir = config.server.static_dir.clone();
    let (ctx, dispatcher) = AppContext::build(config, pool.clone(), generator);

    ctx.queue
        .recover(&pool)
        .await
        .context("Failed to re-enqueue unfinished uploads")?;

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Every queue handle is gone once the router is dropped.
    if let Err(e) = dispatcher.await {
        tracing::warn!(error = %e, "Stylization queue ended abnormally");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
