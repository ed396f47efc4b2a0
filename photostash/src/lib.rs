//! # photostash: Chat-to-gallery photo collector
//!
//! `photostash` collects the photos posted in one Telegram group into a content-addressed image
//! directory and serves them back over HTTP, including a "random image" endpoint suitable for
//! picture frames and dashboards.
//!
//! ## Overview
//!
//! The process runs two things side by side: an HTTP server and a webhook bot. The platform pushes
//! every update for the bot to `POST /bot<token>`. Photo messages from the configured group are
//! resolved to a download URL, fetched, and stored under the MD5 digest of their bytes, so the same
//! picture posted twice is stored once. Everything else is acknowledged and dropped.
//!
//! ### Request Flow
//!
//! - `GET /images/{filename}` reads straight from the [`storage::ImageStore`].
//! - `GET /random-image` lists the store and redirects to one entry.
//! - `POST /bot<token>` hands the update to [`bot::PhotoBot`], which calls into
//!   [`ingest::Ingestor`].
//!
//! ### Single Instance
//!
//! Only one process may own the webhook registration. [`lifecycle::LifecycleGuard`] claims a lock
//! file at startup; a process that finds the lock taken still serves images but leaves its bot
//! inactive, and its webhook route answers 404.
//!
//! ## Configuration
//!
//! See [`config`] for the YAML file and environment variables. The bot token, group id and public
//! webhook URL are required.
use axum::{
    Router,
    body::Body,
    http::Request,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

pub mod api;
pub mod bot;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod lifecycle;
pub mod storage;
pub mod telegram;
pub mod telemetry;
#[cfg(test)]
mod test_utils;

use bot::PhotoBot;
use ingest::Ingestor;
use lifecycle::{LifecycleGuard, StartOutcome};
use storage::{ImageStore, LocalImageStore};
use telegram::{TelegramApi, TelegramClient};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(store)
///     .bot(bot)
///     .lifecycle(lifecycle)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ImageStore>,
    pub bot: Arc<PhotoBot>,
    pub lifecycle: Arc<LifecycleGuard>,
}

/// Request path as it may appear in logs. The webhook path carries the bot token.
fn loggable_path(path: &str) -> &str {
    if path.starts_with("/bot") { "/bot<redacted>" } else { path }
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    let webhook_path = state.config.webhook_path();

    Router::new()
        .route("/images/{filename}", get(api::handlers::images::get_image))
        .route("/random-image", get(api::handlers::images::random_image))
        .route("/health", get(api::handlers::health::health))
        .route(&webhook_path, post(api::handlers::webhook::receive_update))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %loggable_path(request.uri().path()),
                        version = ?request.version(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] opens the image store and wires the bot, without touching
///    the lock file or the platform
/// 2. **Serve**: [`Application::serve`] binds the listener, then tries to start the bot and serves
///    requests whether or not that succeeded
/// 3. **Shutdown**: When the shutdown signal is received, the server drains and the bot is stopped
///    and its lock released
pub struct Application {
    router: Router,
    app_state: AppState,
    config: Config,
}

impl Application {
    /// Create a new application talking to the configured Bot API
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let telegram = Arc::new(TelegramClient::new(config.telegram.api_base.clone(), config.token()));
        Self::new_with_telegram(config, telegram).await
    }

    /// Create a new application with an explicit platform client
    pub async fn new_with_telegram(config: Config, telegram: Arc<dyn TelegramApi>) -> anyhow::Result<Self> {
        debug!(
            images_dir = %config.images_dir.display(),
            lock_file = %config.lock_file.display(),
            group_id = config.group_id(),
            "Starting photostash"
        );

        let store: Arc<dyn ImageStore> = Arc::new(LocalImageStore::open(&config.images_dir).await?);
        let bot = Arc::new(PhotoBot::new(telegram.clone(), Ingestor::new(store.clone()), config.group_id()));
        let lifecycle = Arc::new(
            LifecycleGuard::new(&config.lock_file, telegram, config.webhook_endpoint())
                .delete_webhook_on_shutdown(config.telegram.delete_webhook_on_shutdown),
        );

        let app_state = AppState::builder()
            .config(config.clone())
            .store(store)
            .bot(bot)
            .lifecycle(lifecycle)
            .build();

        let router = build_router(app_state.clone());

        Ok(Self {
            router,
            app_state,
            config,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Claim the lock and register the webhook. The HTTP side works regardless of the outcome.
    pub async fn start_bot(&self) -> StartOutcome {
        self.app_state.lifecycle.start().await
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "photostash listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// The bot is started in a background task, so HTTP answers while the webhook registration is
    /// still in flight. On shutdown an unfinished registration is abandoned and the lock released.
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = Box::pin(shutdown);

        // First poll installs the signal handlers before any lock file exists
        let stopped_early = tokio::select! {
            biased;
            _ = &mut shutdown => true,
            _ = std::future::ready(()) => false,
        };
        if stopped_early {
            info!("Shutdown requested before startup, not starting the bot");
            return Ok(());
        }

        let lifecycle = self.app_state.lifecycle.clone();
        let bot_startup = tokio::spawn(async move {
            match lifecycle.start().await {
                StartOutcome::Registered => {}
                outcome => info!(?outcome, "Bot inactive, serving images only"),
            }
        });

        // Run the server with graceful shutdown
        let served = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await;

        bot_startup.abort();
        let _ = bot_startup.await;

        // Release the lock even if the server failed
        self.app_state.lifecycle.shutdown().await;

        served?;
        Ok(())
    }
}
