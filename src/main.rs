use std::sync::Arc;

use authentication::SessionResolver;
use config::Config;
use connection::PgReviewStore;
use notifier::{HttpMailer, LogNotifier, Notifier};
use routes::{app, AppState};
use store::ReviewStore;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use workflow::ReviewWorkflow;

mod assignments;
mod authentication;
mod config;
mod connection;
mod error;
mod feedback;
#[cfg(test)]
mod memory_store;
mod models;
mod notifier;
mod routes;
mod schema;
mod store;
mod workflow;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn ReviewStore> = Arc::new(PgReviewStore::new(config.database_url.clone()));

    let notifier: Arc<dyn Notifier> = match &config.mail {
        Some(mail) => {
            tracing::info!(endpoint = %mail.api_url, "sending mail through the mail API");
            Arc::new(HttpMailer::new(
                mail.api_url.clone(),
                mail.api_key.clone(),
                mail.sender.clone(),
                mail.timeout,
            )?)
        }
        None => {
            tracing::warn!("MAIL_API_URL not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = AppState {
        workflow: Arc::new(ReviewWorkflow::new(store.clone(), notifier)),
        sessions: Arc::new(SessionResolver::new(store, config.session_cache_secs)),
    };

    let mut app = app(state);

    if config.local_dev {
        tracing::info!("Local dev deployment");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(Any)
            .allow_methods(Any);
        app = app.layer(cors);
    }

    tracing::info!(address = %config.bind_address, "Starting server");
    axum::Server::bind(&config.bind_address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
