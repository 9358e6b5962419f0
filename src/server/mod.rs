/// REST API for the portfolio site
///
/// Four collections (projects, clients, contacts, newsletter) support listing
/// newest first and creating; projects and clients can also be deleted by id.
/// `/api/crop` runs the crop renderer server-side.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, Method},
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

pub mod error;
pub mod routes;
pub mod state;

use routes::{
    create_client, create_contact, create_project, crop_handler, delete_client, delete_project, health_handler,
    list_clients, list_contacts, list_projects, list_subscriptions, subscribe,
};
use state::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", delete(delete_project))
        .route("/api/clients", get(list_clients).post(create_client))
        .route("/api/clients/{id}", delete(delete_client))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/newsletter", get(list_subscriptions).post(subscribe))
        .route("/api/crop", post(crop_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(state.config.body_limit()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
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
}
