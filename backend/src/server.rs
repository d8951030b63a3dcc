use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::{Extension, Router};
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use portal_storage::Catalog;
use tokio::net::TcpListener;

use crate::routes;
use crate::{document_storage::DocumentStorage, jwt::JwtManager, types::Environment};

/// Builds the application router with its dependencies attached
///
/// Kept apart from [`start`] so tests can drive the router without binding a port.
pub fn router(
    environment: Environment,
    catalog: Arc<Catalog>,
    documents: Arc<DocumentStorage>,
    jwt_manager: Arc<JwtManager>,
) -> Router {
    let mut openapi = OpenApi::default();

    routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(catalog))
        .layer(Extension(documents))
        .layer(Extension(jwt_manager))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    catalog: Arc<Catalog>,
    documents: Arc<DocumentStorage>,
    jwt_manager: Arc<JwtManager>,
) -> anyhow::Result<()> {
    let router = router(environment, catalog, documents, jwt_manager)
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::new(
            std::time::Duration::from_secs(5),
        ));

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8001), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%environment, "Industry Portal API started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}
