use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use engine_websocket::{ConnectionSettings, SchemaWatcher, WebsocketService};
use tokio::net::TcpListener;

use crate::{Config, Error};

/// Routes of the server: requests are executed on `graph.path` and websocket connections
/// accepted on `graph.websocket_path`.
pub fn router(config: &Config, schema: SchemaWatcher) -> Router {
    let websockets = WebsocketService::new(schema.clone(), ConnectionSettings::from(&config.websockets));

    Router::new()
        .route(&config.graph.path, post(execute))
        .route(
            &config.graph.websocket_path,
            get(move |upgrade: WebSocketUpgrade| async move { websockets.upgrade(upgrade) }),
        )
        .with_state(schema)
}

/// Starts the server and listens for incoming requests until ctrl-c.
pub async fn serve(config: Config, schema: SchemaWatcher) -> crate::Result<()> {
    let listen_address = config.network.listen_address;
    let listener = TcpListener::bind(listen_address).await.map_err(Error::Server)?;
    let router = router(&config, schema);

    tracing::info!("GraphQL endpoint exposed at http://{listen_address}{}", config.graph.path);

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown())
        .await
        .map_err(Error::Server)
}

async fn graceful_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutting down gracefully...");
}

/// Executes a GraphQL request against the current schema.
async fn execute(State(schema): State<SchemaWatcher>, Json(request): Json<engine::Request>) -> Response {
    let schema = schema.borrow().clone();

    match schema {
        Some(schema) => Json(schema.execute(request).await).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(engine::Response::from_errors(vec![engine::ServerError::new(
                "There is no schema available yet.",
                None,
            )])),
        )
            .into_response(),
    }
}
