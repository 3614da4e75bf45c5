//! HTTP surface of a node: `/routes` for inspection, `/receive_update` for
//! advertisements pushed by neighbors.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::network::transport::UPDATE_PATH;
use crate::protocol::{Advertisement, UpdateMessage};
use crate::router::{Router, RouterView};

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub message: String,
    #[serde(flatten)]
    pub state: RouterView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: error.into() }),
    )
}

async fn handle_routes(State(router): State<Arc<Router>>) -> Json<RoutesResponse> {
    Json(RoutesResponse {
        message: "Current routing table".to_string(),
        state: router.read_state().await,
    })
}

async fn handle_receive_update(
    State(router): State<Arc<Router>>,
    payload: Result<Json<UpdateMessage>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(message) = payload.map_err(|e| {
        warn!("Rejected malformed update: {}", e.body_text());
        bad_request(format!("Missing sender_address or routing_table: {}", e.body_text()))
    })?;

    debug!(
        "Received update from {}:\n{}",
        message.sender_address,
        serde_json::to_string_pretty(&message.routing_table).unwrap_or_default()
    );

    let advertisement = Advertisement::from_message(message).map_err(|e| {
        warn!("Rejected update: {}", e);
        bad_request(e.to_string())
    })?;
    let sender = advertisement.sender;

    let outcome = router.submit_advertisement(advertisement).await.map_err(|e| {
        warn!("Rejected update from {}: {}", sender, e);
        bad_request(e.to_string())
    })?;

    if outcome.changed() {
        info!(
            "Update from {} changed the table ({} new, {} updated)",
            sender, outcome.installed, outcome.updated
        );
    }

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: "Update received".to_string(),
    }))
}

pub fn build_router(router: Arc<Router>) -> axum::Router {
    axum::Router::new()
        .route("/routes", get(handle_routes))
        .route(UPDATE_PATH, post(handle_receive_update))
        .with_state(router)
}

pub async fn serve<F>(listener: TcpListener, router: Arc<Router>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(router);
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "Control server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}
