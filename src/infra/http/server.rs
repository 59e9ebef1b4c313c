use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info, warn};

use crate::domain::error::GridError;
use crate::protocol::wire::{status_code, WireError};
use crate::usecase::services::grid_registry::GridRegistry;

pub fn router(registry: Arc<GridRegistry>) -> Router {
    Router::new()
        .route("/grids", get(list_grids))
        .route("/grids/{name}", get(grid_definition))
        .route("/grids/{name}/data", get(grid_data))
        .with_state(registry)
}

pub async fn serve(registry: Arc<GridRegistry>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!(%addr, grids = ?registry.names(), "serving grids");

    axum::serve(listener, router(registry))
        .await
        .context("grid server stopped")?;
    Ok(())
}

async fn list_grids(State(registry): State<Arc<GridRegistry>>) -> Json<Vec<String>> {
    Json(registry.names())
}

async fn grid_definition(
    State(registry): State<Arc<GridRegistry>>,
    Path(name): Path<String>,
) -> Response {
    match registry.definition(&name) {
        Ok(definition) => Json(definition.clone()).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn grid_data(
    State(registry): State<Arc<GridRegistry>>,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let grid = name.clone();
    let result = tokio::task::spawn_blocking(move || {
        registry.handle_query_string(&name, query.as_deref().unwrap_or(""))
    })
    .await;

    match result {
        Ok(Ok(page)) => Json(page).into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join_err) => {
            error!(%grid, error = %join_err, "grid query task failed");
            let body = WireError {
                error: "internal".to_string(),
                message: "grid query failed".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn error_response(err: &GridError) -> Response {
    let status =
        StatusCode::from_u16(status_code(err)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, "grid request failed");
    } else {
        warn!(error = %err, "grid request rejected");
    }
    (status, Json(WireError::from(err))).into_response()
}
