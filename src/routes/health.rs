//! Healthcheck route.

use crate::{app_state::AppState, db, error::AppResult, setups::ServerSetup};
use axum::{self, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// A healthcheck response containing diagnostic information for the service
#[derive(ToSchema, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct HealthcheckResponse {
    database_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
}

impl HealthcheckResponse {
    /// Whether the service is healthy
    pub fn is_healthy(&self) -> bool {
        self.database_connected
    }

    /// The status code for the healthcheck response
    pub fn status_code(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// GET handler for checking service health.
#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "floodwatch-server healthy", body=HealthcheckResponse),
        (status = 503, description = "floodwatch-server not healthy", body=HealthcheckResponse)
    )
)]
pub async fn healthcheck<S: ServerSetup>(
    State(state): State<AppState<S>>,
) -> AppResult<(StatusCode, axum::Json<serde_json::Value>)> {
    let (database_connected, schema_version) =
        if let Ok(mut conn) = db::connect(&state.db_pool).await {
            let schema_version = db::schema_version(&mut conn).await.ok().flatten();

            (true, schema_version)
        } else {
            (false, None)
        };

    let response = HealthcheckResponse {
        database_connected,
        schema_version,
    };

    Ok((response.status_code(), axum::Json(json! { response })))
}
