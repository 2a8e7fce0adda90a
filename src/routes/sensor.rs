//! Water level sensor ingestion routes

use crate::{
    app_state::AppState,
    db,
    error::{AppError, AppResult},
    models::sensor_reading::SensorReading,
    responses::SuccessResponse,
    setups::ServerSetup,
};
use axum::{
    self,
    extract::{Json, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

/// A water level report from a street sensor.
#[derive(Deserialize, Validate, Clone, Debug, ToSchema)]
pub struct WaterLevelRequest {
    /// Street the sensor is installed on
    #[validate(length(min = 1, message = "Street name is required"))]
    pub street_name: String,
    /// Measured water level
    #[serde(rename = "waterLevel")]
    pub water_level: f64,
}

/// POST handler for ingesting a water level measurement.
///
/// Device-facing and unauthenticated, like the rest of the sensor fleet
/// plumbing. The receive timestamp is stamped server-side.
#[utoipa::path(
    post,
    path = "/api/sensors/water-level",
    request_body = WaterLevelRequest,
    responses(
        (status = 201, description = "Measurement stored", body = SuccessResponse),
        (status = 422, description = "Validation failure", body = AppError),
    )
)]
pub async fn post_water_level<S: ServerSetup>(
    State(state): State<AppState<S>>,
    Json(request): Json<WaterLevelRequest>,
) -> AppResult<(StatusCode, Json<SuccessResponse>)> {
    request.validate()?;

    let conn = &mut db::connect(&state.db_pool).await?;

    let reading =
        SensorReading::create(conn, &request.street_name, request.water_level).await?;

    tracing::debug!(
        reading_id = reading.id,
        street_name = %reading.street_name,
        water_level = reading.water_level,
        "Stored water level reading",
    );

    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true })))
}

/// GET handler returning every stored measurement, oldest first.
#[utoipa::path(
    get,
    path = "/api/sensors/water-level",
    responses(
        (status = 200, description = "All measurements", body = [SensorReading]),
    )
)]
pub async fn get_all_water_levels<S: ServerSetup>(
    State(state): State<AppState<S>>,
) -> AppResult<(StatusCode, Json<Vec<SensorReading>>)> {
    let conn = &mut db::connect(&state.db_pool).await?;

    let readings = SensorReading::list_all(conn).await?;

    Ok((StatusCode::OK, Json(readings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{route_builder::RouteBuilder, test_context::TestContext};
    use http::Method;
    use serde_json::{json, Value};
    use testresult::TestResult;

    #[test_log::test(tokio::test)]
    async fn test_post_and_list_readings() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/sensors/water-level")
            .with_json_body(json!({ "street_name": "Cycloid Ave", "waterLevel": 1.25 }))?
            .into_json_response::<SuccessResponse>()
            .await?;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/sensors/water-level")
            .with_json_body(json!({ "street_name": "Cycloid Ave", "waterLevel": 2.5 }))?
            .into_json_response::<SuccessResponse>()
            .await?;
        assert_eq!(status, StatusCode::CREATED);

        let (status, readings) =
            RouteBuilder::new(ctx.app(), Method::GET, "/api/sensors/water-level")
                .into_json_response::<Vec<SensorReading>>()
                .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(readings.len(), 2);
        // oldest first
        assert_eq!(readings[0].water_level, 1.25);
        assert_eq!(readings[1].water_level, 2.5);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn test_post_rejects_empty_street() -> TestResult {
        let ctx = TestContext::new().await;

        let (status, _) = RouteBuilder::new(ctx.app(), Method::POST, "/api/sensors/water-level")
            .with_json_body(json!({ "street_name": "", "waterLevel": 1.0 }))?
            .into_json_response::<Value>()
            .await?;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        Ok(())
    }
}
