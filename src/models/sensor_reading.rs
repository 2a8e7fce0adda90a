//! Water Level Sensor Reading Model
use crate::db::{schema::sensor_readings, Conn};
use chrono::NaiveDateTime;
use diesel::{pg::Pg, ExpressionMethods, QueryDsl, Queryable, Selectable, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single water level measurement reported by a street sensor.
#[derive(Debug, Queryable, Selectable, Clone, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = sensor_readings)]
#[diesel(check_for_backend(Pg))]
pub struct SensorReading {
    /// Internal Database Identifier
    pub id: i32,
    /// Street the sensor is installed on
    pub street_name: String,
    /// Measured water level
    pub water_level: f64,
    /// Server-side receive timestamp
    pub recorded_at: NaiveDateTime,
}

impl SensorReading {
    /// Persist a measurement. `recorded_at` is stamped by the database.
    pub async fn create(
        conn: &mut Conn<'_>,
        street_name: &str,
        water_level: f64,
    ) -> Result<Self, diesel::result::Error> {
        diesel::insert_into(sensor_readings::table)
            .values((
                sensor_readings::street_name.eq(street_name),
                sensor_readings::water_level.eq(water_level),
            ))
            .returning(SensorReading::as_select())
            .get_result(conn)
            .await
    }

    /// All measurements, oldest first.
    pub async fn list_all(conn: &mut Conn<'_>) -> Result<Vec<Self>, diesel::result::Error> {
        sensor_readings::table
            .order(sensor_readings::id.asc())
            .select(SensorReading::as_select())
            .load(conn)
            .await
    }
}
