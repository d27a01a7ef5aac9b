use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FuelSnapshot {
    pub snapshot_id: i64,
    pub user_id: i64,
    pub timestamp: NaiveDateTime,
    pub fuel_liters: f64,
}
