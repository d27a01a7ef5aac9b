use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::trip_point::TripPoint;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Trip {
    pub trip_id: Uuid,
    pub user_id: i64,
    pub started_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>, // NULL while the trip is open
    pub initial_fuel_liters: Option<f64>,
    pub final_fuel_liters: Option<f64>,
    pub total_distance_km: f64,
}

/// Estimator input row: a closed trip carrying both fuel readings and a
/// positive distance, as selected by `SELECT_RECENT_ELIGIBLE_TRIPS`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EligibleTrip {
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub initial_fuel_liters: f64,
    pub final_fuel_liters: f64,
    pub total_distance_km: f64,
}

/// A user's open trip, if any, with its latest points newest first.
#[derive(Debug, Serialize)]
pub struct ActiveTrip {
    pub trip: Option<Trip>,
    pub points: Vec<TripPoint>,
}
