use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::calc::distance::Coord;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TripPoint {
    pub point_id: i64, // bigserial
    pub trip_id: Uuid,
    pub timestamp: NaiveDateTime,
    pub lat: f64,
    pub lng: f64,
}

impl TripPoint {
    pub fn coord(&self) -> Coord {
        Coord::new(self.lat, self.lng)
    }
}
