use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::EventError;

pub const MAX_SNAPSHOT_LITERS: f64 = 200.0;

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub uuid: String,
    pub user_id: i64,
    pub event: TripEvent,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TripEvent {
    TripStart {
        #[serde(default, deserialize_with = "parse_f64_option")]
        initial_fuel_liters: Option<f64>,
    },
    TripPoint {
        #[serde(deserialize_with = "parse_f64")]
        lat: f64,
        #[serde(deserialize_with = "parse_f64")]
        lng: f64,
        #[serde(default)]
        timestamp: Option<String>,
    },
    TripStop {
        #[serde(default, deserialize_with = "parse_f64_option")]
        final_fuel_liters: Option<f64>,
    },
    FuelSnapshot {
        #[serde(deserialize_with = "parse_f64")]
        fuel_liters: f64,
    },
}

impl EventMessage {
    pub fn message_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.uuid).ok()
    }
}

impl TripEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TripEvent::TripStart { .. } => "trip_start",
            TripEvent::TripPoint { .. } => "trip_point",
            TripEvent::TripStop { .. } => "trip_stop",
            TripEvent::FuelSnapshot { .. } => "fuel_snapshot",
        }
    }

    /// Range checks that must hold before anything reaches storage or the
    /// distance calculation.
    pub fn validate(&self) -> Result<(), EventError> {
        match self {
            TripEvent::TripStart { initial_fuel_liters: fuel }
            | TripEvent::TripStop { final_fuel_liters: fuel } => match fuel {
                Some(liters) if !(liters.is_finite() && *liters > 0.0) => Err(
                    EventError::Validation(format!("fuel reading must be positive, got {}", liters)),
                ),
                _ => Ok(()),
            },
            TripEvent::TripPoint { lat, lng, timestamp } => {
                if !(-90.0..=90.0).contains(lat) {
                    return Err(EventError::Validation(format!(
                        "lat must be between -90 and 90, got {}",
                        lat
                    )));
                }
                if !(-180.0..=180.0).contains(lng) {
                    return Err(EventError::Validation(format!(
                        "lng must be between -180 and 180, got {}",
                        lng
                    )));
                }
                if let Some(ts) = timestamp {
                    if parse_timestamp(ts).is_none() {
                        return Err(EventError::Validation(format!("invalid timestamp '{}'", ts)));
                    }
                }
                Ok(())
            }
            TripEvent::FuelSnapshot { fuel_liters } => {
                if !(0.0..=MAX_SNAPSHOT_LITERS).contains(fuel_liters) {
                    return Err(EventError::Validation(format!(
                        "fuel_liters must be between 0 and {}, got {}",
                        MAX_SNAPSHOT_LITERS, fuel_liters
                    )));
                }
                Ok(())
            }
        }
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrFloat {
    String(String),
    Float(f64),
}

fn parse_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    parse_f64_option(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing number"))
}

fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrFloat> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        Some(StringOrFloat::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}
