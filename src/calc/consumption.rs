use serde::Serialize;

use crate::models::trip::EligibleTrip;

/// Number of most recent eligible trips the estimator looks at.
pub const DEFAULT_STATS_WINDOW: usize = 20;

/// Average speed floor, in km per day, used when a trip's recorded duration
/// is shorter than its distance allows (same-timestamp start/end, clock skew).
const MIN_KM_PER_DAY: f64 = 500.0;

const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionStats {
    pub current_fuel_liters: Option<f64>,
    #[serde(rename = "avgLitersPer100Km")]
    pub avg_liters_per_100km: Option<f64>,
    pub avg_km_per_day: Option<f64>,
    pub projected_range_km: Option<f64>,
    pub projected_days_left: Option<f64>,
    /// Trips handed to the estimator, including ones later skipped for
    /// non-positive consumption.
    pub samples: usize,
}

/// `a / b`, or `None` when `b` is zero or either side is not finite.
pub fn safe_divide(a: f64, b: f64) -> Option<f64> {
    if !a.is_finite() || !b.is_finite() || b == 0.0 {
        return None;
    }
    Some(a / b)
}

pub fn compute_stats(current_fuel_liters: Option<f64>, trips: &[EligibleTrip]) -> ConsumptionStats {
    let mut total_distance = 0.0;
    let mut total_fuel_consumed = 0.0;
    let mut total_days = 0.0;

    for trip in trips {
        let consumed = trip.initial_fuel_liters - trip.final_fuel_liters;
        // refuelled mid-trip or a bad sensor reading
        if consumed <= 0.0 {
            continue;
        }
        let distance = trip.total_distance_km;
        if distance <= 0.0 {
            continue;
        }

        total_distance += distance;
        total_fuel_consumed += consumed;

        let elapsed_days =
            (trip.ended_at - trip.started_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
        total_days += elapsed_days.max(distance / MIN_KM_PER_DAY);
    }

    let liters_per_km = safe_divide(total_fuel_consumed, total_distance);
    let avg_fuel_per_day = safe_divide(total_fuel_consumed, total_days);

    let project = |rate: Option<f64>| match (current_fuel_liters, rate) {
        (Some(fuel), Some(rate)) => safe_divide(fuel, rate),
        _ => None,
    };

    ConsumptionStats {
        current_fuel_liters,
        avg_liters_per_100km: liters_per_km.map(|l| l * 100.0),
        avg_km_per_day: safe_divide(total_distance, total_days),
        projected_range_km: project(liters_per_km),
        projected_days_left: project(avg_fuel_per_day),
        samples: trips.len(),
    }
}
