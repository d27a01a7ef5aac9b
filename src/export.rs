use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use csv::Writer;

use crate::models::trip::Trip;

const HEADER: [&str; 7] = [
    "id",
    "user_id",
    "started_at",
    "ended_at",
    "initial_fuel_liters",
    "final_fuel_liters",
    "total_distance_km",
];

fn format_time(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes one row per trip in the given order. Missing values are empty cells.
pub fn write_trips_csv<W: Write>(trips: &[Trip], out: W) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(HEADER)?;

    for trip in trips {
        writer.write_record(&[
            trip.trip_id.to_string(),
            trip.user_id.to_string(),
            format_time(trip.started_at),
            optional(trip.ended_at.map(format_time)),
            optional(trip.initial_fuel_liters),
            optional(trip.final_fuel_liters),
            trip.total_distance_km.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
