use crate::calc::consumption::ConsumptionStats;
use crate::calc::distance::{segment_km, Coord};
use crate::db::{self, queries, DbPool};
use crate::error::EventError;
use crate::models::fuel_snapshot::FuelSnapshot;
use crate::models::message::{parse_timestamp, EventMessage, TripEvent};
use crate::models::trip::Trip;
use crate::models::trip_point::TripPoint;
use chrono::{NaiveDateTime, Utc};
use sqlx::PgConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Parses and validates a raw payload without touching storage.
pub fn decode(payload: &[u8]) -> Result<EventMessage, EventError> {
    let message: EventMessage =
        serde_json::from_slice(payload).map_err(|e| EventError::Malformed(e.to_string()))?;
    message.event.validate()?;
    Ok(message)
}

/// Applies one event inside a single transaction. Rejected events are logged
/// and dropped; only storage failures are returned as errors.
pub async fn process_message(pool: &DbPool, payload: &[u8], stats_window: usize) -> anyhow::Result<()> {
    let message = match decode(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!(code = e.code(), "Dropping event: {}", e);
            return Ok(());
        }
    };

    debug!(
        user_id = message.user_id,
        kind = message.event.kind(),
        "Processing event {}",
        message.uuid
    );

    let mut tx = pool.begin().await?;

    match apply_event(&mut tx, &message, stats_window).await {
        Ok(()) => tx.commit().await?,
        Err(e) => match e.downcast_ref::<EventError>() {
            Some(rejected) => {
                warn!(
                    user_id = message.user_id,
                    kind = message.event.kind(),
                    code = rejected.code(),
                    "Rejected event {}: {}",
                    message.uuid,
                    rejected
                );
                tx.rollback().await?;
            }
            None => return Err(e),
        },
    }

    Ok(())
}

async fn apply_event(
    conn: &mut PgConnection,
    message: &EventMessage,
    stats_window: usize,
) -> anyhow::Result<()> {
    let user_id = message.user_id;

    match &message.event {
        TripEvent::TripStart { initial_fuel_liters } => {
            if let Some(open) = select_open_trip(conn, user_id).await? {
                debug!("Open trip {} blocks a new start", open.trip_id);
                return Err(EventError::TripActive.into());
            }

            let trip_id = message.message_uuid().unwrap_or_else(Uuid::new_v4);
            let trip = sqlx::query_as::<_, Trip>(queries::INSERT_TRIP)
                .bind(trip_id)
                .bind(user_id)
                .bind(now())
                .bind(*initial_fuel_liters)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(EventError::DuplicateTrip(trip_id))?;

            info!(user_id, "Started trip {}", trip.trip_id);
        }
        TripEvent::TripPoint { lat, lng, timestamp } => {
            let trip = select_open_trip(conn, user_id)
                .await?
                .ok_or(EventError::NoActiveTrip)?;
            let coord = Coord::new(*lat, *lng);

            let previous = sqlx::query_as::<_, TripPoint>(queries::SELECT_LAST_TRIP_POINT)
                .bind(trip.trip_id)
                .fetch_optional(&mut *conn)
                .await?;
            let added_km = segment_km(previous.as_ref().map(TripPoint::coord), coord);

            let point_time = timestamp.as_deref().and_then(parse_timestamp).unwrap_or_else(now);
            let point = sqlx::query_as::<_, TripPoint>(queries::INSERT_TRIP_POINT)
                .bind(trip.trip_id)
                .bind(point_time)
                .bind(coord.lat)
                .bind(coord.lng)
                .fetch_one(&mut *conn)
                .await?;

            let total_km = if added_km > 0.0 {
                sqlx::query_scalar::<_, f64>(queries::INCREMENT_TRIP_DISTANCE)
                    .bind(added_km)
                    .bind(trip.trip_id)
                    .fetch_one(&mut *conn)
                    .await?
            } else {
                trip.total_distance_km
            };

            debug!(
                user_id,
                point_id = point.point_id,
                added_km,
                total_km,
                "Appended point at {} to trip {}",
                point.timestamp,
                point.trip_id
            );
        }
        TripEvent::TripStop { final_fuel_liters } => {
            let open = select_open_trip(conn, user_id)
                .await?
                .ok_or(EventError::NoActiveTrip)?;

            let trip = sqlx::query_as::<_, Trip>(queries::CLOSE_TRIP)
                .bind(now())
                .bind(*final_fuel_liters)
                .bind(open.trip_id)
                .fetch_one(&mut *conn)
                .await?;

            info!(
                user_id,
                total_km = trip.total_distance_km,
                initial_fuel_liters = ?trip.initial_fuel_liters,
                final_fuel_liters = ?trip.final_fuel_liters,
                "Ended trip {}",
                trip.trip_id
            );
            log_stats(user_id, &db::load_consumption_stats(conn, user_id, stats_window).await?);
        }
        TripEvent::FuelSnapshot { fuel_liters } => {
            let snapshot = sqlx::query_as::<_, FuelSnapshot>(queries::INSERT_FUEL_SNAPSHOT)
                .bind(user_id)
                .bind(now())
                .bind(*fuel_liters)
                .fetch_one(&mut *conn)
                .await?;

            info!(
                user_id = snapshot.user_id,
                fuel_liters = snapshot.fuel_liters,
                "Recorded fuel snapshot {} at {}",
                snapshot.snapshot_id,
                snapshot.timestamp
            );
            log_stats(user_id, &db::load_consumption_stats(conn, user_id, stats_window).await?);
        }
    }

    Ok(())
}

async fn select_open_trip(conn: &mut PgConnection, user_id: i64) -> anyhow::Result<Option<Trip>> {
    let trip = sqlx::query_as::<_, Trip>(queries::SELECT_OPEN_TRIP_FOR_UPDATE)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(trip)
}

fn log_stats(user_id: i64, stats: &ConsumptionStats) {
    info!(
        user_id,
        samples = stats.samples,
        current_fuel_liters = ?stats.current_fuel_liters,
        avg_liters_per_100km = ?stats.avg_liters_per_100km,
        avg_km_per_day = ?stats.avg_km_per_day,
        projected_range_km = ?stats.projected_range_km,
        projected_days_left = ?stats.projected_days_left,
        "Consumption stats updated"
    );
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{fresh_user_id, pool};
    use serde_json::{json, Value};

    async fn send(pool: &DbPool, user_id: i64, uuid: Uuid, event: Value) -> anyhow::Result<()> {
        let payload = json!({ "uuid": uuid.to_string(), "user_id": user_id, "event": event });
        process_message(pool, payload.to_string().as_bytes(), 20).await
    }

    async fn trips_of(pool: &DbPool, user_id: i64) -> Vec<Trip> {
        let mut conn = pool.acquire().await.unwrap();
        db::fetch_all_trips(&mut conn, user_id).await.unwrap()
    }

    #[test]
    fn test_decode_accepts_valid_point() {
        let payload = br#"{"uuid": "d52b1454-d43d-50fa-99ca-79515c904162", "user_id": 9,
            "event": {"type": "trip_point", "lat": 48.8566, "lng": "2.3522"}}"#;
        let message = decode(payload).unwrap();
        assert_eq!(message.user_id, 9);
        assert_eq!(message.event.kind(), "trip_point");
    }

    #[test]
    fn test_decode_reports_malformed_json() {
        let err = decode(b"not json").unwrap_err();
        assert_eq!(err.code(), "malformed");

        let err = decode(br#"{"uuid": "x", "event": {"type": "trip_start"}}"#).unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn test_decode_reports_out_of_range_values() {
        let err = decode(
            br#"{"uuid": "x", "user_id": 1, "event": {"type": "trip_point", "lat": 91, "lng": 0}}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "validation");

        let err = decode(
            br#"{"uuid": "x", "user_id": 1, "event": {"type": "fuel_snapshot", "fuel_liters": 250}}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_points_accumulate_in_arrival_order() {
        let Some(pool) = pool().await else { return };
        let user_id = fresh_user_id();
        let a = Coord::new(20.652494, -100.391404);
        let b = Coord::new(20.660000, -100.380000);
        let c = Coord::new(20.671000, -100.372500);
        let d = Coord::new(20.690000, -100.350000);

        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_start", "initial_fuel_liters": 40}))
            .await
            .unwrap();
        // b carries no timestamp and is stamped with the current time, later
        // than the device times of c and d
        let points = [
            (a, Some("2025-06-01 10:00:00")),
            (b, None),
            (c, Some("2025-06-01 10:05:00")),
            (d, Some("2025-06-01T10:10:00")),
        ];
        for (p, timestamp) in points {
            let mut event = json!({"type": "trip_point", "lat": p.lat, "lng": p.lng.to_string()});
            if let Some(ts) = timestamp {
                event["timestamp"] = json!(ts);
            }
            send(&pool, user_id, Uuid::new_v4(), event).await.unwrap();
        }

        let trips = trips_of(&pool, user_id).await;
        assert_eq!(trips.len(), 1);
        let expected = a.distance_km(b) + b.distance_km(c) + c.distance_km(d);
        assert!(
            (trips[0].total_distance_km - expected).abs() < 1e-9,
            "got {} want {}",
            trips[0].total_distance_km,
            expected
        );

        let mut conn = pool.acquire().await.unwrap();
        let active = db::load_active_trip(&mut conn, user_id, 2).await.unwrap();
        assert_eq!(active.trip.map(|t| t.trip_id), Some(trips[0].trip_id));
        assert_eq!(active.points.len(), 2);
        assert_eq!(active.points[0].coord(), d);
        assert_eq!(active.points[1].coord(), c);
    }

    #[tokio::test]
    async fn test_start_while_open_keeps_first_trip() {
        let Some(pool) = pool().await else { return };
        let user_id = fresh_user_id();
        let first = Uuid::new_v4();

        send(&pool, user_id, first, json!({"type": "trip_start"})).await.unwrap();
        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_start", "initial_fuel_liters": "35.5"}))
            .await
            .unwrap();

        let trips = trips_of(&pool, user_id).await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].trip_id, first);
        assert!(trips[0].ended_at.is_none());
        assert_eq!(trips[0].initial_fuel_liters, None);
    }

    #[tokio::test]
    async fn test_point_and_stop_without_open_trip_change_nothing() {
        let Some(pool) = pool().await else { return };
        let user_id = fresh_user_id();

        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_point", "lat": 10.0, "lng": 10.0}))
            .await
            .unwrap();
        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_stop", "final_fuel_liters": 20}))
            .await
            .unwrap();

        assert!(trips_of(&pool, user_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_replayed_start_is_rejected_after_stop() {
        let Some(pool) = pool().await else { return };
        let user_id = fresh_user_id();
        let start = Uuid::new_v4();

        send(&pool, user_id, start, json!({"type": "trip_start", "initial_fuel_liters": 40}))
            .await
            .unwrap();
        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_stop", "final_fuel_liters": 38}))
            .await
            .unwrap();
        send(&pool, user_id, start, json!({"type": "trip_start", "initial_fuel_liters": 40}))
            .await
            .unwrap();

        let trips = trips_of(&pool, user_id).await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].trip_id, start);
        assert!(trips[0].ended_at.is_some());
    }

    #[tokio::test]
    async fn test_closed_trip_and_snapshot_feed_stats() {
        let Some(pool) = pool().await else { return };
        let user_id = fresh_user_id();

        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_start", "initial_fuel_liters": 50}))
            .await
            .unwrap();
        for (lat, lng) in [(48.8566, 2.3522), (51.5074, -0.1278)] {
            send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_point", "lat": lat, "lng": lng}))
                .await
                .unwrap();
        }
        send(&pool, user_id, Uuid::new_v4(), json!({"type": "trip_stop", "final_fuel_liters": 30}))
            .await
            .unwrap();
        send(&pool, user_id, Uuid::new_v4(), json!({"type": "fuel_snapshot", "fuel_liters": "25"}))
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let stats = db::load_consumption_stats(&mut conn, user_id, 20).await.unwrap();
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.current_fuel_liters, Some(25.0));
        let per_100km = stats.avg_liters_per_100km.unwrap();
        assert!(per_100km > 5.5 && per_100km < 6.1, "got {}", per_100km);
        assert!(stats.projected_range_km.unwrap() > 0.0);
    }
}
