use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::calc::consumption::{compute_stats, ConsumptionStats};
use crate::models::trip::{ActiveTrip, EligibleTrip, Trip};
use crate::models::trip_point::TripPoint;

pub mod queries;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_current_fuel(conn: &mut PgConnection, user_id: i64) -> Result<Option<f64>> {
    let fuel = sqlx::query_scalar::<_, f64>(queries::SELECT_CURRENT_FUEL)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(fuel)
}

pub async fn fetch_recent_eligible_trips(
    conn: &mut PgConnection,
    user_id: i64,
    limit: usize,
) -> Result<Vec<EligibleTrip>> {
    let trips = sqlx::query_as::<_, EligibleTrip>(queries::SELECT_RECENT_ELIGIBLE_TRIPS)
        .bind(user_id)
        .bind(i64::try_from(limit)?)
        .fetch_all(conn)
        .await?;
    Ok(trips)
}

pub async fn fetch_all_trips(conn: &mut PgConnection, user_id: i64) -> Result<Vec<Trip>> {
    let trips = sqlx::query_as::<_, Trip>(queries::SELECT_ALL_TRIPS)
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(trips)
}

pub async fn fetch_open_trip(conn: &mut PgConnection, user_id: i64) -> Result<Option<Trip>> {
    let trip = sqlx::query_as::<_, Trip>(queries::SELECT_OPEN_TRIP)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(trip)
}

pub async fn fetch_recent_trip_points(
    conn: &mut PgConnection,
    trip_id: Uuid,
    limit: u32,
) -> Result<Vec<TripPoint>> {
    let points = sqlx::query_as::<_, TripPoint>(queries::SELECT_RECENT_TRIP_POINTS)
        .bind(trip_id)
        .bind(i64::from(limit))
        .fetch_all(conn)
        .await?;
    Ok(points)
}

pub async fn load_active_trip(conn: &mut PgConnection, user_id: i64, limit: u32) -> Result<ActiveTrip> {
    let Some(trip) = fetch_open_trip(&mut *conn, user_id).await? else {
        return Ok(ActiveTrip { trip: None, points: Vec::new() });
    };
    let points = fetch_recent_trip_points(&mut *conn, trip.trip_id, limit).await?;
    Ok(ActiveTrip { trip: Some(trip), points })
}

/// Reads the latest snapshot and the recent eligible trips on one connection
/// and hands them to the estimator.
pub async fn load_consumption_stats(
    conn: &mut PgConnection,
    user_id: i64,
    window: usize,
) -> Result<ConsumptionStats> {
    let current_fuel = fetch_current_fuel(&mut *conn, user_id).await?;
    let trips = fetch_recent_eligible_trips(&mut *conn, user_id, window).await?;
    Ok(compute_stats(current_fuel, &trips))
}

/// Helpers for tests that need PostgreSQL. They run only when `DATABASE_URL`
/// is set; otherwise the calling test returns early.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub async fn pool() -> Option<DbPool> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };
        let pool = init_pool(&url, 2).await.expect("connect to DATABASE_URL");
        run_migrations(&pool).await.expect("run migrations");
        Some(pool)
    }

    /// A user id no other test run will share.
    pub fn fresh_user_id() -> i64 {
        (Uuid::new_v4().as_u128() as i64) & i64::MAX
    }
}
