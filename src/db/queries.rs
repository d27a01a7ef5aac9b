pub const SELECT_OPEN_TRIP_FOR_UPDATE: &str = r#"
SELECT trip_id, user_id, started_at, ended_at, initial_fuel_liters, final_fuel_liters, total_distance_km
FROM trips
WHERE user_id = $1 AND ended_at IS NULL
ORDER BY started_at DESC
LIMIT 1
FOR UPDATE;
"#;

pub const SELECT_OPEN_TRIP: &str = r#"
SELECT trip_id, user_id, started_at, ended_at, initial_fuel_liters, final_fuel_liters, total_distance_km
FROM trips
WHERE user_id = $1 AND ended_at IS NULL
ORDER BY started_at DESC
LIMIT 1;
"#;

// A replayed trip_start returns no row instead of failing on the primary key.
pub const INSERT_TRIP: &str = r#"
INSERT INTO trips (trip_id, user_id, started_at, initial_fuel_liters)
VALUES ($1, $2, $3, $4)
ON CONFLICT (trip_id) DO NOTHING
RETURNING trip_id, user_id, started_at, ended_at, initial_fuel_liters, final_fuel_liters, total_distance_km;
"#;

pub const CLOSE_TRIP: &str = r#"
UPDATE trips
SET ended_at = $1,
    final_fuel_liters = $2
WHERE trip_id = $3 AND ended_at IS NULL
RETURNING trip_id, user_id, started_at, ended_at, initial_fuel_liters, final_fuel_liters, total_distance_km;
"#;

pub const INCREMENT_TRIP_DISTANCE: &str = r#"
UPDATE trips
SET total_distance_km = total_distance_km + $1
WHERE trip_id = $2
RETURNING total_distance_km;
"#;

// Arrival order, not timestamp: device-stamped and server-stamped points
// interleave, and the running distance is measured from the last one appended.
pub const SELECT_LAST_TRIP_POINT: &str = r#"
SELECT point_id, trip_id, timestamp, lat, lng
FROM trip_points
WHERE trip_id = $1
ORDER BY point_id DESC
LIMIT 1;
"#;

pub const SELECT_RECENT_TRIP_POINTS: &str = r#"
SELECT point_id, trip_id, timestamp, lat, lng
FROM trip_points
WHERE trip_id = $1
ORDER BY point_id DESC
LIMIT $2;
"#;

pub const INSERT_TRIP_POINT: &str = r#"
INSERT INTO trip_points (trip_id, timestamp, lat, lng)
VALUES ($1, $2, $3, $4)
RETURNING point_id, trip_id, timestamp, lat, lng;
"#;

pub const INSERT_FUEL_SNAPSHOT: &str = r#"
INSERT INTO fuel_snapshots (user_id, timestamp, fuel_liters)
VALUES ($1, $2, $3)
RETURNING snapshot_id, user_id, timestamp, fuel_liters;
"#;

pub const SELECT_CURRENT_FUEL: &str = r#"
SELECT fuel_liters FROM fuel_snapshots
WHERE user_id = $1
ORDER BY timestamp DESC, snapshot_id DESC
LIMIT 1;
"#;

pub const SELECT_RECENT_ELIGIBLE_TRIPS: &str = r#"
SELECT started_at, ended_at, initial_fuel_liters, final_fuel_liters, total_distance_km
FROM trips
WHERE user_id = $1
  AND ended_at IS NOT NULL
  AND initial_fuel_liters IS NOT NULL
  AND final_fuel_liters IS NOT NULL
  AND total_distance_km > 0
ORDER BY ended_at DESC
LIMIT $2;
"#;

pub const SELECT_ALL_TRIPS: &str = r#"
SELECT trip_id, user_id, started_at, ended_at, initial_fuel_liters, final_fuel_liters, total_distance_km
FROM trips
WHERE user_id = $1
ORDER BY started_at DESC;
"#;
