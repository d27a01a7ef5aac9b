pub mod fuel_snapshot;
pub mod message;
pub mod trip;
pub mod trip_point;
