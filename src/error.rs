use thiserror::Error;

/// Reasons an inbound event is refused. These are logged and the message is
/// acknowledged; they never abort the consumer.
#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("malformed: {0}")]
    Malformed(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("trip_active: user already has an open trip")]
    TripActive,

    #[error("no_active_trip: user has no open trip")]
    NoActiveTrip,

    #[error("duplicate_trip: trip {0} already exists")]
    DuplicateTrip(uuid::Uuid),
}

impl EventError {
    /// Short code matching the error strings clients already know.
    pub fn code(&self) -> &'static str {
        match self {
            EventError::Malformed(_) => "malformed",
            EventError::Validation(_) => "validation",
            EventError::TripActive => "trip_active",
            EventError::NoActiveTrip => "no_active_trip",
            EventError::DuplicateTrip(_) => "duplicate_trip",
        }
    }
}
