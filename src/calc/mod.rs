//! Pure computations over trip history. Nothing in here touches storage.

pub mod consumption;
pub mod distance;
