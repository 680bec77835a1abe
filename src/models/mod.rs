mod location;
mod time;

pub use location::{DbCoordinates, GpsCoordinates, LOCATION_SOURCE, Location};
pub use time::CurrentTime;
