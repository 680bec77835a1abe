//! HTTP request handlers.

mod location;
mod time;

pub use location::track_location;
pub use time::current_time;
