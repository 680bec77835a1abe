//! Business services sitting between the HTTP handlers and the upstream.

mod location;

pub use location::LocationService;
