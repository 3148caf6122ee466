use std::net::Ipv4Addr;
use thiserror::Error;

/// Configuration-time failures. All of these abort simulation setup;
/// nothing in this enum is raised while the event loop is running.
/// An unreachable destination at send time is a tracked loss, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SimError {
    #[error("invalid schedule: time {time_us}us is before {reference_us}us")]
    InvalidSchedule { time_us: u64, reference_us: u64 },

    #[error("degenerate mobility bounds: [{min_x}, {max_x}] x [{min_y}, {max_y}]")]
    InvalidBounds {
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    },

    #[error("address {addr} is already assigned")]
    AddressConflict { addr: Ipv4Addr },
}
