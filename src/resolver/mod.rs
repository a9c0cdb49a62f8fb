mod diff;
pub mod stations;
pub mod trips;

pub use diff::*;
pub use stations::{StationDisplayState, StationReading, StationResolver};
pub use trips::{ActiveTripView, TripResolver};

/// How a resolver finds the active set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverStrategy {
    /// Interval sweep over trips ordered by start, binary search per station.
    #[default]
    Indexed,
    /// Scans every trip and every snapshot on each pass.
    FullScan,
}
