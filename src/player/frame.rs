use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    repository::{Day, StationId, Trip},
    resolver::{ActiveTripView, Diff, StationDisplayState},
    shared::time::Minute,
};

/// Everything a renderer needs for one coalesced update.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub minute: Minute,
    /// Dataset generation the frame was resolved against.
    pub generation: u64,
    pub trips: Vec<ActiveTripView>,
    pub stations: StationDisplayState,
    pub trip_changes: Diff<u32>,
    pub station_changes: Diff<StationId>,
    pub summary: DaySummary,
}

/// Info panel figures for the resolved minute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: Option<NaiveDate>,
    /// All trips of the day.
    pub trip_count: usize,
    pub active_trips: usize,
    /// Distinct bikes among the active trips.
    pub active_bikes: usize,
}

impl DaySummary {
    pub fn new(day: &Day, active: &[ActiveTripView]) -> Self {
        let bikes: HashSet<&str> = active
            .iter()
            .filter_map(|view| day.trip(view.trip_index))
            .map(|trip| &*trip.bike)
            .collect();
        Self {
            date: day.date,
            trip_count: day.trips.len(),
            active_trips: active.len(),
            active_bikes: bikes.len(),
        }
    }
}

/// A trip picked from the trip list, with its whole path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripHighlight {
    pub trip_index: u32,
    pub bike: String,
    pub start_minute: Minute,
    pub end_minute: Minute,
    pub path: Vec<[f64; 2]>,
}

impl From<&Trip> for TripHighlight {
    fn from(trip: &Trip) -> Self {
        Self {
            trip_index: trip.index,
            bike: trip.bike.to_string(),
            start_minute: trip.start_minute(),
            end_minute: trip.end_minute(),
            path: trip
                .path
                .iter()
                .map(|point| point.coordinate.into())
                .collect(),
        }
    }
}
