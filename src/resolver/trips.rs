use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    repository::{Day, Trip},
    resolver::{Diff, ResolverStrategy, diff},
    shared::time::Minute,
};

/// A trip that is under way at the resolved minute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTripView {
    pub trip_index: u32,
    /// Path points reached so far as `[lat, lon]`, in recorded order.
    /// Empty when the trip has started but no point is due yet.
    pub path: Vec<[f64; 2]>,
}

impl ActiveTripView {
    fn new(trip: &Trip, now: NaiveDateTime) -> Self {
        Self {
            trip_index: trip.index,
            path: trip
                .visible_path(now)
                .iter()
                .map(|point| point.coordinate.into())
                .collect(),
        }
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    /// Trail opacity of the segment at `index`, fading towards the oldest point.
    pub fn opacity(&self, index: usize) -> f64 {
        if self.path.len() < 2 {
            return 1.0;
        }
        ((index + 1) as f64 / (self.path.len() - 1) as f64).clamp(0.0, 1.0)
    }
}

/// Whether `trip` is under way at `minute` of `day`, both ends inclusive.
pub fn is_active(day: &Day, trip: &Trip, minute: Minute) -> bool {
    trip.is_active_at(day.instant(minute))
}

/// Indexes of every trip active at `now`, ascending.
pub fn active_indexes(day: &Day, now: NaiveDateTime, strategy: ResolverStrategy) -> Vec<u32> {
    match strategy {
        ResolverStrategy::Indexed => sweep(day, now),
        ResolverStrategy::FullScan => day
            .trips
            .par_iter()
            .filter(|trip| trip.is_active_at(now))
            .map(|trip| trip.index)
            .collect(),
    }
}

// A trip active at `now` started no earlier than `now - longest_trip`, so only
// that window of the start-ordered index needs checking.
fn sweep(day: &Day, now: NaiveDateTime) -> Vec<u32> {
    let trips = &day.trips;
    let by_start = day.trips_by_start();
    let earliest = now - day.longest_trip();
    let lower = by_start.partition_point(|index| trips[*index as usize].start_time < earliest);
    let upper = by_start.partition_point(|index| trips[*index as usize].start_time <= now);
    let mut active: Vec<u32> = by_start[lower..upper]
        .iter()
        .copied()
        .filter(|index| trips[*index as usize].end_time >= now)
        .collect();
    active.sort_unstable();
    active
}

/// Resolves active trips and remembers the previous pass for diffing.
#[derive(Debug, Clone, Default)]
pub struct TripResolver {
    strategy: ResolverStrategy,
    /// Trip index and visible path length of the previous pass.
    previous: Vec<(u32, usize)>,
}

impl TripResolver {
    pub fn new(strategy: ResolverStrategy) -> Self {
        Self {
            strategy,
            previous: Vec::new(),
        }
    }

    pub fn strategy(&self) -> ResolverStrategy {
        self.strategy
    }

    /// Active trips at `minute`. Reads only `day`; calling it twice gives the same result.
    pub fn resolve(&self, day: &Day, minute: Minute) -> Vec<ActiveTripView> {
        let now = day.instant(minute);
        active_indexes(day, now, self.strategy)
            .into_iter()
            .map(|index| ActiveTripView::new(&day.trips[index as usize], now))
            .collect()
    }

    /// Resolves `minute` and reports what changed since the previous call.
    /// A trip whose visible path grew or shrank is `updated`.
    pub fn advance(&mut self, day: &Day, minute: Minute) -> (Vec<ActiveTripView>, Diff<u32>) {
        let views = self.resolve(day, minute);
        let current: Vec<(u32, usize)> = views
            .iter()
            .map(|view| (view.trip_index, view.path.len()))
            .collect();
        let changes = diff(&self.previous, &current);
        self.previous = current;
        (views, changes)
    }

    /// Forgets the previous pass. The next `advance` reports every active trip as added.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}
