use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    repository::Error,
    shared::{
        geo::{Coordinate, Distance},
        time::Minute,
    },
};

/// Stable identity of a docking station across all of its snapshots.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StationId(pub u32);

/// One timestamped point along a trip's recorded path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub coordinate: Coordinate,
    pub timestamp: NaiveDateTime,
}

impl PathPoint {
    pub fn new(latitude: f64, longitude: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            coordinate: Coordinate::from((latitude, longitude)),
            timestamp,
        }
    }
}

/// A single bike rental with its recorded path.
#[derive(Debug, Clone)]
pub struct Trip {
    /// Position of the trip in the day's trip list. Assigned when the day is built.
    pub index: u32,
    /// The bike identifier as exported (bike number).
    pub bike: Arc<str>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Ordered by timestamp, non-decreasing. May be empty.
    pub path: Box<[PathPoint]>,
    pub duration_secs: f64,
    pub distance: Distance,
}

impl Trip {
    /// Validates the interval, path ordering, and that every path point lies
    /// within the interval. Start and end coordinates
    /// default to the first and last path points.
    pub fn new(
        bike: impl Into<Arc<str>>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        path: Vec<PathPoint>,
    ) -> Result<Self, Error> {
        if end_time < start_time {
            return Err(Error::EndBeforeStart {
                start: start_time,
                end: end_time,
            });
        }
        if let Some(position) = path
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(Error::PathOutOfOrder(position + 1));
        }
        if let Some(position) = path
            .iter()
            .position(|point| point.timestamp < start_time || point.timestamp > end_time)
        {
            return Err(Error::PointOutsideTrip(position));
        }
        let start = path.first().map(|point| point.coordinate).unwrap_or_default();
        let end = path.last().map(|point| point.coordinate).unwrap_or_default();
        Ok(Self {
            index: 0,
            bike: bike.into(),
            start_time,
            end_time,
            start,
            end,
            path: path.into(),
            duration_secs: (end_time - start_time).num_milliseconds() as f64 / 1000.0,
            distance: Distance::default(),
        })
    }

    pub fn with_endpoints(mut self, start: Coordinate, end: Coordinate) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_duration_secs(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    /// Inclusive on both ends, so an instantaneous trip is active at exactly one instant.
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// Number of path points with a timestamp at or before `now`.
    pub fn visible_len(&self, now: NaiveDateTime) -> usize {
        self.path.partition_point(|point| point.timestamp <= now)
    }

    pub fn visible_path(&self, now: NaiveDateTime) -> &[PathPoint] {
        &self.path[..self.visible_len(now)]
    }

    pub fn start_minute(&self) -> Minute {
        Minute::of(&self.start_time)
    }

    pub fn end_minute(&self) -> Minute {
        Minute::of(&self.end_time)
    }
}

/// Static description of a station. Taken from its first snapshot of the day.
#[derive(Debug, Clone)]
pub struct Station {
    pub index: u32,
    pub id: StationId,
    pub name: Arc<str>,
    pub coordinate: Coordinate,
    /// Capacity type as exported (terminal type).
    pub terminal_type: Option<Arc<str>>,
    pub station_number: Option<u32>,
    /// True for free-floating spots rather than docking stations.
    pub spot: bool,
}

/// One recorded observation of a station's bike count.
#[derive(Debug, Clone)]
pub struct StationSnapshot {
    pub station_id: StationId,
    pub timestamp: NaiveDateTime,
    pub bike_count: u32,
    pub name: Arc<str>,
    pub coordinate: Coordinate,
    pub terminal_type: Option<Arc<str>>,
    pub station_number: Option<u32>,
    pub spot: bool,
}

impl StationSnapshot {
    pub fn new(station_id: StationId, timestamp: NaiveDateTime, bike_count: u32) -> Self {
        Self {
            station_id,
            timestamp,
            bike_count,
            name: Arc::from(""),
            coordinate: Coordinate::default(),
            terminal_type: None,
            station_number: None,
            spot: false,
        }
    }

    pub fn minute(&self) -> Minute {
        Minute::of(&self.timestamp)
    }
}

/// Compact per-minute bike count kept in the day's station index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub station_idx: u32,
    pub minute: Minute,
    pub bike_count: u32,
}
