use std::{collections::HashMap, sync::Arc, time::Instant};

mod entities;
pub use entities::*;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::shared::time::{self, Minute};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Trip ends at {end} before it starts at {start}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("Trip path goes back in time at point {0}")]
    PathOutOfOrder(usize),
    #[error("Trip path point {0} lies outside the trip's interval")]
    PointOutsideTrip(usize),
}

/// Everything known about one city on one day.
///
/// A `Day` is built once and never mutated afterwards. Switching day or city
/// means building a new `Day` and swapping it in whole.
#[derive(Debug, Clone, Default)]
pub struct Day {
    pub city_id: Option<u32>,
    pub date: Option<NaiveDate>,
    pub trips: Box<[Trip]>,
    pub stations: Box<[Station]>,
    midnight: NaiveDateTime,

    // Trip lookup
    trips_by_start: Box<[u32]>,
    longest_trip: Option<TimeDelta>,
    // Station lookup
    station_lookup: HashMap<StationId, u32>,
    /// Every snapshot in storage order.
    readings: Box<[Reading]>,
    /// Snapshots grouped by station index, one per minute, sorted by minute.
    station_readings: Box<[Box<[Reading]>]>,
}

impl Day {
    pub fn new(trips: Vec<Trip>, snapshots: Vec<StationSnapshot>) -> Self {
        Self::builder().trips(trips).snapshots(snapshots).build()
    }

    pub fn builder() -> DayBuilder {
        DayBuilder::default()
    }

    /// Midnight of the day the clock's minutes are counted from.
    pub fn midnight(&self) -> NaiveDateTime {
        self.midnight
    }

    /// The absolute instant of a minute on this day.
    pub fn instant(&self, minute: Minute) -> NaiveDateTime {
        minute.on(self.midnight)
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty() && self.stations.is_empty()
    }

    pub fn trip(&self, index: u32) -> Option<&Trip> {
        self.trips.get(index as usize)
    }

    /// Trip indexes ordered by start time.
    pub fn trips_by_start(&self) -> &[u32] {
        &self.trips_by_start
    }

    /// The longest interval of any trip of the day.
    pub fn longest_trip(&self) -> TimeDelta {
        self.longest_trip.unwrap_or_else(TimeDelta::zero)
    }

    pub fn station_by_id(&self, id: StationId) -> Option<&Station> {
        let index = self.station_lookup.get(&id)?;
        Some(&self.stations[*index as usize])
    }

    /// All snapshots of the day in the order they were stored.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Snapshots of one station sorted by minute. Of several snapshots in
    /// the same minute only the first stored one is kept.
    pub fn readings_by_station_idx(&self, station_idx: u32) -> &[Reading] {
        self.station_readings
            .get(station_idx as usize)
            .map(|readings| &readings[..])
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct DayBuilder {
    city_id: Option<u32>,
    date: Option<NaiveDate>,
    trips: Vec<Trip>,
    snapshots: Vec<StationSnapshot>,
}

impl DayBuilder {
    pub fn city(mut self, city_id: u32) -> Self {
        self.city_id = Some(city_id);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn trips(mut self, trips: Vec<Trip>) -> Self {
        self.trips = trips;
        self
    }

    pub fn snapshots(mut self, snapshots: Vec<StationSnapshot>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn build(self) -> Day {
        let mut day = Day {
            city_id: self.city_id,
            date: self.date,
            ..Default::default()
        };
        // The reference midnight follows the first stored trip, like the exported files do.
        let reference = self
            .trips
            .first()
            .map(|trip| trip.start_time.date())
            .or_else(|| self.snapshots.first().map(|s| s.timestamp.date()))
            .or(self.date);
        day.midnight = reference.map(time::midnight_of).unwrap_or_default();
        if day.date.is_none() {
            day.date = reference;
        }
        day.load_trips(self.trips);
        day.load_stations(self.snapshots);
        day
    }
}

impl Day {
    fn load_trips(&mut self, mut trips: Vec<Trip>) {
        debug!("Indexing {} trips...", trips.len());
        let now = Instant::now();
        trips.iter_mut().enumerate().for_each(|(i, trip)| {
            trip.index = i as u32;
        });

        let mut by_start: Vec<u32> = (0..trips.len() as u32).collect();
        by_start.par_sort_by_key(|index| trips[*index as usize].start_time);
        self.longest_trip = trips
            .par_iter()
            .map(|trip| trip.end_time - trip.start_time)
            .max();

        self.trips = trips.into();
        self.trips_by_start = by_start.into();
        debug!("Indexing trips took {:?}", now.elapsed());
    }

    fn load_stations(&mut self, snapshots: Vec<StationSnapshot>) {
        debug!("Indexing {} station snapshots...", snapshots.len());
        let now = Instant::now();
        let mut lookup: HashMap<StationId, u32> = HashMap::new();
        let mut stations: Vec<Station> = Vec::new();
        let mut readings: Vec<Reading> = Vec::with_capacity(snapshots.len());
        snapshots.into_iter().for_each(|snapshot| {
            let station_idx = *lookup.entry(snapshot.station_id).or_insert_with(|| {
                let index = stations.len() as u32;
                stations.push(Station {
                    index,
                    id: snapshot.station_id,
                    name: snapshot.name.clone(),
                    coordinate: snapshot.coordinate,
                    terminal_type: snapshot.terminal_type.clone(),
                    station_number: snapshot.station_number,
                    spot: snapshot.spot,
                });
                index
            });
            readings.push(Reading {
                station_idx,
                minute: snapshot.minute(),
                bike_count: snapshot.bike_count,
            });
        });

        let mut grouped: Vec<Vec<Reading>> = vec![Vec::new(); stations.len()];
        readings.iter().for_each(|reading| {
            grouped[reading.station_idx as usize].push(*reading);
        });
        // Stable sort, then keep only the first stored snapshot of each minute.
        grouped.par_iter_mut().for_each(|group| {
            group.sort_by_key(|reading| reading.minute);
            group.dedup_by_key(|reading| reading.minute);
        });

        self.stations = stations.into();
        self.station_lookup = lookup;
        self.readings = readings.into();
        self.station_readings = grouped.into_iter().map(|group| group.into()).collect();
        debug!("Indexing station snapshots took {:?}", now.elapsed());
    }
}

/// Shared handle to an immutable day.
pub type SharedDay = Arc<Day>;

#[cfg(test)]
fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 19)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

#[test]
fn reference_midnight_follows_first_trip() {
    let trip = Trip::new("42", at(10, 0), at(10, 20), vec![]).unwrap();
    let day = Day::new(vec![trip], vec![]);
    assert_eq!(day.midnight(), at(0, 0));
    assert_eq!(day.instant(Minute::clamped(605)), at(10, 5));
}

#[test]
fn trips_indexed_by_start() {
    let late = Trip::new("a", at(12, 0), at(12, 30), vec![]).unwrap();
    let early = Trip::new("b", at(8, 0), at(8, 45), vec![]).unwrap();
    let day = Day::new(vec![late, early], vec![]);
    assert_eq!(day.trips_by_start(), &[1, 0]);
    assert_eq!(day.longest_trip(), TimeDelta::minutes(45));
    assert_eq!(day.trip(1).unwrap().index, 1);
}

#[test]
fn snapshots_grouped_and_sorted_per_station() {
    let snapshots = vec![
        StationSnapshot::new(StationId(7), at(2, 0), 3),
        StationSnapshot::new(StationId(9), at(0, 0), 1),
        StationSnapshot::new(StationId(7), at(0, 0), 5),
    ];
    let day = Day::new(vec![], snapshots);
    assert_eq!(day.stations.len(), 2);
    let station = day.station_by_id(StationId(7)).unwrap();
    let minutes: Vec<u16> = day
        .readings_by_station_idx(station.index)
        .iter()
        .map(|reading| reading.minute.as_minutes())
        .collect();
    assert_eq!(minutes, vec![0, 120]);
    assert_eq!(day.readings().len(), 3);
}

#[test]
fn same_minute_snapshots_keep_first_stored() {
    let snapshots = vec![
        StationSnapshot::new(StationId(7), at(0, 10), 4),
        StationSnapshot::new(StationId(7), at(0, 10) + TimeDelta::seconds(40), 7),
    ];
    let day = Day::new(vec![], snapshots);
    let readings = day.readings_by_station_idx(0);
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].bike_count, 4);
    assert_eq!(day.readings().len(), 2);
}

#[test]
fn path_point_outside_trip_is_rejected() {
    let before = vec![PathPoint::new(50.0, 8.0, at(9, 59)), PathPoint::new(50.1, 8.1, at(10, 10))];
    assert_eq!(
        Trip::new("a", at(10, 0), at(10, 20), before).unwrap_err(),
        Error::PointOutsideTrip(0)
    );
    let after = vec![PathPoint::new(50.0, 8.0, at(10, 0)), PathPoint::new(50.1, 8.1, at(10, 21))];
    assert_eq!(
        Trip::new("a", at(10, 0), at(10, 20), after).unwrap_err(),
        Error::PointOutsideTrip(1)
    );
    let edges = vec![PathPoint::new(50.0, 8.0, at(10, 0)), PathPoint::new(50.1, 8.1, at(10, 20))];
    assert!(Trip::new("a", at(10, 0), at(10, 20), edges).is_ok());
}

#[test]
fn empty_day_is_valid() {
    let day = Day::new(vec![], vec![]);
    assert!(day.is_empty());
    assert!(day.readings_by_station_idx(0).is_empty());
}
