use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    repository::{Day, Reading, StationId},
    resolver::{Diff, ResolverStrategy, diff},
    shared::time::Minute,
};

/// What a station marker shows at the resolved minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StationReading {
    /// No snapshot of the station exists yet. Not the same as zero bikes.
    Unknown,
    Known { bike_count: u32, since: Minute },
}

impl StationReading {
    pub fn bike_count(&self) -> Option<u32> {
        match self {
            StationReading::Unknown => None,
            StationReading::Known { bike_count, .. } => Some(*bike_count),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, StationReading::Known { .. })
    }
}

impl From<Option<&Reading>> for StationReading {
    fn from(value: Option<&Reading>) -> Self {
        match value {
            Some(reading) => StationReading::Known {
                bike_count: reading.bike_count,
                since: reading.minute,
            },
            None => StationReading::Unknown,
        }
    }
}

/// Every station of the day and its reading at one minute.
pub type StationDisplayState = BTreeMap<StationId, StationReading>;

/// Latest snapshot at or before `minute` for every station, by station index.
pub fn latest_readings(day: &Day, minute: Minute, strategy: ResolverStrategy) -> Vec<Option<Reading>> {
    match strategy {
        ResolverStrategy::Indexed => day
            .stations
            .iter()
            .map(|station| latest_in(day.readings_by_station_idx(station.index), minute))
            .collect(),
        ResolverStrategy::FullScan => {
            let mut best: Vec<Option<Reading>> = vec![None; day.stations.len()];
            day.readings()
                .iter()
                .filter(|reading| reading.minute <= minute)
                .for_each(|reading| {
                    let slot = &mut best[reading.station_idx as usize];
                    // Strict, so on equal minutes the first stored snapshot stays.
                    if slot.is_none_or(|current| reading.minute > current.minute) {
                        *slot = Some(*reading);
                    }
                });
            best
        }
    }
}

fn latest_in(readings: &[Reading], minute: Minute) -> Option<Reading> {
    let position = readings.partition_point(|reading| reading.minute <= minute);
    position.checked_sub(1).map(|index| readings[index])
}

/// Resolves station readings and remembers the previous pass for diffing.
///
/// Consecutive forward passes walk a per-station cursor instead of searching
/// again; any backwards move falls back to a binary search.
#[derive(Debug, Clone, Default)]
pub struct StationResolver {
    strategy: ResolverStrategy,
    cursor: Option<Cursor>,
    /// Known stations and their bike counts from the previous pass.
    previous: Vec<(StationId, u32)>,
}

#[derive(Debug, Clone)]
struct Cursor {
    minute: Minute,
    /// Per station index: number of readings at or before `minute`.
    positions: Vec<usize>,
}

impl StationResolver {
    pub fn new(strategy: ResolverStrategy) -> Self {
        Self {
            strategy,
            cursor: None,
            previous: Vec::new(),
        }
    }

    pub fn strategy(&self) -> ResolverStrategy {
        self.strategy
    }

    /// Station readings at `minute`. Reads only `day`; calling it twice gives the same result.
    pub fn resolve(&self, day: &Day, minute: Minute) -> StationDisplayState {
        display_state(day, &latest_readings(day, minute, self.strategy))
    }

    /// Resolves `minute` and reports which stations appeared, disappeared or changed count.
    pub fn advance(&mut self, day: &Day, minute: Minute) -> (StationDisplayState, Diff<StationId>) {
        let latest = match self.strategy {
            ResolverStrategy::Indexed => self.walk(day, minute),
            ResolverStrategy::FullScan => latest_readings(day, minute, self.strategy),
        };
        let state = display_state(day, &latest);
        let current: Vec<(StationId, u32)> = state
            .iter()
            .filter_map(|(id, reading)| reading.bike_count().map(|count| (*id, count)))
            .collect();
        let changes = diff(&self.previous, &current);
        self.previous = current;
        (state, changes)
    }

    pub fn reset(&mut self) {
        self.cursor = None;
        self.previous.clear();
    }

    fn walk(&mut self, day: &Day, minute: Minute) -> Vec<Option<Reading>> {
        let positions: Vec<usize> = match self.cursor.take() {
            Some(cursor)
                if cursor.minute <= minute && cursor.positions.len() == day.stations.len() =>
            {
                cursor
                    .positions
                    .into_iter()
                    .enumerate()
                    .map(|(station_idx, mut position)| {
                        let readings = day.readings_by_station_idx(station_idx as u32);
                        while position < readings.len() && readings[position].minute <= minute {
                            position += 1;
                        }
                        position
                    })
                    .collect()
            }
            _ => day
                .stations
                .iter()
                .map(|station| {
                    day.readings_by_station_idx(station.index)
                        .partition_point(|reading| reading.minute <= minute)
                })
                .collect(),
        };
        let latest = positions
            .iter()
            .enumerate()
            .map(|(station_idx, position)| {
                position
                    .checked_sub(1)
                    .map(|index| day.readings_by_station_idx(station_idx as u32)[index])
            })
            .collect();
        self.cursor = Some(Cursor { minute, positions });
        latest
    }
}

fn display_state(day: &Day, latest: &[Option<Reading>]) -> StationDisplayState {
    day.stations
        .iter()
        .zip(latest)
        .map(|(station, reading)| (station.id, reading.as_ref().into()))
        .collect()
}
