use chrono::NaiveDate;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, Read},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

mod config;
pub mod models;
pub use config::*;
use models::*;

use crate::{
    repository::{self, Day, PathPoint, StationId, StationSnapshot, Trip},
    shared::{geo::Coordinate, time::parse_timestamp},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not find file with name: {0}")]
    FileNotFound(String),
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
    #[error("Invalid trip: {0}")]
    InvalidTrip(#[from] repository::Error),
}

#[derive(Default)]
pub enum StorageType {
    #[default]
    None,
    Directory(PathBuf),
    Zip(PathBuf),
}

/// Rows read and rows skipped while loading one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub trips: usize,
    pub skipped_trips: usize,
    pub snapshots: usize,
    pub skipped_snapshots: usize,
}

/// Reads exported days from a directory or a zip archive.
#[derive(Default)]
pub struct DataSource {
    config: Config,
    storage: StorageType,
}

impl DataSource {
    pub fn new(config: self::Config) -> Self {
        Self {
            config,
            storage: Default::default(),
        }
    }

    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageType::Directory(path.into());
        self
    }

    pub fn from_zip(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = StorageType::Zip(path.into());
        self
    }

    /// True when the day's trip file exists.
    pub fn day_exists(&self, city_id: u32, date: NaiveDate) -> bool {
        let names = self.config.trips_files(city_id, date);
        match self.find(&names) {
            Ok(found) => found.is_some(),
            Err(err) => {
                warn!("Failed to look up {}: {err}", names[0]);
                false
            }
        }
    }

    /// Whether the days before and after `date` can be loaded.
    pub fn adjacent_days(&self, city_id: u32, date: NaiveDate) -> (bool, bool) {
        let previous = date
            .pred_opt()
            .is_some_and(|previous| self.day_exists(city_id, previous));
        let next = date
            .succ_opt()
            .is_some_and(|next| self.day_exists(city_id, next));
        (previous, next)
    }

    /// Every city with the dates it has station files for, dates ascending.
    pub fn available_days(&self) -> Result<BTreeMap<u32, Vec<NaiveDate>>, self::Error> {
        let mut days: BTreeMap<u32, Vec<NaiveDate>> = BTreeMap::new();
        self.file_names()?
            .iter()
            .filter_map(|name| self.config.parse_stations_file(name))
            .for_each(|(city_id, date)| days.entry(city_id).or_default().push(date));
        days.values_mut().for_each(|dates| {
            dates.sort_unstable();
            dates.dedup();
        });
        Ok(days)
    }

    pub fn load_trips(&self, city_id: u32, date: NaiveDate) -> Result<Vec<Trip>, self::Error> {
        self.read_trips(city_id, date).map(|(trips, _)| trips)
    }

    pub fn load_stations(
        &self,
        city_id: u32,
        date: NaiveDate,
    ) -> Result<Vec<StationSnapshot>, self::Error> {
        self.read_stations(city_id, date).map(|(snapshots, _)| snapshots)
    }

    /// Loads both files of a day and builds it. A day without a station file
    /// still loads, with no stations.
    pub fn load_day(&self, city_id: u32, date: NaiveDate) -> Result<(Day, LoadReport), self::Error> {
        let now = Instant::now();
        let (trips, skipped_trips) = self.read_trips(city_id, date)?;
        let (snapshots, skipped_snapshots) = match self.read_stations(city_id, date) {
            Ok(loaded) => loaded,
            Err(Error::FileNotFound(name)) => {
                warn!("No station file {name}, continuing without stations");
                (Vec::new(), 0)
            }
            Err(err) => return Err(err),
        };
        let report = LoadReport {
            trips: trips.len(),
            skipped_trips,
            snapshots: snapshots.len(),
            skipped_snapshots,
        };
        let day = Day::builder()
            .city(city_id)
            .date(date)
            .trips(trips)
            .snapshots(snapshots)
            .build();
        debug!("Loading day {date} of city {city_id} took {:?}", now.elapsed());
        Ok((day, report))
    }

    fn read_trips(&self, city_id: u32, date: NaiveDate) -> Result<(Vec<Trip>, usize), self::Error> {
        let names = self.config.trips_files(city_id, date);
        let (name, rows) = self.read_rows::<TripRow>(&names)?;
        let (trips, skipped) = convert(&name, rows, Trip::try_from);
        debug!("Loaded {} trips from {name}", trips.len());
        Ok((trips, skipped))
    }

    fn read_stations(
        &self,
        city_id: u32,
        date: NaiveDate,
    ) -> Result<(Vec<StationSnapshot>, usize), self::Error> {
        let names = self.config.stations_files(city_id, date);
        let (name, rows) = self.read_rows::<StationRow>(&names)?;
        let (snapshots, skipped) = convert(&name, rows, StationSnapshot::try_from);
        debug!("Loaded {} station snapshots from {name}", snapshots.len());
        Ok((snapshots, skipped))
    }

    /// Deserializes the first existing file among `names`. Rows that fail to
    /// deserialize come back as errors so they can be skipped one by one.
    fn read_rows<T>(&self, names: &[String]) -> Result<(String, Vec<Result<T, Error>>), self::Error>
    where
        T: DeserializeOwned,
    {
        let name = self
            .find(names)?
            .ok_or_else(|| Error::FileNotFound(names[0].clone()))?;
        let bytes = self.read_file(&name)?;
        let reader: Box<dyn Read + '_> = if name.ends_with(".gz") {
            Box::new(GzDecoder::new(&bytes[..]))
        } else {
            Box::new(&bytes[..])
        };
        let mut reader = csv::Reader::from_reader(reader);
        let rows: Vec<Result<T, Error>> = reader
            .deserialize::<T>()
            .map(|row| row.map_err(Error::from))
            .collect();
        Ok((name, rows))
    }

    fn find(&self, names: &[String]) -> Result<Option<String>, self::Error> {
        match &self.storage {
            StorageType::None => Ok(None),
            StorageType::Directory(path) => Ok(names
                .iter()
                .find(|name| path.join(name.as_str()).is_file())
                .cloned()),
            StorageType::Zip(path) => {
                let archive = ZipArchive::new(File::open(path)?)?;
                Ok(names
                    .iter()
                    .find(|name| archive.index_for_name(name).is_some())
                    .cloned())
            }
        }
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, self::Error> {
        match &self.storage {
            StorageType::None => Err(Error::FileNotFound(name.to_string())),
            StorageType::Directory(path) => Ok(fs::read(path.join(name))?),
            StorageType::Zip(path) => {
                let mut archive = ZipArchive::new(File::open(path)?)?;
                let index = archive
                    .index_for_name(name)
                    .ok_or(Error::FileNotFound(name.to_string()))?;
                let mut file = archive.by_index(index)?;
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
        }
    }

    fn file_names(&self) -> Result<Vec<String>, self::Error> {
        match &self.storage {
            StorageType::None => Ok(Vec::new()),
            StorageType::Directory(path) => {
                let mut names = Vec::new();
                for entry in fs::read_dir(path)? {
                    let entry = entry?;
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
                Ok(names)
            }
            StorageType::Zip(path) => {
                let archive = ZipArchive::new(File::open(path)?)?;
                Ok(archive.file_names().map(str::to_string).collect())
            }
        }
    }
}

/// Converts rows, skipping and logging each one that fails.
fn convert<R, T, F>(name: &str, rows: Vec<Result<R, Error>>, f: F) -> (Vec<T>, usize)
where
    F: Fn(R) -> Result<T, Error>,
{
    let mut skipped = 0;
    let records = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| match row.and_then(&f) {
            Ok(record) => Some(record),
            Err(err) => {
                // Row numbers are 1-based and skip the header line.
                warn!("Skipping malformed record {} in {name}: {err}", i + 2);
                skipped += 1;
                None
            }
        })
        .collect();
    (records, skipped)
}

impl TryFrom<TripRow> for Trip {
    type Error = self::Error;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let start_time = parse_timestamp(&row.start_time)
            .ok_or_else(|| Error::MalformedRecord(format!("start_time {:?}", row.start_time)))?;
        let end_time = parse_timestamp(&row.end_time)
            .ok_or_else(|| Error::MalformedRecord(format!("end_time {:?}", row.end_time)))?;
        if row.bike_number.trim().is_empty() {
            return Err(Error::MalformedRecord("missing bike_number".into()));
        }
        let path = parse_segments(row.segments.as_deref().unwrap_or_default())?;

        let mut trip = Trip::new(row.bike_number.trim(), start_time, end_time, path)?;
        if let (Some(latitude), Some(longitude)) = (row.start_latitude, row.start_longitude) {
            trip.start = Coordinate::from((latitude, longitude));
        }
        if let (Some(latitude), Some(longitude)) = (row.end_latitude, row.end_longitude) {
            trip.end = Coordinate::from((latitude, longitude));
        }
        if let Some(duration) = row.duration {
            trip = trip.with_duration_secs(duration);
        }
        if let Some(distance) = row.distance {
            trip = trip.with_distance(distance.into());
        }
        Ok(trip)
    }
}

/// Decodes `[[lat, lon, 'timestamp'], ...]`, as written by Python or as JSON.
fn parse_segments(value: &str) -> Result<Vec<PathPoint>, self::Error> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<(f64, f64, String)> = serde_json::from_str(&value.replace('\'', "\""))?;
    raw.into_iter()
        .map(|(latitude, longitude, timestamp)| {
            parse_timestamp(&timestamp)
                .map(|timestamp| PathPoint::new(latitude, longitude, timestamp))
                .ok_or_else(|| Error::MalformedRecord(format!("segment timestamp {timestamp:?}")))
        })
        .collect()
}

impl TryFrom<StationRow> for StationSnapshot {
    type Error = self::Error;

    fn try_from(row: StationRow) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&row.minute)
            .ok_or_else(|| Error::MalformedRecord(format!("minute {:?}", row.minute)))?;
        let id = parse_count(&row.id)
            .ok_or_else(|| Error::MalformedRecord(format!("station id {:?}", row.id)))?;
        let bike_count = parse_count(&row.bike_count)
            .ok_or_else(|| Error::MalformedRecord(format!("bike_count {:?}", row.bike_count)))?;
        let coordinate = Coordinate::from((row.latitude, row.longitude));
        if !coordinate.is_finite() {
            return Err(Error::MalformedRecord(format!("coordinate {coordinate}")));
        }
        Ok(Self {
            station_id: StationId(id),
            timestamp,
            bike_count,
            name: Arc::from(row.name.trim()),
            coordinate,
            terminal_type: row
                .terminal_type
                .filter(|value| !value.trim().is_empty())
                .map(|value| Arc::from(value.trim())),
            station_number: row.station_number.as_deref().and_then(parse_count),
            spot: row.spot,
        })
    }
}

#[test]
fn parse_python_segments() {
    let points = parse_segments(
        "[[50.58, 8.67, '2024-11-19T08:00:00'], [50.59, 8.68, '2024-11-19T08:00:30.500000']]",
    )
    .unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1].coordinate, Coordinate::from((50.59, 8.68)));
}

#[test]
fn parse_empty_segments() {
    assert!(parse_segments("").unwrap().is_empty());
    assert!(parse_segments("[]").unwrap().is_empty());
    assert!(parse_segments("[[50.0, 8.0]]").is_err());
}
