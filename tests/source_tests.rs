use bikelapse::{
    repository::StationId,
    resolver::StationResolver,
    shared::time::Minute,
    source::{Config, DataSource, Error},
};
use chrono::NaiveDate;
use flate2::{Compression, write::GzEncoder};
use std::{fs, io::Write, path::Path};
use zip::{ZipWriter, write::SimpleFileOptions};

const TRIPS: &str = "\
bike_number,start_latitude,start_longitude,start_time,end_latitude,end_longitude,end_time,duration,date,distance,segments
10001,50.58,8.67,2024-11-19 10:00:00,50.59,8.68,2024-11-19 10:20:00,1200.0,2024-11-19,1520.5,\"[[50.58, 8.67, '2024-11-19T10:00:00'], [50.585, 8.675, '2024-11-19T10:10:00'], [50.59, 8.68, '2024-11-19T10:20:00']]\"
10002,50.57,8.66,2024-11-19 11:00:00,50.56,8.65,2024-11-19 10:30:00,,2024-11-19,,[]
10003,50.57,8.66,not a time,50.56,8.65,2024-11-19 12:30:00,,2024-11-19,,[]
10004,,,2024-11-19 08:00:00,,,2024-11-19 08:05:00,,2024-11-19,,
10005,50.58,8.67,2024-11-19 09:00:00,50.59,8.68,2024-11-19 09:10:00,600.0,2024-11-19,800.0,\"[[50.58, 8.67, '2024-11-19T08:55:00'], [50.59, 8.68, '2024-11-19T09:10:00']]\"
";

const STATIONS: &str = "\
minute,id,uid,latitude,longitude,name,spot,station_number,maintenance,terminal_type,city_id,city_name,bike_count,bike_list
2024-11-19 00:00:00,101,9001,50.58,8.67,Bahnhof,True,4001,False,stele,467,Giessen,5,\"[1, 2, 3, 4, 5]\"
2024-11-19 02:00:00,101,9001,50.58,8.67,Bahnhof,True,4001,False,stele,467,Giessen,3,\"[1, 2, 3]\"
2024-11-19 00:00:00,102,9002,50.59,8.68,Markt,False,,False,,467,Giessen,2.0,
2024-11-19 00:00:00,abc,9003,50.59,8.68,Broken,False,,False,,467,Giessen,2,
";

fn write_gz(path: &Path, content: &str) {
    let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, day).unwrap()
}

fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_gz(&dir.path().join("467_trips_2024-11-19.csv.gz"), TRIPS);
    write_gz(&dir.path().join("467_stations_2024-11-19.csv.gz"), STATIONS);
    // Second day uncompressed and without stations.
    fs::write(dir.path().join("467_trips_2024-11-20.csv"), TRIPS).unwrap();
    fs::write(dir.path().join("468_stations_2024-11-01.csv"), STATIONS).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a data file").unwrap();
    dir
}

#[test]
fn load_day_from_dir_test() {
    let dir = data_dir();
    let source = DataSource::new(Config::default()).from_dir(dir.path());
    let (day, report) = source.load_day(467, date(19)).unwrap();

    assert_eq!(report.trips, 2);
    // End before start, unparseable time, path point before the start.
    assert_eq!(report.skipped_trips, 3);
    assert_eq!(report.snapshots, 3);
    assert_eq!(report.skipped_snapshots, 1);

    assert_eq!(day.city_id, Some(467));
    assert_eq!(day.date, Some(date(19)));
    assert_eq!(day.trips.len(), 2);

    let trip = &day.trips[0];
    assert_eq!(&*trip.bike, "10001");
    assert_eq!(trip.path.len(), 3);
    assert_eq!(trip.duration_secs, 1200.0);
    assert_eq!(trip.distance.as_meters(), 1520.5);
    assert_eq!(trip.start_minute(), Minute::clamped(600));

    let empty_path = &day.trips[1];
    assert!(empty_path.path.is_empty());
    assert_eq!(empty_path.duration_secs, 300.0);

    let station = day.station_by_id(StationId(101)).unwrap();
    assert_eq!(&*station.name, "Bahnhof");
    assert!(station.spot);
    assert_eq!(station.station_number, Some(4001));
    assert_eq!(station.terminal_type.as_deref(), Some("stele"));
    let markt = day.station_by_id(StationId(102)).unwrap();
    assert!(!markt.spot);
    assert_eq!(markt.terminal_type, None);

    let state = StationResolver::default().resolve(&day, Minute::clamped(150));
    assert_eq!(state[&StationId(101)].bike_count(), Some(3));
    assert_eq!(state[&StationId(102)].bike_count(), Some(2));
}

#[test]
fn missing_station_file_loads_without_stations() {
    let dir = data_dir();
    let source = DataSource::new(Config::default()).from_dir(dir.path());
    let (day, report) = source.load_day(467, date(20)).unwrap();
    assert_eq!(day.trips.len(), 2);
    assert!(day.stations.is_empty());
    assert_eq!(report.snapshots, 0);
}

#[test]
fn missing_trip_file_is_an_error() {
    let dir = data_dir();
    let source = DataSource::new(Config::default()).from_dir(dir.path());
    match source.load_day(467, date(21)) {
        Err(Error::FileNotFound(name)) => assert_eq!(name, "467_trips_2024-11-21.csv.gz"),
        other => panic!("expected missing file, got {:?}", other.map(|(_, report)| report)),
    }
}

#[test]
fn available_days_test() {
    let dir = data_dir();
    let source = DataSource::new(Config::default()).from_dir(dir.path());
    let days = source.available_days().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[&467], vec![date(19)]);
    assert_eq!(days[&468], vec![date(1)]);
}

#[test]
fn adjacent_days_test() {
    let dir = data_dir();
    let source = DataSource::new(Config::default()).from_dir(dir.path());
    assert!(source.day_exists(467, date(19)));
    assert!(!source.day_exists(467, date(18)));
    assert_eq!(source.adjacent_days(467, date(19)), (false, true));
    assert_eq!(source.adjacent_days(467, date(20)), (true, false));
}

#[test]
fn load_day_from_zip_test() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("export.zip");
    let mut writer = ZipWriter::new(fs::File::create(&zip_path).unwrap());
    writer
        .start_file("467_trips_2024-11-19.csv", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(TRIPS.as_bytes()).unwrap();
    writer
        .start_file("467_stations_2024-11-19.csv", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(STATIONS.as_bytes()).unwrap();
    writer.finish().unwrap();

    let source = DataSource::new(Config::default()).from_zip(&zip_path);
    assert_eq!(source.available_days().unwrap()[&467], vec![date(19)]);
    let trips = source.load_trips(467, date(19)).unwrap();
    assert_eq!(trips.len(), 2);
    let snapshots = source.load_stations(467, date(19)).unwrap();
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[2].bike_count, 2);
}

#[test]
fn custom_file_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("trips-467-2024-11-19.csv"), TRIPS).unwrap();
    let config = Config {
        trips_file_name: "trips-{city}-{date}.csv".into(),
        stations_file_name: "stations-{city}-{date}.csv".into(),
    };
    let source = DataSource::new(config).from_dir(dir.path());
    let (day, _) = source.load_day(467, date(19)).unwrap();
    assert_eq!(day.trips.len(), 2);
}
