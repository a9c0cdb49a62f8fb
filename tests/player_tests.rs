use bikelapse::{
    playback::{PlaybackState, Tick},
    player::Player,
    repository::{Day, PathPoint, StationId, StationSnapshot, Trip},
    resolver::ResolverStrategy,
    shared::time::{LAST_MINUTE, Minute},
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::{cell::RefCell, rc::Rc};

fn at_minute(minute: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 19)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + TimeDelta::minutes(minute)
}

fn trip(bike: &str, start: i64, end: i64) -> Trip {
    let path = vec![
        PathPoint::new(50.58, 8.67, at_minute(start)),
        PathPoint::new(50.59, 8.68, at_minute(end)),
    ];
    Trip::new(bike, at_minute(start), at_minute(end), path).unwrap()
}

fn sample_day() -> Day {
    Day::new(
        vec![
            trip("10001", 600, 620),
            trip("10001", 610, 630),
            trip("10002", 612, 640),
        ],
        vec![
            StationSnapshot::new(StationId(1), at_minute(0), 5),
            StationSnapshot::new(StationId(1), at_minute(615), 4),
        ],
    )
}

#[test]
fn new_player_schedules_first_frame() {
    let mut player = Player::new(sample_day());
    let frame = player.run_frame().unwrap();
    assert_eq!(frame.minute, Minute::default());
    assert!(frame.trips.is_empty());
    assert_eq!(frame.stations[&StationId(1)].bike_count(), Some(5));
    assert!(player.run_frame().is_none());
}

#[test]
fn scrub_burst_renders_once() {
    let frames = Rc::new(RefCell::new(Vec::new()));
    let mut player = Player::new(sample_day());
    let seen = Rc::clone(&frames);
    player.on_frame(move |frame| seen.borrow_mut().push(frame.minute));
    player.run_frame();

    (590..=615).for_each(|minute| {
        player.scrub(minute);
    });
    let frame = player.run_frame().unwrap();
    assert_eq!(frame.minute, Minute::clamped(615));
    assert_eq!(frame.trips.len(), 3);
    assert!(player.run_frame().is_none());

    assert_eq!(*frames.borrow(), vec![Minute::default(), Minute::clamped(615)]);
}

#[test]
fn scrub_clamps() {
    let mut player = Player::new(sample_day());
    assert_eq!(player.scrub(-30), Minute::default());
    assert_eq!(player.scrub(5000), LAST_MINUTE);
    assert_eq!(player.minute(), LAST_MINUTE);
}

#[test]
fn summary_counts_distinct_bikes() {
    let mut player = Player::new(sample_day());
    player.scrub(615);
    let frame = player.run_frame().unwrap();
    assert_eq!(frame.summary.trip_count, 3);
    assert_eq!(frame.summary.active_trips, 3);
    assert_eq!(frame.summary.active_bikes, 2);
    assert_eq!(player.summary(Minute::clamped(635)).active_trips, 1);
}

#[test]
fn playback_runs_to_completion() {
    let mut player = Player::new(sample_day());
    player.scrub(1437);
    assert!(player.play());
    assert_eq!(player.tick(), Tick::Advanced(Minute::clamped(1438)));
    assert_eq!(player.tick(), Tick::Advanced(LAST_MINUTE));
    assert_eq!(player.tick(), Tick::Completed);
    assert_eq!(player.clock().state(), PlaybackState::Stopped);
    assert_eq!(player.tick(), Tick::Idle);
    assert_eq!(player.run_frame().unwrap().minute, LAST_MINUTE);
}

#[test]
fn toggle_flips_state() {
    let mut player = Player::new(sample_day());
    assert_eq!(player.toggle(), PlaybackState::Playing);
    assert_eq!(player.toggle(), PlaybackState::Stopped);
    assert!(!player.pause());
}

#[test]
fn select_trip_jumps_clock() {
    let mut player = Player::new(sample_day());
    player.run_frame();

    let highlight = player.select_trip(2).unwrap();
    assert_eq!(highlight.bike, "10002");
    assert_eq!(highlight.start_minute, Minute::clamped(612));
    assert_eq!(highlight.path.len(), 2);
    assert_eq!(player.minute(), Minute::clamped(612));
    assert_eq!(player.selected_trip(), Some(2));
    assert_eq!(player.run_frame().unwrap().minute, Minute::clamped(612));

    assert!(player.select_trip(99).is_none());
    assert_eq!(player.minute(), Minute::clamped(612));
    assert_eq!(player.selected_trip(), Some(2));

    player.clear_selection();
    assert_eq!(player.selected_trip(), None);
}

#[test]
fn replace_day_cancels_pending_frame() {
    let mut player = Player::new(sample_day());
    player.run_frame();
    player.play();
    player.scrub(615);

    let other = Day::new(vec![trip("20001", 900, 910)], vec![]);
    player.replace_day(other);

    assert!(!player.clock().is_playing());
    assert_eq!(player.selected_trip(), None);
    let frame = player.run_frame().unwrap();
    assert_eq!(frame.generation, 1);
    assert_eq!(frame.minute, Minute::clamped(615));
    assert!(frame.trips.is_empty());
    assert!(frame.stations.is_empty());
    assert_eq!(frame.summary.trip_count, 1);
    assert_eq!(player.scheduler().stats().cancelled, 1);
}

#[test]
fn frame_changes_track_previous_frame() {
    let mut player = Player::new(sample_day()).with_strategy(ResolverStrategy::FullScan);
    player.scrub(605);
    let frame = player.run_frame().unwrap();
    assert_eq!(frame.trip_changes.added, vec![0]);
    assert_eq!(frame.station_changes.added, vec![StationId(1)]);

    player.request_frame();
    let frame = player.run_frame().unwrap();
    assert!(frame.trip_changes.is_empty());
    assert!(frame.station_changes.is_empty());

    player.scrub(616);
    let frame = player.run_frame().unwrap();
    assert_eq!(frame.trip_changes.added, vec![1, 2]);
    assert_eq!(frame.station_changes.updated, vec![StationId(1)]);
}
