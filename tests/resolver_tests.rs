use bikelapse::{
    repository::{Day, PathPoint, StationId, StationSnapshot, Trip},
    resolver::{ResolverStrategy, StationReading, StationResolver, TripResolver},
    shared::time::Minute,
};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

fn at_minute(minute: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 19)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + TimeDelta::minutes(minute)
}

fn trip(bike: &str, start: i64, end: i64, points: &[i64]) -> Trip {
    let path = points
        .iter()
        .enumerate()
        .map(|(i, minute)| PathPoint::new(50.0 + i as f64 * 0.01, 8.0, at_minute(*minute)))
        .collect();
    Trip::new(bike, at_minute(start), at_minute(end), path).unwrap()
}

fn minute(value: i64) -> Minute {
    Minute::clamped(value)
}

/// Pseudo random but reproducible day, dense enough to hit overlapping trips.
fn synthetic_day(trips: usize, stations: u32) -> Day {
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: i64| {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed % bound as u64) as i64
    };
    let trips = (0..trips)
        .map(|i| {
            let start = next(1400);
            let end = (start + next(90)).min(1439);
            let step = ((end - start) / 4).max(1);
            let points: Vec<i64> = (start..=end).step_by(step as usize).collect();
            trip(&format!("{}", i % 50), start, end, &points)
        })
        .collect();
    let snapshots = (0..stations * 6)
        .map(|i| {
            StationSnapshot::new(
                StationId(i % stations),
                at_minute(next(1440)),
                next(20) as u32,
            )
        })
        .collect();
    Day::new(trips, snapshots)
}

#[test]
fn path_prefix_follows_clock() {
    let day = Day::new(vec![trip("A", 600, 620, &[600, 610, 620])], vec![]);
    let resolver = TripResolver::default();

    let trips = resolver.resolve(&day, minute(605));
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].path.len(), 1);

    let trips = resolver.resolve(&day, minute(610));
    assert_eq!(trips[0].path.len(), 2);

    let trips = resolver.resolve(&day, minute(620));
    assert_eq!(trips[0].path.len(), 3);

    assert!(resolver.resolve(&day, minute(625)).is_empty());
    assert!(resolver.resolve(&day, minute(599)).is_empty());
}

#[test]
fn path_prefix_is_monotonic() {
    let day = Day::new(vec![trip("A", 600, 660, &[600, 615, 630, 645, 660])], vec![]);
    let resolver = TripResolver::default();
    let mut last = 0;
    for now in 600..=660 {
        let trips = resolver.resolve(&day, minute(now));
        let len = trips[0].path.len();
        assert!(len >= last, "prefix shrank at minute {now}");
        last = len;
    }
    assert_eq!(last, 5);
}

#[test]
fn instantaneous_trip_is_active_once() {
    let day = Day::new(vec![trip("A", 700, 700, &[700])], vec![]);
    let resolver = TripResolver::default();
    assert!(resolver.resolve(&day, minute(699)).is_empty());
    assert_eq!(resolver.resolve(&day, minute(700)).len(), 1);
    assert!(resolver.resolve(&day, minute(701)).is_empty());
}

#[test]
fn trip_without_path_is_active_but_drawn_empty() {
    let day = Day::new(vec![trip("A", 100, 110, &[])], vec![]);
    let trips = TripResolver::default().resolve(&day, minute(105));
    assert_eq!(trips.len(), 1);
    assert!(!trips[0].has_path());
}

#[test]
fn started_trip_before_first_point_has_empty_path() {
    let day = Day::new(vec![trip("A", 100, 120, &[105, 120])], vec![]);
    let trips = TripResolver::default().resolve(&day, minute(102));
    assert_eq!(trips.len(), 1);
    assert!(trips[0].path.is_empty());
}

#[test]
fn opacity_fades_to_oldest() {
    let day = Day::new(vec![trip("A", 0, 30, &[0, 10, 20, 30])], vec![]);
    let trips = TripResolver::default().resolve(&day, minute(30));
    let view = &trips[0];
    assert!((view.opacity(0) - 1.0 / 3.0).abs() < 1e-9);
    assert!((view.opacity(1) - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(view.opacity(2), 1.0);
    assert_eq!(view.opacity(3), 1.0);
}

#[test]
fn station_uses_latest_snapshot() {
    let snapshots = vec![
        StationSnapshot::new(StationId(1), at_minute(0), 5),
        StationSnapshot::new(StationId(1), at_minute(120), 3),
    ];
    let day = Day::new(vec![], snapshots);
    let resolver = StationResolver::default();

    let state = resolver.resolve(&day, minute(60));
    assert_eq!(state[&StationId(1)].bike_count(), Some(5));

    let state = resolver.resolve(&day, minute(150));
    assert_eq!(state[&StationId(1)].bike_count(), Some(3));

    let state = resolver.resolve(&day, minute(-1));
    assert_eq!(state[&StationId(1)].bike_count(), Some(5));
}

#[test]
fn station_unknown_before_first_snapshot() {
    let snapshots = vec![
        StationSnapshot::new(StationId(1), at_minute(0), 5),
        StationSnapshot::new(StationId(2), at_minute(300), 0),
    ];
    let day = Day::new(vec![], snapshots);
    let state = StationResolver::default().resolve(&day, minute(200));
    assert_eq!(state.len(), 2);
    assert_eq!(state[&StationId(2)], StationReading::Unknown);

    let state = StationResolver::default().resolve(&day, minute(300));
    assert_eq!(state[&StationId(2)].bike_count(), Some(0));
}

#[test]
fn first_stored_snapshot_wins_tie() {
    let snapshots = vec![
        StationSnapshot::new(StationId(1), at_minute(10), 4),
        StationSnapshot::new(StationId(1), at_minute(10) + TimeDelta::seconds(40), 7),
        StationSnapshot::new(StationId(1), at_minute(12), 2),
    ];
    let day = Day::new(vec![], snapshots);
    for strategy in [ResolverStrategy::Indexed, ResolverStrategy::FullScan] {
        let state = StationResolver::new(strategy).resolve(&day, minute(10));
        assert_eq!(state[&StationId(1)].bike_count(), Some(4), "{strategy:?}");
        let state = StationResolver::new(strategy).resolve(&day, minute(11));
        assert_eq!(state[&StationId(1)].bike_count(), Some(4), "{strategy:?}");
    }

    // The forward cursor walks over the same minute without picking the later snapshot.
    let mut walking = StationResolver::new(ResolverStrategy::Indexed);
    walking.advance(&day, minute(9));
    let (state, _) = walking.advance(&day, minute(10));
    assert_eq!(state[&StationId(1)].bike_count(), Some(4));
    let (state, _) = walking.advance(&day, minute(12));
    assert_eq!(state[&StationId(1)].bike_count(), Some(2));
}

#[test]
fn tie_in_reversed_storage_keeps_first_stored() {
    let snapshots = vec![
        StationSnapshot::new(StationId(1), at_minute(10) + TimeDelta::seconds(40), 7),
        StationSnapshot::new(StationId(1), at_minute(5), 1),
        StationSnapshot::new(StationId(1), at_minute(10), 4),
    ];
    let day = Day::new(vec![], snapshots);
    for strategy in [ResolverStrategy::Indexed, ResolverStrategy::FullScan] {
        let state = StationResolver::new(strategy).resolve(&day, minute(10));
        assert_eq!(state[&StationId(1)].bike_count(), Some(7), "{strategy:?}");
    }
}

#[test]
fn strategies_agree() {
    let day = synthetic_day(2_000, 40);
    let indexed_trips = TripResolver::new(ResolverStrategy::Indexed);
    let scanned_trips = TripResolver::new(ResolverStrategy::FullScan);
    let indexed_stations = StationResolver::new(ResolverStrategy::Indexed);
    let scanned_stations = StationResolver::new(ResolverStrategy::FullScan);
    for now in (0..1440).step_by(7) {
        assert_eq!(
            indexed_trips.resolve(&day, minute(now)),
            scanned_trips.resolve(&day, minute(now)),
            "trips differ at {now}"
        );
        assert_eq!(
            indexed_stations.resolve(&day, minute(now)),
            scanned_stations.resolve(&day, minute(now)),
            "stations differ at {now}"
        );
    }
}

#[test]
fn cursor_matches_fresh_search() {
    let day = synthetic_day(0, 25);
    let mut walking = StationResolver::new(ResolverStrategy::Indexed);
    let fresh = StationResolver::new(ResolverStrategy::FullScan);
    // Forward, then a jump backwards, then forward again.
    let minutes = [0, 5, 90, 91, 400, 1200, 30, 31, 800, 1439];
    for now in minutes {
        let (state, _) = walking.advance(&day, minute(now));
        assert_eq!(state, fresh.resolve(&day, minute(now)), "mismatch at {now}");
    }
}

#[test]
fn resolve_is_idempotent() {
    let day = synthetic_day(500, 10);
    let trips = TripResolver::default();
    let stations = StationResolver::default();
    assert_eq!(trips.resolve(&day, minute(720)), trips.resolve(&day, minute(720)));
    assert_eq!(
        stations.resolve(&day, minute(720)),
        stations.resolve(&day, minute(720))
    );
}

#[test]
fn advance_reports_changes() {
    let day = Day::new(
        vec![
            trip("A", 600, 620, &[600, 610, 620]),
            trip("B", 615, 640, &[615, 640]),
        ],
        vec![],
    );
    let mut resolver = TripResolver::default();

    let (_, changes) = resolver.advance(&day, minute(605));
    assert_eq!(changes.added, vec![0]);

    let (_, changes) = resolver.advance(&day, minute(615));
    assert_eq!(changes.added, vec![1]);
    assert_eq!(changes.updated, vec![0]);

    let (_, changes) = resolver.advance(&day, minute(615));
    assert!(changes.is_empty());

    let (_, changes) = resolver.advance(&day, minute(630));
    assert_eq!(changes.removed, vec![0]);
    assert!(changes.added.is_empty());

    resolver.reset();
    let (_, changes) = resolver.advance(&day, minute(630));
    assert_eq!(changes.added, vec![1]);
}

#[test]
fn empty_day_resolves_to_nothing() {
    let day = Day::new(vec![], vec![]);
    for strategy in [ResolverStrategy::Indexed, ResolverStrategy::FullScan] {
        assert!(TripResolver::new(strategy).resolve(&day, minute(600)).is_empty());
        assert!(StationResolver::new(strategy).resolve(&day, minute(600)).is_empty());
    }
}
