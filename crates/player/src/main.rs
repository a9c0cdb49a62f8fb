mod ticker;

use bikelapse::{
    playback::{PlaybackConfig, Tick},
    player::{Frame, Player},
    shared::time::Minute,
    source::{Config, DataSource},
};
use chrono::NaiveDate;
use std::{path::Path, time::Instant};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::ticker::Ticker;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<_> = std::env::args().collect();
    if args.len() < 3 {
        error!("Usage: bikelapse-player <data-dir|zip> <city-id> [date] [HH:MM]");
        std::process::exit(1);
    }
    let path = Path::new(&args[1]);
    let Ok(city_id) = args[2].parse::<u32>() else {
        error!("Invalid city id {:?}", args[2]);
        std::process::exit(1);
    };

    let source = if path.extension().is_some_and(|ext| ext == "zip") {
        DataSource::new(Config::default()).from_zip(path)
    } else {
        DataSource::new(Config::default()).from_dir(path)
    };

    let date = match args.get(3) {
        Some(date) => match NaiveDate::parse_from_str(date, DATE_FORMAT) {
            Ok(date) => date,
            Err(err) => {
                error!("Invalid date {date:?}: {err}");
                std::process::exit(1);
            }
        },
        None => match first_available_day(&source, city_id) {
            Some(date) => date,
            None => {
                error!("No recorded days for city {city_id} in {}", path.display());
                std::process::exit(1);
            }
        },
    };
    let start = match args.get(4).map(|time| Minute::from_hm(time)) {
        Some(Some(minute)) => minute,
        Some(None) => {
            error!("Invalid start time {:?}, expected HH:MM", args[4]);
            std::process::exit(1);
        }
        None => Minute::default(),
    };

    info!("Loading city {city_id} on {date}...");
    let now = Instant::now();
    let (day, report) = match source.load_day(city_id, date) {
        Ok(loaded) => loaded,
        Err(err) => {
            error!("Failed to load day: {err}");
            std::process::exit(1);
        }
    };
    info!(
        "Loaded {} trips ({} skipped) and {} station snapshots ({} skipped) in {:?}",
        report.trips,
        report.skipped_trips,
        report.snapshots,
        report.skipped_snapshots,
        now.elapsed()
    );
    let (previous, next) = source.adjacent_days(city_id, date);
    info!("Previous day available: {previous}, next day available: {next}");

    let config = PlaybackConfig::default();
    let mut player = Player::new(day).with_config(config);
    player.on_frame(log_frame);
    player.scrub(start.as_minutes() as i64);
    player.play();

    let ticker = Ticker::spawn(config.tick_interval);
    run(&mut player, ticker, config).await;

    let stats = player.scheduler().stats();
    info!(
        "Stopped at {} after {} frames ({} requests coalesced, {} cancelled)",
        player.minute().to_hm_string(),
        stats.passes,
        stats.coalesced,
        stats.cancelled
    );
}

async fn run(player: &mut Player, mut ticker: Ticker, config: PlaybackConfig) {
    let mut frames = time::interval(config.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(()) = ticker.recv() => {
                if player.tick() == Tick::Completed {
                    player.run_frame();
                    break;
                }
            }
            _ = frames.tick() => {
                player.run_frame();
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }
    ticker.stop();
}

fn first_available_day(source: &DataSource, city_id: u32) -> Option<NaiveDate> {
    match source.available_days() {
        Ok(days) => days.get(&city_id)?.first().copied(),
        Err(err) => {
            error!("Failed to list recorded days: {err}");
            None
        }
    }
}

fn log_frame(frame: &Frame) {
    let known = frame
        .stations
        .values()
        .filter(|reading| reading.is_known())
        .count();
    info!(
        "{} | {} active trips, {} bikes out of {} trips | {}/{} stations reporting",
        frame.minute.to_hm_string(),
        frame.summary.active_trips,
        frame.summary.active_bikes,
        frame.summary.trip_count,
        known,
        frame.stations.len()
    );
}
