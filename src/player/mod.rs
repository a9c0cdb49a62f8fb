mod frame;
pub use frame::*;

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::{
    playback::{Clock, FrameScheduler, PlaybackConfig, PlaybackState, Tick},
    repository::{Day, SharedDay},
    resolver::{
        ActiveTripView, ResolverStrategy, StationDisplayState, StationResolver, TripResolver,
    },
    shared::time::Minute,
};

pub type FrameCallback = Box<dyn FnMut(&Frame)>;

/// The coordinating context of a replay session.
///
/// Owns the clock, the current day and the frame scheduler. Every clock
/// producer (slider, play timer, trip selection) goes through it, and every
/// change only schedules work; the resolvers run once per frame boundary in
/// [`Player::run_frame`].
pub struct Player {
    config: PlaybackConfig,
    clock: Clock,
    day: SharedDay,
    scheduler: FrameScheduler,
    trips: TripResolver,
    stations: StationResolver,
    selected: Option<u32>,
    on_frame: Option<FrameCallback>,
}

impl Player {
    pub fn new(day: impl Into<SharedDay>) -> Self {
        let mut player = Self {
            config: PlaybackConfig::default(),
            clock: Clock::new(),
            day: day.into(),
            scheduler: FrameScheduler::new(),
            trips: TripResolver::default(),
            stations: StationResolver::default(),
            selected: None,
            on_frame: None,
        };
        player.request_frame();
        player
    }

    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_strategy(mut self, strategy: ResolverStrategy) -> Self {
        self.trips = TripResolver::new(strategy);
        self.stations = StationResolver::new(strategy);
        self
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn day(&self) -> &Day {
        &self.day
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn minute(&self) -> Minute {
        self.clock.minute()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Registers the render callback, invoked once per coalesced update.
    pub fn on_frame<F>(&mut self, callback: F)
    where
        F: FnMut(&Frame) + 'static,
    {
        self.on_frame = Some(Box::new(callback));
    }

    /// Slider input. Clamped, and only schedules a pass.
    pub fn scrub(&mut self, minute: i64) -> Minute {
        let minute = self.clock.set(minute);
        self.scheduler.request(minute);
        minute
    }

    pub fn play(&mut self) -> bool {
        let started = self.clock.start();
        if started {
            debug!("Playback started at {}", self.clock.minute());
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        let stopped = self.clock.stop();
        if stopped {
            debug!("Playback stopped at {}", self.clock.minute());
        }
        stopped
    }

    pub fn toggle(&mut self) -> PlaybackState {
        match self.clock.state() {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Stopped => self.play(),
        };
        self.clock.state()
    }

    /// One step of the play timer.
    pub fn tick(&mut self) -> Tick {
        let tick = self.clock.tick();
        match tick {
            Tick::Advanced(minute) => self.scheduler.request(minute),
            Tick::Completed => info!("Playback complete"),
            Tick::Idle => (),
        }
        tick
    }

    /// Highlights a trip and jumps the clock to its start.
    /// Returns `None` and changes nothing for an unknown index.
    pub fn select_trip(&mut self, trip_index: u32) -> Option<TripHighlight> {
        let trip = self.day.trip(trip_index)?;
        let highlight = TripHighlight::from(trip);
        self.selected = Some(trip_index);
        let minute = self.clock.set_minute(highlight.start_minute);
        self.scheduler.request(minute);
        Some(highlight)
    }

    pub fn selected_trip(&self) -> Option<u32> {
        self.selected
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Swaps in another day. Playback is stopped and the pending pass is
    /// cancelled before the old day is released; the clock keeps its minute.
    pub fn replace_day(&mut self, day: impl Into<SharedDay>) {
        self.clock.stop();
        let generation = self.scheduler.invalidate();
        self.trips.reset();
        self.stations.reset();
        self.selected = None;
        self.day = day.into();
        info!(
            "Loaded day {:?} with {} trips and {} stations (generation {generation})",
            self.day.date,
            self.day.trips.len(),
            self.day.stations.len()
        );
        self.request_frame();
    }

    /// Schedules a pass for the current minute.
    pub fn request_frame(&mut self) {
        self.scheduler.request(self.clock.minute());
    }

    /// Frame boundary. Resolves the pending minute, if any, hands the
    /// frame to the render callback and returns it.
    pub fn run_frame(&mut self) -> Option<Frame> {
        let pending = self.scheduler.take_due()?;
        let day = Arc::clone(&self.day);
        let (trips, trip_changes) = self.trips.advance(&day, pending.minute);
        let (stations, station_changes) = self.stations.advance(&day, pending.minute);
        let summary = DaySummary::new(&day, &trips);
        let frame = Frame {
            minute: pending.minute,
            generation: pending.generation,
            trips,
            stations,
            trip_changes,
            station_changes,
            summary,
        };
        trace!(
            "Frame {} from {} requests: {} trips, {} changes",
            frame.minute,
            pending.requests,
            frame.trips.len(),
            frame.trip_changes.len() + frame.station_changes.len()
        );
        if let Some(callback) = self.on_frame.as_mut() {
            callback(&frame);
        }
        Some(frame)
    }

    /// Active trips at `minute`, without touching the diff state.
    pub fn active_trips(&self, minute: Minute) -> Vec<ActiveTripView> {
        self.trips.resolve(&self.day, minute)
    }

    /// Station readings at `minute`, without touching the diff state.
    pub fn station_display_state(&self, minute: Minute) -> StationDisplayState {
        self.stations.resolve(&self.day, minute)
    }

    pub fn summary(&self, minute: Minute) -> DaySummary {
        DaySummary::new(&self.day, &self.active_trips(minute))
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("clock", &self.clock)
            .field("generation", &self.scheduler.generation())
            .field("trips", &self.day.trips.len())
            .field("stations", &self.day.stations.len())
            .field("selected", &self.selected)
            .finish()
    }
}
