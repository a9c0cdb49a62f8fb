use serde::Serialize;

use crate::shared::time::{LAST_MINUTE, Minute};

#[cfg(test)]
use crate::shared::time::FIRST_MINUTE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// What a single tick did to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The clock moved forward by one minute.
    Advanced(Minute),
    /// The clock was already on the last minute. Playback is now stopped.
    Completed,
    /// The clock is stopped and ticks are ignored.
    Idle,
}

/// The simulated wall clock of the replayed day.
///
/// Inputs are never rejected: any minute is clamped to the day, the way a
/// slider clamps to its own bounds.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    minute: Minute,
    state: PlaybackState,
}

impl Clock {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn minute(&self) -> Minute {
        self.minute
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Moves the clock to `minute`, clamped to `[0, 1439]`. Does not touch
    /// the playback state, so scrubbing while playing keeps playing from the
    /// new position.
    pub fn set(&mut self, minute: i64) -> Minute {
        self.minute = Minute::clamped(minute);
        self.minute
    }

    pub fn set_minute(&mut self, minute: Minute) -> Minute {
        self.minute = minute;
        self.minute
    }

    /// Returns false when the clock was already playing.
    pub fn start(&mut self) -> bool {
        let was_stopped = self.state == PlaybackState::Stopped;
        self.state = PlaybackState::Playing;
        was_stopped
    }

    /// Returns false when the clock was already stopped.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.state == PlaybackState::Playing;
        self.state = PlaybackState::Stopped;
        was_playing
    }

    pub fn toggle(&mut self) -> PlaybackState {
        match self.state {
            PlaybackState::Playing => self.stop(),
            PlaybackState::Stopped => self.start(),
        };
        self.state
    }

    /// Advances one minute while playing. On the last minute the clock stays
    /// put, stops, and reports completion. Because the clock is then stopped,
    /// completion is reported once per run.
    pub fn tick(&mut self) -> Tick {
        if self.state == PlaybackState::Stopped {
            return Tick::Idle;
        }
        match self.minute.next() {
            Some(next) => {
                self.minute = next;
                Tick::Advanced(next)
            }
            None => {
                debug_assert_eq!(self.minute, LAST_MINUTE);
                self.state = PlaybackState::Stopped;
                Tick::Completed
            }
        }
    }
}

#[test]
fn set_clamps() {
    let mut clock = Clock::new();
    assert_eq!(clock.set(-5), FIRST_MINUTE);
    assert_eq!(clock.set(2000), LAST_MINUTE);
    assert_eq!(clock.set(600).as_minutes(), 600);
    assert_eq!(clock.set(600).as_minutes(), 600);
}

#[test]
fn tick_requires_playing() {
    let mut clock = Clock::new();
    assert_eq!(clock.tick(), Tick::Idle);
    assert_eq!(clock.minute(), FIRST_MINUTE);
    clock.start();
    assert_eq!(clock.tick(), Tick::Advanced(Minute::clamped(1)));
}

#[test]
fn completion_signalled_once() {
    let mut clock = Clock::new();
    clock.set(1439);
    clock.start();
    assert_eq!(clock.tick(), Tick::Completed);
    assert_eq!(clock.minute(), LAST_MINUTE);
    assert_eq!(clock.state(), PlaybackState::Stopped);
    assert_eq!(clock.tick(), Tick::Idle);
    assert_eq!(clock.minute(), LAST_MINUTE);
}
