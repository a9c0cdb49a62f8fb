use tracing::trace;

use crate::shared::time::Minute;

/// A resolver pass waiting for the next frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFrame {
    /// Latest minute requested before the frame boundary.
    pub minute: Minute,
    /// Dataset generation the pass was requested against.
    pub generation: u64,
    /// How many requests were folded into this pass.
    pub requests: u32,
}

/// Collapses bursts of clock changes into at most one pass per frame.
///
/// Requests made before the next frame boundary overwrite each other's
/// minute; only the latest one is resolved. Replacing the dataset bumps the
/// generation and drops whatever was pending, so a pass can never run
/// against a day that is no longer displayed.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: Option<PendingFrame>,
    generation: u64,
    passes: u64,
    coalesced: u64,
    cancelled: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Default::default()
    }

    /// Schedules a pass for `minute`, or retargets the one already scheduled.
    pub fn request(&mut self, minute: Minute) {
        match &mut self.pending {
            Some(pending) => {
                trace!("Coalescing frame {} into {}", pending.minute, minute);
                pending.minute = minute;
                pending.requests += 1;
                self.coalesced += 1;
            }
            None => {
                self.pending = Some(PendingFrame {
                    minute,
                    generation: self.generation,
                    requests: 1,
                });
            }
        }
    }

    /// Drops the pending pass, if any.
    pub fn cancel(&mut self) -> Option<PendingFrame> {
        let cancelled = self.pending.take();
        if let Some(frame) = &cancelled {
            trace!("Cancelled pending frame for {}", frame.minute);
            self.cancelled += 1;
        }
        cancelled
    }

    /// Called before the dataset is swapped. Cancels the pending pass and
    /// starts a new generation.
    pub fn invalidate(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Frame boundary: hands out the pending pass, if it still belongs to
    /// the current generation.
    pub fn take_due(&mut self) -> Option<PendingFrame> {
        let frame = self.pending.take()?;
        if frame.generation != self.generation {
            trace!("Dropping stale frame from generation {}", frame.generation);
            self.cancelled += 1;
            return None;
        }
        self.passes += 1;
        Some(frame)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            passes: self.passes,
            coalesced: self.coalesced,
            cancelled: self.cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub passes: u64,
    pub coalesced: u64,
    pub cancelled: u64,
}

#[test]
fn burst_collapses_to_latest() {
    let mut scheduler = FrameScheduler::new();
    (0..10).for_each(|minute| scheduler.request(Minute::clamped(minute)));
    let frame = scheduler.take_due().unwrap();
    assert_eq!(frame.minute, Minute::clamped(9));
    assert_eq!(frame.requests, 10);
    assert!(scheduler.take_due().is_none());
    assert_eq!(scheduler.stats().passes, 1);
    assert_eq!(scheduler.stats().coalesced, 9);
}

#[test]
fn invalidate_drops_pending() {
    let mut scheduler = FrameScheduler::new();
    scheduler.request(Minute::clamped(30));
    assert_eq!(scheduler.invalidate(), 1);
    assert!(scheduler.take_due().is_none());
    scheduler.request(Minute::clamped(31));
    assert_eq!(scheduler.take_due().unwrap().generation, 1);
}
