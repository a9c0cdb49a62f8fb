use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Play timer running on its own task. Dropping the ticker cancels the task.
pub struct Ticker {
    receiver: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(period: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(8);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(()).await.is_err() {
                    break;
                }
            }
            debug!("Ticker stopped");
        });
        Self { receiver, handle }
    }

    /// Next tick, or `None` once the timer task is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.receiver.recv().await
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
