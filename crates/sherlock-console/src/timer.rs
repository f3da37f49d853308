//! Scoped background timers.
//!
//! A `ScopedTimer` owns the task driving a periodic callback. Dropping the
//! handle aborts the task, so a view that goes away stops its polling on
//! every exit path.

use std::future::Future;
use std::time::Duration;

use sherlock_common::{Result, SherlockError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug)]
pub struct ScopedTimer {
    handle: Option<JoinHandle<()>>,
}

impl ScopedTimer {
    /// Run `tick` every `period`, first after one full period.
    pub fn every<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        Self { handle: Some(handle) }
    }

    /// Wrap an already spawned task.
    pub fn from_handle(handle: JoinHandle<()>) -> Self {
        Self { handle: Some(handle) }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the timer. Calling this more than once is harmless.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("timer cancelled");
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Poll `probe` every `period` until it yields a value, for log bundle and
/// OTA progress tracking. Errors from `probe` end the poll. With
/// `max_attempts` set, gives up with `SherlockError::Timeout` after that many
/// empty probes.
pub async fn poll_until<T, F, Fut>(
    period: Duration,
    max_attempts: Option<usize>,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut attempts = 0usize;
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        attempts += 1;
        if max_attempts.is_some_and(|max| attempts >= max) {
            return Err(SherlockError::Timeout(format!("no result after {attempts} polls")));
        }
        time::sleep(period).await;
    }
}
