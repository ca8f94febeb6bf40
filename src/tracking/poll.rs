use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::api::{
    client::JobClient,
    error::ApiError,
    job::{JobHandle, JobState},
};

/// Waits between status queries.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Queries a job at a fixed interval until it leaves the running state.
///
/// There is no deadline; a job that never finishes blocks forever.
pub struct Poller {
    interval: Duration,
    sleep: Box<dyn Sleep>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Poller::with_sleep(interval, Box::new(ThreadSleep))
    }

    pub fn with_sleep(interval: Duration, sleep: Box<dyn Sleep>) -> Self {
        Poller { interval, sleep }
    }

    /// Returns the first terminal state reported for `job`.
    ///
    /// A failed status query is returned as an error, since the job state is
    /// then unknown.
    pub fn await_terminal(&mut self, client: &mut dyn JobClient, job: JobHandle) -> Result<JobState, ApiError> {
        let started = Instant::now();
        let mut polls = 0u32;
        loop {
            let state = client.job_status(job.id)?;
            polls += 1;
            if state.is_terminal() {
                info!(job = %job.id, kind = %job.kind, ?state, polls, elapsed = ?started.elapsed(), "job finished");
                return Ok(state);
            }
            debug!(job = %job.id, kind = %job.kind, polls, elapsed = ?started.elapsed(), "job still running");
            self.sleep.sleep(self.interval);
        }
    }
}
