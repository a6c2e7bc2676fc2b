use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

// ============================================================================
// Read-After-Write Poller
// ============================================================================
//
// Bridges an asynchronous command with an eventually-consistent read model:
// keeps reading the projection until it satisfies the caller's predicate or
// the deadline passes.
//
// - Timing out is NOT an error: it means "not visible yet".
// - Sleeping between reads is a tokio sleep, so only the calling task waits.
// - Dropping the returned future (request aborted, outer timeout) stops the
//   loop at the next await point; no further reads are issued.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct PollProfile {
    /// Label used in logs and metrics
    pub name: &'static str,
    /// Total time budget for the wait
    pub max_wait: Duration,
    /// Delay between two reads
    pub interval: Duration,
}

impl PollProfile {
    pub fn new(name: &'static str, max_wait: Duration, interval: Duration) -> Self {
        Self {
            name,
            max_wait,
            interval,
        }
    }

    /// Waiting for the seat reservation to be reflected in the draft order
    pub fn reservation() -> Self {
        Self::new("reservation", Duration::from_secs(5), Duration::from_millis(500))
    }

    /// Waiting for the priced order; pricing follows the reservation closely
    pub fn pricing() -> Self {
        Self::new("pricing", Duration::from_secs(1), Duration::from_millis(300))
    }
}

/// Result of a poll
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// An accepted value was read
    Found {
        value: T,
        attempts: u32,
        elapsed: Duration,
    },
    /// The deadline passed without an accepted value
    TimedOut { attempts: u32, elapsed: Duration },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Found { attempts, .. } | PollOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Found { elapsed, .. } | PollOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PollOutcome::Found { .. })
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            PollOutcome::Found { value, .. } => Some(value),
            PollOutcome::TimedOut { .. } => None,
        }
    }
}

/// Read until `accept` holds for a present value, or until `profile.max_wait`
/// elapses.
///
/// The lookup runs at least once. Errors from the lookup abort the poll and
/// are returned as-is; an absent value just means "keep waiting".
pub async fn poll_until<F, Fut, T, E, P>(
    profile: &PollProfile,
    mut lookup: F,
    accept: P,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let deadline = started + profile.max_wait;
    let mut attempts = 0;

    loop {
        attempts += 1;

        if let Some(value) = lookup().await? {
            if accept(&value) {
                tracing::debug!(
                    profile = profile.name,
                    attempts = attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Read model caught up"
                );
                return Ok(PollOutcome::Found {
                    value,
                    attempts,
                    elapsed: started.elapsed(),
                });
            }
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }

        tracing::debug!(
            profile = profile.name,
            attempt = attempts,
            delay_ms = profile.interval.as_millis() as u64,
            "Read model not caught up yet, polling again"
        );

        // Never sleep past the deadline
        sleep(profile.interval.min(deadline - now)).await;
    }

    tracing::warn!(
        profile = profile.name,
        attempts = attempts,
        max_wait_ms = profile.max_wait.as_millis() as u64,
        "Read model did not catch up before the deadline"
    );

    Ok(PollOutcome::TimedOut {
        attempts,
        elapsed: started.elapsed(),
    })
}
