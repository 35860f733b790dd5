//! Bounded, cancellable polling.
//!
//! Both readiness waits (tap interfaces appearing, controller devices
//! becoming available) are blocking sleep/retry loops with a wall-clock
//! budget. The caller can raise a [`CancelFlag`] from another thread; it is
//! checked between iterations, never in the middle of a probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Sleep time and timeout of the LINC-OE bring-up scripts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Poll interval and overall budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Upper bound on the number of probes this policy allows.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let steps = self.timeout.as_nanos() / self.interval.as_nanos();
        u32::try_from(steps).unwrap_or(u32::MAX - 1) + 1
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Probe until it yields a value, the budget runs out, or `cancel` is raised.
///
/// The budget advances by one interval after every unsuccessful probe,
/// whatever the reason the probe gave for not being ready.
pub fn poll_until<T, F>(what: &str, policy: &PollPolicy, cancel: &CancelFlag, mut probe: F) -> Result<T>
where
    F: FnMut(u32) -> Option<T>,
{
    let mut elapsed = Duration::ZERO;
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled { what: what.to_string() });
        }

        attempt += 1;
        if let Some(value) = probe(attempt) {
            debug!("{} ready after {} attempt(s)", what, attempt);
            return Ok(value);
        }

        if elapsed >= policy.timeout || attempt >= policy.max_attempts() {
            return Err(BridgeError::ReconciliationTimeout {
                what: what.to_string(),
                waited: elapsed,
            });
        }

        elapsed += policy.interval;
        std::thread::sleep(policy.interval);
    }
}
