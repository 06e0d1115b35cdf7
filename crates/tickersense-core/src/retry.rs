//! Bounded retry with a fixed delay between attempts.
//!
//! The delay is awaited through a [`Sleeper`] so tests can observe the
//! schedule without waiting in real time.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

/// Bounded retry policy: at most `max_attempts` calls, `delay` between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt and no delay.
    pub const fn no_retry() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Attempts actually made; a zero budget still makes one call.
    pub const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// `operation` receives the zero-based attempt number. The delay is
    /// applied between attempts only, never after the last failure. Returns
    /// every error observed, in order, when all attempts fail.
    pub async fn run<T, E, F, Fut>(&self, sleeper: &dyn Sleeper, operation: F) -> Result<T, Vec<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(sleeper, |_| true, operation).await
    }

    /// Like [`RetryPolicy::run`], but stops early on an error for which
    /// `should_retry` returns false.
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        sleeper: &dyn Sleeper,
        should_retry: P,
        mut operation: F,
    ) -> Result<T, Vec<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let attempts = self.attempts();
        let mut errors = Vec::with_capacity(attempts as usize);

        for attempt in 0..attempts {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retry = should_retry(&error);
                    errors.push(error);
                    if !retry {
                        debug!(attempt, "error is not retryable; giving up");
                        break;
                    }
                    if attempt + 1 < attempts {
                        debug!(attempt, delay_ms = self.delay.as_millis() as u64, "retrying after failed attempt");
                        sleeper.sleep(self.delay).await;
                    }
                }
            }
        }

        Err(errors)
    }
}

/// Pause abstraction used between retry attempts.
pub trait Sleeper: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Real-time sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Sleeper that returns immediately and records every requested pause.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses
            .lock()
            .map(|pauses| pauses.clone())
            .unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
        Box::pin(async {})
    }
}
