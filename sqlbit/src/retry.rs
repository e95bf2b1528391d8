use std::thread;
use std::time::Duration;

/// Bounded retry of contention failures; the delay doubles after every failed attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self { attempts: 1, delay: Duration::ZERO }
    }

    /// `retries` extra attempts after the first one.
    pub const fn new(retries: usize, delay: Duration) -> Self {
        Self { attempts: retries + 1, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

pub fn retry_with_delay<F, R, T, E>(attempts: usize, delay: Duration, mut op: F, retryable: R) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    assert!(attempts >= 1);
    let mut left = attempts;
    let mut backoff = delay;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if left > 1 && retryable(&e) => {
                left -= 1;
                crate::warn!("attempt {} of {} hit contention, retrying in {:?}", attempts - left, attempts, backoff);
                thread::sleep(backoff);
                backoff = backoff.saturating_mul(2);
            }
            Err(e) => return Err(e),
        }
    }
}
