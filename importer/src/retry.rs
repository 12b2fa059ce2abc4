use std::time::Duration;

use log::{debug, warn};

use crate::backend::BatchWriter;
use crate::config::RetryPolicy;
use crate::convert::Point;

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// `initial * multiplier^n`, capped at the policy maximum.
    pub fn next_delay(&mut self) -> Duration {
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        self.attempt = self.attempt.saturating_add(1);

        let nanos = self.policy.initial_delay.as_nanos() as f64 * self.policy.multiplier.powi(exponent);
        let max = self.policy.max_delay;
        if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
            max
        } else {
            Duration::from_nanos(nanos.round() as u64)
        }
    }
}

/// Write `batch` until the backend accepts it, blocking the caller for as
/// long as that takes. Returns the number of write calls made.
pub async fn write_with_retry<W>(writer: &mut W, batch: &[Point], policy: &RetryPolicy) -> u32
where
    W: BatchWriter + ?Sized,
{
    let mut backoff = Backoff::new(policy.clone());
    let mut calls = 0u32;
    loop {
        calls = calls.saturating_add(1);
        match writer.write_batch(batch).await {
            Ok(()) => {
                debug!("wrote batch of {} points after {} call(s)", batch.len(), calls);
                return calls;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!("Write failed: {:#} (retrying in {:?})", e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
