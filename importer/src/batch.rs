use chrono::Utc;
use log::info;

use crate::backend::BatchWriter;
use crate::config::RetryPolicy;
use crate::convert::Point;
use crate::retry::write_with_retry;

/// Collects points and hands full batches to the backend. The partial
/// remainder is written by a final [`flush`](BatchAccumulator::flush).
pub struct BatchAccumulator<W> {
    writer: W,
    batch: Vec<Point>,
    batch_size: usize,
    retry: RetryPolicy,
    total: u64,
    batches: u64,
}

impl<W: BatchWriter> BatchAccumulator<W> {
    pub fn new(writer: W, batch_size: usize, retry: RetryPolicy) -> Self {
        Self {
            writer,
            batch: Vec::new(),
            batch_size,
            retry,
            total: 0,
            batches: 0,
        }
    }

    pub async fn append(&mut self, point: Point) {
        self.batch.push(point);
        self.total += 1;
        if self.batch.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// Write the current batch, retrying until it is accepted.
    pub async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        // Stamp once so every retry sends the same points
        let now = Utc::now();
        for point in &mut self.batch {
            point.timestamp.get_or_insert(now);
        }

        write_with_retry(&mut self.writer, &self.batch, &self.retry).await;
        self.batches += 1;
        info!(
            "Flushed batch #{} ({} points, {} total)",
            self.batches,
            self.batch.len(),
            self.total
        );
        self.batch = Vec::new();
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }
}
