//! Contiguous block of evenly sampled data

use super::channel::EpochMillis;
use super::store::StoreError;
use std::sync::OnceLock;

/// One evenly sampled run of data
///
/// The time span is fixed at construction; samples are attached later by
/// [`Segment::load`] and never change afterwards.
#[derive(Debug)]
pub struct Segment {
    /// Time of the first sample
    start: EpochMillis,

    /// Nominal sample interval in milliseconds
    interval_ms: f64,

    /// Number of samples the segment covers
    sample_count: usize,

    /// Ordinal position within the owning store
    index: usize,

    /// Raw counts, populated on first load
    samples: OnceLock<Vec<i32>>,
}

impl Segment {
    pub fn new(start: EpochMillis, interval_ms: f64, sample_count: usize) -> Self {
        Self {
            start,
            interval_ms,
            sample_count,
            index: 0,
            samples: OnceLock::new(),
        }
    }

    /// Create and load in one step
    pub fn with_samples(
        start: EpochMillis,
        interval_ms: f64,
        samples: Vec<i32>,
    ) -> Self {
        let segment = Self::new(start, interval_ms, samples.len());
        let _ = segment.samples.set(samples);
        segment
    }

    /// Attach sample data
    ///
    /// Fails if the length disagrees with the declared sample count.
    /// Loading an already loaded segment is a no-op.
    pub fn load(&self, samples: Vec<i32>) -> Result<(), StoreError> {
        if samples.len() != self.sample_count {
            return Err(StoreError::SampleCountMismatch {
                index: self.index,
                expected: self.sample_count,
                actual: samples.len(),
            });
        }
        let _ = self.samples.set(samples);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.samples.get().is_some()
    }

    pub fn samples(&self) -> Option<&[i32]> {
        self.samples.get().map(Vec::as_slice)
    }

    pub fn start(&self) -> EpochMillis {
        self.start
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Exclusive end time: start + count * interval
    pub fn end_ms(&self) -> f64 {
        self.start as f64 + self.sample_count as f64 * self.interval_ms
    }

    /// Whether `time` falls inside `[start, end)`
    pub fn covers(&self, time: EpochMillis) -> bool {
        time >= self.start && (time as f64) < self.end_ms()
    }
}
