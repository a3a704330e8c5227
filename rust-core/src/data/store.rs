//! Per-channel segment storage with gapless reads
//!
//! Segments are kept sorted by start time and may not overlap. A read over
//! `[T, T + N·interval)` first resolves to a [`Coverage`] verdict: either the
//! list of segment slices that tile the range, or the point where tiling
//! breaks. Only a contiguous verdict yields data.

use super::channel::EpochMillis;
use super::segment::Segment;
use thiserror::Error;

/// Relative tolerance when comparing sample intervals of adjacent segments
const INTERVAL_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Segment starting at {start}ms overlaps existing segment #{existing}")]
    Overlap { start: EpochMillis, existing: usize },

    #[error("Data gap at {at_ms}ms: {reason}")]
    Gap { at_ms: f64, reason: GapReason },

    #[error("Segment #{index} has not been loaded")]
    NotLoaded { index: usize },

    #[error("Segment #{index} expects {expected} samples, got {actual}")]
    SampleCountMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Why a range could not be tiled by stored segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// No segment covers the requested start time
    NoCoverage,
    /// The next segment starts later than the previous one ends
    Discontinuity,
    /// The next segment is sampled at a different rate
    IntervalMismatch,
    /// Data ends before the requested number of samples
    EndOfData,
}

impl std::fmt::Display for GapReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            GapReason::NoCoverage => "no segment covers the start time",
            GapReason::Discontinuity => "segments are not contiguous",
            GapReason::IntervalMismatch => "sample interval changes between segments",
            GapReason::EndOfData => "data ends before the requested sample count",
        };
        f.write_str(text)
    }
}

/// Slice of one segment contributing to a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSlice {
    /// Position of the segment in the store
    pub position: usize,
    /// First sample taken from the segment
    pub offset: usize,
    /// Number of samples taken
    pub len: usize,
}

/// Result of a coverage query
#[derive(Debug, Clone, PartialEq)]
pub enum Coverage {
    Contiguous(Vec<SegmentSlice>),
    Gap { at_ms: f64, reason: GapReason },
}

/// Ordered, non-overlapping segments for one channel
#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a segment, keeping time order
    ///
    /// Every segment's ordinal index is its position in time order, so
    /// segments after an out-of-order insert are renumbered.
    pub fn add_segment(&mut self, segment: Segment) -> Result<(), StoreError> {
        let pos = self
            .segments
            .partition_point(|s| s.start() < segment.start());

        let neighbours = pos.checked_sub(1).into_iter().chain(Some(pos));
        for i in neighbours {
            if let Some(existing) = self.segments.get(i) {
                if overlaps(existing, &segment) {
                    return Err(StoreError::Overlap {
                        start: segment.start(),
                        existing: existing.index(),
                    });
                }
            }
        }

        self.segments.insert(pos, segment);
        for (i, s) in self.segments.iter_mut().enumerate().skip(pos) {
            s.set_index(i);
        }
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Segment covering `time`, if any
    pub fn segment_at(&self, time: EpochMillis) -> Option<&Segment> {
        let first = self.segments.partition_point(|s| s.start() <= time);
        first
            .checked_sub(1)
            .map(|i| &self.segments[i])
            .filter(|s| s.covers(time))
    }

    /// Sample interval of the segment covering `time`
    pub fn interval_at(&self, time: EpochMillis) -> Option<f64> {
        self.segment_at(time).map(Segment::interval_ms)
    }

    /// Number of stored samples whose timestamps fall in `[start, end)`
    pub fn sample_count_in(&self, start: EpochMillis, end: EpochMillis) -> usize {
        self.segments
            .iter()
            .map(|s| {
                let first = index_at_or_after(s, start);
                let last = index_at_or_after(s, end);
                last.saturating_sub(first)
            })
            .sum()
    }

    /// Decide whether `sample_count` samples from `start` can be read without gaps
    pub fn coverage(&self, start: EpochMillis, sample_count: usize) -> Coverage {
        let first = self.segments.partition_point(|s| s.start() <= start);
        let Some(position) = first
            .checked_sub(1)
            .filter(|&i| self.segments[i].covers(start))
        else {
            return Coverage::Gap {
                at_ms: start as f64,
                reason: GapReason::NoCoverage,
            };
        };

        let segment = &self.segments[position];
        let interval = segment.interval_ms();
        let offset = ((start - segment.start()) as f64 / interval).floor() as usize;

        let mut slices = Vec::new();
        let mut remaining = sample_count;
        let mut position = position;
        let mut offset = offset.min(segment.sample_count());

        loop {
            let current = &self.segments[position];
            let take = remaining.min(current.sample_count() - offset);
            if take > 0 {
                slices.push(SegmentSlice {
                    position,
                    offset,
                    len: take,
                });
            }
            remaining -= take;
            if remaining == 0 {
                return Coverage::Contiguous(slices);
            }

            let expected = current.end_ms();
            let Some(next) = self.segments.get(position + 1) else {
                return Coverage::Gap {
                    at_ms: expected,
                    reason: GapReason::EndOfData,
                };
            };
            if (next.interval_ms() - interval).abs() > INTERVAL_TOLERANCE * interval {
                return Coverage::Gap {
                    at_ms: next.start() as f64,
                    reason: GapReason::IntervalMismatch,
                };
            }
            if (next.start() as f64 - expected).abs() > interval / 2.0 {
                return Coverage::Gap {
                    at_ms: expected,
                    reason: GapReason::Discontinuity,
                };
            }

            position += 1;
            offset = 0;
        }
    }

    /// Read exactly `sample_count` raw samples starting at `start`
    ///
    /// Fails with [`StoreError::Gap`] instead of returning partial or
    /// zero-filled data.
    pub fn read_gapless(
        &self,
        start: EpochMillis,
        sample_count: usize,
    ) -> Result<Vec<i32>, StoreError> {
        let slices = match self.coverage(start, sample_count) {
            Coverage::Contiguous(slices) => slices,
            Coverage::Gap { at_ms, reason } => return Err(StoreError::Gap { at_ms, reason }),
        };

        let mut out = Vec::with_capacity(sample_count);
        for slice in slices {
            let segment = &self.segments[slice.position];
            let samples = segment.samples().ok_or(StoreError::NotLoaded {
                index: segment.index(),
            })?;
            out.extend_from_slice(&samples[slice.offset..slice.offset + slice.len]);
        }
        Ok(out)
    }
}

/// First sample index of `segment` at or after `time`, clamped to its length
fn index_at_or_after(segment: &Segment, time: EpochMillis) -> usize {
    let k = ((time - segment.start()) as f64 / segment.interval_ms()).ceil();
    if k <= 0.0 {
        0
    } else {
        (k as usize).min(segment.sample_count())
    }
}

fn overlaps(a: &Segment, b: &Segment) -> bool {
    let tolerance = a.interval_ms().min(b.interval_ms()) / 2.0;
    (a.start() as f64) + tolerance < b.end_ms() && (b.start() as f64) + tolerance < a.end_ms()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn segment(start: EpochMillis, interval: f64, values: std::ops::Range<i32>) -> Segment {
        Segment::with_samples(start, interval, values.collect())
    }

    #[test]
    fn test_read_within_one_segment() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(0, 10.0, 0..100)).unwrap();

        assert_eq!(store.read_gapless(50, 5).unwrap(), vec![5, 6, 7, 8, 9]);
        assert_eq!(store.read_gapless(0, 100).unwrap().len(), 100);
    }

    #[test]
    fn test_read_stitches_contiguous_segments() {
        let mut store = SegmentStore::new();
        // Inserted out of order on purpose
        store.add_segment(segment(1_000, 10.0, 100..200)).unwrap();
        store.add_segment(segment(0, 10.0, 0..100)).unwrap();

        let data = store.read_gapless(900, 20).unwrap();
        assert_eq!(data, (90..110).collect::<Vec<_>>());
    }

    #[test]
    fn test_index_follows_time_order() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(2_000, 10.0, 0..10)).unwrap();
        store.add_segment(segment(0, 10.0, 0..10)).unwrap();
        store.add_segment(segment(1_000, 10.0, 0..10)).unwrap();

        let indices: Vec<usize> = store.segments().iter().map(Segment::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(store.segments()[2].start(), 2_000);
    }

    #[test]
    fn test_interval_at_picks_covering_segment() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(0, 10.0, 0..100)).unwrap();
        store.add_segment(segment(10_000, 20.0, 0..100)).unwrap();

        assert_eq!(store.interval_at(500), Some(10.0));
        assert_eq!(store.interval_at(10_000), Some(20.0));
        assert_eq!(store.interval_at(11_990), Some(20.0));
        assert_eq!(store.interval_at(5_000), None);
        assert_eq!(store.interval_at(12_000), None);
    }

    #[test]
    fn test_sample_count_in_range() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(0, 10.0, 0..30)).unwrap();
        store.add_segment(segment(1_000, 20.0, 0..50)).unwrap();

        assert_eq!(store.sample_count_in(0, 40_000), 80);
        assert_eq!(store.sample_count_in(0, 300), 30);
        assert_eq!(store.sample_count_in(5, 100), 9);
        assert_eq!(store.sample_count_in(250, 1_040), 7);
        assert_eq!(store.sample_count_in(400, 900), 0);
        assert_eq!(store.sample_count_in(-1_000, 0), 0);
    }

    #[test]
    fn test_gap_between_segments() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(0, 10.0, 0..100)).unwrap();
        store.add_segment(segment(1_500, 10.0, 150..200)).unwrap();

        assert_eq!(
            store.read_gapless(900, 20),
            Err(StoreError::Gap {
                at_ms: 1_000.0,
                reason: GapReason::Discontinuity
            })
        );
    }

    #[test]
    fn test_interval_mismatch_is_a_gap() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(0, 10.0, 0..100)).unwrap();
        store.add_segment(segment(1_000, 20.0, 0..100)).unwrap();

        assert!(matches!(
            store.coverage(500, 100),
            Coverage::Gap {
                reason: GapReason::IntervalMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_no_coverage_and_end_of_data() {
        let mut store = SegmentStore::new();
        assert!(matches!(
            store.read_gapless(0, 1),
            Err(StoreError::Gap { reason: GapReason::NoCoverage, .. })
        ));

        store.add_segment(segment(1_000, 10.0, 0..10)).unwrap();
        assert!(matches!(
            store.read_gapless(0, 1),
            Err(StoreError::Gap { reason: GapReason::NoCoverage, .. })
        ));
        assert!(matches!(
            store.read_gapless(1_050, 10),
            Err(StoreError::Gap { reason: GapReason::EndOfData, .. })
        ));
    }

    #[test]
    fn test_overlap_rejected() {
        let mut store = SegmentStore::new();
        store.add_segment(segment(0, 10.0, 0..100)).unwrap();

        assert_eq!(
            store.add_segment(segment(990, 10.0, 0..10)),
            Err(StoreError::Overlap {
                start: 990,
                existing: 0
            })
        );
        assert!(matches!(
            store.add_segment(segment(-50, 10.0, 0..10)),
            Err(StoreError::Overlap { .. })
        ));
        // Touching is fine
        store.add_segment(segment(1_000, 10.0, 0..10)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unloaded_segment() {
        let mut store = SegmentStore::new();
        store.add_segment(Segment::new(0, 10.0, 10)).unwrap();

        assert!(matches!(store.coverage(0, 10), Coverage::Contiguous(_)));
        assert_eq!(
            store.read_gapless(0, 10),
            Err(StoreError::NotLoaded { index: 0 })
        );
    }

    proptest! {
        #[test]
        fn prop_contiguous_reads_match_reference(
            lengths in prop::collection::vec(1usize..40, 1..6),
            start_frac in 0.0f64..1.0,
            count_frac in 0.0f64..1.0,
        ) {
            let interval = 10.0;
            let mut store = SegmentStore::new();
            let mut t = 0i64;
            let mut next_value = 0i32;
            for len in &lengths {
                let values: Vec<i32> = (next_value..next_value + *len as i32).collect();
                store.add_segment(Segment::with_samples(t, interval, values)).unwrap();
                t += (*len as f64 * interval) as i64;
                next_value += *len as i32;
            }

            let total = next_value as usize;
            let first = ((total - 1) as f64 * start_frac) as usize;
            let count = 1 + ((total - first - 1) as f64 * count_frac) as usize;

            let data = store.read_gapless(first as i64 * 10, count).unwrap();
            prop_assert_eq!(data, (first as i32..(first + count) as i32).collect::<Vec<_>>());

            // One sample past the end is always a gap
            let past = store.read_gapless(first as i64 * 10, total - first + 1);
            let is_gap = matches!(past, Err(StoreError::Gap { .. }));
            prop_assert!(is_gap);
        }
    }
}
