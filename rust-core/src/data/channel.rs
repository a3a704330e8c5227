//! Channel identity and analysis time ranges

use super::store::SegmentStore;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Milliseconds since the Unix epoch
pub type EpochMillis = i64;

/// SEED-style channel identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl ChannelId {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
        }
    }

    /// Display name used as the series key, e.g. `IU.ANMO.00.BHZ`
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

/// Half-open time range `[start, end)` in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: EpochMillis,
    pub end: EpochMillis,
}

impl TimeRange {
    pub fn new(start: EpochMillis, end: EpochMillis) -> Self {
        Self { start, end }
    }

    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start.timestamp_millis(), end.timestamp_millis())
    }

    /// Span in milliseconds (zero when inverted)
    pub fn span_ms(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    /// Number of whole samples of `interval_ms` that fit in the range
    pub fn sample_count(&self, interval_ms: f64) -> usize {
        if interval_ms <= 0.0 {
            return 0;
        }
        (self.span_ms() as f64 / interval_ms).floor() as usize
    }

    pub fn start_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.start).single()
    }

    pub fn end_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.end).single()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_datetime(), self.end_datetime()) {
            (Some(s), Some(e)) => write!(f, "{} - {}", s.to_rfc3339(), e.to_rfc3339()),
            _ => write!(f, "{}ms - {}ms", self.start, self.end),
        }
    }
}

/// A channel together with the data loaded for it
#[derive(Debug)]
pub struct ChannelData {
    pub id: ChannelId,
    pub store: SegmentStore,
}

impl ChannelData {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            store: SegmentStore::new(),
        }
    }

    pub fn name(&self) -> String {
        self.id.name()
    }

    /// Stored samples that fall inside `range` (0 without data)
    pub fn data_length(&self, range: &TimeRange) -> usize {
        self.store.sample_count_in(range.start, range.end)
    }
}
