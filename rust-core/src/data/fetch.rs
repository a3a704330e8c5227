//! Remote time-series retrieval
//!
//! One service call per channel and time range. The returned block is cached
//! and exposed as a single segment anchored at the request start.

use super::channel::{ChannelData, ChannelId, EpochMillis, TimeRange};
use super::segment::Segment;
use super::store::StoreError;
use crate::config::DataServiceConfig;
use chrono::{TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode data: {0}")]
    Codec(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Parameters of a single data-service query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub channel: ChannelId,
    pub start: EpochMillis,
    pub end: EpochMillis,
}

impl FetchRequest {
    pub fn new(service: &DataServiceConfig, channel: &ChannelId, range: TimeRange) -> Self {
        Self {
            protocol: service.protocol.clone(),
            host: service.host.clone(),
            path: service.path.clone(),
            channel: channel.clone(),
            start: range.start,
            end: range.end,
        }
    }

    /// FDSN dataselect query URL for this request
    pub fn query_url(&self) -> String {
        let location = if self.channel.location.trim().is_empty() {
            "--"
        } else {
            self.channel.location.as_str()
        };
        format!(
            "{}://{}{}?net={}&sta={}&loc={}&cha={}&starttime={}&endtime={}",
            self.protocol,
            self.host,
            self.path,
            self.channel.network,
            self.channel.station,
            location,
            self.channel.channel,
            format_time(self.start),
            format_time(self.end),
        )
    }
}

fn format_time(ms: EpochMillis) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(t) => t.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        None => ms.to_string(),
    }
}

/// Decoded samples and their spacing
#[derive(Debug, Clone, PartialEq)]
pub struct DataBlock {
    pub samples: Vec<f64>,
    pub interval_ms: f64,
}

/// External time-series service
pub trait TimeSeriesService {
    fn fetch(&self, request: &FetchRequest) -> Result<DataBlock, ServiceError>;
}

impl<F> TimeSeriesService for F
where
    F: Fn(&FetchRequest) -> Result<DataBlock, ServiceError>,
{
    fn fetch(&self, request: &FetchRequest) -> Result<DataBlock, ServiceError> {
        self(request)
    }
}

/// Block returned by one fetch, kept so segments can load from it
#[derive(Debug, Clone)]
pub struct CachedBlock {
    start: EpochMillis,
    block: DataBlock,
}

impl CachedBlock {
    pub fn new(start: EpochMillis, block: DataBlock) -> Self {
        Self { start, block }
    }

    pub fn interval_ms(&self) -> f64 {
        self.block.interval_ms
    }

    pub fn len(&self) -> usize {
        self.block.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.samples.is_empty()
    }

    /// Segment spanning the whole block, not yet loaded
    pub fn segment(&self) -> Segment {
        Segment::new(self.start, self.block.interval_ms, self.len())
    }

    /// Populate `segment` with its slice of the cached block
    pub fn load(&self, segment: &Segment) -> Result<(), StoreError> {
        let offset =
            ((segment.start() - self.start) as f64 / self.block.interval_ms).floor() as usize;
        let end = offset + segment.sample_count();
        let Some(values) = self.block.samples.get(offset..end) else {
            return Err(StoreError::SampleCountMismatch {
                index: segment.index(),
                expected: segment.sample_count(),
                actual: self.len().saturating_sub(offset),
            });
        };
        segment.load(values.iter().map(|&v| v as i32).collect())
    }
}

/// Fetches channel data through a [`TimeSeriesService`]
pub struct RemoteFetcher<S> {
    config: DataServiceConfig,
    service: S,
}

impl<S: TimeSeriesService> RemoteFetcher<S> {
    pub fn new(config: DataServiceConfig, service: S) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &DataServiceConfig {
        &self.config
    }

    /// Perform the service call for one channel
    pub fn fetch(&self, channel: &ChannelId, range: TimeRange) -> Result<CachedBlock, ServiceError> {
        let request = FetchRequest::new(&self.config, channel, range);
        tracing::debug!("Fetching {}", request.query_url());

        let block = self.service.fetch(&request)?;
        if block.interval_ms.is_nan() || block.interval_ms <= 0.0 {
            return Err(ServiceError::Protocol(format!(
                "invalid sample interval {}ms",
                block.interval_ms
            )));
        }
        tracing::debug!("Expected sample count: {}", block.samples.len());

        Ok(CachedBlock::new(range.start, block))
    }

    /// Fetch and store one segment for `channel`
    ///
    /// Failures are logged and leave the store untouched. Returns whether a
    /// segment was added.
    pub fn populate(&self, channel: &mut ChannelData, range: TimeRange) -> bool {
        let cached = match self.fetch(&channel.id, range) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::error!("Fetch failed for {}: {}", channel.id, e);
                return false;
            }
        };
        if cached.is_empty() {
            tracing::warn!("Service returned no samples for {}", channel.id);
            return false;
        }

        let segment = cached.segment();
        let added = cached
            .load(&segment)
            .and_then(|_| channel.store.add_segment(segment));
        match added {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Could not store data for {}: {}", channel.id, e);
                false
            }
        }
    }

    /// Build a channel from a single fetch; the store is empty on failure
    pub fn fetch_channel(&self, id: ChannelId, range: TimeRange) -> ChannelData {
        let mut channel = ChannelData::new(id);
        self.populate(&mut channel, range);
        channel
    }
}
