//! Channel data: segments, gapless reads and remote retrieval

pub mod channel;
pub mod segment;
pub mod store;
pub mod fetch;

pub use channel::{ChannelData, ChannelId, EpochMillis, TimeRange};
pub use segment::Segment;
pub use store::{Coverage, GapReason, SegmentSlice, SegmentStore, StoreError};
pub use fetch::{CachedBlock, DataBlock, FetchRequest, RemoteFetcher, ServiceError, TimeSeriesService};
