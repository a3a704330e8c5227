//! Seismic PSD - Power Spectral Density Pipeline Core
//! 
//! Gapless trace retrieval, instrument response lookup and parallel Welch
//! PSD estimation for seismic channels, with optional Python bindings.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![allow(non_local_definitions)]

pub mod config;
pub mod data;
pub mod response;
pub mod spectrum;
pub mod pipeline;
#[cfg(feature = "python")]
pub mod python_bindings;

pub use config::PipelineConfig;
pub use data::{ChannelData, ChannelId, RemoteFetcher, SegmentStore, TimeRange};
pub use response::{FrequencyGrid, ResponseCurve, ResponseResolver};
pub use spectrum::{FftEngine, PsdEstimator, WindowType};
pub use pipeline::{PipelineResult, PsdPipeline, PsdSeries};
