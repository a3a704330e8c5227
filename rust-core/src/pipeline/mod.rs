//! Multi-channel PSD batch and plot-ready output

pub mod orchestrator;
pub mod series;

pub use orchestrator::{PipelineError, PsdPipeline};
pub use series::{ChannelFailure, ChannelOutcome, FailureReason, PipelineResult, PlotPoint, PsdSeries};
