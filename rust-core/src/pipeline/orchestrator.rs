//! Batch PSD computation across channels
//!
//! Two phases. Responses are resolved one channel at a time on the calling
//! thread, since response sources are not safe to drive concurrently. PSDs
//! are then computed on a worker pool, one task per channel, each appending
//! to a shared collection. Results are sorted by channel name afterwards so
//! output order never depends on task completion order.

use super::series::{ChannelFailure, FailureReason, PipelineResult, PsdSeries};
use crate::config::PipelineConfig;
use crate::data::{ChannelData, GapReason, StoreError, TimeRange};
use crate::response::{FrequencyGrid, ResolveResponse, ResponseCurve};
use crate::spectrum::{EstimatorConfig, PsdEstimator};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Please select channels")]
    NoChannelsSelected,

    #[error("{channel} is selected more than once")]
    DuplicateChannel { channel: String },

    #[error("{channel} contains {available} samples in the selected range, at least {required} are needed. Please select a longer dataset.")]
    InsufficientSamples {
        channel: String,
        available: usize,
        required: usize,
    },

    #[error("No channel produced a PSD ({})", join_failures(.failures))]
    NoUsableChannels { failures: Vec<ChannelFailure> },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn join_failures(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A channel whose response resolved, ready for estimation
struct PsdJob<'a> {
    channel: &'a ChannelData,
    interval_ms: f64,
    trace_length: usize,
    response: ResponseCurve,
}

/// Runs response resolution and PSD estimation over a set of channels
pub struct PsdPipeline<R> {
    resolver: R,
    estimator: PsdEstimator,
    max_period_s: f64,
    pool: rayon::ThreadPool,
}

impl<R: ResolveResponse> PsdPipeline<R> {
    pub fn new(resolver: R, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.pipeline.worker_threads)
            .thread_name(|i| format!("psd-worker-{}", i))
            .build()?;

        let estimator = PsdEstimator::new(EstimatorConfig {
            window_type: config.psd.window,
            min_samples: config.psd.min_samples,
        });

        Ok(Self {
            resolver,
            estimator,
            max_period_s: config.psd.max_period_s,
            pool,
        })
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn estimator(&self) -> &PsdEstimator {
        &self.estimator
    }

    /// Compute PSD series for `channels` over `range`
    ///
    /// Channels without data, without a response, or with gaps are reported
    /// in the result and do not stop the others. Fails only on bad input or
    /// when no channel yields a series.
    pub fn run(
        &self,
        channels: &[ChannelData],
        range: TimeRange,
    ) -> Result<PipelineResult, PipelineError> {
        self.check_preconditions(channels, &range)?;

        let mut failures = Vec::new();
        let mut response_not_found = Vec::new();
        let jobs = self.resolve_responses(channels, range, &mut failures, &mut response_not_found);

        let started = Instant::now();
        let (mut series, psd_failures) = self.compute(&jobs, range);
        tracing::info!(
            "PSD calculation duration = {:.3} sec ({} channels)",
            started.elapsed().as_secs_f64(),
            jobs.len()
        );
        failures.extend(psd_failures);

        series.sort_by(|a, b| a.name.cmp(&b.name));
        failures.sort_by(|a, b| a.channel.cmp(&b.channel));

        if series.is_empty() {
            return Err(PipelineError::NoUsableChannels { failures });
        }
        if !response_not_found.is_empty() {
            tracing::warn!(
                "Error attempting to load responses for these channels: {}",
                response_not_found.join(", ")
            );
        }

        Ok(PipelineResult::new(series, failures, response_not_found))
    }

    fn check_preconditions(
        &self,
        channels: &[ChannelData],
        range: &TimeRange,
    ) -> Result<(), PipelineError> {
        if channels.is_empty() {
            return Err(PipelineError::NoChannelsSelected);
        }

        let mut seen = HashSet::with_capacity(channels.len());
        for channel in channels {
            if !seen.insert(&channel.id) {
                return Err(PipelineError::DuplicateChannel {
                    channel: channel.name(),
                });
            }
        }

        let required = self.estimator.min_samples();
        for channel in channels.iter().filter(|c| !c.store.is_empty()) {
            let available = channel.data_length(range);
            if available < required {
                return Err(PipelineError::InsufficientSamples {
                    channel: channel.name(),
                    available,
                    required,
                });
            }
        }
        Ok(())
    }

    /// Phase one: sequential response lookup
    fn resolve_responses<'a>(
        &self,
        channels: &'a [ChannelData],
        range: TimeRange,
        failures: &mut Vec<ChannelFailure>,
        response_not_found: &mut Vec<String>,
    ) -> Vec<PsdJob<'a>> {
        let mut jobs = Vec::with_capacity(channels.len());

        for channel in channels {
            if channel.store.is_empty() {
                tracing::warn!("No data loaded for {}", channel.id);
                failures.push(ChannelFailure {
                    channel: channel.name(),
                    reason: FailureReason::NoData,
                });
                continue;
            }

            // The grid, the read and the estimate all use the rate at the range start
            let Some(interval_ms) = channel.store.interval_at(range.start) else {
                let gap = StoreError::Gap {
                    at_ms: range.start as f64,
                    reason: GapReason::NoCoverage,
                };
                tracing::warn!("{}: {}", channel.id, gap);
                failures.push(ChannelFailure {
                    channel: channel.name(),
                    reason: FailureReason::Gap(gap.to_string()),
                });
                continue;
            };

            let trace_length = range.sample_count(interval_ms);
            let grid = FrequencyGrid::new(interval_ms, trace_length);

            match self.resolver.resolve(&channel.id, range.start, &grid) {
                Ok(response) => jobs.push(PsdJob {
                    channel,
                    interval_ms,
                    trace_length,
                    response,
                }),
                Err(e) => {
                    tracing::warn!("{}", e);
                    response_not_found.push(channel.name());
                    failures.push(ChannelFailure {
                        channel: channel.name(),
                        reason: FailureReason::ResponseNotFound(e.to_string()),
                    });
                }
            }
        }

        jobs
    }

    /// Phase two: one pool task per channel
    fn compute(&self, jobs: &[PsdJob<'_>], range: TimeRange) -> (Vec<PsdSeries>, Vec<ChannelFailure>) {
        let series = Mutex::new(Vec::with_capacity(jobs.len()));
        let failures = Mutex::new(Vec::new());
        let estimator = &self.estimator;
        let max_period_s = self.max_period_s;

        self.pool.scope(|s| {
            for job in jobs {
                let series = &series;
                let failures = &failures;
                s.spawn(move |_| match estimate_channel(estimator, job, range, max_period_s) {
                    Ok(result) => {
                        if let Ok(mut guard) = series.lock() {
                            guard.push(result);
                        }
                    }
                    Err(reason) => {
                        tracing::error!("PSD failed for {}: {}", job.channel.id, reason);
                        if let Ok(mut guard) = failures.lock() {
                            guard.push(ChannelFailure {
                                channel: job.channel.name(),
                                reason,
                            });
                        }
                    }
                });
            }
        });

        (
            series.into_inner().unwrap_or_else(PoisonError::into_inner),
            failures.into_inner().unwrap_or_else(PoisonError::into_inner),
        )
    }
}

fn estimate_channel(
    estimator: &PsdEstimator,
    job: &PsdJob<'_>,
    range: TimeRange,
    max_period_s: f64,
) -> Result<PsdSeries, FailureReason> {
    let counts = job
        .channel
        .store
        .read_gapless(range.start, job.trace_length)
        .map_err(|e| FailureReason::Gap(e.to_string()))?;
    let samples: Vec<f64> = counts.iter().map(|&c| f64::from(c)).collect();

    let estimate = estimator
        .estimate(&samples, job.interval_ms, &job.response)
        .map_err(|e| FailureReason::Estimate(e.to_string()))?;

    Ok(PsdSeries::from_estimate(job.channel.name(), &estimate, max_period_s))
}
