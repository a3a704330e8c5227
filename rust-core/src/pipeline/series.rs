//! Plot-ready PSD series and batch results

use crate::spectrum::PsdEstimate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One (period, power) point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    /// Period in seconds
    pub period_s: f64,
    /// Power in dB
    pub power_db: f64,
}

/// PSD of one channel, keyed by channel name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsdSeries {
    pub name: String,
    pub points: Vec<PlotPoint>,
}

impl PsdSeries {
    /// Convert an estimate to (period, dB) points
    ///
    /// DC, periods at or above `max_period_s` and bins with no finite dB
    /// value (zero power, zero response) are left out.
    pub fn from_estimate(name: impl Into<String>, estimate: &PsdEstimate, max_period_s: f64) -> Self {
        let grid = estimate.grid();
        let points = estimate
            .psd()
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(k, p)| {
                let period_s = 1.0 / grid.frequency(k);
                if period_s >= max_period_s {
                    return None;
                }
                let power_db = 10.0 * p.norm().log10();
                power_db.is_finite().then_some(PlotPoint { period_s, power_db })
            })
            .collect();

        Self {
            name: name.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Why a channel has no series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Nothing was loaded for the channel
    NoData,
    /// The response source had no curve for it
    ResponseNotFound(String),
    /// The requested range is not covered gaplessly
    Gap(String),
    /// Estimation itself failed
    Estimate(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoData => write!(f, "no data"),
            FailureReason::ResponseNotFound(msg) => write!(f, "response not found: {}", msg),
            FailureReason::Gap(msg) => write!(f, "{}", msg),
            FailureReason::Estimate(msg) => write!(f, "PSD failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: String,
    pub reason: FailureReason,
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.channel, self.reason)
    }
}

/// What happened to one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelOutcome<'a> {
    Series(&'a PsdSeries),
    Unavailable(&'a FailureReason),
}

/// Output of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    series: Vec<PsdSeries>,
    failures: Vec<ChannelFailure>,
    response_not_found: Vec<String>,
}

impl PipelineResult {
    pub(crate) fn new(
        series: Vec<PsdSeries>,
        failures: Vec<ChannelFailure>,
        response_not_found: Vec<String>,
    ) -> Self {
        Self {
            series,
            failures,
            response_not_found,
        }
    }

    /// Series sorted by channel name
    pub fn series(&self) -> &[PsdSeries] {
        &self.series
    }

    pub fn into_series(self) -> Vec<PsdSeries> {
        self.series
    }

    /// Every channel excluded from the output, sorted by name
    pub fn failures(&self) -> &[ChannelFailure] {
        &self.failures
    }

    /// Channels whose response could not be resolved, in input order
    pub fn response_not_found(&self) -> &[String] {
        &self.response_not_found
    }

    pub fn outcome(&self, channel: &str) -> Option<ChannelOutcome<'_>> {
        if let Some(series) = self.series.iter().find(|s| s.name == channel) {
            return Some(ChannelOutcome::Series(series));
        }
        self.failures
            .iter()
            .find(|f| f.channel == channel)
            .map(|f| ChannelOutcome::Unavailable(&f.reason))
    }

    /// Outcome of every channel keyed by name
    pub fn outcomes(&self) -> BTreeMap<&str, ChannelOutcome<'_>> {
        let mut map = BTreeMap::new();
        for f in &self.failures {
            map.insert(f.channel.as_str(), ChannelOutcome::Unavailable(&f.reason));
        }
        for s in &self.series {
            map.insert(s.name.as_str(), ChannelOutcome::Series(s));
        }
        map
    }

    /// User-facing warning listing channels without a response
    pub fn warning(&self) -> Option<String> {
        if self.response_not_found.is_empty() {
            return None;
        }
        Some(format!(
            "Error attempting to load responses for these channels: {}",
            self.response_not_found.join(", ")
        ))
    }
}
