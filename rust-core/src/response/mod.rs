//! Instrument response lookup on the PSD frequency grid

pub mod grid;

pub use grid::{pad_length, FrequencyGrid};

use crate::data::{ChannelId, EpochMillis};
use num_complex::Complex64;
use thiserror::Error;

/// Failure reported by a response source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("No response found for {channel}")]
    NotFound { channel: String },

    #[error("Response I/O error: {0}")]
    Io(String),

    #[error("Response has {actual} points, expected {expected}")]
    PointCount { expected: usize, actual: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Response unavailable for {channel}: {source}")]
    ResponseUnavailable {
        channel: String,
        #[source]
        source: ResponseError,
    },
}

/// Complex response values aligned 1:1 with a [`FrequencyGrid`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCurve {
    grid: FrequencyGrid,
    values: Vec<Complex64>,
}

impl ResponseCurve {
    pub fn new(grid: FrequencyGrid, values: Vec<Complex64>) -> Self {
        Self { grid, values }
    }

    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    pub fn values(&self) -> &[Complex64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// |R(f_k)|²
    pub fn magnitude_squared(&self, k: usize) -> Option<f64> {
        self.values.get(k).map(|r| r.norm_sqr())
    }
}

/// External response service
///
/// Returns `num_points` complex values evenly spaced over
/// `[start_freq, end_freq]` for the calibration in effect at `start`.
pub trait ResponseProvider {
    fn get_response(
        &self,
        channel: &ChannelId,
        start: EpochMillis,
        start_freq: f64,
        end_freq: f64,
        num_points: usize,
    ) -> Result<Vec<Complex64>, ResponseError>;
}

/// Anything that can produce a response curve for a channel and grid
///
/// The PSD stage only depends on this, so file-based, cached or remote
/// sources can be swapped without touching the estimator.
pub trait ResolveResponse {
    fn resolve(
        &self,
        channel: &ChannelId,
        window_start: EpochMillis,
        grid: &FrequencyGrid,
    ) -> Result<ResponseCurve, ResolveError>;
}

/// Resolves curves through a [`ResponseProvider`]
pub struct ResponseResolver<P> {
    provider: P,
}

impl<P: ResponseProvider> ResponseResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: ResponseProvider> ResolveResponse for ResponseResolver<P> {
    fn resolve(
        &self,
        channel: &ChannelId,
        window_start: EpochMillis,
        grid: &FrequencyGrid,
    ) -> Result<ResponseCurve, ResolveError> {
        let unavailable = |source| ResolveError::ResponseUnavailable {
            channel: channel.name(),
            source,
        };

        let values = self
            .provider
            .get_response(channel, window_start, 0.0, grid.end_freq, grid.pad_length)
            .map_err(unavailable)?;

        if values.len() != grid.pad_length {
            return Err(unavailable(ResponseError::PointCount {
                expected: grid.pad_length,
                actual: values.len(),
            }));
        }

        Ok(ResponseCurve::new(*grid, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Flat unit response for every channel except `missing`
    struct FlatProvider {
        missing: &'static str,
        calls: RefCell<Vec<(f64, f64, usize)>>,
    }

    impl ResponseProvider for FlatProvider {
        fn get_response(
            &self,
            channel: &ChannelId,
            _start: EpochMillis,
            start_freq: f64,
            end_freq: f64,
            num_points: usize,
        ) -> Result<Vec<Complex64>, ResponseError> {
            self.calls.borrow_mut().push((start_freq, end_freq, num_points));
            if channel.channel == self.missing {
                return Err(ResponseError::NotFound {
                    channel: channel.name(),
                });
            }
            Ok(vec![Complex64::new(1.0, 0.0); num_points])
        }
    }

    #[test]
    fn test_resolve_requests_grid_range() {
        let resolver = ResponseResolver::new(FlatProvider {
            missing: "LHZ",
            calls: RefCell::new(Vec::new()),
        });
        let grid = FrequencyGrid::new(25.0, 4_000);
        let channel = ChannelId::new("IU", "ANMO", "00", "BHZ");

        let curve = resolver.resolve(&channel, 0, &grid).unwrap();

        assert_eq!(curve.len(), 1024);
        assert_eq!(curve.magnitude_squared(3), Some(1.0));
        let calls = resolver.provider().calls.borrow();
        assert_eq!(calls.as_slice(), &[(0.0, grid.end_freq, 1024)]);
    }

    #[test]
    fn test_missing_response_is_unavailable() {
        let resolver = ResponseResolver::new(FlatProvider {
            missing: "LHZ",
            calls: RefCell::new(Vec::new()),
        });
        let grid = FrequencyGrid::new(1000.0, 400);
        let channel = ChannelId::new("IU", "ANMO", "00", "LHZ");

        let err = resolver.resolve(&channel, 0, &grid).unwrap_err();
        assert_eq!(
            err,
            ResolveError::ResponseUnavailable {
                channel: "IU.ANMO.00.LHZ".to_string(),
                source: ResponseError::NotFound {
                    channel: "IU.ANMO.00.LHZ".to_string()
                },
            }
        );
    }

    #[test]
    fn test_wrong_point_count_rejected() {
        struct Short;
        impl ResponseProvider for Short {
            fn get_response(
                &self,
                _: &ChannelId,
                _: EpochMillis,
                _: f64,
                _: f64,
                _: usize,
            ) -> Result<Vec<Complex64>, ResponseError> {
                Ok(vec![Complex64::new(1.0, 0.0); 3])
            }
        }

        let resolver = ResponseResolver::new(Short);
        let grid = FrequencyGrid::new(10.0, 400);
        let err = resolver
            .resolve(&ChannelId::new("XX", "TEST", "", "HHZ"), 0, &grid)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ResponseUnavailable {
                source: ResponseError::PointCount { expected: 128, actual: 3 },
                ..
            }
        ));
    }
}
