//! Welch power spectral density with instrument deconvolution
//!
//! The trace is cut into windows a quarter of its length, stepping by a
//! quarter window (75% overlap). Each window is demeaned, detrended, tapered
//! and zero-padded to the grid's pad length before the FFT. Squared
//! magnitudes are averaged across windows, scaled to a one-sided density and
//! divided by |R(f)|² of the instrument response.

use super::fft::{FftEngine, FftError};
use super::windowing::{apply_window_inplace, demean, detrend};
use super::windows::WindowType;
use crate::response::{FrequencyGrid, ResponseCurve};
use num_complex::Complex64;
use thiserror::Error;

/// Shortest trace the estimator accepts by default
pub const MIN_SAMPLES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    #[error("Trace contains {available} samples, at least {required} are needed")]
    InsufficientSamples { available: usize, required: usize },

    #[error("Invalid sample interval: {0}ms")]
    InvalidInterval(f64),

    #[error("Response grid has pad length {actual}, expected {expected}")]
    GridMismatch { expected: usize, actual: usize },

    #[error("Response has {actual} points, at least {required} are needed")]
    ResponseTooShort { required: usize, actual: usize },

    #[error(transparent)]
    Fft(#[from] FftError),
}

/// Estimator configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Taper applied to each window
    pub window_type: WindowType,

    /// Fewest samples accepted
    pub min_samples: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_type: WindowType::CosineTaper,
            min_samples: MIN_SAMPLES,
        }
    }
}

/// Averaged one-sided spectrum on a [`FrequencyGrid`]
#[derive(Debug, Clone, PartialEq)]
pub struct PsdEstimate {
    grid: FrequencyGrid,
    windows: usize,
    psd: Vec<Complex64>,
}

impl PsdEstimate {
    pub fn grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    /// Number of windows averaged
    pub fn windows(&self) -> usize {
        self.windows
    }

    /// Frequency of each bin in Hz, DC first
    pub fn frequencies(&self) -> Vec<f64> {
        self.grid.frequencies()
    }

    /// Density per bin, in units² / Hz
    pub fn psd(&self) -> &[Complex64] {
        &self.psd
    }

    /// Divide out |R(f)|² bin by bin
    pub fn deconvolve(&mut self, response: &ResponseCurve) -> Result<(), EstimateError> {
        if response.grid().pad_length != self.grid.pad_length {
            return Err(EstimateError::GridMismatch {
                expected: self.grid.pad_length,
                actual: response.grid().pad_length,
            });
        }
        if response.len() < self.psd.len() {
            return Err(EstimateError::ResponseTooShort {
                required: self.psd.len(),
                actual: response.len(),
            });
        }

        for (p, r) in self.psd.iter_mut().zip(response.values()) {
            *p /= r.norm_sqr();
        }
        Ok(())
    }
}

/// Welch PSD estimator
#[derive(Debug, Clone, Default)]
pub struct PsdEstimator {
    config: EstimatorConfig,
}

impl PsdEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Fewest samples `estimate` will accept, never below [`MIN_SAMPLES`]
    pub fn min_samples(&self) -> usize {
        self.config.min_samples.max(MIN_SAMPLES)
    }

    /// Ground-motion PSD of `samples` with `response` removed
    ///
    /// # Arguments
    /// * `samples` - Gapless trace in engineering units
    /// * `interval_ms` - Sample interval in milliseconds
    /// * `response` - Response on the grid for this trace length
    pub fn estimate(
        &self,
        samples: &[f64],
        interval_ms: f64,
        response: &ResponseCurve,
    ) -> Result<PsdEstimate, EstimateError> {
        let mut estimate = self.power_spectrum(samples, interval_ms)?;
        estimate.deconvolve(response)?;
        Ok(estimate)
    }

    /// Averaged one-sided PSD without deconvolution
    pub fn power_spectrum(
        &self,
        samples: &[f64],
        interval_ms: f64,
    ) -> Result<PsdEstimate, EstimateError> {
        let n = samples.len();
        if n < self.min_samples() {
            return Err(EstimateError::InsufficientSamples {
                available: n,
                required: self.min_samples(),
            });
        }
        if !interval_ms.is_finite() || interval_ms <= 0.0 {
            return Err(EstimateError::InvalidInterval(interval_ms));
        }

        let grid = FrequencyGrid::new(interval_ms, n);
        let range = grid.data_length;
        let slider = range / 4;
        let pad = grid.pad_length;
        let bins = grid.num_bins();

        let engine = FftEngine::new(pad)?;
        let mut window = vec![0.0; range];
        let mut buffer = vec![0.0; 2 * pad];
        let mut power = vec![0.0; bins];
        let mut window_power = 0.0;
        let mut windows = 0;

        let mut start = 0;
        while start + range <= n {
            window.copy_from_slice(&samples[start..start + range]);
            demean(&mut window);
            detrend(&mut window);
            window_power = apply_window_inplace(&mut window, self.config.window_type);

            buffer.fill(0.0);
            for (i, &x) in window.iter().enumerate() {
                buffer[2 * i] = x;
            }
            engine.transform_packed(&mut buffer)?;

            for (k, p) in power.iter_mut().enumerate() {
                let re = buffer[2 * k];
                let im = buffer[2 * k + 1];
                *p += re * re + im * im;
            }

            windows += 1;
            start += slider;
        }

        let scale = 2.0 * grid.period / (windows as f64 * window_power);
        let psd = power
            .iter()
            .enumerate()
            .map(|(k, &p)| {
                // DC and Nyquist have no mirror image to fold in
                let one_sided = if k == 0 || k == bins - 1 { 0.5 } else { 1.0 };
                Complex64::new(p * scale * one_sided, 0.0)
            })
            .collect();

        Ok(PsdEstimate { grid, windows, psd })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Deterministic uniform noise with unit variance
    fn white_noise(n: usize, mut seed: u64) -> Vec<f64> {
        (0..n)
            .map(|_| {
                seed = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let u = (seed >> 11) as f64 / (1u64 << 53) as f64;
                (u - 0.5) * 12f64.sqrt()
            })
            .collect()
    }

    fn flat_response(grid: FrequencyGrid, gain: f64) -> ResponseCurve {
        ResponseCurve::new(grid, vec![Complex64::new(gain, 0.0); grid.pad_length])
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let estimator = PsdEstimator::default();
        let samples = vec![0.0; 31];
        let grid = FrequencyGrid::new(10.0, 31);

        assert_eq!(
            estimator.estimate(&samples, 10.0, &flat_response(grid, 1.0)),
            Err(EstimateError::InsufficientSamples {
                available: 31,
                required: 32
            })
        );
    }

    #[test]
    fn test_min_samples_cannot_be_lowered() {
        let estimator = PsdEstimator::new(EstimatorConfig {
            min_samples: 8,
            ..EstimatorConfig::default()
        });

        assert_eq!(estimator.min_samples(), MIN_SAMPLES);
        assert!(matches!(
            estimator.power_spectrum(&white_noise(31, 3), 10.0),
            Err(EstimateError::InsufficientSamples { required: 32, .. })
        ));
    }

    #[test]
    fn test_invalid_interval() {
        let estimator = PsdEstimator::default();
        assert_eq!(
            estimator.power_spectrum(&[0.0; 64], 0.0),
            Err(EstimateError::InvalidInterval(0.0))
        );
    }

    #[test]
    fn test_window_count_and_bins() {
        let estimator = PsdEstimator::default();
        let estimate = estimator.power_spectrum(&white_noise(4096, 1), 10.0).unwrap();

        // 4096 / 4 = 1024 per window, step 256 -> 13 windows
        assert_eq!(estimate.windows(), 13);
        assert_eq!(estimate.grid().pad_length, 1024);
        assert_eq!(estimate.psd().len(), 513);
        assert_eq!(estimate.frequencies().len(), 513);
        assert_eq!(estimate.frequencies()[0], 0.0);
    }

    #[test]
    fn test_white_noise_level() {
        // One-sided PSD of unit-variance white noise is 2·dt
        let dt = 0.01;
        let estimator = PsdEstimator::default();
        let estimate = estimator
            .power_spectrum(&white_noise(16_384, 42), dt * 1000.0)
            .unwrap();

        let mid = &estimate.psd()[100..2000];
        let mean = mid.iter().map(|p| p.re).sum::<f64>() / mid.len() as f64;
        assert!((mean / (2.0 * dt) - 1.0).abs() < 0.1, "mean PSD {}", mean);
    }

    #[test]
    fn test_sine_peak() {
        let dt = 0.01;
        let signal: Vec<f64> = (0..4096)
            .map(|n| (2.0 * PI * 1.0 * n as f64 * dt).sin())
            .collect();

        let estimator = PsdEstimator::default();
        let estimate = estimator.power_spectrum(&signal, dt * 1000.0).unwrap();

        let (peak, _) = estimate
            .psd()
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.re.partial_cmp(&b.re).unwrap())
            .unwrap();
        let peak_freq = estimate.grid().frequency(peak);
        assert!((peak_freq - 1.0).abs() < 2.0 * estimate.grid().delta_freq);
    }

    #[test]
    fn test_deconvolution_divides_by_gain_squared() {
        let samples = white_noise(2048, 7);
        let estimator = PsdEstimator::default();
        let raw = estimator.power_spectrum(&samples, 20.0).unwrap();
        let grid = *raw.grid();

        let corrected = estimator
            .estimate(&samples, 20.0, &flat_response(grid, 2.0))
            .unwrap();

        for (r, c) in raw.psd().iter().zip(corrected.psd()) {
            assert!((r.re / 4.0 - c.re).abs() <= 1e-12 * r.re.abs().max(1.0));
        }
    }

    #[test]
    fn test_mismatched_response_rejected() {
        let samples = white_noise(2048, 7);
        let estimator = PsdEstimator::default();
        let wrong_grid = FrequencyGrid::new(20.0, 4096);

        assert_eq!(
            estimator.estimate(&samples, 20.0, &flat_response(wrong_grid, 1.0)),
            Err(EstimateError::GridMismatch {
                expected: 512,
                actual: 1024
            })
        );

        let grid = FrequencyGrid::new(20.0, 2048);
        let short = ResponseCurve::new(grid, vec![Complex64::new(1.0, 0.0); 10]);
        assert_eq!(
            estimator.estimate(&samples, 20.0, &short),
            Err(EstimateError::ResponseTooShort {
                required: 257,
                actual: 10
            })
        );
    }
}
