//! Spectral estimation with FFT

pub mod fft;
pub mod windows;
pub mod windowing;
pub mod psd;

pub use fft::{FftEngine, FftError};
pub use windows::{WindowType, generate_window};
pub use psd::{EstimateError, EstimatorConfig, PsdEstimate, PsdEstimator, MIN_SAMPLES};
