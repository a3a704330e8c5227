//! Fixed-length complex FFT over interleaved real/imaginary buffers
//!
//! Complex data is laid out as pairs of doubles. With offset `i0` and stride `s`
//! the mathematical value `d[i]` lives at:
//!
//! ```text
//! Re(d[i]) = data[i0 + s*i]
//! Im(d[i]) = data[i0 + s*i + 1]
//! ```
//!
//! A stride larger than 2 skips the values between pairs, which lets callers
//! transform one row or column of a multi-dimensional layout in place.
//! Results are written back in wrap-around order.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FftError {
    #[error("The transform length must be > 0: {0}")]
    InvalidLength(usize),

    #[error("The stride must be >= 2: {0}")]
    InvalidStride(usize),

    #[error("The data array is too small for {n}: offset={offset} stride={stride} data.len()={actual}")]
    BufferTooSmall {
        n: usize,
        offset: usize,
        stride: usize,
        actual: usize,
    },
}

/// FFT engine for a fixed transform length
///
/// Plans are immutable once built, so one engine can be shared between threads.
/// Each call allocates its own working buffer.
pub struct FftEngine {
    /// Transform length (number of complex points)
    n: usize,

    /// Forward plan
    forward: Arc<dyn Fft<f64>>,

    /// Inverse plan (unnormalized)
    inverse: Arc<dyn Fft<f64>>,
}

impl FftEngine {
    /// Create an engine for transforming `n` complex points
    pub fn new(n: usize) -> Result<Self, FftError> {
        if n == 0 {
            return Err(FftError::InvalidLength(n));
        }

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);

        Ok(Self {
            n,
            forward,
            inverse,
        })
    }

    /// Transform length
    pub fn len(&self) -> usize {
        self.n
    }

    /// Always false: zero-length engines cannot be built
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Minimum buffer length for a given offset and stride
    ///
    /// `None` when the length does not fit in `usize`.
    pub fn required_len(&self, offset: usize, stride: usize) -> Option<usize> {
        stride
            .checked_mul(self.n - 1)
            .and_then(|span| span.checked_add(offset))
            .and_then(|last| last.checked_add(2))
    }

    /// Validate offset and stride against a buffer of `data_len` doubles
    pub fn check_data(&self, data_len: usize, offset: usize, stride: usize) -> Result<(), FftError> {
        if stride < 2 {
            return Err(FftError::InvalidStride(stride));
        }
        if self.required_len(offset, stride).map_or(true, |len| len > data_len) {
            return Err(FftError::BufferTooSmall {
                n: self.n,
                offset,
                stride,
                actual: data_len,
            });
        }
        Ok(())
    }

    /// Forward transform in place
    pub fn transform(&self, data: &mut [f64], offset: usize, stride: usize) -> Result<(), FftError> {
        self.check_data(data.len(), offset, stride)?;
        self.run(self.forward.as_ref(), data, offset, stride);
        Ok(())
    }

    /// Unnormalized inverse transform in place (caller divides by `n`)
    ///
    /// Input must be in wrap-around order.
    pub fn backtransform(&self, data: &mut [f64], offset: usize, stride: usize) -> Result<(), FftError> {
        self.check_data(data.len(), offset, stride)?;
        self.run(self.inverse.as_ref(), data, offset, stride);
        Ok(())
    }

    /// Forward transform of a densely packed buffer (offset 0, stride 2)
    pub fn transform_packed(&self, data: &mut [f64]) -> Result<(), FftError> {
        self.transform(data, 0, 2)
    }

    /// Inverse transform of a densely packed buffer (offset 0, stride 2)
    pub fn backtransform_packed(&self, data: &mut [f64]) -> Result<(), FftError> {
        self.backtransform(data, 0, 2)
    }

    fn run(&self, plan: &dyn Fft<f64>, data: &mut [f64], offset: usize, stride: usize) {
        let mut work: Vec<Complex<f64>> = (0..self.n)
            .map(|i| {
                let re = offset + stride * i;
                Complex::new(data[re], data[re + 1])
            })
            .collect();

        plan.process(&mut work);

        for (i, c) in work.iter().enumerate() {
            let re = offset + stride * i;
            data[re] = c.re;
            data[re + 1] = c.im;
        }
    }
}

/// Frequency in Hz of bin `k` in wrap-around order
///
/// Bins at or above `n / 2` map to negative frequencies.
pub fn bin_frequency(k: usize, n: usize, delta_freq: f64) -> f64 {
    if k < n / 2 {
        k as f64 * delta_freq
    } else {
        (k as f64 - n as f64) * delta_freq
    }
}
