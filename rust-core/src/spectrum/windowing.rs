//! Per-window conditioning before the FFT
//!
//! Each PSD window is demeaned, linearly detrended and tapered to reduce
//! spectral leakage from the window edges.

use super::windows::{generate_window, WindowType};

/// Subtract the arithmetic mean in place
pub fn demean(signal: &mut [f64]) {
    if signal.is_empty() {
        return;
    }
    let mean = signal.iter().sum::<f64>() / signal.len() as f64;
    for s in signal.iter_mut() {
        *s -= mean;
    }
}

/// Remove the least-squares straight line fit in place
pub fn detrend(signal: &mut [f64]) {
    let n = signal.len();
    if n < 2 {
        return;
    }

    let nf = n as f64;
    let sum_x = (nf - 1.0) * nf / 2.0;
    let sum_xx = (nf - 1.0) * nf * (2.0 * nf - 1.0) / 6.0;
    let (sum_y, sum_xy) = signal
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sy, sxy), (i, &y)| (sy + y, sxy + i as f64 * y));

    let slope = (nf * sum_xy - sum_x * sum_y) / (nf * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / nf;

    for (i, s) in signal.iter_mut().enumerate() {
        *s -= intercept + slope * i as f64;
    }
}

/// Apply window in-place
///
/// # Returns
/// Sum of squared window coefficients, used to undo the power lost to tapering
pub fn apply_window_inplace(signal: &mut [f64], window_type: WindowType) -> f64 {
    let window = generate_window(window_type, signal.len());

    for (s, w) in signal.iter_mut().zip(window.iter()) {
        *s *= w;
    }

    window.iter().map(|&w| w * w).sum()
}
