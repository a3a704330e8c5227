//! Taper functions applied to each PSD window before the FFT

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fraction of the window tapered at each end by [`WindowType::CosineTaper`]
pub const COSINE_TAPER_FRACTION: f64 = 0.05;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowType {
    /// Split cosine bell: raised-cosine ramps over the first and last 5%,
    /// flat in between. Standard taper for seismic noise PSDs.
    #[default]
    CosineTaper,

    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/(M-1))
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/(M-1))
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/(M-1)) + 0.08*cos(4πn/(M-1))
    Blackman,

    /// Rectangular window (no windowing)
    Rectangular,
}

/// Generate window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    if length < 2 {
        return vec![1.0; length];
    }

    let m = length as f64;
    let mut window = Vec::with_capacity(length);

    match window_type {
        WindowType::CosineTaper => {
            let ramp = ((m * COSINE_TAPER_FRACTION).round() as usize).max(1);
            for n in 0..length {
                let w = if n < ramp {
                    0.5 * (1.0 - (PI * n as f64 / ramp as f64).cos())
                } else if n >= length - ramp {
                    0.5 * (1.0 - (PI * (length - 1 - n) as f64 / ramp as f64).cos())
                } else {
                    1.0
                };
                window.push(w);
            }
        }

        WindowType::Hann => {
            for n in 0..length {
                let angle = 2.0 * PI * n as f64 / (m - 1.0);
                window.push(0.5 - 0.5 * angle.cos());
            }
        }

        WindowType::Hamming => {
            for n in 0..length {
                let angle = 2.0 * PI * n as f64 / (m - 1.0);
                window.push(0.54 - 0.46 * angle.cos());
            }
        }

        WindowType::Blackman => {
            for n in 0..length {
                let angle1 = 2.0 * PI * n as f64 / (m - 1.0);
                let angle2 = 4.0 * PI * n as f64 / (m - 1.0);
                window.push(0.42 - 0.5 * angle1.cos() + 0.08 * angle2.cos());
            }
        }

        WindowType::Rectangular => {
            window.resize(length, 1.0);
        }
    }

    window
}
