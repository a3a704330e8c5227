//! Frequency grid shared by response curves and PSD estimates

/// Smallest power of two >= `data_length`, never below 2
pub fn pad_length(data_length: usize) -> usize {
    let mut pad = 2;
    while pad < data_length {
        pad <<= 1;
    }
    pad
}

/// Frequency sampling derived from a sample interval and a trace length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyGrid {
    /// Sample interval in seconds
    pub period: f64,

    /// Samples per averaging window (a quarter of the trace)
    pub data_length: usize,

    /// FFT length each window is zero-padded to
    pub pad_length: usize,

    /// Bin spacing in Hz
    pub delta_freq: f64,

    /// Frequency of the last of `pad_length` points in Hz
    pub end_freq: f64,
}

impl FrequencyGrid {
    /// Grid for a trace of `trace_length` samples spaced `interval_ms` apart
    pub fn new(interval_ms: f64, trace_length: usize) -> Self {
        let data_length = trace_length / 4;
        let pad_length = pad_length(data_length);
        let period = interval_ms / 1000.0;
        let delta_freq = 1.0 / (pad_length as f64 * period);
        let end_freq = delta_freq * (pad_length - 1) as f64;

        Self {
            period,
            data_length,
            pad_length,
            delta_freq,
            end_freq,
        }
    }

    /// Number of single-sided bins (DC through Nyquist)
    pub fn num_bins(&self) -> usize {
        self.pad_length / 2 + 1
    }

    /// Frequency of bin `k` in Hz
    pub fn frequency(&self, k: usize) -> f64 {
        k as f64 * self.delta_freq
    }

    /// Single-sided frequency axis
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.num_bins()).map(|k| self.frequency(k)).collect()
    }
}
