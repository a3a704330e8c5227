//! Python bindings for PSD estimation

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use numpy::{PyArray1, PyReadonlyArray1};
use num_complex::Complex64;
use crate::pipeline::PsdSeries;
use crate::response::{FrequencyGrid, ResponseCurve};
use crate::spectrum::{EstimatorConfig, PsdEstimator, WindowType};

/// Window type enum exposed to Python
#[pyclass(name = "WindowType")]
#[derive(Clone)]
pub enum PyWindowType {
    CosineTaper,
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl From<PyWindowType> for WindowType {
    fn from(py_win: PyWindowType) -> Self {
        match py_win {
            PyWindowType::CosineTaper => WindowType::CosineTaper,
            PyWindowType::Hann => WindowType::Hann,
            PyWindowType::Hamming => WindowType::Hamming,
            PyWindowType::Blackman => WindowType::Blackman,
            PyWindowType::Rectangular => WindowType::Rectangular,
        }
    }
}

fn slice<'a>(array: &'a PyReadonlyArray1<f64>) -> PyResult<&'a [f64]> {
    array
        .as_slice()
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// PSD estimator exposed to Python
#[pyclass(name = "PsdEstimator")]
pub struct PyPsdEstimator {
    estimator: PsdEstimator,
    max_period_s: f64,
}

#[pymethods]
impl PyPsdEstimator {
    /// Create a new PSD estimator
    /// 
    /// Args:
    ///     window_type: Taper applied to each averaging window
    ///     min_samples: Shortest accepted trace
    ///     max_period_s: Periods at or above this are dropped from the output
    #[new]
    #[pyo3(signature = (window_type=PyWindowType::CosineTaper, min_samples=32, max_period_s=1e6))]
    fn new(window_type: PyWindowType, min_samples: usize, max_period_s: f64) -> Self {
        Self {
            estimator: PsdEstimator::new(EstimatorConfig {
                window_type: window_type.into(),
                min_samples,
            }),
            max_period_s,
        }
    }
    
    /// Compute the deconvolved PSD of a gapless trace
    /// 
    /// Args:
    ///     samples: Trace as numpy array
    ///     interval_ms: Sample interval in milliseconds
    ///     response_re: Real part of the response on the trace's grid
    ///     response_im: Imaginary part of the response
    /// 
    /// Returns:
    ///     (periods in seconds, power in dB) as numpy arrays
    fn estimate<'py>(
        &self,
        py: Python<'py>,
        samples: PyReadonlyArray1<f64>,
        interval_ms: f64,
        response_re: PyReadonlyArray1<f64>,
        response_im: PyReadonlyArray1<f64>,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let samples = slice(&samples)?;
        let values: Vec<Complex64> = slice(&response_re)?
            .iter()
            .zip(slice(&response_im)?)
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect();
        let grid = FrequencyGrid::new(interval_ms, samples.len());
        let response = ResponseCurve::new(grid, values);

        let estimate = self
            .estimator
            .estimate(samples, interval_ms, &response)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let series = PsdSeries::from_estimate("", &estimate, self.max_period_s);

        let periods = series.points.iter().map(|p| p.period_s).collect();
        let power = series.points.iter().map(|p| p.power_db).collect();
        Ok((PyArray1::from_vec(py, periods), PyArray1::from_vec(py, power)))
    }
    
    /// Frequency grid for a trace
    /// 
    /// Returns:
    ///     (pad_length, delta_freq, end_freq)
    #[staticmethod]
    fn frequency_grid(interval_ms: f64, trace_length: usize) -> (usize, f64, f64) {
        let grid = FrequencyGrid::new(interval_ms, trace_length);
        (grid.pad_length, grid.delta_freq, grid.end_freq)
    }
    
    /// Get the minimum accepted trace length
    fn min_samples(&self) -> usize {
        self.estimator.min_samples()
    }
}
