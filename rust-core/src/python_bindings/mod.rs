//! PyO3 bindings for Python integration

use pyo3::prelude::*;

mod spectrum_bindings;

/// Python module definition
#[pymodule]
fn seismic_psd(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<spectrum_bindings::PyPsdEstimator>()?;
    
    // Add WindowType enum
    m.add_class::<spectrum_bindings::PyWindowType>()?;
    
    Ok(())
}
