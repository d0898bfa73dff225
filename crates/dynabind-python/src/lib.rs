//! Python bindings for the Dynabind boundary layer.
//!
//! This crate wraps `dynabind-core` with PyO3: it converts Python call
//! arguments into the dynamic value model, binds them against declared
//! signatures, runs the native bodies, and maps boundary errors back to
//! Python exception types. The native extension is named `_dynabind`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![allow(unsafe_code)]

use pyo3::prelude::*;

mod call;
mod convert;
mod error;
mod functions;

/// The native `_dynabind` extension module.
#[pymodule]
fn _dynabind(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("RADIX_MAX_KEY", dynabind_core::RADIX_MAX_KEY)?;

    m.add_function(wrap_pyfunction!(functions::divide_f32, m)?)?;
    m.add_function(wrap_pyfunction!(functions::divide_f64, m)?)?;
    m.add_function(wrap_pyfunction!(functions::divide_f32_default_1, m)?)?;
    m.add_function(wrap_pyfunction!(functions::optional_usize, m)?)?;
    m.add_function(wrap_pyfunction!(functions::sum_bytes, m)?)?;
    m.add_function(wrap_pyfunction!(functions::iota_bytes, m)?)?;
    m.add_function(wrap_pyfunction!(functions::take_some_array, m)?)?;
    m.add_function(wrap_pyfunction!(functions::heap_sort_any, m)?)?;
    m.add_function(wrap_pyfunction!(functions::radix_sort_byte_list, m)?)?;
    m.add_function(wrap_pyfunction!(functions::callback_with_args, m)?)?;

    Ok(())
}
