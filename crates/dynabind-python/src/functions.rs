//! The exported boundary functions.
//!
//! Every function takes `*args`/`**kwargs`, stages them through
//! [`CallArgs`], and binds against a static declarative signature, so
//! positional and keyword call forms behave identically without
//! per-function argument parsing.

use std::sync::LazyLock;

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

use dynabind_core::{
    heap_sort_sequence, radix_sort_sequence, DeclaredType, DefaultValue, DynamicValue,
    FunctionSignature,
};

use crate::call::CallArgs;
use crate::convert::scalar_to_py;
use crate::error::{arg_err, buffer_err, callback_err, sort_err};

static DIVIDE_F32: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("divide_f32")
        .required("a", DeclaredType::F32)
        .required("b", DeclaredType::F32)
});

static DIVIDE_F64: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("divide_f64")
        .required("a", DeclaredType::F64)
        .required("b", DeclaredType::F64)
});

static DIVIDE_F32_DEFAULT_1: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("divide_f32_default_1")
        .required("a", DeclaredType::F32)
        .optional("b", DeclaredType::F32, DefaultValue::Float32(1.0))
});

static OPTIONAL_USIZE: LazyLock<FunctionSignature> =
    LazyLock::new(|| FunctionSignature::new("optional_usize").required("value", DeclaredType::Any));

static SUM_BYTES: LazyLock<FunctionSignature> =
    LazyLock::new(|| FunctionSignature::new("sum_bytes").required("data", DeclaredType::Bytes));

static IOTA_BYTES: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("iota_bytes").required("buffer", DeclaredType::ByteBuffer)
});

static TAKE_SOME_ARRAY: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("take_some_array").required("array", DeclaredType::ArrayF32)
});

static HEAP_SORT_ANY: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("heap_sort_any").required("values", DeclaredType::Sequence)
});

static RADIX_SORT_BYTE_LIST: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("radix_sort_byte_list").required("values", DeclaredType::Sequence)
});

static CALLBACK_WITH_ARGS: LazyLock<FunctionSignature> = LazyLock::new(|| {
    FunctionSignature::new("callback_with_args")
        .required("a", DeclaredType::Int)
        .required("b", DeclaredType::Int)
        .required("callback", DeclaredType::Callable)
});

/// Single-precision division of two floats.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn divide_f32(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&DIVIDE_F32)?;
    let a = binding.f32_arg(0).map_err(arg_err)?;
    let b = binding.f32_arg(1).map_err(arg_err)?;
    scalar_to_py(py, &DynamicValue::Float32(a / b))
}

/// Double-precision division of two floats.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn divide_f64(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&DIVIDE_F64)?;
    let a = binding.f64_arg(0).map_err(arg_err)?;
    let b = binding.f64_arg(1).map_err(arg_err)?;
    scalar_to_py(py, &DynamicValue::Float64(a / b))
}

/// Single-precision division where the divisor defaults to 1.0.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn divide_f32_default_1(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&DIVIDE_F32_DEFAULT_1)?;
    let a = binding.f32_arg(0).map_err(arg_err)?;
    let b = binding.f32_arg(1).map_err(arg_err)?;
    scalar_to_py(py, &DynamicValue::Float32(a / b))
}

/// `None` for a truthy argument, `1` otherwise.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn optional_usize(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&OPTIONAL_USIZE)?;
    let value = binding.any_arg(0).map_err(arg_err)?;
    if value.is_truthy() {
        scalar_to_py(py, &DynamicValue::None)
    } else {
        scalar_to_py(py, &DynamicValue::Int(1))
    }
}

/// Sum of the bytes in an immutable `bytes` object.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn sum_bytes(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&SUM_BYTES)?;
    let desc = binding.buffer_arg(0).map_err(arg_err)?;
    let data = desc.as_bytes().map_err(buffer_err)?;
    let total: i64 = data.iter().map(|&b| i64::from(b)).sum();
    scalar_to_py(py, &DynamicValue::Int(total))
}

/// Fill a writable `bytearray` with 0, 1, 2, ... in place.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn iota_bytes(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let mut binding = call.bind(&IOTA_BYTES)?;
    let desc = binding.buffer_arg_mut(0).map_err(arg_err)?;
    for (i, slot) in desc.as_bytes_mut().map_err(buffer_err)?.iter_mut().enumerate() {
        *slot = i as u8;
    }
    scalar_to_py(py, &DynamicValue::None)
}

/// Sum every element of a float32 ndarray, whatever its rank or layout.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn take_some_array(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&TAKE_SOME_ARRAY)?;
    let desc = binding.buffer_arg(0).map_err(arg_err)?;
    let total = desc.sum_f32().map_err(buffer_err)?;
    scalar_to_py(py, &DynamicValue::Float64(f64::from(total)))
}

/// Sort a list of numbers in place by comparison.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn heap_sort_any(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&HEAP_SORT_ANY)?;
    let seq = binding.sequence_arg(0).map_err(arg_err)?;
    heap_sort_sequence(seq).map_err(sort_err)?;
    scalar_to_py(py, &DynamicValue::None)
}

/// Sort a list of integers in 0..=255 in place by counting.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn radix_sort_byte_list(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&RADIX_SORT_BYTE_LIST)?;
    let seq = binding.sequence_arg(0).map_err(arg_err)?;
    radix_sort_sequence(seq).map_err(sort_err)?;
    scalar_to_py(py, &DynamicValue::None)
}

/// Invoke `callback(a, b)` and return its scalar result.
///
/// An exception raised inside the callback propagates to the caller
/// unchanged.
#[pyfunction]
#[pyo3(signature = (*args, **kwargs))]
pub(crate) fn callback_with_args(
    py: Python<'_>,
    args: &Bound<'_, PyTuple>,
    kwargs: Option<&Bound<'_, PyDict>>,
) -> PyResult<Py<PyAny>> {
    let call = CallArgs::from_python(args, kwargs)?;
    let binding = call.bind(&CALLBACK_WITH_ARGS)?;
    let a = binding.int_arg(0).map_err(arg_err)?;
    let b = binding.int_arg(1).map_err(arg_err)?;
    let bridge = binding.callable_arg(2).map_err(arg_err)?;
    let result = bridge
        .invoke(&[DynamicValue::Int(a), DynamicValue::Int(b)])
        .map_err(callback_err)?;
    scalar_to_py(py, &result)
}
