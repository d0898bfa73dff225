//! Argument binding: resolving one call against a declared signature.
//!
//! [`bind`] is a pure function over a [`FunctionSignature`] and the
//! call's positional/keyword arguments. Slot resolution (positions,
//! names, defaults) completes first; coercion to typed native arguments
//! runs second, so argument-shape errors always beat buffer errors.
//! Nothing executes and no host data is touched until binding succeeds.

use indexmap::IndexMap;

use crate::buffer::{BufferDescriptor, BufferRequest};
use crate::callback::CallbackBridge;
use crate::error::{BindError, CallError};
use crate::signature::{DeclaredType, FunctionSignature, Param};
use crate::traits::SequenceHost;
use crate::value::{DynamicValue, ValueKind};

/// A typed native argument produced by coercion.
pub enum BoundValue<'call> {
    /// The host's null value.
    None,
    /// A bound boolean.
    Bool(bool),
    /// A bound integer.
    Int(i64),
    /// A bound single-precision float.
    F32(f32),
    /// A bound double-precision float.
    F64(f64),
    /// A bound buffer view (bytes, writable bytes, or f32 array).
    Buffer(BufferDescriptor<'call>),
    /// A bound host sequence handle.
    Sequence(&'call dyn SequenceHost),
    /// A bound host closure, wrapped for invocation.
    Callable(CallbackBridge<'call>),
    /// A pass-through value for `Any`-declared parameters.
    Any(DynamicValue<'call>),
}

impl BoundValue<'_> {
    fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::F32(_) => ValueKind::Float32,
            Self::F64(_) => ValueKind::Float64,
            Self::Buffer(desc) => desc.source_kind(),
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Callable(_) => ValueKind::Callable,
            Self::Any(v) => v.kind(),
        }
    }
}

/// The resolved mapping from one invocation to a signature's slots.
///
/// Created per call and consumed immediately; it borrows both the
/// signature and the host values, so it cannot be persisted.
pub struct CallBinding<'sig, 'call> {
    signature: &'sig FunctionSignature,
    slots: Vec<BoundValue<'call>>,
}

impl std::fmt::Debug for CallBinding<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallBinding")
            .field("function", &self.signature.name())
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl<'sig, 'call> CallBinding<'sig, 'call> {
    fn mismatch(&self, index: usize) -> BindError {
        let param = &self.signature.params()[index];
        BindError::TypeMismatch {
            function: self.signature.name().to_string(),
            param: param.name.clone(),
            expected: param.declared,
            got: self.slots[index].kind(),
        }
    }

    /// The bound `f32` at `index`.
    pub fn f32_arg(&self, index: usize) -> Result<f32, BindError> {
        match &self.slots[index] {
            BoundValue::F32(v) => Ok(*v),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The bound `f64` at `index`.
    pub fn f64_arg(&self, index: usize) -> Result<f64, BindError> {
        match &self.slots[index] {
            BoundValue::F64(v) => Ok(*v),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The bound integer at `index`.
    pub fn int_arg(&self, index: usize) -> Result<i64, BindError> {
        match &self.slots[index] {
            BoundValue::Int(v) => Ok(*v),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The bound boolean at `index`.
    pub fn bool_arg(&self, index: usize) -> Result<bool, BindError> {
        match &self.slots[index] {
            BoundValue::Bool(v) => Ok(*v),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The bound buffer descriptor at `index`.
    pub fn buffer_arg(&self, index: usize) -> Result<&BufferDescriptor<'call>, BindError> {
        match &self.slots[index] {
            BoundValue::Buffer(desc) => Ok(desc),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The bound buffer descriptor at `index`, for writing.
    pub fn buffer_arg_mut(
        &mut self,
        index: usize,
    ) -> Result<&mut BufferDescriptor<'call>, BindError> {
        let err = self.mismatch(index);
        match &mut self.slots[index] {
            BoundValue::Buffer(desc) => Ok(desc),
            _ => Err(err),
        }
    }

    /// The bound host sequence at `index`.
    pub fn sequence_arg(&self, index: usize) -> Result<&'call dyn SequenceHost, BindError> {
        match &self.slots[index] {
            BoundValue::Sequence(seq) => Ok(*seq),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The bound callback bridge at `index`.
    pub fn callable_arg(&self, index: usize) -> Result<CallbackBridge<'call>, BindError> {
        match &self.slots[index] {
            BoundValue::Callable(bridge) => Ok(*bridge),
            _ => Err(self.mismatch(index)),
        }
    }

    /// The pass-through value at `index` for an `Any` parameter.
    pub fn any_arg(&self, index: usize) -> Result<&DynamicValue<'call>, BindError> {
        match &self.slots[index] {
            BoundValue::Any(v) => Ok(v),
            _ => Err(self.mismatch(index)),
        }
    }
}

/// Bind a call's arguments to a signature, producing typed slots.
///
/// Positional arguments fill parameters left to right; remaining
/// parameters are filled from `keywords` by name; unfilled optional
/// parameters take their defaults. Never mutates caller-supplied values.
pub fn bind<'sig, 'call>(
    signature: &'sig FunctionSignature,
    positional: Vec<DynamicValue<'call>>,
    mut keywords: IndexMap<String, DynamicValue<'call>>,
) -> Result<CallBinding<'sig, 'call>, CallError> {
    let params = signature.params();
    if positional.len() > params.len() {
        return Err(BindError::TooManyPositional {
            function: signature.name().to_string(),
            expected: params.len(),
            got: positional.len(),
        }
        .into());
    }

    let mut filled: Vec<Option<DynamicValue<'call>>> = Vec::with_capacity(params.len());
    for value in positional {
        filled.push(Some(value));
    }
    filled.resize_with(params.len(), || None);

    for (slot, param) in filled.iter_mut().zip(params) {
        if let Some(value) = keywords.shift_remove(param.name.as_str()) {
            if slot.is_some() {
                return Err(BindError::DuplicateArgument {
                    function: signature.name().to_string(),
                    param: param.name.clone(),
                }
                .into());
            }
            *slot = Some(value);
        }
    }

    if let Some((keyword, _)) = keywords.first() {
        return Err(BindError::UnexpectedKeyword {
            function: signature.name().to_string(),
            keyword: keyword.clone(),
        }
        .into());
    }

    for (slot, param) in filled.iter_mut().zip(params) {
        if slot.is_none() {
            match param.default {
                Some(default) => *slot = Some(default.to_value()),
                None => {
                    return Err(BindError::MissingArgument {
                        function: signature.name().to_string(),
                        param: param.name.clone(),
                    }
                    .into());
                }
            }
        }
    }

    let mut slots = Vec::with_capacity(params.len());
    for (slot, param) in filled.into_iter().zip(params) {
        // Every slot is Some after the default pass.
        let value = slot.unwrap_or(DynamicValue::None);
        slots.push(coerce(signature, param, value)?);
    }

    Ok(CallBinding { signature, slots })
}

/// Convert an i64 if the float is integral and representable; never
/// truncate.
fn integral_to_i64(v: f64) -> Option<i64> {
    const I64_SPAN: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if v.is_finite() && v.fract() == 0.0 && v >= -I64_SPAN && v < I64_SPAN {
        Some(v as i64)
    } else {
        None
    }
}

/// Coerce one resolved argument to its declared parameter type.
///
/// Exact tag matches always pass. Integers widen to declared floats by
/// exact numeric conversion; host floats narrow to declared `Int` only
/// when integral. Booleans and numerics never interchange.
fn coerce<'call>(
    signature: &FunctionSignature,
    param: &Param,
    value: DynamicValue<'call>,
) -> Result<BoundValue<'call>, CallError> {
    let got = value.kind();
    let mismatch = || {
        CallError::Bind(BindError::TypeMismatch {
            function: signature.name().to_string(),
            param: param.name.clone(),
            expected: param.declared,
            got,
        })
    };

    match (param.declared, value) {
        (DeclaredType::F32, DynamicValue::Float32(v)) => Ok(BoundValue::F32(v)),
        (DeclaredType::F32, DynamicValue::Float64(v)) => Ok(BoundValue::F32(v as f32)),
        (DeclaredType::F32, DynamicValue::Int(v)) => Ok(BoundValue::F32(v as f32)),

        (DeclaredType::F64, DynamicValue::Float64(v)) => Ok(BoundValue::F64(v)),
        (DeclaredType::F64, DynamicValue::Float32(v)) => Ok(BoundValue::F64(f64::from(v))),
        (DeclaredType::F64, DynamicValue::Int(v)) => Ok(BoundValue::F64(v as f64)),

        (DeclaredType::Int, DynamicValue::Int(v)) => Ok(BoundValue::Int(v)),
        (DeclaredType::Int, DynamicValue::Float64(v)) => {
            integral_to_i64(v).map(BoundValue::Int).ok_or_else(mismatch)
        }
        (DeclaredType::Int, DynamicValue::Float32(v)) => integral_to_i64(f64::from(v))
            .map(BoundValue::Int)
            .ok_or_else(mismatch),

        (DeclaredType::Bool, DynamicValue::Bool(v)) => Ok(BoundValue::Bool(v)),

        (
            DeclaredType::Bytes,
            value @ (DynamicValue::Bytes(_) | DynamicValue::ByteBuffer(_) | DynamicValue::Array(_)),
        ) => Ok(BoundValue::Buffer(BufferDescriptor::from_value(
            &value,
            BufferRequest::Bytes,
        )?)),
        (
            DeclaredType::ByteBuffer,
            value @ (DynamicValue::Bytes(_) | DynamicValue::ByteBuffer(_) | DynamicValue::Array(_)),
        ) => Ok(BoundValue::Buffer(BufferDescriptor::from_value(
            &value,
            BufferRequest::BytesMut,
        )?)),
        (
            DeclaredType::ArrayF32,
            value @ (DynamicValue::Bytes(_) | DynamicValue::ByteBuffer(_) | DynamicValue::Array(_)),
        ) => Ok(BoundValue::Buffer(BufferDescriptor::from_value(
            &value,
            BufferRequest::ArrayF32,
        )?)),

        (DeclaredType::Sequence, DynamicValue::Sequence(seq)) => Ok(BoundValue::Sequence(seq)),
        (DeclaredType::Callable, DynamicValue::Callable(handle)) => {
            Ok(BoundValue::Callable(CallbackBridge::new(handle)))
        }
        (DeclaredType::Any, value) => Ok(BoundValue::Any(value)),

        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BufferError;
    use crate::signature::DefaultValue;
    use crate::value::ArrayHandle;

    fn divide_sig() -> FunctionSignature {
        FunctionSignature::new("divide_f32")
            .required("a", DeclaredType::F32)
            .required("b", DeclaredType::F32)
    }

    fn divide_default_sig() -> FunctionSignature {
        FunctionSignature::new("divide_f32_default_1")
            .required("a", DeclaredType::F32)
            .optional("b", DeclaredType::F32, DefaultValue::Float32(1.0))
    }

    fn kw(pairs: &[(&str, DynamicValue<'static>)]) -> IndexMap<String, DynamicValue<'static>> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn positional_and_keyword_forms_agree() {
        let sig = divide_sig();
        let by_pos = bind(
            &sig,
            vec![DynamicValue::Float64(20.0), DynamicValue::Float64(5.0)],
            IndexMap::new(),
        )
        .unwrap();
        let by_kw = bind(
            &sig,
            vec![],
            kw(&[
                ("b", DynamicValue::Float64(5.0)),
                ("a", DynamicValue::Float64(20.0)),
            ]),
        )
        .unwrap();
        assert_eq!(by_pos.f32_arg(0).unwrap(), by_kw.f32_arg(0).unwrap());
        assert_eq!(by_pos.f32_arg(1).unwrap(), by_kw.f32_arg(1).unwrap());
    }

    #[test]
    fn defaults_fill_unsupplied_parameters() {
        let sig = divide_default_sig();
        let binding = bind(&sig, vec![DynamicValue::Float64(20.0)], IndexMap::new()).unwrap();
        assert_eq!(binding.f32_arg(1).unwrap(), 1.0);

        let binding = bind(
            &sig,
            vec![],
            kw(&[
                ("a", DynamicValue::Float64(20.0)),
                ("b", DynamicValue::Float64(2.0)),
            ]),
        )
        .unwrap();
        assert_eq!(binding.f32_arg(1).unwrap(), 2.0);
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        let sig = divide_sig();
        let err = bind(&sig, vec![], IndexMap::new()).unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::MissingArgument { ref param, .. }) if param == "a"
        ));

        let err = bind(&sig, vec![], kw(&[("b", DynamicValue::Float64(2.0))])).unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::MissingArgument { ref param, .. }) if param == "a"
        ));
    }

    #[test]
    fn duplicate_argument_is_rejected() {
        let sig = divide_sig();
        let err = bind(
            &sig,
            vec![DynamicValue::Float64(20.0)],
            kw(&[
                ("a", DynamicValue::Float64(1.0)),
                ("b", DynamicValue::Float64(2.0)),
            ]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::DuplicateArgument { ref param, .. }) if param == "a"
        ));
    }

    #[test]
    fn unexpected_keyword_is_rejected() {
        let sig = divide_sig();
        let err = bind(
            &sig,
            vec![DynamicValue::Float64(1.0), DynamicValue::Float64(2.0)],
            kw(&[("c", DynamicValue::Float64(3.0))]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::UnexpectedKeyword { ref keyword, .. }) if keyword == "c"
        ));
    }

    #[test]
    fn too_many_positional_is_rejected() {
        let sig = divide_sig();
        let err = bind(
            &sig,
            vec![
                DynamicValue::Float64(1.0),
                DynamicValue::Float64(2.0),
                DynamicValue::Float64(3.0),
            ],
            IndexMap::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::TooManyPositional {
                expected: 2,
                got: 3,
                ..
            })
        ));
    }

    #[test]
    fn integers_widen_to_declared_floats() {
        let sig = divide_sig();
        let binding = bind(
            &sig,
            vec![DynamicValue::Int(1000), DynamicValue::Float64(0.5)],
            IndexMap::new(),
        )
        .unwrap();
        assert_eq!(binding.f32_arg(0).unwrap(), 1000.0);
        assert_eq!(binding.f32_arg(1).unwrap(), 0.5);
    }

    #[test]
    fn fractional_floats_never_truncate_to_int() {
        let sig = FunctionSignature::new("f").required("n", DeclaredType::Int);
        let err = bind(&sig, vec![DynamicValue::Float64(2.5)], IndexMap::new()).unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::TypeMismatch { .. })
        ));

        let binding = bind(&sig, vec![DynamicValue::Float64(2.0)], IndexMap::new()).unwrap();
        assert_eq!(binding.int_arg(0).unwrap(), 2);
    }

    #[test]
    fn booleans_and_numerics_never_interchange() {
        let int_sig = FunctionSignature::new("f").required("n", DeclaredType::Int);
        assert!(bind(&int_sig, vec![DynamicValue::Bool(true)], IndexMap::new()).is_err());

        let bool_sig = FunctionSignature::new("g").required("flag", DeclaredType::Bool);
        assert!(bind(&bool_sig, vec![DynamicValue::Int(1)], IndexMap::new()).is_err());
        assert!(bind(&bool_sig, vec![DynamicValue::Bool(true)], IndexMap::new()).is_ok());
    }

    #[test]
    fn buffer_parameters_coerce_to_descriptors() {
        let sig = FunctionSignature::new("sum_bytes").required("data", DeclaredType::Bytes);
        let binding = bind(&sig, vec![DynamicValue::Bytes(b"\x01\x02")], IndexMap::new()).unwrap();
        let desc = binding.buffer_arg(0).unwrap();
        assert_eq!(desc.as_bytes().unwrap(), b"\x01\x02");
    }

    #[test]
    fn unsupported_buffer_protocol_surfaces_distinctly() {
        let sig = FunctionSignature::new("iota_bytes").required("buffer", DeclaredType::ByteBuffer);
        let err = bind(
            &sig,
            vec![DynamicValue::Array(ArrayHandle::unsupported("memoryview"))],
            IndexMap::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CallError::Buffer(BufferError::UnsupportedProtocol { ref protocol }) if protocol == "memoryview"
        ));
    }

    #[test]
    fn shape_errors_beat_buffer_errors() {
        // An unknown keyword must surface even when another argument
        // would fail buffer construction.
        let sig = FunctionSignature::new("iota_bytes").required("buffer", DeclaredType::ByteBuffer);
        let err = bind(
            &sig,
            vec![DynamicValue::Array(ArrayHandle::unsupported("memoryview"))],
            kw(&[("extra", DynamicValue::Int(1))]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CallError::Bind(BindError::UnexpectedKeyword { .. })
        ));
    }

    #[test]
    fn any_parameters_pass_values_through() {
        let sig = FunctionSignature::new("optional_usize").required("value", DeclaredType::Any);
        let binding = bind(&sig, vec![DynamicValue::Bool(false)], IndexMap::new()).unwrap();
        assert!(!binding.any_arg(0).unwrap().is_truthy());
    }

    #[test]
    fn binding_debug_names_the_function() {
        let sig = divide_sig();
        let binding = bind(
            &sig,
            vec![DynamicValue::Float64(1.0), DynamicValue::Float64(2.0)],
            IndexMap::new(),
        )
        .unwrap();
        let text = format!("{binding:?}");
        assert!(text.contains("divide_f32"));
        assert!(text.contains("slots"));
    }

    proptest::proptest! {
        #[test]
        fn binding_is_call_form_independent(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let sig = divide_sig();
            let by_pos = bind(
                &sig,
                vec![DynamicValue::Float64(a), DynamicValue::Float64(b)],
                IndexMap::new(),
            )
            .unwrap();
            let by_kw = bind(
                &sig,
                vec![],
                kw(&[
                    ("b", DynamicValue::Float64(b)),
                    ("a", DynamicValue::Float64(a)),
                ]),
            )
            .unwrap();
            let mixed = bind(
                &sig,
                vec![DynamicValue::Float64(a)],
                kw(&[("b", DynamicValue::Float64(b))]),
            )
            .unwrap();
            for binding in [&by_kw, &mixed] {
                proptest::prop_assert_eq!(by_pos.f32_arg(0).unwrap(), binding.f32_arg(0).unwrap());
                proptest::prop_assert_eq!(by_pos.f32_arg(1).unwrap(), binding.f32_arg(1).unwrap());
            }
        }
    }
}
