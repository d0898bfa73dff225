//! Declarative function signatures.
//!
//! A [`FunctionSignature`] is built once at registration time, not
//! discovered at call time, so binding is a pure function over two known
//! structures: the signature and the call's arguments.

use std::fmt;

use crate::value::DynamicValue;

/// The native type a parameter is declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclaredType {
    /// Single-precision float. Accepts host floats and integers.
    F32,
    /// Double-precision float. Accepts host floats and integers.
    F64,
    /// Signed integer. Accepts integral floats, rejects fractional ones.
    Int,
    /// Boolean. Never interchanged with numeric kinds.
    Bool,
    /// Immutable byte sequence, exchanged as a read-only descriptor.
    Bytes,
    /// Mutable byte storage, exchanged as a writable zero-copy view.
    ByteBuffer,
    /// Dense single-precision ndarray of any rank.
    ArrayF32,
    /// Ordered mutable host sequence.
    Sequence,
    /// Host closure, exchanged as a callback bridge.
    Callable,
    /// Any tag, passed through unconverted.
    Any,
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::ByteBuffer => "writable byte buffer",
            Self::ArrayF32 => "float32 array",
            Self::Sequence => "sequence",
            Self::Callable => "callable",
            Self::Any => "any value",
        };
        f.write_str(name)
    }
}

/// A default value for an optional parameter.
///
/// Restricted to owned scalars so signatures are `'static` and `Sync`
/// and can live in statics built at module registration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DefaultValue {
    /// The host's null value.
    None,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Int(i64),
    /// Single-precision default.
    Float32(f32),
    /// Double-precision default.
    Float64(f64),
}

impl DefaultValue {
    /// Materialize the default as a dynamic value.
    pub fn to_value(self) -> DynamicValue<'static> {
        match self {
            Self::None => DynamicValue::None,
            Self::Bool(v) => DynamicValue::Bool(v),
            Self::Int(v) => DynamicValue::Int(v),
            Self::Float32(v) => DynamicValue::Float32(v),
            Self::Float64(v) => DynamicValue::Float64(v),
        }
    }
}

/// One declared parameter slot.
#[derive(Clone, Debug)]
pub struct Param {
    /// Parameter name, unique within the signature.
    pub name: String,
    /// The declared native type.
    pub declared: DeclaredType,
    /// Default value; `None` means the parameter is required.
    pub default: Option<DefaultValue>,
}

impl Param {
    /// Whether the parameter must be supplied by the caller.
    pub fn required(&self) -> bool {
        self.default.is_none()
    }
}

/// An ordered parameter list for one exposed native function.
///
/// Positional order is fixed at construction and never changes.
#[derive(Clone, Debug)]
pub struct FunctionSignature {
    name: String,
    params: Vec<Param>,
}

impl FunctionSignature {
    /// Start a signature for the function `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a required parameter.
    ///
    /// # Panics
    ///
    /// Panics if `name` duplicates an existing parameter. Signatures are
    /// built at registration time; a duplicate is a registration bug.
    pub fn required(mut self, name: impl Into<String>, declared: DeclaredType) -> Self {
        self.push(Param {
            name: name.into(),
            declared,
            default: None,
        });
        self
    }

    /// Append an optional parameter with a default.
    ///
    /// # Panics
    ///
    /// Panics if `name` duplicates an existing parameter.
    pub fn optional(
        mut self,
        name: impl Into<String>,
        declared: DeclaredType,
        default: DefaultValue,
    ) -> Self {
        self.push(Param {
            name: name.into(),
            declared,
            default: Some(default),
        });
        self
    }

    fn push(&mut self, param: Param) {
        assert!(
            self.params.iter().all(|p| p.name != param.name),
            "duplicate parameter '{}' in signature for {}()",
            param.name,
            self.name
        );
        self.params.push(param);
    }

    /// The function's name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parameters in positional order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_positional_order() {
        let sig = FunctionSignature::new("divide_f32")
            .required("a", DeclaredType::F32)
            .optional("b", DeclaredType::F32, DefaultValue::Float32(1.0));
        assert_eq!(sig.name(), "divide_f32");
        assert_eq!(sig.params().len(), 2);
        assert_eq!(sig.params()[0].name, "a");
        assert!(sig.params()[0].required());
        assert!(!sig.params()[1].required());
    }

    #[test]
    #[should_panic(expected = "duplicate parameter")]
    fn duplicate_parameter_names_are_rejected() {
        let _ = FunctionSignature::new("f")
            .required("a", DeclaredType::Int)
            .required("a", DeclaredType::Int);
    }

    #[test]
    fn defaults_materialize_with_their_tag() {
        assert_eq!(
            DefaultValue::Float32(1.0).to_value(),
            DynamicValue::Float32(1.0)
        );
        assert_eq!(DefaultValue::None.to_value(), DynamicValue::None);
    }
}
