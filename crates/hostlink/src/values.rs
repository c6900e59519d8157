//! Numeric kinds and signatures allowed across the host boundary.

use std::fmt;
use wasmtime::{Engine, FuncType, Val, ValType};

/// A numeric value kind. Nothing else crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValKind {
    /// 32-bit integer; also the kind of a memory offset.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ValKind {
    /// The kind of an engine value type, or `None` for vector and reference
    /// types.
    pub fn from_val_type(ty: &ValType) -> Option<ValKind> {
        match ty {
            ValType::I32 => Some(ValKind::I32),
            ValType::I64 => Some(ValKind::I64),
            ValType::F32 => Some(ValKind::F32),
            ValType::F64 => Some(ValKind::F64),
            _ => None,
        }
    }

    /// The kind of a runtime value, or `None` for vector and reference values.
    pub fn of(val: &Val) -> Option<ValKind> {
        match val {
            Val::I32(_) => Some(ValKind::I32),
            Val::I64(_) => Some(ValKind::I64),
            Val::F32(_) => Some(ValKind::F32),
            Val::F64(_) => Some(ValKind::F64),
            _ => None,
        }
    }

    /// The engine value type for this kind.
    pub fn val_type(self) -> ValType {
        match self {
            ValKind::I32 => ValType::I32,
            ValKind::I64 => ValType::I64,
            ValKind::F32 => ValType::F32,
            ValKind::F64 => ValType::F64,
        }
    }

    /// The zero value of this kind.
    pub fn zero(self) -> Val {
        match self {
            ValKind::I32 => Val::I32(0),
            ValKind::I64 => Val::I64(0),
            ValKind::F32 => Val::F32(0),
            ValKind::F64 => Val::F64(0),
        }
    }
}

impl fmt::Display for ValKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValKind::I32 => "i32",
            ValKind::I64 => "i64",
            ValKind::F32 => "f32",
            ValKind::F64 => "f64",
        })
    }
}

/// The type of a host function: ordered numeric parameters and at most one
/// numeric result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    params: Vec<ValKind>,
    result: Option<ValKind>,
}

impl Signature {
    /// Creates a signature.
    pub fn new(params: impl IntoIterator<Item = ValKind>, result: Option<ValKind>) -> Signature {
        Signature {
            params: params.into_iter().collect(),
            result,
        }
    }

    /// Parameter kinds, in order.
    pub fn params(&self) -> &[ValKind] {
        &self.params
    }

    /// Result kind, if any.
    pub fn result(&self) -> Option<ValKind> {
        self.result
    }

    /// Converts a guest function type. Returns `None` if any parameter or
    /// result is not numeric, or if there is more than one result.
    pub fn from_func_type(ty: &FuncType) -> Option<Signature> {
        let params = ty
            .params()
            .map(|p| ValKind::from_val_type(&p))
            .collect::<Option<Vec<_>>>()?;
        let mut results = ty.results();
        let result = match (results.next(), results.next()) {
            (None, _) => None,
            (Some(r), None) => Some(ValKind::from_val_type(&r)?),
            (Some(_), Some(_)) => return None,
        };
        Some(Signature { params, result })
    }

    /// The engine function type for this signature.
    pub fn func_type(&self, engine: &Engine) -> FuncType {
        FuncType::new(
            engine,
            self.params.iter().map(|k| k.val_type()),
            self.result.map(ValKind::val_type),
        )
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(") -> ")?;
        match self.result {
            Some(result) => write!(f, "{result}"),
            None => f.write_str("()"),
        }
    }
}
