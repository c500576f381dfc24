use std::rc::Rc;

use bitflags::bitflags;

use crate::analysis::env::{FrameId, SlotId};
use crate::builtins::Builtin;
use crate::syntax::ast::Node;

bitflags! {
    /// Runtime type discriminants, used as acceptance sets in signatures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeSet: u8 {
        const BOOLEAN  = 1 << 0;
        const INT      = 1 << 1;
        const FLOAT    = 1 << 2;
        const STRING   = 1 << 3;
        const LIST     = 1 << 4;
        const FUNCTION = 1 << 5;

        const NUMBER = Self::INT.bits() | Self::FLOAT.bits();
        const ANY = Self::BOOLEAN.bits()
            | Self::INT.bits()
            | Self::FLOAT.bits()
            | Self::STRING.bits()
            | Self::LIST.bits()
            | Self::FUNCTION.bits();
    }
}

impl TypeSet {
    /// Human-readable set for type mismatch messages: "int or float".
    pub fn describe(self) -> String {
        if self == TypeSet::ANY {
            return "any value".into();
        }
        let names: Vec<&str> = [
            (TypeSet::BOOLEAN, "boolean"),
            (TypeSet::INT, "int"),
            (TypeSet::FLOAT, "float"),
            (TypeSet::STRING, "string"),
            (TypeSet::LIST, "list"),
            (TypeSet::FUNCTION, "function"),
        ]
        .iter()
        .filter(|(bit, _)| self.contains(*bit))
        .map(|(_, name)| *name)
        .collect();
        names.join(" or ")
    }
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// A runtime value. The booleans `t` and `nil` are the only values accepted
/// in boolean positions — there is no truthiness coercion.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Function(Function),
}

#[derive(Debug, Clone)]
pub enum Function {
    Builtin(Rc<Builtin>),
    User(Rc<UserFunction>),
}

impl Function {
    pub fn name(&self) -> Rc<str> {
        match self {
            Function::Builtin(b) => Rc::from(b.name),
            Function::User(u) => u.name.clone(),
        }
    }
}

/// A user-defined function: parameter slots in its own frame, a body node,
/// and the captured defining frame. Allocated eagerly by the environment
/// builder so sibling definitions can reference each other in any order.
#[derive(Debug)]
pub struct UserFunction {
    pub name: Rc<str>,
    pub params: Vec<ParamSpec>,
    pub body: Rc<Node>,
    /// The function's own frame — parameters live here, parent chain is the
    /// lexical capture.
    pub frame: FrameId,
}

#[derive(Debug)]
pub struct ParamSpec {
    pub name: String,
    pub slot: SlotId,
    /// `Some` for keyword parameters: the default expression, re-evaluated
    /// once per call in the function's captured environment.
    pub default: Option<Rc<Node>>,
}

impl UserFunction {
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }

    pub fn has_keywords(&self) -> bool {
        self.params.iter().any(|p| p.default.is_some())
    }
}

impl Value {
    pub const T: Value = Value::Bool(true);
    pub const NIL: Value = Value::Bool(false);

    pub fn type_set(&self) -> TypeSet {
        match self {
            Value::Bool(_) => TypeSet::BOOLEAN,
            Value::Int(_) => TypeSet::INT,
            Value::Float(_) => TypeSet::FLOAT,
            Value::Str(_) => TypeSet::STRING,
            Value::List(_) => TypeSet::LIST,
            Value::Function(_) => TypeSet::FUNCTION,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(true) => "t",
            Value::Bool(false) => "nil",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
        }
    }

    /// Numeric reading; callers have already type-checked.
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            _ => 0.0,
        }
    }
}

/// Structural equality: ints and floats compare numerically, aggregates
/// element-wise, functions by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => match (a, b) {
                (Function::Builtin(x), Function::Builtin(y)) => Rc::ptr_eq(x, y),
                (Function::User(x), Function::User(y)) => Rc::ptr_eq(x, y),
                _ => false,
            },
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "t"),
            Value::Bool(false) => write!(f, "nil"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Function(func) => write!(f, "#<function {}>", func.name()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
