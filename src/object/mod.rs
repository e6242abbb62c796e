use crate::ast::{FunctionLiteral, InfixOperator, PrefixOperator};
pub use crate::object::environment::{Env, Environment};
use indexmap::IndexMap;
use std::{fmt, rc::Rc};
use thiserror::Error;

pub mod builtins;
pub mod environment;

pub type EvalResult = std::result::Result<Rc<Object>, EvalError>;

/// Native function backing a builtin. Receives the already-evaluated arguments.
pub type BuiltinFunction = fn(Vec<Rc<Object>>) -> EvalResult;

pub enum Object {
    Null,
    Integer(i64),
    Boolean(bool),
    String(String),
    Array(Vec<Rc<Object>>),
    Hash(IndexMap<HashKey, HashPair>),
    Function(Rc<FunctionLiteral>, Env),
    Builtin(&'static str, BuiltinFunction),
    Error(String),
}

thread_local! {
    static NULL: Rc<Object> = Rc::new(Object::Null);
    static TRUE: Rc<Object> = Rc::new(Object::Boolean(true));
    static FALSE: Rc<Object> = Rc::new(Object::Boolean(false));
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Object::Null => write!(f, "null"),
            Object::Integer(v) => write!(f, "{}", v),
            Object::Boolean(b) => write!(f, "{}", b),
            Object::String(s) => write!(f, "{}", s),
            Object::Array(elements) => {
                let elements = elements.iter().map(|e| e.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", elements.join(", "))
            }
            Object::Hash(pairs) => {
                let pairs = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect::<Vec<_>>();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Object::Function(function, _) => {
                write!(
                    f,
                    "fn({}) {{\n{}\n}}",
                    function.parameters.join(", "),
                    function.body
                )
            }
            Object::Builtin(_, _) => write!(f, "builtin function"),
            Object::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

// Captured environments can contain the function itself, so never walk them.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Object::String(s) => write!(f, "{}({:?})", self.type_name(), s),
            Object::Builtin(name, _) => write!(f, "{}({})", self.type_name(), name),
            _ => write!(f, "{}({})", self.type_name(), self),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Null, Object::Null) => true,
            (Object::Integer(l), Object::Integer(r)) => l == r,
            (Object::Boolean(l), Object::Boolean(r)) => l == r,
            (Object::String(l), Object::String(r)) => l == r,
            (Object::Array(l), Object::Array(r)) => l == r,
            (Object::Hash(l), Object::Hash(r)) => l == r,
            (Object::Function(lf, le), Object::Function(rf, re)) => {
                Rc::ptr_eq(lf, rf) && Rc::ptr_eq(le, re)
            }
            (Object::Builtin(l, _), Object::Builtin(r, _)) => l == r,
            (Object::Error(l), Object::Error(r)) => l == r,
            _ => false,
        }
    }
}

impl Object {
    /// The shared null instance.
    pub fn null() -> Rc<Object> {
        NULL.with(Rc::clone)
    }

    /// One of the two shared boolean instances.
    pub fn boolean(value: bool) -> Rc<Object> {
        if value {
            TRUE.with(Rc::clone)
        } else {
            FALSE.with(Rc::clone)
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Object::Null => false,
            Object::Boolean(b) => *b,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "NULL",
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::String(_) => "STRING",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::Function(_, _) => "FUNCTION",
            Object::Builtin(_, _) => "BUILTIN",
            Object::Error(_) => "ERROR",
        }
    }

    /// Returns the key this value indexes a hash by, or `None` if it can't be used as one.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Integer(v) => Some(HashKey::new(self, *v as u64)),
            Object::Boolean(b) => Some(HashKey::new(self, u64::from(*b))),
            Object::String(s) => Some(HashKey::new(self, fnv1a_64(s.as_bytes()))),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }
}

/// Reference identity used by `==` and `!=` outside of integers and strings. There is exactly
/// one null and one of each boolean, so those compare by variant.
pub fn identical(left: &Rc<Object>, right: &Rc<Object>) -> bool {
    match (left.as_ref(), right.as_ref()) {
        (Object::Null, Object::Null) => true,
        (Object::Boolean(l), Object::Boolean(r)) => l == r,
        _ => Rc::ptr_eq(left, right),
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HashKey {
    pub object_type: &'static str,
    pub value: u64,
}

impl HashKey {
    fn new(obj: &Object, value: u64) -> Self {
        HashKey {
            object_type: obj.type_name(),
            value,
        }
    }
}

/// The original key is kept next to the value so hashes can be displayed.
#[derive(Clone, Debug, PartialEq)]
pub struct HashPair {
    pub key: Rc<Object>,
    pub value: Rc<Object>,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EvalError {
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),
    #[error("not a function: {0}")]
    NotAFunction(&'static str),
    #[error("unknown operator: {0}{1}")]
    UnknownPrefixOperator(PrefixOperator, &'static str),
    #[error("unknown operator: {1} {0} {2}")]
    UnknownInfixOperator(InfixOperator, &'static str, &'static str),
    #[error("type mismatch: {1} {0} {2}")]
    TypeMismatch(InfixOperator, &'static str, &'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unusable as hash key: {0}")]
    UnusableHashKey(&'static str),
    #[error("index operator not supported: {0}")]
    IndexNotSupported(&'static str),
    #[error("wrong number of arguments. got={got}, want={want}")]
    WrongArgumentCount { got: usize, want: usize },
    #[error("argument to `{0}` not supported, got {1}")]
    UnsupportedArgument(&'static str, &'static str),
    #[error("argument to `{name}` must be {expected}, got {got}")]
    WrongArgumentType {
        name: &'static str,
        expected: &'static str,
        got: &'static str,
    },
}

pub fn assert_argument_count(expected: usize, args: &[Rc<Object>]) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::WrongArgumentCount {
            got: args.len(),
            want: expected,
        });
    }

    Ok(())
}
