//! Runtime value types for Zircon

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;

use crate::ast::FunctionDef;
use crate::environment::World;
use crate::error::{ErrorKind, Result};
use crate::number;

/// Runtime values in Zircon
#[derive(Clone)]
pub enum Value {
    /// Absence of a value (what a capability returns when it has nothing)
    Nil,

    /// Boolean value
    Bool(bool),

    /// Exact decimal number
    Number(BigDecimal),

    /// String value
    String(String),

    /// A name that resolved to nothing; stands for itself
    Symbol(String),

    /// Ordered results, e.g. of a tuple or a `for` loop
    Array(Vec<Value>),

    /// `key: value`
    Pair(Box<Value>, Box<Value>),

    /// String-keyed map (environment variables, request metadata)
    Dict(Rc<BTreeMap<String, Value>>),

    /// Closure
    Function(Rc<Closure>),

    /// Host capability
    Native(NativeFn),

    /// A scope handle, e.g. the global `$`
    Scope(World),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Pair(..) => "pair",
            Value::Dict(_) => "dict",
            Value::Function(_) => "function",
            Value::Native(_) => "native",
            Value::Scope(_) => "world",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// True for closures and host capabilities
    pub fn is_invocable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// Build a dict value from key/value pairs
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Dict(Rc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn as_number(&self) -> Result<&BigDecimal> {
        match self {
            Value::Number(n) => Ok(n),
            other => Err(mismatch("number", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("boolean", other)),
        }
    }

    /// Text of a string or symbol, used where either may name something
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

/// A type mismatch error naming the expected type and the value received
pub fn mismatch(expected: &str, got: &Value) -> crate::error::ZirconError {
    ErrorKind::TypeMismatch(expected.to_string(), got.type_name().to_string()).into()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(BigDecimal::from(n))
    }
}

impl From<BigDecimal> for Value {
    fn from(n: BigDecimal) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number::format(n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Symbol(name) => write!(f, "{}", name),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Pair(key, value) => write!(f, "{}: {}", key, value),
            Value::Dict(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(closure) => write!(f, "<fn({})>", closure.def.params.join(", ")),
            Value::Native(native) => write!(f, "<native {}>", native.name),
            Value::Scope(world) => write!(f, "{:?}", world),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Pair(ak, av), Value::Pair(bk, bv)) => ak == bk && av == bv,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a == b,
            (Value::Scope(a), Value::Scope(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A function literal bundled with the world it was evaluated in
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: World,
}

impl Closure {
    pub fn new(def: Rc<FunctionDef>, env: World) -> Self {
        Self { def, env }
    }
}

/// Native function signature: evaluated arguments in, one value out
pub type NativeFnPtr = Rc<dyn Fn(&[Value]) -> std::result::Result<Value, String>>;

/// Host capability registered under a name with a fixed arity
#[derive(Clone)]
pub struct NativeFn {
    pub name: String,
    pub arity: Option<usize>, // None means variadic
    func: NativeFnPtr,
}

impl NativeFn {
    pub fn new(
        name: &str,
        arity: Option<usize>,
        func: impl Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            arity,
            func: Rc::new(func),
        }
    }

    /// Check the arity contract, then call into the host
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        if let Some(arity) = self.arity {
            if args.len() != arity {
                return Err(ErrorKind::WrongArity(arity, args.len()).into());
            }
        }
        (self.func)(args).map_err(|message| {
            ErrorKind::Host {
                name: self.name.clone(),
                message,
            }
            .into()
        })
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && std::ptr::eq(
                Rc::as_ptr(&self.func) as *const (),
                Rc::as_ptr(&other.func) as *const (),
            )
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
