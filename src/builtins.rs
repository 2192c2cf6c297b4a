//! Default host capabilities
//!
//! `echo`, `print` and `env` form the host bridge every session gets; the
//! prelude adds a few conversions and helpers. All of them are plain
//! [`NativeFn`]s, registered the same way an embedding host registers its own.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;

use crate::number;
use crate::value::{NativeFn, Value};

/// Shared output stream for `echo` and `print`
pub type Sink = Rc<RefCell<dyn Write>>;

/// Space-separated textual forms of `args`
fn join(args: &[Value]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit(out: &Sink, text: &str) -> Result<Value, String> {
    let mut out = out.borrow_mut();
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|err| err.to_string())?;
    Ok(Value::Nil)
}

/// The host bridge: `echo`, `print` and `env`
pub fn host_bridge(out: &Sink) -> Vec<NativeFn> {
    let echo_out = Rc::clone(out);
    let print_out = Rc::clone(out);
    vec![
        // echo(args...) - one line
        NativeFn::new("echo", None, move |args| {
            emit(&echo_out, &format!("{}\n", join(args)))
        }),
        // print(args...) - no trailing newline
        NativeFn::new("print", None, move |args| emit(&print_out, &join(args))),
        // env() / env(name)
        NativeFn::new("env", None, |args| match args {
            [] => Ok(Value::dict(
                std::env::vars().map(|(key, value)| (key, Value::String(value))),
            )),
            [name] => {
                let name = name
                    .as_name()
                    .ok_or_else(|| format!("expected a variable name, got {}", name.type_name()))?;
                Ok(std::env::var(name).map(Value::String).unwrap_or(Value::Nil))
            }
            _ => Err(format!("takes 0 or 1 arguments, got {}", args.len())),
        }),
    ]
}

fn index(value: &Value) -> Result<usize, String> {
    match value {
        Value::Number(n) if n.is_integer() => n
            .to_usize()
            .ok_or_else(|| format!("{} is not a valid index", value)),
        other => Err(format!("expected a whole number, got {}", other.type_name())),
    }
}

fn integer(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) if n.is_integer() => {
            n.to_i64().ok_or_else(|| format!("{} is out of range", value))
        }
        other => Err(format!("expected a whole number, got {}", other.type_name())),
    }
}

/// Helpers available in every session
pub fn prelude() -> Vec<NativeFn> {
    vec![
        // len(val)
        NativeFn::new("len", Some(1), |args| {
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Dict(map) => map.len(),
                other => return Err(format!("requires string, array or dict, got {}", other.type_name())),
            };
            Ok(Value::Number(BigDecimal::from(len as u64)))
        }),
        // substr(s, start, end?)
        NativeFn::new("substr", None, |args| {
            if args.len() < 2 || args.len() > 3 {
                return Err("takes 2 or 3 arguments".to_string());
            }
            let Value::String(s) = &args[0] else {
                return Err(format!("requires a string, got {}", args[0].type_name()));
            };
            let chars: Vec<char> = s.chars().collect();
            let end = match args.get(2) {
                Some(end) => index(end)?.min(chars.len()),
                None => chars.len(),
            };
            let start = index(&args[1])?.min(end);
            Ok(Value::String(chars[start..end].iter().collect()))
        }),
        // str(val)
        NativeFn::new("str", Some(1), |args| Ok(Value::String(args[0].to_string()))),
        // num(val)
        NativeFn::new("num", Some(1), |args| match &args[0] {
            Value::Number(_) => Ok(args[0].clone()),
            Value::String(s) => number::parse(s.trim())
                .map(Value::Number)
                .map_err(|kind| kind.to_string()),
            Value::Bool(b) => Ok(Value::from(*b as i64)),
            other => Err(format!("cannot convert {} to number", other.type_name())),
        }),
        // type(val)
        NativeFn::new("type", Some(1), |args| Ok(Value::from(args[0].type_name()))),
        // range(end) / range(start, end)
        NativeFn::new("range", None, |args| {
            let (start, end) = match args {
                [end] => (0, integer(end)?),
                [start, end] => (integer(start)?, integer(end)?),
                _ => return Err("takes 1 or 2 arguments".to_string()),
            };
            Ok(Value::Array((start..end).map(Value::from).collect()))
        }),
        // assert(cond, message?)
        NativeFn::new("assert", None, |args| {
            let (cond, message) = match args {
                [cond] => (cond, None),
                [cond, message] => (cond, Some(message)),
                _ => return Err("takes 1 or 2 arguments".to_string()),
            };
            match (cond, message) {
                (Value::Bool(true), _) => Ok(Value::Nil),
                (Value::Bool(false), Some(message)) => Err(message.to_string()),
                (Value::Bool(false), None) => Err("assertion failed".to_string()),
                (other, _) => Err(format!("expected boolean, got {}", other.type_name())),
            }
        }),
    ]
}
