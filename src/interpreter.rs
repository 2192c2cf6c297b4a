//! Tree-walking evaluator for Zircon
//!
//! `calc` evaluates a node against a world. Calls, command-style calls and
//! dot calls share one rule: an invocable callee is applied to the evaluated
//! arguments, and a plain value followed by a single invocable is piped into
//! it, so `x.f` and `x f` both mean `f(x)`.

use std::cmp::Ordering;
use std::rc::Rc;

use tracing::debug;

use crate::ast::{BinaryOp, CallStyle, Literal, Node, PrefixOp};
use crate::environment::{WeakWorld, World};
use crate::error::{ErrorKind, Result};
use crate::number;
use crate::value::{mismatch, Closure, Value};

/// Default limit on nested closure calls
pub const MAX_CALL_DEPTH: usize = 64;

/// Limit on nested node evaluation, counted across calls
pub const MAX_EVAL_DEPTH: usize = 192;

/// Outcome of evaluating a node: a plain value, or a `return` unwinding to
/// the enclosing function body or program unit.
enum Flow {
    Normal(Value),
    Return(Value),
}

impl Flow {
    fn into_value(self) -> Value {
        match self {
            Flow::Normal(value) | Flow::Return(value) => value,
        }
    }
}

/// Evaluation state
pub struct Interpreter {
    depth: usize,
    max_depth: usize,
    nesting: usize,
    /// Call frames still referenced after their call returned
    escaped: Vec<WeakWorld>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_max_depth(MAX_CALL_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            nesting: 0,
            escaped: Vec::new(),
        }
    }

    /// Empty every call frame that outlived its call. Closures stored in the
    /// frames they capture keep each other alive until this runs.
    pub fn release(&mut self) {
        let frames: Vec<World> = self.escaped.drain(..).filter_map(|w| w.upgrade()).collect();
        debug!(frames = frames.len(), "releasing escaped frames");
        for frame in &frames {
            frame.clear();
        }
    }

    fn keep_track(&mut self, frame: &World) {
        if self.escaped.len() == self.escaped.capacity() {
            self.escaped.retain(WeakWorld::is_alive);
        }
        self.escaped.push(frame.downgrade());
    }

    /// Evaluate `node` in `world`. A `return` inside it ends here.
    pub fn calc(&mut self, node: &Node, world: &World) -> Result<Value> {
        self.eval(node, world).map(Flow::into_value)
    }

    fn eval(&mut self, node: &Node, world: &World) -> Result<Flow> {
        if self.nesting >= MAX_EVAL_DEPTH {
            return Err(ErrorKind::StackOverflow.into());
        }
        self.nesting += 1;
        let result = self.step(node, world);
        self.nesting -= 1;
        result
    }

    fn step(&mut self, node: &Node, world: &World) -> Result<Flow> {
        let value = match node {
            Node::Literal(lit) => match lit {
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(n.clone()),
                Literal::String(s) => Value::String(s.clone()),
            },
            // An unbound name stands for itself
            Node::Symbol(name) => world
                .get(name)
                .unwrap_or_else(|| Value::Symbol(name.clone())),
            Node::Prefix { op, operand } => {
                let value = self.calc(operand, world)?;
                prefix(*op, value)?
            }
            Node::Binary { left, op, right } => self.binary(left, *op, right, world)?,
            Node::Call { callee, args, style } => self.call(node, callee, args, *style, world)?,
            Node::If(parts) => return self.if_chain(parts, world),
            Node::Return(inner) => return Ok(Flow::Return(self.calc(inner, world)?)),
            Node::Function(def) => {
                Value::Function(Rc::new(Closure::new(Rc::clone(def), world.clone())))
            }
            Node::Native(native) => Value::Native(native.clone()),
            Node::Tuple(items) => Value::Array(self.calc_all(items, world)?),
            Node::Block(stmts) => {
                let mut last = Value::Nil;
                for stmt in stmts {
                    match self.eval(stmt, world)? {
                        Flow::Normal(value) => last = value,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                last
            }
            Node::Let { name, value } => {
                let value = self.calc(value, world)?;
                world.define(name, value.clone());
                value
            }
            Node::Assign { name, value } => {
                let value = self.calc(value, world)?;
                world.put(name, value.clone());
                value
            }
            Node::For { var, subject, body } => {
                return self.for_loop(var.as_deref(), subject, body, world)
            }
        };
        Ok(Flow::Normal(value))
    }

    fn calc_all(&mut self, nodes: &[Node], world: &World) -> Result<Vec<Value>> {
        nodes.iter().map(|node| self.calc(node, world)).collect()
    }

    // ==================== Operators ====================

    fn binary(&mut self, left: &Node, op: BinaryOp, right: &Node, world: &World) -> Result<Value> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let l = self.calc(left, world)?.as_bool()?;
            if (op == BinaryOp::And && !l) || (op == BinaryOp::Or && l) {
                return Ok(Value::Bool(l));
            }
            return Ok(Value::Bool(self.calc(right, world)?.as_bool()?));
        }
        let l = self.calc(left, world)?;
        let r = self.calc(right, world)?;
        operate(op, l, r)
    }

    // ==================== Calls ====================

    fn call(
        &mut self,
        node: &Node,
        callee: &Node,
        args: &[Node],
        style: CallStyle,
        world: &World,
    ) -> Result<Value> {
        let target = self.calc(callee, world)?;

        if target.is_invocable() {
            let values = self.calc_all(args, world)?;
            return self.invoke(&target, values);
        }

        if args.is_empty() {
            return Ok(target);
        }

        // pipe: `x.f` / `x f` is `f(x)`
        if let [arg] = args {
            let f = self.calc(arg, world)?;
            if f.is_invocable() {
                return self.invoke(&f, vec![target]);
            }
            if style == CallStyle::Dot {
                if let Some(found) = member(&target, arg) {
                    return Ok(found);
                }
            }
        }

        Err(ErrorKind::NotCallable(node.to_string()).into())
    }

    /// Apply a closure or native capability to evaluated arguments
    pub fn invoke(&mut self, target: &Value, args: Vec<Value>) -> Result<Value> {
        match target {
            Value::Native(native) => {
                debug!(name = %native.name, args = args.len(), "native call");
                native.invoke(&args)
            }
            Value::Function(closure) => self.call_closure(closure, args),
            other => Err(ErrorKind::NotCallable(other.to_string()).into()),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value> {
        let params = &closure.def.params;
        if args.len() > params.len() {
            return Err(ErrorKind::WrongArity(params.len(), args.len()).into());
        }
        if self.depth >= self.max_depth {
            return Err(ErrorKind::StackOverflow.into());
        }

        let frame = World::with_parent(&closure.env);
        let mut args = args.into_iter();
        for param in params {
            frame.define(param, args.next().unwrap_or(Value::Nil));
        }

        self.depth += 1;
        let result = self.calc(&closure.def.body, &frame);
        self.depth -= 1;
        if frame.is_shared() {
            self.keep_track(&frame);
        }
        result
    }

    // ==================== Control flow ====================

    /// Walk `[cond, action, ...]` pairs; a trailing odd element is the else
    /// branch. With no match and no else, the last condition is the result.
    fn if_chain(&mut self, parts: &[Node], world: &World) -> Result<Flow> {
        let mut last = Value::Nil;
        for chunk in parts.chunks(2) {
            match chunk {
                [cond, action] => {
                    let value = self.calc(cond, world)?;
                    if value.as_bool()? {
                        return self.eval(action, world);
                    }
                    last = value;
                }
                [otherwise] => return self.eval(otherwise, world),
                _ => {}
            }
        }
        Ok(Flow::Normal(last))
    }

    fn for_loop(
        &mut self,
        var: Option<&str>,
        subject: &Node,
        body: &Node,
        world: &World,
    ) -> Result<Flow> {
        let mut results = Vec::new();
        match var {
            Some(var) => {
                for item in elements(self.calc(subject, world)?)? {
                    world.put(var, item);
                    match self.eval(body, world)? {
                        Flow::Normal(value) => results.push(value),
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
            None => {
                while self.calc(subject, world)?.as_bool()? {
                    match self.eval(body, world)? {
                        Flow::Normal(value) => results.push(value),
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
            }
        }
        Ok(Flow::Normal(Value::Array(results)))
    }
}

/// Evaluate `node` in `world` with a fresh interpreter
pub fn calc(node: &Node, world: &World) -> Result<Value> {
    Interpreter::new().calc(node, world)
}

fn prefix(op: PrefixOp, value: Value) -> Result<Value> {
    Ok(match op {
        PrefixOp::Plus => {
            value.as_number()?;
            value
        }
        PrefixOp::Minus => Value::Number(-value.as_number()?.clone()),
        PrefixOp::Not => Value::Bool(!value.as_bool()?),
        PrefixOp::Exists => Value::Bool(!value.is_nil()),
        PrefixOp::Empty => Value::Bool(value.is_nil()),
    })
}

/// Apply a binary operator to two evaluated operands
pub fn operate(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => Value::Number(l.as_number()? + r.as_number()?),
        BinaryOp::Sub => Value::Number(l.as_number()? - r.as_number()?),
        BinaryOp::Mul => Value::Number(l.as_number()? * r.as_number()?),
        BinaryOp::Div => Value::Number(number::divide(l.as_number()?, r.as_number()?)?),
        BinaryOp::Rem => Value::Number(number::remainder(l.as_number()?, r.as_number()?)?),
        BinaryOp::Quot => Value::Number(number::quotient(l.as_number()?, r.as_number()?)?),
        BinaryOp::Pow => Value::Number(number::power(l.as_number()?, r.as_number()?)?),
        BinaryOp::Concat => match (&l, &r) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            _ => Value::String(format!("{}{}", l, r)),
        },
        BinaryOp::Eq => Value::Bool(l == r),
        BinaryOp::Ne => Value::Bool(l != r),
        BinaryOp::Lt => Value::Bool(compare(&l, &r)? == Ordering::Less),
        BinaryOp::Le => Value::Bool(compare(&l, &r)? != Ordering::Greater),
        BinaryOp::Gt => Value::Bool(compare(&l, &r)? == Ordering::Greater),
        BinaryOp::Ge => Value::Bool(compare(&l, &r)? != Ordering::Less),
        BinaryOp::And => Value::Bool(l.as_bool()? && r.as_bool()?),
        BinaryOp::Or => Value::Bool(l.as_bool()? || r.as_bool()?),
        BinaryOp::Is => match r.as_name() {
            Some(name) => Value::Bool(l.type_name() == name),
            None => return Err(mismatch("type name", &r)),
        },
        BinaryOp::In => Value::Bool(contains(&r, &l)?),
        BinaryOp::Pair => Value::Pair(Box::new(l), Box::new(r)),
    };
    Ok(value)
}

fn compare(l: &Value, r: &Value) -> Result<Ordering> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Number(_), other) | (Value::String(_), other) => Err(mismatch(l.type_name(), other)),
        (other, _) => Err(mismatch("number or string", other)),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Array(items) => Ok(items.contains(item)),
        Value::Pair(k, v) => Ok(**k == *item || **v == *item),
        Value::String(s) => match item {
            Value::String(part) => Ok(s.contains(part.as_str())),
            other => Err(mismatch("string", other)),
        },
        Value::Dict(map) => match item.as_name() {
            Some(key) => Ok(map.contains_key(key)),
            None => Err(mismatch("string", item)),
        },
        Value::Scope(world) => match item.as_name() {
            Some(name) => Ok(world.contains(name)),
            None => Err(mismatch("string", item)),
        },
        other => Err(mismatch("array, string, dict or world", other)),
    }
}

/// Dot lookup of a member name on a dict or world
fn member(target: &Value, member: &Node) -> Option<Value> {
    let Node::Symbol(name) = member else {
        return None;
    };
    match target {
        Value::Dict(map) => map.get(name).cloned(),
        Value::Scope(world) => world.get(name),
        _ => None,
    }
}

/// Items a `for ... in` loop visits
fn elements(subject: Value) -> Result<Vec<Value>> {
    match subject {
        Value::Array(items) => Ok(items),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Value::Dict(map) => Ok(map.keys().map(|k| Value::String(k.clone())).collect()),
        Value::Scope(world) => Ok(world.names().into_iter().map(Value::String).collect()),
        Value::Pair(k, v) => Ok(vec![*k, *v]),
        other => Err(mismatch("array, string, dict, world or pair", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::value::NativeFn;

    fn eval(source: &str, world: &World) -> Result<Value> {
        let mut interpreter = Interpreter::new();
        let mut last = Value::Nil;
        for unit in Parser::new(source) {
            last = interpreter.calc(&unit?, world)?;
        }
        Ok(last)
    }

    #[test]
    fn test_native_node_evaluates_to_capability() {
        let world = World::new();
        let twice = NativeFn::new("twice", Some(1), |args| {
            let n = args[0].as_number().map_err(|e| e.to_string())?;
            Ok(Value::Number(n + n))
        });
        let call = Node::call(
            Node::Native(twice),
            vec![Node::number(number::parse("21").unwrap())],
            CallStyle::Paren,
        );
        assert_eq!(calc(&call, &world).unwrap(), Value::from(42));
    }

    #[test]
    fn test_return_stops_at_program_unit() {
        let world = World::new();
        assert_eq!(eval("return 1\n2", &world).unwrap(), Value::from(2));
    }

    #[test]
    fn test_nested_return_unwinds_blocks() {
        let world = World::new();
        let source = "f := do { for true { if true { return 'out' } } }\nf()";
        assert_eq!(eval(source, &world).unwrap(), Value::from("out"));
    }

    #[test]
    fn test_closure_captures_defining_world() {
        let world = World::new();
        eval("make := do n: do: n\nget := make(7)", &world).unwrap();
        let inner = World::with_parent(&world);
        inner.define("n", Value::from(0));
        assert_eq!(eval("get()", &inner).unwrap(), Value::from(7));
    }

    #[test]
    fn test_depth_limit() {
        let world = World::new();
        let mut interpreter = Interpreter::with_max_depth(3);
        let units: Vec<Node> = Parser::parse("f := do n: f(n + 1)\nf(0)").unwrap();
        interpreter.calc(&units[0], &world).unwrap();
        let err = interpreter.calc(&units[1], &world).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        // the counter unwinds with the error
        assert_eq!(interpreter.depth, 0);
    }

    #[test]
    fn test_eval_depth_limit() {
        let world = World::new();
        let mut node = Node::number(number::parse("1").unwrap());
        for _ in 0..1000 {
            node = Node::Prefix {
                op: PrefixOp::Minus,
                operand: Box::new(node),
            };
        }
        let mut interpreter = Interpreter::new();
        let err = interpreter.calc(&node, &world).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        assert_eq!(interpreter.nesting, 0);
        assert_eq!(interpreter.depth, 0);
    }

    #[test]
    fn test_escaped_frames_are_released() {
        let world = World::new();
        let mut interpreter = Interpreter::new();
        let units = Parser::parse("make := do { inner := do: 1; inner }
held := make()
make()")
            .unwrap();
        for unit in &units {
            interpreter.calc(unit, &world).unwrap();
        }
        // one frame is held through `held`, the other only by its own closure
        assert_eq!(interpreter.escaped.len(), 2);
        let frames: Vec<World> = interpreter.escaped.iter().filter_map(WeakWorld::upgrade).collect();
        assert_eq!(frames.len(), 2);
        drop(frames);

        interpreter.release();
        assert!(interpreter.escaped.is_empty());
        match world.get("held") {
            Some(Value::Function(closure)) => assert!(closure.env.names().is_empty()),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_unshared_frames_are_not_tracked() {
        let world = World::new();
        let mut interpreter = Interpreter::new();
        let units = Parser::parse("add := do a, b: a + b
add(1, 2)").unwrap();
        for unit in &units {
            interpreter.calc(unit, &world).unwrap();
        }
        assert!(interpreter.escaped.is_empty());
    }

    #[test]
    fn test_operate_membership_errors() {
        let err = operate(BinaryOp::In, Value::from(1), Value::from(2)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch(..)));
    }

    #[test]
    fn test_pair_iteration() {
        let world = World::new();
        let value = eval("for half in ('a': 1) { half }", &world).unwrap();
        assert_eq!(value.to_string(), "[a, 1]");
    }
}
