use std::cell::{Cell, RefCell};
use std::rc::Rc;

use zircon::{run, ErrorKind, NativeFn, Session, SessionOptions, Sink, Value, World};

fn capture() -> (Rc<RefCell<Vec<u8>>>, Sink) {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let sink: Sink = buffer.clone();
    (buffer, sink)
}

fn text(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(buffer.borrow().clone()).unwrap()
}

fn quiet(sink: Sink) -> Session {
    let options = SessionOptions {
        trace: false,
        ..SessionOptions::default()
    };
    Session::with_options(sink, options)
}

fn double() -> NativeFn {
    NativeFn::new("double", Some(1), |args| match &args[0] {
        Value::Number(n) => Ok(Value::Number(n + n)),
        other => Err(format!("cannot double {}", other.type_name())),
    })
}

#[test]
fn test_pipe_dot_call() {
    let (_, sink) = capture();
    let mut session = quiet(sink);
    session.register(double());
    assert_eq!(session.run("5.double").unwrap(), Value::from(10));
    assert_eq!(session.run("5.double.double").unwrap(), Value::from(20));
    // command-style juxtaposition pipes the same way
    assert_eq!(session.run("5 double").unwrap(), Value::from(10));
}

#[test]
fn test_pipe_into_closure() {
    let (_, sink) = capture();
    let source = "increment := do n: n + 1\ndouble := do n: n * 2\n3.double.increment";
    assert_eq!(run(source, None, sink).unwrap(), Value::from(7));
}

#[test]
fn test_command_call_matches_paren_call() {
    let (out, sink) = capture();
    let mut session = quiet(sink);
    session.register(NativeFn::new("shout", Some(1), |args| {
        Ok(Value::String(args[0].to_string().to_uppercase()))
    }));
    let command = session.run("shout 'hi'").unwrap();
    let paren = session.run("shout('hi')").unwrap();
    assert_eq!(command, paren);
    assert_eq!(command, Value::from("HI"));

    session.run("echo 'hi'").unwrap();
    session.run("echo('hi')").unwrap();
    assert_eq!(text(&out), "hi\nhi\n");
}

#[test]
fn test_echo_and_print() {
    let (out, sink) = capture();
    let mut session = quiet(sink);
    let result = session.run("print 'a', 1\nprint ' '\necho 'b', true").unwrap();
    assert!(result.is_nil());
    assert_eq!(text(&out), "a 1 b true\n");
}

#[test]
fn test_diagnostic_trace_is_separate_from_output() {
    let (out, sink) = capture();
    let (diag, diagnostics) = capture();
    let mut session = Session::new(sink).with_diagnostics(diagnostics);
    session.run("x := 2\necho x * 3\nx").unwrap();
    assert_eq!(text(&out), "6\n");
    assert_eq!(text(&diag), "#> 2\n#> nil\n#> 2\n");
}

#[test]
fn test_seed_callback() {
    let (out, sink) = capture();
    let seed: &dyn Fn(&World) = &|world: &World| {
        world.put(
            "headers",
            Value::dict([("host", Value::from("example.org"))]),
        );
        world.put("remote", Value::from("10.0.0.1"));
    };
    let result = run("echo remote\nheaders.host", Some(seed), sink).unwrap();
    assert_eq!(result, Value::from("example.org"));
    assert_eq!(text(&out), "10.0.0.1\n");
}

#[test]
fn test_env_capability() {
    std::env::set_var("ZIRCON_HOST_TEST", "/home/zircon");
    let (_, sink) = capture();
    let mut session = quiet(sink);
    assert_eq!(session.run("env.ZIRCON_HOST_TEST").unwrap(), Value::from("/home/zircon"));
    assert_eq!(session.run("env('ZIRCON_HOST_TEST')").unwrap(), Value::from("/home/zircon"));
    assert!(session.run("env.ZIRCON_HOST_TEST_MISSING").unwrap().is_nil());
    assert_eq!(session.run("env() is dict").unwrap(), Value::Bool(true));
}

#[test]
fn test_self_binding_prints_global_scope() {
    let (out, sink) = capture();
    let mut session = quiet(sink);
    session.run("greeting := 'hi'\n$.echo").unwrap();
    let printed = text(&out);
    assert!(printed.starts_with("<world: "), "{}", printed);
    assert!(printed.contains("greeting"), "{}", printed);
    assert!(printed.contains("$"), "{}", printed);
}

#[test]
fn test_host_failure_carries_cause() {
    let (_, sink) = capture();
    let mut session = quiet(sink);
    session.register(double());
    let err = session.run("'x'.double").unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::Host {
            name: "double".to_string(),
            message: "cannot double string".to_string(),
        }
    );
}

#[test]
fn test_registered_arity_is_enforced() {
    let (_, sink) = capture();
    let mut session = quiet(sink);
    session.register(double());
    let err = session.run("double(1, 2)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongArity(1, 2));
}

#[test]
fn test_failure_stops_later_units() {
    let (out, sink) = capture();
    let mut session = quiet(sink);
    let err = session.run("echo 'before'\n1 / 0\necho 'after'").unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    assert_eq!(text(&out), "before\n");
}

#[test]
fn test_scope_search_through_world_api() {
    let outer = World::new();
    outer.put("x", Value::from(1));
    {
        let inner = World::with_parent(&outer);
        inner.put("x", Value::from(2));
        inner.put("fresh", Value::from(3));
    }
    assert_eq!(outer.get("x"), Some(Value::from(2)));
    assert_eq!(outer.get("fresh"), None);
}

#[test]
fn test_independent_sessions() {
    let (_, first_sink) = capture();
    let (_, second_sink) = capture();
    let mut first = quiet(first_sink);
    let mut second = quiet(second_sink);
    first.run("shared := 1").unwrap();
    assert_eq!(
        second.run("shared").unwrap(),
        Value::Symbol("shared".to_string())
    );
}

struct DropFlag(Rc<Cell<bool>>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

/// Run `source` in a session holding a native that flags its own drop, then
/// report whether dropping the session released it.
fn released_after(source: &str) -> bool {
    let dropped = Rc::new(Cell::new(false));
    let flag = DropFlag(dropped.clone());
    let (_, sink) = capture();
    let mut session = quiet(sink);
    session.register(NativeFn::new("held", Some(0), move |_| {
        let _held = &flag;
        Ok(Value::Nil)
    }));
    session.run(source).unwrap();
    drop(session);
    dropped.get()
}

#[test]
fn test_dropping_session_releases_world() {
    assert!(released_after("x := 1"));
    assert!(released_after("f := do: 1"));
    assert!(released_after("f := do { g := do: held(); g }
h := f()
f()"));
    assert!(released_after("make := do n: do: n
keep := make(1)
make(2)"));
}
