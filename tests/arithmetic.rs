use std::cell::RefCell;
use std::rc::Rc;

use zircon::{ErrorKind, Session, SessionOptions, Value};

fn session() -> Session {
    let options = SessionOptions {
        trace: false,
        ..SessionOptions::default()
    };
    Session::with_options(Rc::new(RefCell::new(std::io::sink())), options)
}

fn eval(source: &str) -> String {
    session()
        .run(source)
        .unwrap_or_else(|e| panic!("{} failed: {}", source, e))
        .to_string()
}

fn fail(source: &str) -> ErrorKind {
    session().run(source).unwrap_err().kind
}

#[test]
fn test_basic_operations() {
    assert_eq!(eval("2 + 3"), "5");
    assert_eq!(eval("2 - 3"), "-1");
    assert_eq!(eval("6 * 7"), "42");
    assert_eq!(eval("2 ^ 10"), "1024");
}

#[test]
fn test_exact_decimals() {
    assert_eq!(eval("0.1 + 0.2"), "0.3");
    assert_eq!(eval("1.5 * 1.5"), "2.25");
    assert_eq!(eval("10 / 4"), "2.5");
    assert_eq!(eval("1 / 8"), "0.125");
    assert_eq!(eval("2 ^ -2"), "0.25");
}

#[test]
fn test_large_values_stay_exact() {
    assert_eq!(eval("2 ^ 100"), "1267650600228229401496703205376");
    assert_eq!(eval("99_999_999_999 * 99_999_999_999"), "9999999999800000000001");
}

#[test]
fn test_precedence_and_grouping() {
    assert_eq!(eval("1 + 2 * 3"), "7");
    assert_eq!(eval("(1 + 2) * 3"), "9");
    assert_eq!(eval("2 * 3 ^ 2"), "18");
    assert_eq!(eval("10 - 4 - 3"), "3");
    assert_eq!(eval("-2 + 5"), "3");
}

#[test]
fn test_integer_division_and_remainder() {
    assert_eq!(eval("7 \\ 2"), "3");
    assert_eq!(eval("7 % 2"), "1");
    assert_eq!(eval("-7 % 2"), "-1");
}

#[test]
fn test_division_by_zero() {
    assert_eq!(fail("1 / 0"), ErrorKind::DivisionByZero);
    assert_eq!(fail("0 / 0"), ErrorKind::DivisionByZero);
    assert_eq!(fail("5 % 0"), ErrorKind::DivisionByZero);
}

#[test]
fn test_non_terminating_division() {
    assert_eq!(fail("1 / 3"), ErrorKind::NonTerminatingDecimal);
    assert_eq!(fail("2 ^ -3 / 7"), ErrorKind::NonTerminatingDecimal);
}

#[test]
fn test_non_integer_exponent() {
    assert!(matches!(fail("2 ^ 0.5"), ErrorKind::InvalidExponent(_)));
}

#[test]
fn test_exponent_out_of_range() {
    assert!(matches!(fail("2 ^ 99999999999"), ErrorKind::InvalidExponent(_)));
    assert!(matches!(fail("2 ^ -1000000000"), ErrorKind::InvalidExponent(_)));
    assert_eq!(eval("1 ^ 999999999"), "1");
}

#[test]
fn test_num_rejects_exponent_notation() {
    for source in ["num('1e5')", "num('1e99999999999')", "num('1e-99999999999') + 1"] {
        match fail(source) {
            ErrorKind::Host { name, .. } => assert_eq!(name, "num", "{}", source),
            other => panic!("{} gave {:?}", source, other),
        }
    }
    assert_eq!(eval("num('-1_000.50') + 1"), "-999.50");
}

#[test]
fn test_type_mismatch() {
    assert_eq!(
        fail("1 + 'a'"),
        ErrorKind::TypeMismatch("number".to_string(), "string".to_string())
    );
    // an unbound name is a symbol, not a number
    assert_eq!(
        fail("missing * 2"),
        ErrorKind::TypeMismatch("number".to_string(), "symbol".to_string())
    );
}

#[test]
fn test_comparison() {
    assert_eq!(eval("1 < 2"), "true");
    assert_eq!(eval("2 <= 2"), "true");
    assert_eq!(eval("3 > 4"), "false");
    assert_eq!(eval("1.0 = 1"), "true");
    assert_eq!(eval("1 <> 1"), "false");
    assert_eq!(eval("'abc' < 'abd'"), "true");
}

#[test]
fn test_concat() {
    assert_eq!(eval("'a' & 'b'"), "ab");
    assert_eq!(eval("'n=' & 5"), "n=5");
    assert_eq!(eval("2 & 3"), "5");
}

#[test]
fn test_logic_short_circuits() {
    assert_eq!(eval("true and false"), "false");
    assert_eq!(eval("false or true"), "true");
    // the right side is never evaluated, so its type does not matter
    assert_eq!(eval("false and 1 / 0"), "false");
    assert_eq!(eval("true or 1 / 0"), "true");
    assert_eq!(eval("not (1 = 2)"), "true");
}

#[test]
fn test_result_is_a_number_value() {
    let value = session().run("40 + 2").unwrap();
    assert_eq!(value, Value::from(42));
}
