//! Exact decimal arithmetic
//!
//! Numbers are `BigDecimal`s. Addition, subtraction and multiplication come
//! straight from `bigdecimal`; the operations below need exact semantics that
//! the crate's rounding division does not give, so they work on the unscaled
//! `BigInt` digits directly.

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::ErrorKind;

fn ten_pow(exp: u64) -> BigInt {
    num_traits::pow(BigInt::from(10u32), exp as usize)
}

/// Bring two decimals to a common scale, returning both unscaled values and
/// that scale.
fn aligned(a: &BigDecimal, b: &BigDecimal) -> (BigInt, BigInt, i64) {
    let (ma, sa) = a.as_bigint_and_exponent();
    let (mb, sb) = b.as_bigint_and_exponent();
    let scale = sa.max(sb);
    let ma = ma * ten_pow((scale - sa) as u64);
    let mb = mb * ten_pow((scale - sb) as u64);
    (ma, mb, scale)
}

/// Largest exponent magnitude `power` accepts
pub const MAX_EXPONENT: u64 = 999_999_999;

/// Parse a number literal: an optional sign, digits with `_` separators and
/// an optional `.` fraction. Exponent notation is rejected.
pub fn parse(text: &str) -> Result<BigDecimal, ErrorKind> {
    let invalid = || ErrorKind::InvalidNumber(text.to_string());
    let unsigned = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let well_formed = |part: &str| {
        part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_digit() || c == '_')
    };
    if !well_formed(int) || !frac.map_or(true, well_formed) {
        return Err(invalid());
    }

    let digits: String = text.chars().filter(|&c| c != '_').collect();
    digits.parse::<BigDecimal>().map_err(|_| invalid())
}

/// Exact quotient. Fails when `b` is zero or the quotient has no finite
/// decimal expansion.
pub fn divide(a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, ErrorKind> {
    if b.is_zero() {
        return Err(ErrorKind::DivisionByZero);
    }
    let (ma, sa) = a.as_bigint_and_exponent();
    let (mb, sb) = b.as_bigint_and_exponent();

    let (mut num, mut den) = (ma, mb);
    if den.is_negative() {
        num = -num;
        den = -den;
    }
    let g = num.gcd(&den);
    if !g.is_zero() {
        num /= &g;
        den /= &g;
    }

    // A reduced fraction terminates iff its denominator is 2^x * 5^y.
    let two = BigInt::from(2u32);
    let five = BigInt::from(5u32);
    let mut rest = den.clone();
    let (mut twos, mut fives) = (0u64, 0u64);
    while rest.is_even() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }
    if !rest.is_one() {
        return Err(ErrorKind::NonTerminatingDecimal);
    }

    let k = twos.max(fives);
    let factor = ten_pow(k) / &den;
    let mantissa = num * factor;
    let scale = k as i64 + sa - sb;
    Ok(BigDecimal::new(mantissa, scale))
}

/// Integer part of `a / b`, truncated toward zero
pub fn quotient(a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, ErrorKind> {
    if b.is_zero() {
        return Err(ErrorKind::DivisionByZero);
    }
    let (ma, mb, _) = aligned(a, b);
    Ok(BigDecimal::new(ma / mb, 0))
}

/// Remainder of the truncating division; takes the sign of `a`
pub fn remainder(a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal, ErrorKind> {
    if b.is_zero() {
        return Err(ErrorKind::DivisionByZero);
    }
    let (ma, mb, scale) = aligned(a, b);
    Ok(BigDecimal::new(ma % mb, scale))
}

/// `base` raised to an integer exponent of at most [`MAX_EXPONENT`] in
/// magnitude. Negative exponents divide exactly.
pub fn power(base: &BigDecimal, exponent: &BigDecimal) -> Result<BigDecimal, ErrorKind> {
    let invalid = || ErrorKind::InvalidExponent(format(exponent));
    if !exponent.is_integer() {
        return Err(invalid());
    }
    let n = exponent
        .to_i64()
        .filter(|n| n.unsigned_abs() <= MAX_EXPONENT)
        .ok_or_else(invalid)?;

    let mut result = BigDecimal::one();
    let mut square = base.clone();
    let mut remaining = n.unsigned_abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = &result * &square;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = &square * &square;
        }
    }

    if n < 0 {
        divide(&BigDecimal::one(), &result)
    } else {
        Ok(result)
    }
}

/// Plain (never scientific) rendering that keeps the value's scale, so
/// `1.50` stays `1.50` and `1e2` prints as `100`.
pub fn format(n: &BigDecimal) -> String {
    let (mantissa, scale) = n.as_bigint_and_exponent();
    let negative = mantissa.sign() == Sign::Minus;
    let digits = mantissa.abs().to_string();

    let body = if scale <= 0 {
        let mut s = digits;
        if s != "0" {
            s.push_str(&"0".repeat((-scale) as usize));
        }
        s
    } else {
        let scale = scale as usize;
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            format!("{}.{}", int, frac)
        } else {
            format!("0.{}{}", "0".repeat(scale - digits.len()), digits)
        }
    };

    if negative {
        format!("-{}", body)
    } else {
        body
    }
}
