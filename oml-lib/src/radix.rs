//! Pure number crunching used by the dispatcher: base conversion, formatting
//! and the integer math opcodes. Nothing in here touches interpreter state.

use thiserror::Error;

pub const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// the longest number that is written out in unary
pub const MAX_UNARY_DIGITS: u64 = 1 << 20;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitsError {
    #[error("Base {0} has no digits")]
    InvalidBase(i64),

    #[error("{0} has too many digits to write in unary")]
    UnaryTooLong(i64),
}

/// The digits of `n` in `base`, most significant first.
///
/// 0 has the single digit 0. For negative `n` every digit of the magnitude is
/// negated, so that [`from_digits`] gives back `n`. Base 1 is unary, i.e. |n|
/// ones (or minus ones), up to [MAX_UNARY_DIGITS] of them.
pub fn to_digits(n: i64, base: i64) -> Result<Vec<i64>, DigitsError> {
    if base < 1 {
        return Err(DigitsError::InvalidBase(base));
    }
    let sign = if n < 0 { -1 } else { 1 };
    let mut mag = n.unsigned_abs();
    if base == 1 {
        return Ok(vec![sign; unary_len(n)?]);
    }
    if mag == 0 {
        return Ok(vec![0]);
    }
    let base = base as u64;
    let mut digits = vec![];
    while mag > 0 {
        digits.push((mag % base) as i64 * sign);
        mag /= base;
    }
    digits.reverse();
    Ok(digits)
}

fn unary_len(n: i64) -> Result<usize, DigitsError> {
    let len = n.unsigned_abs();
    if len > MAX_UNARY_DIGITS {
        return Err(DigitsError::UnaryTooLong(n));
    }
    Ok(len as usize)
}

/// the inverse of [`to_digits`], wraps on overflow
pub fn from_digits(digits: &[i64], base: i64) -> i64 {
    digits
        .iter()
        .fold(0i64, |acc, d| acc.wrapping_mul(base).wrapping_add(*d))
}

/// Renders `n` the way `#` prints it.
///
/// Bases above 36 have no digits, those fall back to a decimal description.
pub fn format_int(n: i64, base: i64) -> Result<String, DigitsError> {
    if base < 1 {
        return Err(DigitsError::InvalidBase(base));
    }
    let sign = if n < 0 { "-" } else { "" };
    Ok(match base {
        _ if n == 0 => "0".into(),
        10 => n.to_string(),
        1 => format!("{}{}", sign, "1".repeat(unary_len(n)?)),
        2..=36 => {
            let digits: String = to_digits(n, base)?
                .into_iter()
                .map(|d| ALPHABET[d.unsigned_abs() as usize] as char)
                .collect();
            format!("{}{}", sign, digits)
        }
        _ => format!("output in base {}: {}", base, n),
    })
}

/// value of an input character in `base`, letters are case insensitive
pub fn digit_value(c: u8, base: i64) -> Option<i64> {
    let c = c.to_ascii_lowercase();
    let pos = ALPHABET.iter().position(|a| *a == c)? as i64;
    if pos < base.max(2) {
        Some(pos)
    } else {
        None
    }
}

/// Glues the decimal digits of `y` to the right of `x`: `12 34 -> 1234`
pub fn concat(x: i64, y: i64) -> i64 {
    let mut pow: i64 = 10;
    while y >= pow {
        match pow.checked_mul(10) {
            Some(p) => pow = p,
            None => break,
        }
    }
    x.wrapping_mul(pow).wrapping_add(y)
}

/// integer power by squaring. Negative exponents truncate towards zero
pub fn ipow(mut base: i64, exp: i64) -> i64 {
    if exp < 0 {
        return match base {
            1 => 1,
            -1 if exp % 2 == 0 => 1,
            -1 => -1,
            _ => 0,
        };
    }
    let mut exp = exp as u64;
    let mut res: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            res = res.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    res
}

/// Integer cube root, rounded towards zero.
///
/// Digit-by-digit method from Hacker's Delight, three bits per step.
/// `y2` tracks `y * y` so no multiplication of two unknowns is needed.
pub fn icbrt(n: i64) -> i64 {
    let mut x = n.unsigned_abs();
    let mut y2: u64 = 0;
    let mut y: u64 = 0;
    for s in (0..=63).rev().step_by(3) {
        y2 *= 4;
        y *= 2;
        let b = 3 * (y2 + y) + 1;
        if (x >> s) >= b {
            x -= b << s;
            y2 += 2 * y + 1;
            y += 1;
        }
    }
    if n < 0 {
        -(y as i64)
    } else {
        y as i64
    }
}

/// Integer square root (floor), 0 for negative input
pub fn isqrt(n: i64) -> i64 {
    if n < 0 {
        return 0;
    }
    let mut num = n as u64;
    let mut res: u64 = 0;
    // highest power of four that fits
    let mut bit: u64 = 1 << 62;
    while bit > num {
        bit >>= 2;
    }
    while bit != 0 {
        if num >= res + bit {
            num -= res + bit;
            res = (res >> 1) + bit;
        } else {
            res >>= 1;
        }
        bit >>= 2;
    }
    res as i64
}

/// Wrapping factorial, 0 for negative input.
///
/// From 66! on the product has at least 64 factors of two, so it wraps to 0.
pub fn factorial(n: i64) -> i64 {
    if !(0..66).contains(&n) {
        0
    } else {
        (2..=n).fold(1i64, |acc, k| acc.wrapping_mul(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_digits() {
        assert_eq!(to_digits(6, 2), Ok(vec![1, 1, 0]));
        assert_eq!(to_digits(255, 16), Ok(vec![15, 15]));
        assert_eq!(to_digits(0, 7), Ok(vec![0]));
        assert_eq!(to_digits(3, 1), Ok(vec![1, 1, 1]));
        assert_eq!(to_digits(-10, 10), Ok(vec![-1, 0]));
        assert_eq!(to_digits(5, 0), Err(DigitsError::InvalidBase(0)));
    }

    #[test]
    fn test_digits_roundtrip_every_base() {
        for base in 1..=36 {
            for n in [0, 1, 2, 35, 36, 1295, 99999, -4711] {
                let digits = to_digits(n, base).unwrap();
                assert_eq!(from_digits(&digits, base), n, "n = {} base = {}", n, base);
            }
        }
        let digits = to_digits(i64::MIN, 2).unwrap();
        assert_eq!(digits.len(), 64);
        assert_eq!(from_digits(&digits, 2), i64::MIN);
    }

    #[test]
    fn test_format_int() {
        assert_eq!(format_int(255, 16).unwrap(), "ff");
        assert_eq!(format_int(-5, 2).unwrap(), "-101");
        assert_eq!(format_int(2, 2).unwrap(), "10");
        assert_eq!(format_int(0, 36).unwrap(), "0");
        assert_eq!(format_int(4, 1).unwrap(), "1111");
        assert_eq!(format_int(12, 40).unwrap(), "output in base 40: 12");
        assert_eq!(format_int(-12, 10).unwrap(), "-12");
        assert_eq!(format_int(1, 0), Err(DigitsError::InvalidBase(0)));
    }

    #[test]
    fn test_unary_is_capped() {
        let max = MAX_UNARY_DIGITS as i64;
        assert_eq!(to_digits(-max, 1).unwrap().len(), max as usize);
        assert_eq!(format_int(max, 1).unwrap().len(), max as usize);
        assert_eq!(to_digits(max + 1, 1), Err(DigitsError::UnaryTooLong(max + 1)));
        assert_eq!(format_int(i64::MIN, 1), Err(DigitsError::UnaryTooLong(i64::MIN)));
        // other bases are unaffected
        assert_eq!(format_int(i64::MAX, 2).unwrap().len(), 63);
    }

    #[test]
    fn test_digit_value() {
        assert_eq!(digit_value(b'F', 16), Some(15));
        assert_eq!(digit_value(b'f', 16), Some(15));
        assert_eq!(digit_value(b'2', 2), None);
        assert_eq!(digit_value(b'z', 36), Some(35));
        assert_eq!(digit_value(b'-', 10), None);
    }

    #[test]
    fn test_concat() {
        assert_eq!(concat(12, 34), 1234);
        assert_eq!(concat(1, 0), 10);
        assert_eq!(concat(5, 10), 510);
        assert_eq!(concat(0, 7), 7);
    }

    #[test]
    fn test_ipow() {
        assert_eq!(ipow(2, 10), 1024);
        assert_eq!(ipow(-3, 3), -27);
        assert_eq!(ipow(7, 0), 1);
        assert_eq!(ipow(2, -1), 0);
        assert_eq!(ipow(-1, -3), -1);
    }

    #[test]
    fn test_roots() {
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(17), 4);
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(-9), 0);
        assert_eq!(isqrt(i64::MAX), 3037000499);
        assert_eq!(icbrt(27), 3);
        assert_eq!(icbrt(28), 3);
        assert_eq!(icbrt(26), 2);
        assert_eq!(icbrt(-27), -3);
        assert_eq!(icbrt(i64::MAX), 2097151);
    }

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(5), 120);
        assert_eq!(factorial(-3), 0);
        assert_eq!(factorial(0), 1);
        assert_eq!(factorial(1), 1);
        assert_eq!(factorial(20), 2432902008176640000);
        assert_ne!(factorial(65), 0);
        assert_eq!(factorial(66), 0);
        assert_eq!(factorial(i64::MAX), 0);
    }
}
