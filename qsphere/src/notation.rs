// src/notation.rs
//! Text form of complex numbers and real vectors as typed by a user.
//!
//! Accepted complex forms: `±D.D±D.Di`, `±D.D`, `±D.Di` and `±i`.
//! Output drops a zero real or imaginary part, writes an imaginary part of
//! `±1` as a bare `i` / `-i`, and signs the imaginary part explicitly unless
//! it leads. Reals are written like C's `%g` with six significant digits.

use crate::complex::{fuzzy_eq, near_zero};
use crate::error::ParseError;
use num_complex::Complex64;

pub fn parse_complex(text: &str) -> Result<Complex64, ParseError> {
    let s: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }

    let Some(body) = s.strip_suffix('i') else {
        return Ok(Complex64::new(parse_real_token(&s, text)?, 0.0));
    };

    match split_point(body) {
        Some(k) => {
            let re = parse_real_token(&body[..k], text)?;
            let im = parse_imaginary_coefficient(&body[k..], text)?;
            Ok(Complex64::new(re, im))
        }
        None => Ok(Complex64::new(
            0.0,
            parse_imaginary_coefficient(body, text)?,
        )),
    }
}

/// Index of the sign that starts the imaginary term, if the text has a real
/// term in front of it. Signs belonging to an exponent are skipped.
fn split_point(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    (1..bytes.len())
        .rev()
        .find(|&k| (bytes[k] == b'+' || bytes[k] == b'-') && !matches!(bytes[k - 1], b'e' | b'E'))
}

fn parse_imaginary_coefficient(token: &str, original: &str) -> Result<f64, ParseError> {
    match token {
        "" | "+" => Ok(1.0),
        "-" => Ok(-1.0),
        _ => parse_real_token(token, original),
    }
}

/// Parses one real number after checking it against the decimal grammar, so
/// that words `f64::from_str` would accept (`inf`, `NaN`) are refused.
pub fn parse_real(text: &str) -> Result<f64, ParseError> {
    let s = text.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }
    parse_real_token(s, text)
}

fn parse_real_token(token: &str, original: &str) -> Result<f64, ParseError> {
    if !is_decimal(token) {
        return Err(ParseError::Malformed(original.to_string()));
    }
    token
        .parse::<f64>()
        .map_err(|_| ParseError::Malformed(original.to_string()))
}

fn is_decimal(token: &str) -> bool {
    let b = token.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == b.len()
}

pub fn format_complex(z: Complex64) -> String {
    let re = if near_zero(z.re) { 0.0 } else { z.re };
    let im = if near_zero(z.im) { 0.0 } else { z.im };

    match (re == 0.0, im == 0.0) {
        (true, true) => "0".to_string(),
        (false, true) => format_real(re),
        (true, false) => imaginary_term(im, true),
        (false, false) => format!("{}{}", format_real(re), imaginary_term(im, false)),
    }
}

fn imaginary_term(im: f64, leading: bool) -> String {
    if fuzzy_eq(im, 1.0) {
        return if leading { "i" } else { "+i" }.to_string();
    }
    if fuzzy_eq(im, -1.0) {
        return "-i".to_string();
    }
    let body = format_real(im);
    if !leading && im > 0.0 {
        format!("+{body}i")
    } else {
        format!("{body}i")
    }
}

/// `%g`-style rendering with six significant digits.
pub fn format_real(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return x.to_string();
    }

    let scientific = format!("{:.5e}", x);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (5 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, x))
    }
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Parses `x, y, z`-style lists, optionally wrapped in `()` or `[]`.
pub fn parse_real_vector(text: &str, expected: usize) -> Result<Vec<f64>, ParseError> {
    let s = text.trim();
    if s.is_empty() {
        return Err(ParseError::Empty);
    }
    let inner = s
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .or_else(|| s.strip_prefix('[').and_then(|r| r.strip_suffix(']')))
        .unwrap_or(s);

    let values = inner
        .split(',')
        .map(|part| {
            let part = part.trim();
            if part.is_empty() {
                Err(ParseError::Malformed(text.to_string()))
            } else {
                parse_real_token(part, text)
            }
        })
        .collect::<Result<Vec<f64>, ParseError>>()?;

    if values.len() != expected {
        return Err(ParseError::WrongArity {
            text: text.to_string(),
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

pub fn format_real_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format_real(*v)).collect();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Complex64 {
        parse_complex(text).unwrap_or_else(|e| panic!("{text:?} failed: {e}"))
    }

    #[test]
    fn parses_every_accepted_shape() {
        assert_eq!(parsed("1.5-2.25i"), Complex64::new(1.5, -2.25));
        assert_eq!(parsed("-3"), Complex64::new(-3.0, 0.0));
        assert_eq!(parsed("+0.5i"), Complex64::new(0.0, 0.5));
        assert_eq!(parsed("i"), Complex64::new(0.0, 1.0));
        assert_eq!(parsed("-i"), Complex64::new(0.0, -1.0));
        assert_eq!(parsed("2+i"), Complex64::new(2.0, 1.0));
        assert_eq!(parsed("2 - i"), Complex64::new(2.0, -1.0));
        assert_eq!(parsed("1e-07+3i"), Complex64::new(1e-7, 3.0));
        assert_eq!(parsed("2.5e-3i"), Complex64::new(0.0, 2.5e-3));
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(parse_complex(""), Err(ParseError::Empty));
        for bad in ["abc", "1+", "1+x", "i1", "+-2i", "1..2", "inf", "NaN", "1ii", "."] {
            assert!(
                matches!(parse_complex(bad), Err(ParseError::Malformed(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn formats_like_a_calculator() {
        assert_eq!(format_complex(Complex64::new(0.0, 0.0)), "0");
        assert_eq!(format_complex(Complex64::new(1.0, 0.0)), "1");
        assert_eq!(format_complex(Complex64::new(0.0, 1.0)), "i");
        assert_eq!(format_complex(Complex64::new(0.0, -1.0)), "-i");
        assert_eq!(format_complex(Complex64::new(2.0, 1.0)), "2+i");
        assert_eq!(format_complex(Complex64::new(2.0, -1.0)), "2-i");
        assert_eq!(format_complex(Complex64::new(0.5, 0.25)), "0.5+0.25i");
        assert_eq!(format_complex(Complex64::new(-0.5, -0.25)), "-0.5-0.25i");
        assert_eq!(format_complex(Complex64::new(0.0, -2.0)), "-2i");
        assert_eq!(
            format_complex(Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0)),
            "0.707107"
        );
    }

    #[test]
    fn format_real_switches_to_exponent_form() {
        assert_eq!(format_real(1234567.0), "1.23457e+06");
        assert_eq!(format_real(0.0001), "0.0001");
        assert_eq!(format_real(0.00001), "1e-05");
        assert_eq!(format_real(-42.0), "-42");
    }

    #[test]
    fn formatted_text_parses_back() {
        for z in [
            Complex64::new(0.25, -0.75),
            Complex64::new(-3.0, 1.0),
            Complex64::new(0.0, 0.125),
            Complex64::new(1234567.0, 0.5),
        ] {
            let back = parsed(&format_complex(z));
            assert!((back - z).norm() < 1e-5 * (1.0 + z.norm()), "{z} -> {back}");
        }
    }

    #[test]
    fn vectors_parse_with_or_without_brackets() {
        assert_eq!(parse_real_vector("(1, 0, 0)", 3).unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(parse_real_vector("0.5,0.5", 2).unwrap(), vec![0.5, 0.5]);
        assert_eq!(parse_real_vector("[0, -1, 0]", 3).unwrap(), vec![0.0, -1.0, 0.0]);
        assert!(matches!(
            parse_real_vector("1, 2", 3),
            Err(ParseError::WrongArity { expected: 3, found: 2, .. })
        ));
        assert!(matches!(parse_real_vector("1,,2", 3), Err(ParseError::Malformed(_))));
        assert_eq!(format_real_vector(&[1.0, 0.0, -0.5]), "(1, 0, -0.5)");
    }
}
