//! Value to VCF text conversion.
//!
//! Every function here is pure: the same value always formats to the same text.

use crate::{
    constants::{LIST_SEPARATOR, MISSING_VALUE},
    core::value::FieldValue,
};

const QUAL_FORMAT_EXTENSION_TO_TRIM: &str = ".00";
const ZERO_FORMAT: &str = "0.00";
const SCIENTIFIC_LOWER_BOUND: f64 = 1e-20;
const SCIENTIFIC_UPPER_BOUND: f64 = 0.01;

/// Formats a QUAL value with two decimals, dropping a trailing `.00`.
pub fn format_qual_value(qual: f64) -> String {
    let s = format_fixed(qual, 2);
    match s.strip_suffix(QUAL_FORMAT_EXTENSION_TO_TRIM) {
        Some(trimmed) => trimmed.to_string(),
        None => s,
    }
}

/// Pretty prints a double for display.
///
/// * `|d| >= 1` gets `%.2f` formatting
/// * `0.01 <= |d| < 1` gets `%.3f`
/// * `1e-20 <= |d| < 0.01` gets `%.3e` with a signed, two digit exponent
/// * anything smaller is written as `0.00`
pub fn format_vcf_double(d: f64) -> String {
    let magnitude = d.abs();
    if magnitude >= 1.0 {
        format_fixed(d, 2)
    } else if magnitude >= SCIENTIFIC_UPPER_BOUND {
        format_fixed(d, 3)
    } else if magnitude >= SCIENTIFIC_LOWER_BOUND {
        format_scientific(d)
    } else {
        ZERO_FORMAT.to_string()
    }
}

/// Fixed-point text with `decimals` digits, rounding exact ties away from zero.
///
/// `format!("{:.2}")` breaks ties to even (`10.125` gives `10.12`); VCF
/// tooling expects `10.13`.
fn format_fixed(d: f64, decimals: usize) -> String {
    // 64 digits hold the exact binary expansion of any |d| >= 0.01
    let exact = format!("{:.64}", d.abs());
    let Some((int_part, frac_part)) = exact.split_once('.') else {
        return format!("{d:.decimals$}");
    };
    let round_up = frac_part.as_bytes().get(decimals).is_some_and(|b| *b >= b'5');

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(decimals))
        .collect();
    if round_up {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let (int_digits, frac_digits) = digits.split_at(digits.len() - decimals);
    let mut text = String::with_capacity(digits.len() + 2);
    if d.is_sign_negative() {
        text.push('-');
    }
    text.push_str(&String::from_utf8_lossy(int_digits));
    if decimals > 0 {
        text.push('.');
        text.push_str(&String::from_utf8_lossy(frac_digits));
    }
    text
}

fn format_scientific(d: f64) -> String {
    let rendered = format!("{d:.3e}");
    let Some((mantissa, exponent)) = rendered.split_once('e') else {
        return rendered;
    };
    // Rust renders `1.235e-3`; VCF consumers expect `1.235e-03`
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Formats a field value, returning `None` when the field must be omitted
/// (a `false` flag).
pub fn format_vcf_field(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Missing => Some(MISSING_VALUE.to_string()),
        FieldValue::Integer(i) => Some(i.to_string()),
        FieldValue::Float(d) => Some(format_vcf_double(*d)),
        FieldValue::Flag(true) => Some(String::new()),
        FieldValue::Flag(false) => None,
        FieldValue::Text(text) => Some(text.clone()),
        FieldValue::List(values) => {
            if values.is_empty() {
                return Some(MISSING_VALUE.to_string());
            }
            let mut joined = String::new();
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    joined.push(LIST_SEPARATOR);
                }
                // a false flag inside a list has no textual form of its own
                if let Some(text) = format_vcf_field(value) {
                    joined.push_str(&text);
                }
            }
            Some(joined)
        }
    }
}

/// True for text made only of missing sentinels and list separators, e.g. `.` or `.,.`.
pub fn is_missing_value(s: &str) -> bool {
    s.chars()
        .all(|c| c == LIST_SEPARATOR || MISSING_VALUE.starts_with(c))
}

/// Comma-joined missing sentinels for a field with `count` values.
pub fn missing_values(count: usize) -> String {
    vec![MISSING_VALUE; count.max(1)].join(&LIST_SEPARATOR.to_string())
}
