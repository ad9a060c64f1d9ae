// Helpers for coercing spreadsheet cells and formatting numbers.
//
// Report cells arrive as whatever the source workbook stored: real numbers,
// numeric text with currency symbols, dashes for "no value". Everything
// downstream works with typed values produced here.
use calamine::Data;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64`, tolerating the decorations the
/// weekly reports use (`£`, thousands separators, a trailing `%`).
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed, including the
///   lone `-` used for new entries.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '£' | '%' | ' '))
        .collect();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// True for cells stored as numbers. Numeric-looking text does not count:
/// the rank column only holds real numbers on data rows.
pub fn is_numeric_cell(cell: &Data) -> bool {
    matches!(cell, Data::Int(_) | Data::Float(_))
}

pub fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) if v.is_finite() => Some(*v),
        Data::String(s) => parse_f64_safe(Some(s.as_str())),
        _ => None,
    }
}

pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
        other => other.to_string(),
    }
}

/// `Some` only for finite, non-negative values without a fractional part.
pub fn whole_number(v: f64) -> Option<u32> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
