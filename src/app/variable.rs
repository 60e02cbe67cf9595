//! Variable model and text coercion rules.
//!
//! Values are always stored as text, whatever their origin (network
//! payloads are textual).  Conversion to a typed value happens only when
//! the application reads a variable or when a handler is dispatched, and
//! it never fails: malformed text degrades to the type's zero value.

use core::fmt;

/// The four variable types understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Int,
    Float,
    Bool,
    Text,
}

impl VarType {
    /// Wire label sent to the server.
    pub fn label(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "string",
        }
    }

    /// Parse a wire label (case-insensitive).  Unknown labels fall back
    /// to [`VarType::Text`].
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("int") {
            Self::Int
        } else if label.eq_ignore_ascii_case("float") {
            Self::Float
        } else if label.eq_ignore_ascii_case("bool") || label.eq_ignore_ascii_case("boolean") {
            Self::Bool
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named, typed value held in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub var_type: VarType,
    /// Canonical textual representation.
    pub value: String,
}

// ── Canonical formatting ──────────────────────────────────────

/// Integer as plain decimal.
pub fn format_int(v: i32) -> String {
    v.to_string()
}

/// Float with fixed six-digit precision (`20.0` → `"20.000000"`).
pub fn format_float(v: f32) -> String {
    format!("{v:.6}")
}

/// Boolean as the literal `"true"` / `"false"`.
pub fn format_bool(v: bool) -> String {
    if v { "true" } else { "false" }.to_string()
}

// ── Best-effort parsing ───────────────────────────────────────

/// Integer from the longest leading numeric prefix.
///
/// `"12abc"` → 12, `"3.7"` → 3, `"abc"` → 0.  Out-of-range values
/// saturate at the `i32` bounds.
pub fn parse_int(text: &str) -> i32 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return 0;
    }
    match s[..end].parse::<i64>() {
        Ok(v) => v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        // More digits than an i64 holds.
        Err(_) if s.starts_with('-') => i32::MIN,
        Err(_) => i32::MAX,
    }
}

/// Float from the longest leading decimal prefix (optional sign,
/// fraction and exponent).  `"abc"` → 0.0.
pub fn parse_float(text: &str) -> f32 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return 0.0;
    }
    // Exponent only counts if at least one digit follows it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f32>().unwrap_or(0.0)
}

/// `true` for case-insensitive `"true"` or the literal `"1"`.
pub fn parse_bool(text: &str) -> bool {
    text.eq_ignore_ascii_case("true") || text == "1"
}
