//! Lenient argument normalisation.
//!
//! Callers send loosely typed JSON. Required fields that are missing or empty
//! are reported by the tool; optional fields never fail and fall back to the
//! tool's default instead.

use serde_json::{Map, Value};

/// Argument bag passed to every tool.
pub type ToolArgs = Map<String, Value>;

/// Read-only view over a [`ToolArgs`] bag.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a>(&'a ToolArgs);

impl<'a> Args<'a> {
    pub fn new(args: &'a ToolArgs) -> Self {
        Self(args)
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name)
    }

    /// Non-empty text. Numbers are accepted and stringified.
    pub fn text(&self, name: &str) -> Option<String> {
        text(self.get(name))
    }

    /// Text or `""` when absent.
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default()
    }

    pub fn count(&self, name: &str, default: u32, max: u32) -> u32 {
        clamp_count(self.get(name), default, max)
    }

    pub fn flag(&self, name: &str) -> bool {
        flag(self.get(name))
    }

    pub fn choice(&self, name: &str, allowed: &[&'static str], default: &'static str) -> &'static str {
        choice(self.get(name), allowed, default)
    }

    pub fn positive_number(&self, name: &str) -> Option<f64> {
        number(self.get(name)).filter(|n| *n != 0.0)
    }
}

/// Non-empty string content of `value`.
pub fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a result-count limit.
///
/// Numbers truncate toward zero and strings parse their leading integer.
/// Absent, unparsable or `< 1` yields `default`; anything above `max` is
/// capped to `max`.
pub fn clamp_count(value: Option<&Value>, default: u32, max: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => leading_integer(s),
        _ => None,
    };

    match parsed {
        Some(n) if n < 1 => default,
        Some(n) if n > i64::from(max) => max,
        Some(n) => n as u32,
        None => default,
    }
}

pub(crate) fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate rather than fail on absurdly long digit runs.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

/// Boolean switch: `true`, `"true"` (any case) or a non-zero number.
pub fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Lower-case `value` and match it against `allowed`; otherwise `default`.
pub fn choice(value: Option<&Value>, allowed: &[&'static str], default: &'static str) -> &'static str {
    let Some(Value::String(raw)) = value else {
        return default;
    };
    let lowered = raw.trim().to_lowercase();
    allowed
        .iter()
        .copied()
        .find(|candidate| *candidate == lowered)
        .unwrap_or(default)
}

/// Finite number from a JSON number or numeric string.
pub fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
