//! Display formatting for evaluated amounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many decimal places to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DecimalPolicy {
    /// Up to 10 places, trailing zeros trimmed.
    Auto,
    Fixed(u8),
}

impl Default for DecimalPolicy {
    fn default() -> Self {
        DecimalPolicy::Fixed(2)
    }
}

impl TryFrom<String> for DecimalPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("auto") {
            return Ok(DecimalPolicy::Auto);
        }
        value
            .trim()
            .parse::<u8>()
            .map(DecimalPolicy::Fixed)
            .map_err(|_| format!("expected \"auto\" or a number of places, got '{}'", value))
    }
}

impl From<DecimalPolicy> for String {
    fn from(policy: DecimalPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for DecimalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalPolicy::Auto => write!(f, "auto"),
            DecimalPolicy::Fixed(places) => write!(f, "{}", places),
        }
    }
}

/// Digit grouping of the integer part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// `12,34,567`
    #[default]
    Indian,
    /// `1,234,567`
    International,
    None,
}

fn group_digits(digits: &str, grouping: Grouping) -> String {
    let len = digits.len();
    let breaks: Vec<usize> = match grouping {
        Grouping::None => Vec::new(),
        Grouping::International => (1..len).filter(|i| (len - i) % 3 == 0).collect(),
        Grouping::Indian if len > 3 => (1..len - 3).filter(|i| (len - 3 - i) % 2 == 0).chain([len - 3]).collect(),
        Grouping::Indian => Vec::new(),
    };

    let mut out = String::with_capacity(len + breaks.len());
    for (i, c) in digits.chars().enumerate() {
        if breaks.contains(&i) {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_number(value: f64, policy: DecimalPolicy, grouping: Grouping) -> String {
    let value = if value.is_finite() { value } else { 0.0 };

    let magnitude = match policy {
        DecimalPolicy::Fixed(places) => format!("{:.*}", places as usize, value.abs()),
        DecimalPolicy::Auto => {
            let s = format!("{:.10}", value.abs());
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    };

    let (int_part, frac_part) = match magnitude.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (magnitude.as_str(), None),
    };

    let is_zero = magnitude.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, grouping));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
