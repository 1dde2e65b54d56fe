use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Time-bucketing unit of a cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "day" | "daily" => Some(Self::Day),
            "week" | "weekly" => Some(Self::Week),
            "month" | "monthly" => Some(Self::Month),
            "year" | "yearly" => Some(Self::Year),
            _ => None,
        }
    }

    /// Key under which the backend nests buckets of this granularity.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Clamp negative amounts (refunds, credits) to zero for display.
pub fn no_neg(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Returns "$1,234.56".
pub fn format_cost(value: f64) -> String {
    let cents = (no_neg(value) * 100.0).round() as u64;
    let dollars = cents / 100;
    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("${}.{:02}", grouped, cents % 100)
}

/// Returns "+12.5%", "-3.0%" or "0.0%".
pub fn format_variation(variation: f64) -> String {
    let rounded = (variation * 10.0).round() / 10.0;
    if rounded > 0.0 {
        format!("+{:.1}%", rounded)
    } else if rounded < 0.0 {
        format!("{:.1}%", rounded)
    } else {
        "0.0%".to_string()
    }
}

/// Returns "[████░░░░]" where █ is the share of the whole.
pub fn format_share_bar(part: f64, whole: f64, width: usize) -> String {
    let ratio = if whole > 0.0 {
        (no_neg(part) / whole).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * width as f64).round() as usize;
    format!(
        "[{}{}]",
        "█".repeat(filled),
        "░".repeat(width.saturating_sub(filled))
    )
}

/// Returns "512 B", "1.5 KB", "2.0 GB" (powers of 1024).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (expected YYYY-MM-DD)", value))
}

/// Longest range `defaults.days` may ask for.
pub const MAX_RANGE_DAYS: u32 = 3660;

/// Inclusive range ending at `today` and spanning `days` days.
pub fn default_range(today: NaiveDate, days: u32) -> Result<(NaiveDate, NaiveDate)> {
    let span = i64::from(days.max(1)) - 1;
    let begin = today
        .checked_sub_signed(Duration::days(span))
        .with_context(|| format!("A range of {} days ending {} is out of bounds", days, today))?;
    Ok((begin, today))
}

/// Short column label for a bucket key ("Jan 05", "Jan 2024", "2024").
/// Keys that are not ISO dates are returned unchanged.
pub fn bucket_label(granularity: Granularity, key: &str) -> String {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d"));
    match date {
        Ok(d) => match granularity {
            Granularity::Day | Granularity::Week => d.format("%b %d").to_string(),
            Granularity::Month => d.format("%b %Y").to_string(),
            Granularity::Year => d.format("%Y").to_string(),
        },
        Err(_) => key.to_string(),
    }
}
