use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use num_format::{Locale, ToFormattedString};

static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Emit a warning through tracing at most once per distinct message.
pub fn warn_once(message: impl Into<String>) {
    let message = message.into();
    let cache = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));

    if let Ok(mut warned) = cache.lock()
        && warned.insert(message.clone())
    {
        tracing::warn!("{message}");
    }
}

#[derive(Clone)]
pub struct NumberFormatOptions {
    pub use_comma: bool,
    pub use_human: bool,
    pub locale: String,
    pub decimal_places: usize,
}

impl Default for NumberFormatOptions {
    fn default() -> Self {
        Self {
            use_comma: false,
            use_human: false,
            locale: "en".to_string(),
            decimal_places: 2,
        }
    }
}

/// Format a number for display. Accepts both u32 and u64.
pub fn format_number(n: impl Into<u64>, options: &NumberFormatOptions) -> String {
    let n: u64 = n.into();
    let locale = match options.locale.as_str() {
        "de" => Locale::de,
        "fr" => Locale::fr,
        "es" => Locale::es,
        "it" => Locale::it,
        "ja" => Locale::ja,
        "ko" => Locale::ko,
        "sv" => Locale::sv,
        "zh" => Locale::zh,
        _ => Locale::en,
    };

    if options.use_human {
        if n >= 1_000_000_000_000 {
            format!(
                "{:.prec$}t",
                n as f64 / 1_000_000_000_000.0,
                prec = options.decimal_places
            )
        } else if n >= 1_000_000_000 {
            format!(
                "{:.prec$}b",
                n as f64 / 1_000_000_000.0,
                prec = options.decimal_places
            )
        } else if n >= 1_000_000 {
            format!(
                "{:.prec$}m",
                n as f64 / 1_000_000.0,
                prec = options.decimal_places
            )
        } else if n >= 1_000 {
            format!(
                "{:.prec$}k",
                n as f64 / 1_000.0,
                prec = options.decimal_places
            )
        } else {
            n.to_string()
        }
    } else if options.use_comma {
        n.to_formatted_string(&locale)
    } else {
        n.to_string()
    }
}

pub fn format_date_for_display(date: &str) -> String {
    if date.is_empty() || date == "unknown" {
        return "Unknown".to_string();
    }

    if let Ok(parsed) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        // Non-padded month and day
        format!("{}/{}/{}", parsed.month(), parsed.day(), parsed.year())
    } else {
        date.to_string()
    }
}

/// Format a dollar amount with two decimals.
pub fn format_cost(cost: f64) -> String {
    format!("${cost:.2}")
}

/// Convert fractional epoch seconds into a UTC instant.
///
/// Returns `None` for non-finite values and anything chrono cannot represent.
pub fn timestamp_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Get the system's local timezone as an IANA timezone string (e.g., "America/Chicago")
pub fn get_local_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve the zone used for calendar bucketing.
///
/// An explicit, non-empty name wins; otherwise the system zone is used. Unknown
/// names fall back to UTC with a warning.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => get_local_timezone(),
    };

    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn_once(format!("Unknown time zone '{name}', falling back to UTC"));
            Tz::UTC
        }
    }
}
