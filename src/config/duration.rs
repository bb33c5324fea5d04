// src/config/duration.rs

use std::time::Duration;

/// Parse a duration such as `"250ms"`, `"30s"`, `"10m"` or `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit (ms, s, m or h)"))?;
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("duration '{s}' does not start with a number"));
    }

    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid duration number '{digits}': {e}"))?;
    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => return Err(format!("unsupported duration unit '{other}'; expected ms, s, m or h")),
    };

    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
