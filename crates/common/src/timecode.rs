//! Timecode parsing for trim points given on the command line.
//!
//! Accepted forms, from least to most significant field:
//! `ss[.frac]`, `mm:ss[.frac]`, `hh:mm:ss[.frac]`, `dd:hh:mm:ss[.frac]`.

use crate::error::{RecastError, RecastResult};

const SECS_PER_MINUTE: f64 = 60.0;
const SECS_PER_HOUR: f64 = 3_600.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Parse a timecode string into fractional seconds.
///
/// An empty string is zero.
pub fn parse_time(value: &str) -> RecastResult<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0.0);
    }

    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 4 {
        return Err(RecastError::config(format!(
            "Invalid time '{value}': expected SS, MM:SS, HH:MM:SS or DD:HH:MM:SS"
        )));
    }

    let field = |raw: &str| -> RecastResult<f64> {
        let parsed: f64 = raw
            .trim()
            .parse()
            .map_err(|_| RecastError::config(format!("Invalid time field '{raw}' in '{value}'")))?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(RecastError::config(format!(
                "Time field '{raw}' in '{value}' must be a non-negative number"
            )));
        }
        Ok(parsed)
    };

    let mut fields = parts.iter().rev();
    let mut seconds = match fields.next() {
        Some(raw) => field(raw)?,
        None => 0.0,
    };

    // Minutes must be whole; hours and days may be fractional.
    if let Some(raw) = fields.next() {
        let minutes: u64 = raw.trim().parse().map_err(|_| {
            RecastError::config(format!("Invalid minutes field '{raw}' in '{value}'"))
        })?;
        seconds += minutes as f64 * SECS_PER_MINUTE;
    }
    if let Some(raw) = fields.next() {
        seconds += field(raw)? * SECS_PER_HOUR;
    }
    if let Some(raw) = fields.next() {
        seconds += field(raw)? * SECS_PER_DAY;
    }

    Ok(seconds)
}
