//! Time points on the recording timeline.
//!
//! Every stream in a session is anchored to the start of the recording.
//! Times are integer nanoseconds; fractional seconds from input documents
//! are rounded exactly once, on the way in.

use serde::{Deserialize, Deserializer, Serializer};

/// Signed nanoseconds since recording start.
///
/// Signed because re-basing onto a trimmed window can go negative
/// before clamping.
pub type TimeNs = i64;

/// One second in [`TimeNs`] units.
pub const SECOND: TimeNs = 1_000_000_000;

/// Convert fractional seconds to nanoseconds, rounding half to even.
pub fn secs_to_ns(secs: f64) -> TimeNs {
    (secs * SECOND as f64).round_ties_even() as TimeNs
}

/// Convert nanoseconds to fractional seconds.
pub fn ns_to_secs(ns: TimeNs) -> f64 {
    ns as f64 / SECOND as f64
}

/// Format a time as `h:mm:ss.mmm` for human-readable output.
pub fn format_ns(ns: TimeNs) -> String {
    let sign = if ns < 0 { "-" } else { "" };
    let ns = ns.unsigned_abs();
    let millis = (ns / 1_000_000) % 1_000;
    let total_secs = ns / SECOND as u64;
    format!(
        "{sign}{}:{:02}:{:02}.{millis:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60
    )
}

/// Serde adapter storing a [`TimeNs`] as fractional seconds.
pub mod secs {
    use super::*;

    pub fn serialize<S: Serializer>(ns: &TimeNs, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(ns_to_secs(*ns))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeNs, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom(format!(
                "timestamp must be finite, got {value}"
            )));
        }
        Ok(secs_to_ns(value))
    }
}

/// Serde adapter for an undo timestamp in fractional seconds, where any
/// negative value means "never undone".
pub mod undo_secs {
    use super::*;

    pub fn serialize<S: Serializer>(
        ns: &Option<TimeNs>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ns {
            Some(ns) => serializer.serialize_f64(ns_to_secs(*ns)),
            None => serializer.serialize_f64(-1.0),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeNs>, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if value.is_nan() {
            return Err(serde::de::Error::custom("undo timestamp is NaN"));
        }
        if value < 0.0 {
            return Ok(None);
        }
        Ok(Some(secs_to_ns(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_ns_rounds_once() {
        assert_eq!(secs_to_ns(1.5), 1_500_000_000);
        assert_eq!(secs_to_ns(0.1), 100_000_000);
        assert_eq!(secs_to_ns(-2.0), -2 * SECOND);
    }

    #[test]
    fn test_ns_to_secs() {
        assert!((ns_to_secs(2_250_000_000) - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_format_ns() {
        assert_eq!(format_ns(0), "0:00:00.000");
        assert_eq!(format_ns(3_723 * SECOND + 45_000_000), "1:02:03.045");
        assert_eq!(format_ns(-SECOND), "-0:00:01.000");
    }
}
