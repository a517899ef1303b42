//! Timestamped sensor readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensor signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Vibration amplitude (g).
    Vibration,
    /// Temperature (°C).
    Temperature,
    /// Pressure (psi).
    Pressure,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Self::Vibration, Self::Temperature, Self::Pressure];

    pub fn unit(self) -> &'static str {
        match self {
            Self::Vibration => "g",
            Self::Temperature => "°C",
            Self::Pressure => "psi",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vibration => write!(f, "vibration"),
            Self::Temperature => write!(f, "temperature"),
            Self::Pressure => write!(f, "pressure"),
        }
    }
}

/// A single timestamped sample of all three channels.
///
/// Serializes as `{"timestamp": "<RFC 3339>", "vibration": .., "temperature": .., "pressure": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub vibration: f64,
    pub temperature: f64,
    pub pressure: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, vibration: f64, temperature: f64, pressure: f64) -> Self {
        Self {
            timestamp,
            vibration,
            temperature,
            pressure,
        }
    }

    /// Value of one channel.
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Vibration => self.vibration,
            Channel::Temperature => self.temperature,
            Channel::Pressure => self.pressure,
        }
    }

    /// First channel holding NaN or ±Inf, if any.
    pub fn non_finite_channel(&self) -> Option<Channel> {
        Channel::ALL
            .into_iter()
            .find(|&c| !self.value(c).is_finite())
    }

    pub fn is_finite(&self) -> bool {
        self.non_finite_channel().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_iso8601_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let r = Reading::new(ts, 0.6, 70.0, 30.0);
        let v = serde_json::to_value(r).unwrap();
        assert_eq!(v["timestamp"], "2024-03-01T12:00:00Z");
        assert_eq!(v["vibration"], 0.6);
        assert_eq!(v["temperature"], 70.0);
        assert_eq!(v["pressure"], 30.0);
    }

    #[test]
    fn detects_non_finite_channel() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(Reading::new(ts, 0.5, 60.0, 30.0).is_finite());
        let bad = Reading::new(ts, 0.5, f64::NAN, 30.0);
        assert_eq!(bad.non_finite_channel(), Some(Channel::Temperature));
    }
}
