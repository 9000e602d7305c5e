//! Remote TempBuddy sensor protocol.
//!
//! Newer sensors answer `GET /api/info` with a small JSON object; older
//! ones return an HTML page with `Temperature: 72.5&deg;F` somewhere in it.
//! Both are reduced to a Fahrenheit reading here.

use serde::{Deserialize, Serialize};

use crate::{
    text::{parse_by_keyword, parse_float, trim},
    types::TempUnit,
};

pub const SENSOR_INFO_PATH: &str = "/api/info";
pub const SENSOR_POLL_INTERVAL_MS: u64 = 60_000;

const LEGACY_KEYWORD: &str = "Temperature:";
const LEGACY_TERMINATOR: &str = "&deg;";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub temp: f32,
    pub temp_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
}

impl SensorInfo {
    pub fn new(temp: f32, unit: TempUnit) -> Self {
        Self {
            temp,
            temp_unit: unit.as_str().to_string(),
            humidity: None,
        }
    }

    /// Reading in Fahrenheit, or `None` for an unknown unit tag.
    pub fn fahrenheit(&self) -> Option<f32> {
        if !self.temp.is_finite() {
            return None;
        }
        match TempUnit::from_tag(&self.temp_unit)? {
            TempUnit::Fahrenheit => Some(self.temp),
            TempUnit::Celsius => Some(celsius_to_fahrenheit(self.temp)),
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn parse_json_reading(body: &str) -> Option<f32> {
    serde_json::from_str::<SensorInfo>(body).ok()?.fahrenheit()
}

/// `Temperature: <value>&deg;<unit>`; a `C` after the terminator means
/// Celsius, anything else is taken as Fahrenheit.
pub fn parse_legacy_reading(body: &str) -> Option<f32> {
    let value = parse_float(trim(parse_by_keyword(body, LEGACY_KEYWORD, LEGACY_TERMINATOR)))?;

    let unit = body
        .find(LEGACY_KEYWORD)
        .map(|index| &body[index..])
        .and_then(|rest| rest.find(LEGACY_TERMINATOR).map(|end| &rest[end + LEGACY_TERMINATOR.len()..]))
        .and_then(|tail| tail.chars().next());

    match unit {
        Some('C') | Some('c') => Some(celsius_to_fahrenheit(value)),
        _ => Some(value),
    }
}

/// JSON first, then the legacy text form.
pub fn parse_reading(body: &str) -> Option<f32> {
    parse_json_reading(body).or_else(|| parse_legacy_reading(body))
}

/// A sensor address counts as configured when it is non-blank and not the
/// all-zero placeholder.
pub fn is_sensor_configured(sensor_ip: &str) -> bool {
    let ip = trim(sensor_ip);
    !ip.is_empty() && ip != "0.0.0.0"
}

/// Limits outbound sensor polls to one per interval. The first poll is
/// always due.
#[derive(Debug, Clone)]
pub struct PollThrottle {
    interval_ms: u64,
    last_poll_ms: Option<u64>,
}

impl Default for PollThrottle {
    fn default() -> Self {
        Self::new(SENSOR_POLL_INTERVAL_MS)
    }
}

impl PollThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_poll_ms: None,
        }
    }

    /// Returns `true` and records the attempt when a poll may go out now.
    pub fn poll_due(&mut self, now_ms: u64) -> bool {
        let due = match self.last_poll_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if due {
            self.last_poll_ms = Some(now_ms);
        }
        due
    }

    /// Makes the next call to [`poll_due`](Self::poll_due) succeed.
    pub fn reset(&mut self) {
        self.last_poll_ms = None;
    }

    pub fn last_poll_ms(&self) -> Option<u64> {
        self.last_poll_ms
    }
}
