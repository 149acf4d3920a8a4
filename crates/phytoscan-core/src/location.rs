//! Best-effort location attached to a verified submission.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a location fix was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Exif,
    #[default]
    DeviceGps,
    Manual,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::DeviceGps => "device_gps",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub source: LocationSource,
    /// Horizontal accuracy in metres, when the provider reports one.
    pub accuracy: Option<f64>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl LocationData {
    pub fn new(latitude: f64, longitude: f64, source: LocationSource) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
            source,
            accuracy: None,
            captured_at: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// `lat, lon` with four decimals.
    pub fn coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Address when known, otherwise the coordinates.
    pub fn display_label(&self) -> String {
        match &self.address {
            Some(address) if !address.is_empty() => address.clone(),
            _ => self.coordinates(),
        }
    }
}

/// Convert an EXIF degrees/minutes/seconds triple to decimal degrees.
///
/// Southern and western references produce negative values.
pub fn dms_to_decimal(dms: [f64; 3], reference: &str) -> f64 {
    let dd = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
    match reference.trim() {
        "S" | "W" | "s" | "w" => -dd,
        _ => dd,
    }
}

/// Parse an EXIF `DateTime` tag (`YYYY:MM:DD HH:MM:SS`), treated as UTC.
pub fn parse_exif_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_north_east_is_positive() {
        let lat = dms_to_decimal([14.0, 35.0, 24.0], "N");
        assert!((lat - 14.59).abs() < 1e-9);
    }

    #[test]
    fn dms_south_west_is_negative() {
        assert!(dms_to_decimal([33.0, 52.0, 0.0], "S") < 0.0);
        assert!(dms_to_decimal([151.0, 12.0, 0.0], "W") < 0.0);
    }

    #[test]
    fn exif_timestamp_parses() {
        let ts = parse_exif_timestamp("2024:06:12 08:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-06-12T08:30:00+00:00");
        assert!(parse_exif_timestamp("yesterday").is_none());
    }

    #[test]
    fn display_label_prefers_address() {
        let loc = LocationData::new(14.5995, 120.9842, LocationSource::DeviceGps);
        assert_eq!(loc.display_label(), "14.5995, 120.9842");
        let loc = loc.with_address("Manila, Metro Manila");
        assert_eq!(loc.display_label(), "Manila, Metro Manila");
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&LocationSource::DeviceGps).unwrap();
        assert_eq!(json, "\"device_gps\"");
    }
}
