use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// `lat,lon` with the 4 decimal places the points endpoint expects.
    pub fn to_query(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Forecast and observation-stations endpoints for one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridReference {
    pub forecast_url: String,
    pub stations_url: String,
}

/// Latest station reading, already normalized to Celsius and m/s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawObservation {
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub text_description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One forecast block; only the first one is ever used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawForecastPeriod {
    /// Fahrenheit as published; normally a whole number.
    pub temperature_f: Option<f64>,
    pub short_forecast: Option<String>,
    pub wind_speed_text: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

/// A display value that may be missing.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(f64),
    /// A whole number passed through as published, e.g. forecast degrees.
    Integer(i64),
    /// Pre-formatted text passed through verbatim, e.g. `"10 mph"`.
    Text(String),
    NotAvailable,
}

impl Reading {
    pub const NOT_AVAILABLE: &'static str = "N/A";
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Reading::NotAvailable, Reading::Number)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(n) => write!(f, "{n}"),
            Reading::Integer(n) => write!(f, "{n}"),
            Reading::Text(s) => f.write_str(s),
            Reading::NotAvailable => f.write_str(Self::NOT_AVAILABLE),
        }
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Number(n) => serializer.serialize_f64(*n),
            Reading::Integer(n) => serializer.serialize_i64(*n),
            Reading::Text(s) => serializer.serialize_str(s),
            Reading::NotAvailable => serializer.serialize_str(Self::NOT_AVAILABLE),
        }
    }
}

/// Where the values of a snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSource {
    Observation { station: String },
    Forecast,
}

/// The normalized, display-ready current conditions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature_f: Reading,
    pub description: String,
    pub humidity_percent: Reading,
    pub wind_speed_mph: Reading,
    pub source: SnapshotSource,
    pub observed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_query_uses_four_decimals() {
        let c = Coordinate::new(42.38343, -83.352749);
        assert_eq!(c.to_query(), "42.3834,-83.3527");

        let c = Coordinate::new(40.0, -105.5);
        assert_eq!(c.to_query(), "40.0000,-105.5000");
    }

    #[test]
    fn reading_display() {
        assert_eq!(Reading::Number(68.0).to_string(), "68");
        assert_eq!(Reading::Number(11.2).to_string(), "11.2");
        assert_eq!(Reading::Integer(72).to_string(), "72");
        assert_eq!(Reading::Text("5 mph".into()).to_string(), "5 mph");
        assert_eq!(Reading::NotAvailable.to_string(), "N/A");
    }

    #[test]
    fn snapshot_serializes_absent_fields_as_marker() {
        let snapshot = WeatherSnapshot {
            temperature_f: Reading::Integer(72),
            description: "Sunny".into(),
            humidity_percent: Reading::NotAvailable,
            wind_speed_mph: Reading::Text("5 mph".into()),
            source: SnapshotSource::Forecast,
            observed_at: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["temperature_f"], serde_json::json!(72));
        assert!(!json.to_string().contains("72.0"));
        assert_eq!(json["humidity_percent"], "N/A");
        assert_eq!(json["wind_speed_mph"], "5 mph");
        assert_eq!(json["source"]["kind"], "forecast");
    }
}
