//! Human-friendly rendering of a snapshot and an optional UV index.

use chrono::{DateTime, TimeZone};
use nowcast_core::{Reading, SnapshotSource, WeatherSnapshot};
use std::fmt::{Display, Write};

pub const UNAVAILABLE_NOTICE: &str = "Unable to retrieve weather data. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvCategory {
    pub fn from_index(index: f64) -> Self {
        match index {
            i if i < 3.0 => Self::Low,
            i if i < 6.0 => Self::Moderate,
            i if i < 8.0 => Self::High,
            i if i < 11.0 => Self::VeryHigh,
            _ => Self::Extreme,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
            Self::Extreme => "Extreme",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Low => {
                "Wear sunglasses on bright days. If you burn easily, cover up and use sunscreen."
            }
            Self::Moderate => {
                "Take precautions - cover up, wear a hat, sunglasses, and sunscreen. \
                 Seek shade during midday hours."
            }
            Self::High => {
                "Protection required - UV damages skin and can cause sunburn. \
                 Reduce time in the sun between 11am-4pm."
            }
            Self::VeryHigh => {
                "Extra protection needed - unprotected skin will be damaged and can burn quickly. \
                 Avoid the sun between 11am-4pm."
            }
            Self::Extreme => {
                "Take all precautions - unprotected skin can burn in minutes. \
                 Avoid the sun between 11am-4pm, wear a hat, sunglasses and sunscreen."
            }
        }
    }
}

/// Append `unit` to numbers only; text and N/A are shown as-is.
fn with_unit(reading: &Reading, unit: &str) -> String {
    match reading {
        Reading::Number(n) => format!("{n}{unit}"),
        Reading::Integer(n) => format!("{n}{unit}"),
        other => other.to_string(),
    }
}

pub fn render<Tz>(
    location: &str,
    now: &DateTime<Tz>,
    snapshot: Option<&WeatherSnapshot>,
    uv_index: Option<f64>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();

    let _ = writeln!(out, "Weather for {location}");
    let _ = writeln!(out, "Last updated: {}", now.format("%B %d, %Y %I:%M %p"));
    let _ = writeln!(out);

    if let Some(index) = uv_index {
        let category = UvCategory::from_index(index);
        let _ = writeln!(out, "UV index: {index:.1} ({})", category.label());
        let _ = writeln!(out, "  {}", category.recommendation());
        let _ = writeln!(out);
    }

    let Some(snapshot) = snapshot else {
        let _ = writeln!(out, "{UNAVAILABLE_NOTICE}");
        return out;
    };

    let _ = writeln!(out, "Temperature: {}", with_unit(&snapshot.temperature_f, "°F"));
    let _ = writeln!(out, "Conditions:  {}", snapshot.description);
    let _ = writeln!(out, "Humidity:    {}", with_unit(&snapshot.humidity_percent, "%"));
    let _ = writeln!(out, "Wind:        {}", with_unit(&snapshot.wind_speed_mph, " mph"));

    let source = match &snapshot.source {
        SnapshotSource::Observation { station } => format!("station {station}"),
        SnapshotSource::Forecast => "forecast".to_string(),
    };
    let _ = writeln!(out, "Source:      {source}");

    out
}
