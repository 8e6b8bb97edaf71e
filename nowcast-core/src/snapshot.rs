//! Unit conversion and per-field fallback into a [`WeatherSnapshot`].

use crate::model::{RawForecastPeriod, RawObservation, Reading, SnapshotSource, WeatherSnapshot};

pub const NO_DESCRIPTION: &str = "No description available";

const MS_TO_MPH: f64 = 2.237;

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    round_to(c * 9.0 / 5.0 + 32.0, 1)
}

pub fn ms_to_mph(ms: f64) -> f64 {
    round_to(ms * MS_TO_MPH, 1)
}

/// Round the exact binary value to `places` decimals, ties to even.
///
/// Decimal formatting rounds from the stored value itself; scaling by a
/// power of ten first would round twice.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

/// Whole forecast degrees stay integers; anything else is kept as published.
fn forecast_degrees(value: f64) -> Reading {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Reading::Integer(value as i64)
    } else {
        Reading::Number(value)
    }
}

fn description(text: Option<&str>) -> String {
    match text.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NO_DESCRIPTION.to_string(),
    }
}

/// High-fidelity snapshot from a station reading.
pub fn from_observation(station: &str, obs: &RawObservation) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature_f: obs.temperature_c.map(celsius_to_fahrenheit).into(),
        description: description(obs.text_description.as_deref()),
        humidity_percent: obs.humidity_percent.map(|h| round_to(h, 0)).into(),
        wind_speed_mph: obs.wind_speed_ms.map(ms_to_mph).into(),
        source: SnapshotSource::Observation {
            station: station.to_string(),
        },
        observed_at: obs.timestamp,
    }
}

/// Coarser snapshot from a forecast period. Forecasts carry no humidity.
pub fn from_forecast(period: &RawForecastPeriod) -> WeatherSnapshot {
    let wind_speed_mph = match period.wind_speed_text.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Reading::Text(s.to_string()),
        _ => Reading::NotAvailable,
    };

    WeatherSnapshot {
        temperature_f: period
            .temperature_f
            .map_or(Reading::NotAvailable, forecast_degrees),
        description: description(period.short_forecast.as_deref()),
        humidity_percent: Reading::NotAvailable,
        wind_speed_mph,
        source: SnapshotSource::Forecast,
        observed_at: period.start_time,
    }
}
