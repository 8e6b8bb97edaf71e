//! The api.weather.gov pipeline.
//!
//! - `/points/{lat},{lon}` gives `.properties.forecast` (or `forecastHourly`)
//!   and `.properties.observationStations`.
//! - The stations URL lists `.features[]`, nearest first, each with
//!   `.properties.stationIdentifier`.
//! - `/stations/{id}/observations/latest` gives `.properties.temperature`,
//!   `.relativeHumidity` and `.windSpeed` as `{unitCode, value}` pairs,
//!   any of which may be null.
//! - The forecast gives `.properties.periods[]`, used only when no
//!   observation can be had.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    config::{Config, ForecastKind},
    error::WeatherError,
    model::{Coordinate, GridReference, RawForecastPeriod, RawObservation, WeatherSnapshot},
    retry::Fetcher,
    snapshot,
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct NwsProvider {
    fetcher: Fetcher,
    base_url: String,
    forecast: ForecastKind,
}

impl NwsProvider {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        Ok(Self {
            fetcher: Fetcher::new(config.fetcher_settings())?,
            base_url: config.base_url().to_string(),
            forecast: config.service.forecast,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        document: &'static str,
    ) -> Result<T, WeatherError> {
        let body = self.fetcher.fetch(url).await?;
        serde_json::from_str(&body)
            .map_err(|e| WeatherError::structural(document, format!("invalid JSON: {e}")))
    }

    /// Map a coordinate to its forecast and stations endpoints.
    pub async fn resolve(&self, coordinate: Coordinate) -> Result<GridReference, WeatherError> {
        let url = format!("{}/points/{}", self.base_url, coordinate.to_query());
        let points: PointsResponse = self.fetch_json(&url, "points").await?;
        points.into_grid(self.forecast)
    }

    /// Nearest station id and its latest reading.
    pub async fn latest_observation(
        &self,
        stations: &StationsResponse,
    ) -> Result<(String, RawObservation), WeatherError> {
        let station = stations.nearest()?;
        let url = format!(
            "{}/stations/{}/observations/latest",
            self.base_url, station
        );
        let observation: ObservationResponse = self.fetch_json(&url, "observation").await?;
        let raw = observation.into_raw()?;
        Ok((station.to_string(), raw))
    }

    pub async fn stations(&self, url: &str) -> Result<StationsResponse, WeatherError> {
        let body = self.fetcher.fetch(url).await?;
        // A malformed list is a gap to fall back over, not a failure.
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unreadable stations document");
            StationsResponse::default()
        }))
    }

    /// Prefer the nearest station's observation; fall back to the first
    /// forecast period when any part of that path comes up empty.
    pub async fn snapshot(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, WeatherError> {
        let grid = self.resolve(coordinate).await?;
        tracing::debug!(?grid, "Resolved grid");

        // Parsed only on the fallback path; a bad forecast never hides a good observation.
        let forecast = self.fetcher.fetch(&grid.forecast_url).await?;
        let stations = self.stations(&grid.stations_url).await?;

        match self.latest_observation(&stations).await {
            Ok((station, observation)) => {
                return Ok(snapshot::from_observation(&station, &observation));
            }
            Err(e) => {
                tracing::warn!(error = %e, "No usable observation, falling back to forecast");
            }
        }

        first_forecast_period(&forecast)?
            .map(|period| snapshot::from_forecast(&period))
            .ok_or(WeatherError::NoData)
    }
}

/// The first period of a forecast document, if it has any.
pub fn first_forecast_period(body: &str) -> Result<Option<RawForecastPeriod>, WeatherError> {
    let forecast: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| WeatherError::structural("forecast", format!("invalid JSON: {e}")))?;
    forecast.into_first_period()
}

#[async_trait]
impl WeatherProvider for NwsProvider {
    async fn get_weather(&self, coordinate: Coordinate) -> Option<WeatherSnapshot> {
        match self.snapshot(coordinate).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::error!(error = %e, "Error retrieving weather data");
                None
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PointsResponse {
    properties: Option<PointsProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    forecast: Option<String>,
    forecast_hourly: Option<String>,
    observation_stations: Option<String>,
}

impl PointsResponse {
    fn into_grid(self, kind: ForecastKind) -> Result<GridReference, WeatherError> {
        let props = self
            .properties
            .ok_or_else(|| WeatherError::structural("points", "missing properties"))?;

        let (forecast, key) = match kind {
            ForecastKind::Standard => (props.forecast, "forecast"),
            ForecastKind::Hourly => (props.forecast_hourly, "forecastHourly"),
        };
        let forecast_url = forecast
            .ok_or_else(|| WeatherError::structural("points", format!("missing properties.{key}")))?;
        let stations_url = props.observation_stations.ok_or_else(|| {
            WeatherError::structural("points", "missing properties.observationStations")
        })?;

        Ok(GridReference {
            forecast_url,
            stations_url,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StationsResponse {
    #[serde(default)]
    features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    properties: Option<StationProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationProperties {
    station_identifier: Option<String>,
}

impl StationsResponse {
    fn nearest(&self) -> Result<&str, WeatherError> {
        let first = self
            .features
            .first()
            .ok_or_else(|| WeatherError::structural("stations", "no stations listed"))?;

        first
            .properties
            .as_ref()
            .and_then(|p| p.station_identifier.as_deref())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                WeatherError::structural("stations", "missing properties.stationIdentifier")
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuantitativeValue {
    value: Option<f64>,
    unit_code: Option<String>,
}

impl QuantitativeValue {
    fn unit_is(&self, suffix: &str) -> bool {
        self.unit_code.as_deref().is_some_and(|u| u.ends_with(suffix))
    }
}

#[derive(Debug, Deserialize)]
struct ObservationResponse {
    properties: Option<ObservationProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationProperties {
    timestamp: Option<DateTime<Utc>>,
    text_description: Option<String>,
    temperature: Option<QuantitativeValue>,
    relative_humidity: Option<QuantitativeValue>,
    wind_speed: Option<QuantitativeValue>,
}

impl ObservationResponse {
    fn into_raw(self) -> Result<RawObservation, WeatherError> {
        let props = self
            .properties
            .ok_or_else(|| WeatherError::structural("observation", "missing properties"))?;

        let temperature_c = props.temperature.and_then(|t| {
            let v = t.value?;
            Some(if t.unit_is("degF") { (v - 32.0) * 5.0 / 9.0 } else { v })
        });
        let wind_speed_ms = props.wind_speed.and_then(|w| {
            let v = w.value?;
            Some(if w.unit_is("km_h-1") { v / 3.6 } else { v })
        });

        Ok(RawObservation {
            temperature_c,
            humidity_percent: props.relative_humidity.and_then(|h| h.value),
            wind_speed_ms,
            text_description: props.text_description,
            timestamp: props.timestamp,
        })
    }
}

/// Any value that fails to deserialize as `T` is treated as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Option<ForecastProperties>,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    /// Kept raw so that only the period actually used has to be readable.
    #[serde(default, deserialize_with = "lenient")]
    periods: Option<Vec<Value>>,
}

/// `temperature` is a plain number, or a `{unitCode, value}` pair when the
/// quantitative-value feature flag is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ForecastTemperature {
    Degrees(f64),
    Quantity { value: Option<f64> },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ForecastPeriod {
    #[serde(deserialize_with = "lenient")]
    start_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "lenient")]
    temperature: Option<ForecastTemperature>,
    #[serde(deserialize_with = "lenient")]
    short_forecast: Option<String>,
    #[serde(deserialize_with = "lenient")]
    wind_speed: Option<String>,
}

impl ForecastResponse {
    fn into_first_period(self) -> Result<Option<RawForecastPeriod>, WeatherError> {
        let Some(first) = self
            .properties
            .and_then(|p| p.periods)
            .and_then(|periods| periods.into_iter().next())
        else {
            return Ok(None);
        };

        let period: ForecastPeriod = serde_json::from_value(first)
            .map_err(|e| WeatherError::structural("forecast", format!("unreadable period: {e}")))?;

        let temperature_f = period.temperature.and_then(|t| match t {
            ForecastTemperature::Degrees(v) => Some(v),
            ForecastTemperature::Quantity { value } => value,
        });

        Ok(Some(RawForecastPeriod {
            temperature_f,
            short_forecast: period.short_forecast,
            wind_speed_text: period.wind_speed,
            start_time: period.start_time,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).expect("document must deserialize")
    }

    #[test]
    fn grid_from_points() {
        let points: PointsResponse = parse(json!({
            "properties": {
                "forecast": "https://api.weather.gov/gridpoints/DTX/57,35/forecast",
                "forecastHourly": "https://api.weather.gov/gridpoints/DTX/57,35/forecast/hourly",
                "observationStations": "https://api.weather.gov/gridpoints/DTX/57,35/stations"
            }
        }));
        let grid = points.into_grid(ForecastKind::Standard).unwrap();

        assert_eq!(
            grid.forecast_url,
            "https://api.weather.gov/gridpoints/DTX/57,35/forecast"
        );
        assert_eq!(
            grid.stations_url,
            "https://api.weather.gov/gridpoints/DTX/57,35/stations"
        );
    }

    #[test]
    fn hourly_grid_uses_hourly_forecast() {
        let points: PointsResponse = parse(json!({
            "properties": {
                "forecast": "https://a/forecast",
                "forecastHourly": "https://a/forecast/hourly",
                "observationStations": "https://a/stations"
            }
        }));
        let grid = points.into_grid(ForecastKind::Hourly).unwrap();
        assert_eq!(grid.forecast_url, "https://a/forecast/hourly");
    }

    #[test]
    fn grid_without_forecast_is_structural() {
        let points: PointsResponse = parse(json!({
            "properties": { "observationStations": "https://a/stations" }
        }));
        let err = points.into_grid(ForecastKind::Standard).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("properties.forecast"));

        let points: PointsResponse = parse(json!({ "status": 404 }));
        assert!(points.into_grid(ForecastKind::Standard).unwrap_err().is_structural());
    }

    #[test]
    fn grid_without_stations_is_structural() {
        let points: PointsResponse = parse(json!({
            "properties": { "forecast": "https://a/forecast" }
        }));
        let err = points.into_grid(ForecastKind::Standard).unwrap_err();
        assert!(err.to_string().contains("observationStations"));
    }

    #[test]
    fn nearest_station_is_first() {
        let stations: StationsResponse = parse(json!({
            "features": [
                { "properties": { "stationIdentifier": "KDET" } },
                { "properties": { "stationIdentifier": "KDTW" } }
            ]
        }));
        assert_eq!(stations.nearest().unwrap(), "KDET");
    }

    #[test]
    fn empty_station_list() {
        let stations: StationsResponse = parse(json!({ "features": [] }));
        assert!(stations.features.is_empty());
        assert!(stations.nearest().is_err());

        let stations: StationsResponse = parse(json!({}));
        assert!(stations.features.is_empty());
    }

    #[test]
    fn station_without_identifier() {
        let stations: StationsResponse = parse(json!({
            "features": [ { "properties": {} } ]
        }));
        assert!(stations.nearest().unwrap_err().is_structural());
    }

    #[test]
    fn observation_nulls_are_absent() {
        let obs: ObservationResponse = parse(json!({
            "properties": {
                "timestamp": "2026-10-16T14:51:00+00:00",
                "textDescription": "Clear",
                "temperature": { "unitCode": "wmoUnit:degC", "value": 20.0 },
                "relativeHumidity": { "unitCode": "wmoUnit:percent", "value": null },
                "windSpeed": { "unitCode": "wmoUnit:m_s-1", "value": 5.0 }
            }
        }));
        let raw = obs.into_raw().unwrap();

        assert_eq!(raw.temperature_c, Some(20.0));
        assert_eq!(raw.humidity_percent, None);
        assert_eq!(raw.wind_speed_ms, Some(5.0));
        assert_eq!(raw.text_description.as_deref(), Some("Clear"));
        assert!(raw.timestamp.is_some());
    }

    #[test]
    fn observation_units_are_normalized() {
        let obs: ObservationResponse = parse(json!({
            "properties": {
                "temperature": { "unitCode": "wmoUnit:degF", "value": 68.0 },
                "windSpeed": { "unitCode": "wmoUnit:km_h-1", "value": 18.0 }
            }
        }));
        let raw = obs.into_raw().unwrap();

        assert_eq!(raw.temperature_c, Some(20.0));
        assert_eq!(raw.wind_speed_ms, Some(5.0));
    }

    #[test]
    fn fast_wind_in_km_h_rounds_up() {
        let obs: ObservationResponse = parse(json!({
            "properties": {
                "windSpeed": { "unitCode": "wmoUnit:km_h-1", "value": 180.0 }
            }
        }));
        let raw = obs.into_raw().unwrap();
        let snapshot = snapshot::from_observation("KDET", &raw);

        assert_eq!(
            snapshot.wind_speed_mph,
            crate::model::Reading::Number(111.9)
        );
    }

    #[test]
    fn observation_without_properties_is_structural() {
        let obs: ObservationResponse = parse(json!({ "type": "Feature" }));
        assert!(obs.into_raw().unwrap_err().is_structural());
    }

    #[test]
    fn first_forecast_period_is_extracted() {
        let body = json!({
            "properties": {
                "periods": [
                    {
                        "startTime": "2026-10-16T10:00:00-04:00",
                        "temperature": 72,
                        "shortForecast": "Sunny",
                        "windSpeed": "5 mph"
                    },
                    { "temperature": 60, "shortForecast": "Clear", "windSpeed": "2 mph" }
                ]
            }
        });
        let period = first_forecast_period(&body.to_string()).unwrap().unwrap();

        assert_eq!(period.temperature_f, Some(72.0));
        assert_eq!(period.short_forecast.as_deref(), Some("Sunny"));
        assert_eq!(period.wind_speed_text.as_deref(), Some("5 mph"));
        assert_eq!(
            period.start_time.map(|t| t.to_rfc3339()),
            Some("2026-10-16T14:00:00+00:00".to_string())
        );
    }

    #[test]
    fn forecast_without_periods_has_no_period() {
        assert_eq!(first_forecast_period(r#"{"properties": {}}"#).unwrap(), None);
        assert_eq!(first_forecast_period("{}").unwrap(), None);
        assert_eq!(
            first_forecast_period(r#"{"properties": {"periods": "soon"}}"#).unwrap(),
            None
        );
    }

    #[test]
    fn mistyped_period_fields_are_absent() {
        let body = json!({
            "properties": {
                "periods": [
                    {
                        "startTime": "yesterday",
                        "temperature": "warm",
                        "shortForecast": 7,
                        "windSpeed": null
                    }
                ]
            }
        });
        let period = first_forecast_period(&body.to_string()).unwrap().unwrap();
        assert_eq!(period, RawForecastPeriod::default());
    }

    #[test]
    fn fractional_and_quantity_temperatures() {
        let body = json!({
            "properties": { "periods": [ { "temperature": 72.5 } ] }
        });
        let period = first_forecast_period(&body.to_string()).unwrap().unwrap();
        assert_eq!(period.temperature_f, Some(72.5));

        let body = json!({
            "properties": {
                "periods": [ { "temperature": { "unitCode": "wmoUnit:degF", "value": 64 } } ]
            }
        });
        let period = first_forecast_period(&body.to_string()).unwrap().unwrap();
        assert_eq!(period.temperature_f, Some(64.0));
    }

    #[test]
    fn unreadable_forecast_is_structural() {
        assert!(first_forecast_period("<html>").unwrap_err().is_structural());
        assert!(
            first_forecast_period(r#"{"properties": {"periods": [42]}}"#)
                .unwrap_err()
                .is_structural()
        );
    }
}
