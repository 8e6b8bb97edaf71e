//! Core library for the `nowcast` CLI.
//!
//! This crate defines:
//! - A retrying HTTP fetcher for JSON documents
//! - The api.weather.gov grid / station / observation pipeline
//! - Unit conversion and forecast fallback into a [`WeatherSnapshot`]
//! - Configuration stored on disk
//!
//! Each call is self-contained: nothing is cached between calls.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod retry;
pub mod snapshot;

pub use config::{Config, ForecastKind};
pub use error::{FetchError, WeatherError};
pub use model::{Coordinate, GridReference, Reading, SnapshotSource, WeatherSnapshot};
pub use provider::{WeatherProvider, nws::NwsProvider, provider_from_config};
pub use retry::{Fetcher, FetcherSettings, RetryPolicy};

/// One-shot lookup for `coordinate` using `config`.
///
/// Returns `None` when the client cannot be built or no data path succeeded.
pub async fn get_weather(config: &Config, coordinate: Coordinate) -> Option<WeatherSnapshot> {
    match NwsProvider::new(config) {
        Ok(provider) => provider.get_weather(coordinate).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up the weather.gov client");
            None
        }
    }
}
