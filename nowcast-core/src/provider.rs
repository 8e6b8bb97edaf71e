use crate::{
    Config,
    model::{Coordinate, WeatherSnapshot},
    provider::nws::NwsProvider,
};
use anyhow::Context;
use async_trait::async_trait;
use std::fmt::Debug;

pub mod nws;

/// What the presentation layer calls once per render cycle.
///
/// `None` means "data temporarily unavailable"; the cause has already been
/// logged.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, coordinate: Coordinate) -> Option<WeatherSnapshot>;
}

/// Construct the provider described by `config`.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider =
        NwsProvider::new(config).context("Failed to set up the weather.gov client")?;
    Ok(Box::new(provider))
}
