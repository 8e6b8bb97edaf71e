use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use nowcast_core::{Config, Coordinate, WeatherProvider, provider_from_config};

use crate::display;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "Current weather from the US National Weather Service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the contact and location stored in the config file.
    Configure,

    /// Show current conditions once.
    Show {
        #[command(flatten)]
        target: Target,

        /// Print the snapshot as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// UV index to display alongside the weather.
        #[arg(long)]
        uv: Option<f64>,
    },

    /// Refresh current conditions periodically.
    Watch {
        #[command(flatten)]
        target: Target,

        /// Minutes between refreshes.
        #[arg(long, default_value_t = 15)]
        interval_mins: u64,

        /// UV index to display alongside the weather.
        #[arg(long)]
        uv: Option<f64>,
    },
}

/// Overrides for the configured location.
#[derive(Debug, clap::Args)]
pub struct Target {
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl Target {
    fn resolve(&self, config: &Config) -> (Coordinate, String) {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => (Coordinate::new(lat, lon), format!("{lat:.4}, {lon:.4}")),
            _ => (config.coordinate(), config.location.name.clone()),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { target, json, uv } => {
                let config = Config::load()?;
                let provider = provider_from_config(&config)?;
                let (coordinate, name) = target.resolve(&config);

                let snapshot = provider.get_weather(coordinate).await;
                if json {
                    let out = serde_json::to_string_pretty(&snapshot)
                        .context("Failed to serialize snapshot")?;
                    println!("{out}");
                } else {
                    let now = chrono::Local::now();
                    print!("{}", display::render(&name, &now, snapshot.as_ref(), uv));
                }
                Ok(())
            }
            Command::Watch {
                target,
                interval_mins,
                uv,
            } => {
                let config = Config::load()?;
                let provider = provider_from_config(&config)?;
                let (coordinate, name) = target.resolve(&config);
                watch(provider.as_ref(), coordinate, &name, interval_mins, uv).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.contact = Text::new("Contact (email or URL) sent to weather.gov:")
        .with_default(&config.contact)
        .prompt()?;
    config.location.name = Text::new("Location name:")
        .with_default(&config.location.name)
        .prompt()?;
    config.location.latitude = CustomType::<f64>::new("Latitude:")
        .with_default(config.location.latitude)
        .with_error_message("Please enter a number, e.g. 42.3834")
        .prompt()?;
    config.location.longitude = CustomType::<f64>::new("Longitude:")
        .with_default(config.location.longitude)
        .with_error_message("Please enter a number, e.g. -83.3527")
        .prompt()?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn watch(
    provider: &dyn WeatherProvider,
    coordinate: Coordinate,
    name: &str,
    interval_mins: u64,
    uv: Option<f64>,
) -> anyhow::Result<()> {
    let period = Duration::from_secs(interval_mins.max(1) * 60);
    let mut ticker = tokio::time::interval(period);

    println!("Refreshing every {} minute(s). Press Ctrl-C to stop.", period.as_secs() / 60);
    loop {
        ticker.tick().await;
        tracing::debug!(?coordinate, "Refreshing");
        let snapshot = provider.get_weather(coordinate).await;
        let now = chrono::Local::now();
        println!("{}", display::render(name, &now, snapshot.as_ref(), uv));
    }
}
