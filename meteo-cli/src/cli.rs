use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Select, validator::Validation};
use meteo_core::{
    Config, Location, LocationSignal, ResourceState, TemperatureUnit, WeatherResources,
    WeatherSnapshot, provider_from_config,
};
use tracing::info;

use crate::{lookup, output};

/// How long `show` waits for the location and the first forecast.
const SHOW_TIMEOUT: Duration = Duration::from_secs(60);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Current weather from Open-Meteo")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the home location and display unit.
    Configure,

    /// Show current weather once.
    Show {
        #[command(flatten)]
        coords: Coordinates,

        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Keep re-fetching and print every change. Stops on Ctrl-C.
    Watch {
        #[command(flatten)]
        coords: Coordinates,

        /// Seconds between re-fetches.
        #[arg(long, default_value_t = 600)]
        every: u64,
    },
}

/// Coordinates that take precedence over the configured home location.
#[derive(Debug, Clone, Copy, Args)]
pub struct Coordinates {
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
}

impl Coordinates {
    /// Location the resource waits on: home if configured, else a full override pair,
    /// else whatever `lookup_url` reports.
    fn location_signal(&self, config: &Config) -> anyhow::Result<LocationSignal> {
        if let Some(home) = config.home {
            return Ok(LocationSignal::resolved(home));
        }

        match (self.latitude, self.longitude, &config.lookup_url) {
            (Some(latitude), Some(longitude), _) => {
                Ok(LocationSignal::resolved(Location::new(latitude, longitude)))
            }
            (_, _, Some(url)) => {
                Ok(LocationSignal::resolve_with(lookup::fetch_location(url.clone())))
            }
            _ => config.home_location().map(LocationSignal::resolved),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { coords, json } => show(coords, json).await,
            Command::Watch { coords, every } => watch(coords, every).await,
        }
    }
}

fn registry_for(config: &Config, coords: &Coordinates) -> anyhow::Result<WeatherResources> {
    Ok(WeatherResources::new(provider_from_config(config), coords.location_signal(config)?))
}

async fn show(coords: Coordinates, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let registry = registry_for(&config, &coords)?;

    let resource = registry.weather(coords.latitude, coords.longitude);
    let snapshot = tokio::time::timeout(SHOW_TIMEOUT, resource.settled())
        .await
        .context("Timed out waiting for a location and forecast")?
        .context("Could not get current weather")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", output::render(&snapshot, config.unit));
    }

    Ok(())
}

async fn watch(coords: Coordinates, every: u64) -> anyhow::Result<()> {
    let config = Config::load()?;
    let registry = registry_for(&config, &coords)?;
    let resource = registry.weather(coords.latitude, coords.longitude);

    let mut updates = resource.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(every.max(1)));
    // The resource fetches on its own at start; skip the immediate tick.
    ticker.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_printed: Option<WeatherSnapshot> = None;

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl-C")?;
                info!("Stopping weather watch");
                break;
            }
            _ = ticker.tick() => resource.refetch()?,
            changed = updates.changed() => {
                changed.context("Weather resource stopped")?;
                let state = updates.borrow_and_update().clone();
                let stamp = Local::now().format("%H:%M:%S");

                match state {
                    ResourceState::Ready(snapshot) if last_printed != Some(snapshot) => {
                        println!("[{stamp}] {}", output::render(&snapshot, config.unit));
                        last_printed = Some(snapshot);
                    }
                    ResourceState::Errored(err) => eprintln!("[{stamp}] {err}"),
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let home = config.home;

    let latitude = coordinate_prompt("Home latitude:", 90.0, home.map(|h| h.latitude))?;
    let longitude = coordinate_prompt("Home longitude:", 180.0, home.map(|h| h.longitude))?;

    let units = TemperatureUnit::all().to_vec();
    let cursor = units.iter().position(|u| *u == config.unit).unwrap_or(0);
    let unit = Select::new("Temperature unit:", units).with_starting_cursor(cursor).prompt()?;

    config.set_home(Location::new(latitude, longitude));
    config.unit = unit;

    let path = config.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

fn coordinate_prompt(message: &str, bound: f64, default: Option<f64>) -> anyhow::Result<f64> {
    let mut prompt = CustomType::<f64>::new(message)
        .with_error_message("Please type a decimal number")
        .with_validator(move |value: &f64| {
            if (-bound..=bound).contains(value) {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(format!("Must be between -{bound} and {bound}").into()))
            }
        });

    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }

    Ok(prompt.prompt()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    fn coords(latitude: Option<f64>, longitude: Option<f64>) -> Coordinates {
        Coordinates { latitude, longitude }
    }

    #[test]
    fn home_wins_when_configured() {
        let mut config = Config::default();
        config.set_home(Location::new(1.0, 2.0));

        let signal = coords(Some(5.0), Some(6.0)).location_signal(&config).expect("signal");
        assert_eq!(signal.current(), Some(Location::new(1.0, 2.0)));
    }

    #[test]
    fn full_override_pair_stands_in_for_missing_home() {
        let signal = coords(Some(5.0), Some(-6.0))
            .location_signal(&Config::default())
            .expect("signal");

        assert_eq!(signal.current(), Some(Location::new(5.0, -6.0)));
    }

    #[test]
    fn partial_override_without_home_is_an_error() {
        let err = coords(Some(5.0), None).location_signal(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No home location configured"));
    }

    #[tokio::test]
    async fn lookup_url_resolves_missing_home() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 48.85,
                "longitude": 2.35
            })))
            .mount(&server)
            .await;

        let config = Config { lookup_url: Some(server.uri()), ..Config::default() };
        let signal = coords(Some(5.0), None).location_signal(&config).expect("signal");

        let mut rx = signal.subscribe();
        let seen = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(Option::is_some))
            .await
            .expect("lookup timed out")
            .expect("signal dropped")
            .clone();

        assert_eq!(seen, Some(Location::new(48.85, 2.35)));
    }

    #[tokio::test]
    async fn override_pair_skips_lookup() {
        let config = Config {
            lookup_url: Some("http://127.0.0.1:9/unused".to_string()),
            ..Config::default()
        };

        let signal = coords(Some(5.0), Some(6.0)).location_signal(&config).expect("signal");
        assert_eq!(signal.current(), Some(Location::new(5.0, 6.0)));
    }

    #[test]
    fn parses_negative_coordinates() {
        let args = ["meteo", "show", "--latitude", "-33.87", "--longitude", "151.21"];
        let cli = Cli::try_parse_from(args).expect("parse");

        match cli.command {
            Command::Show { coords, json } => {
                assert_eq!(coords.latitude, Some(-33.87));
                assert_eq!(coords.longitude, Some(151.21));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn watch_defaults_to_ten_minutes() {
        let cli = Cli::try_parse_from(["meteo", "watch"]).expect("parse");
        assert!(matches!(cli.command, Command::Watch { every: 600, .. }));
    }
}
