//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - The Open-Meteo provider and the weather status classification
//! - A location signal that gates fetching until coordinates are known
//! - Observable, re-fetchable weather resources, memoized per argument pair
//! - Configuration handling
//!
//! It is used by `meteo-cli`, but any async front end can hold a
//! [`WeatherResources`] registry and render from [`WeatherResource::subscribe`].

pub mod config;
pub mod location;
pub mod memo;
pub mod model;
pub mod provider;
pub mod resource;

pub use config::{Config, OpenMeteoConfig, TemperatureUnit};
pub use location::{Location, LocationSignal};
pub use model::{
    WeatherRequest, WeatherSnapshot, WeatherStatus, celsius_to_fahrenheit, weather_status,
};
pub use provider::{WeatherProvider, open_meteo::OpenMeteoProvider, provider_from_config};
pub use resource::{
    CoordinateOverride, ResourceError, ResourceState, WeatherResource, WeatherResources,
};
