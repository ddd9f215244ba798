use crate::{
    Config,
    model::{WeatherRequest, WeatherSnapshot},
    provider::open_meteo::OpenMeteoProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod open_meteo;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, request: &WeatherRequest) -> anyhow::Result<WeatherSnapshot>;
}

/// Construct the Open-Meteo provider from config.
pub fn provider_from_config(config: &Config) -> Arc<dyn WeatherProvider> {
    Arc::new(OpenMeteoProvider::new(&config.open_meteo))
}
