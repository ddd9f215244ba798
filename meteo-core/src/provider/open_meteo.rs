use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    config::OpenMeteoConfig,
    model::{ForecastResponse, WeatherRequest, WeatherSnapshot},
};

use super::WeatherProvider;

/// Client for the keyless Open-Meteo forecast API.
///
/// Documentation: <https://open-meteo.com/en/docs>
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct ForecastQuery {
    latitude: f64,
    longitude: f64,
    temperature_unit: &'static str,
    current_weather: bool,
    daily: &'static str,
    timezone: &'static str,
}

impl ForecastQuery {
    fn current(request: &WeatherRequest) -> Self {
        Self {
            latitude: request.latitude,
            longitude: request.longitude,
            temperature_unit: "celsius",
            current_weather: true,
            daily: "sunset,sunrise",
            timezone: "auto",
        }
    }
}

impl OpenMeteoProvider {
    pub fn new(config: &OpenMeteoConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the raw forecast payload for `request`.
    #[instrument(skip(self, request), fields(lat = request.latitude, lon = request.longitude))]
    pub async fn fetch_forecast(&self, request: &WeatherRequest) -> Result<ForecastResponse> {
        let url = format!("{}/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&ForecastQuery::current(request))
            .send()
            .await
            .context("Failed to send request to Open-Meteo (forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        debug!(bytes = body.len(), "Open-Meteo forecast received");

        serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn get_weather(&self, request: &WeatherRequest) -> Result<WeatherSnapshot> {
        let forecast = self.fetch_forecast(request).await?;
        Ok(WeatherSnapshot::from_current(&forecast.current_weather))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
