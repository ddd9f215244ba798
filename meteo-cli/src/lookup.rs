use anyhow::{Context, anyhow};
use meteo_core::Location;
use reqwest::Client;
use serde::Deserialize;

/// The only fields read from the lookup service's reply.
#[derive(Debug, Deserialize)]
struct LookupReply {
    latitude: f64,
    longitude: f64,
}

/// Ask `url` where the caller is. Any JSON object with numeric
/// `latitude`/`longitude` fields is accepted (ipapi.co, ipwho.is, ...).
pub async fn fetch_location(url: String) -> anyhow::Result<Location> {
    let res = Client::new()
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to send location lookup to {url}"))?;

    let status = res.status();
    if !status.is_success() {
        return Err(anyhow!("Location lookup at {url} failed with status {status}"));
    }

    let reply: LookupReply =
        res.json().await.with_context(|| format!("Failed to parse location from {url}"))?;

    Ok(Location::new(reply.latitude, reply.longitude))
}
