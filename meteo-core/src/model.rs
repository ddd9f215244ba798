use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Coordinates of a single outbound forecast call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Location> for WeatherRequest {
    fn from(location: Location) -> Self {
        Self { latitude: location.latitude, longitude: location.longitude }
    }
}

/// Open-Meteo `/v1/forecast` payload for `current_weather=true&daily=sunset,sunrise`.
///
/// Only `current_weather` is required; the rest is informational.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub generationtime_ms: Option<f64>,
    pub utc_offset_seconds: Option<i64>,
    pub timezone: Option<String>,
    pub timezone_abbreviation: Option<String>,
    pub elevation: Option<f64>,
    pub current_weather: CurrentWeather,
    pub daily_units: Option<DailyUnits>,
    pub daily: Option<Daily>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub temperature: f64,
    pub windspeed: f64,
    pub winddirection: f64,
    pub weathercode: i32,
    pub is_day: u8,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyUnits {
    pub time: String,
    pub sunset: String,
    pub sunrise: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Daily {
    pub time: Vec<String>,
    pub sunset: Vec<String>,
    pub sunrise: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherStatus {
    ClearDay,
    ClearNight,
    CloudyDay,
    CloudyNight,
    Overcast,
    LightRain,
    HeavyRain,
    Snow,
    Thunder,
}

impl WeatherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherStatus::ClearDay => "clear_day",
            WeatherStatus::ClearNight => "clear_night",
            WeatherStatus::CloudyDay => "cloudy_day",
            WeatherStatus::CloudyNight => "cloudy_night",
            WeatherStatus::Overcast => "overcast",
            WeatherStatus::LightRain => "light_rain",
            WeatherStatus::HeavyRain => "heavy_rain",
            WeatherStatus::Snow => "snow",
            WeatherStatus::Thunder => "thunder",
        }
    }
}

impl std::fmt::Display for WeatherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simplified view of the current conditions, rebuilt on every successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub is_daytime: bool,
    pub weather_status: Option<WeatherStatus>,
    pub celsius_temp: f64,
    pub fahrenheit_temp: f64,
    pub wind_speed: f64,
}

impl WeatherSnapshot {
    pub fn from_current(current: &CurrentWeather) -> Self {
        let is_daytime = current.is_day == 1;

        Self {
            is_daytime,
            weather_status: weather_status(current.weathercode, is_daytime),
            celsius_temp: current.temperature,
            fahrenheit_temp: celsius_to_fahrenheit(current.temperature),
            wind_speed: current.windspeed,
        }
    }
}

/// Map a WMO weather code onto a [`WeatherStatus`].
///
/// Arms are checked in order and the first match wins, so `code >= 3`
/// swallows every precipitation arm below it. Those arms never fire; they
/// are kept so the thresholds stay visible next to the live ones.
///
/// See <https://open-meteo.com/en/docs#weathervariables>.
#[allow(clippy::if_same_then_else)]
pub fn weather_status(code: i32, is_daytime: bool) -> Option<WeatherStatus> {
    if code == 0 {
        Some(if is_daytime { WeatherStatus::ClearDay } else { WeatherStatus::ClearNight })
    } else if code == 1 || code == 2 {
        Some(if is_daytime { WeatherStatus::CloudyDay } else { WeatherStatus::CloudyNight })
    } else if code >= 3 {
        Some(WeatherStatus::Overcast)
    } else if code >= 51 {
        Some(WeatherStatus::LightRain)
    } else if code >= 63 {
        Some(WeatherStatus::HeavyRain)
    } else if code >= 71 {
        Some(WeatherStatus::Snow)
    } else if code >= 80 {
        Some(WeatherStatus::HeavyRain)
    } else if code >= 85 {
        Some(WeatherStatus::Snow)
    } else if code >= 95 {
        Some(WeatherStatus::Snow)
    } else {
        None
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
