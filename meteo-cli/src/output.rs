use meteo_core::{TemperatureUnit, WeatherSnapshot};

/// One-line human summary, e.g. `overcast (night), 4.5°C, wind 12.0 km/h`.
pub fn render(snapshot: &WeatherSnapshot, unit: TemperatureUnit) -> String {
    let status = snapshot.weather_status.map_or("unknown", |s| s.as_str());
    let daylight = if snapshot.is_daytime { "day" } else { "night" };
    let temperature = match unit {
        TemperatureUnit::Celsius => format!("{:.1}°C", snapshot.celsius_temp),
        TemperatureUnit::Fahrenheit => format!("{:.1}°F", snapshot.fahrenheit_temp),
    };

    format!("{status} ({daylight}), {temperature}, wind {:.1} km/h", snapshot.wind_speed)
}
