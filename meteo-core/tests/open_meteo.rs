//! Open-Meteo provider and weather resources against a mock HTTP server.

use std::{sync::Arc, time::Duration};

use meteo_core::{
    Location, LocationSignal, OpenMeteoConfig, OpenMeteoProvider, ResourceError, WeatherProvider,
    WeatherRequest, WeatherResources, WeatherStatus,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn sample_forecast(weathercode: i32, is_day: u8, temperature: f64) -> serde_json::Value {
    serde_json::json!({
        "latitude": 52.52,
        "longitude": 13.419998,
        "generationtime_ms": 0.0629425048828125,
        "utc_offset_seconds": 3600,
        "timezone": "Europe/Berlin",
        "timezone_abbreviation": "CET",
        "elevation": 38.0,
        "current_weather": {
            "temperature": temperature,
            "windspeed": 14.8,
            "winddirection": 251,
            "weathercode": weathercode,
            "is_day": is_day,
            "time": "2024-01-15T12:00"
        },
        "daily_units": {
            "time": "iso8601",
            "sunset": "iso8601",
            "sunrise": "iso8601"
        },
        "daily": {
            "time": ["2024-01-15", "2024-01-16"],
            "sunset": ["2024-01-15T16:30", "2024-01-16T16:32"],
            "sunrise": ["2024-01-15T08:10", "2024-01-16T08:09"]
        }
    })
}

fn provider_for(server: &MockServer) -> OpenMeteoProvider {
    OpenMeteoProvider::new(&OpenMeteoConfig { base_url: server.uri() })
}

async fn mount_forecast(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(response)
        .mount(server)
        .await;
}

const BERLIN: WeatherRequest = WeatherRequest { latitude: 52.52, longitude: 13.41 };

// ============================================================================
// Provider
// ============================================================================

#[tokio::test]
async fn sends_documented_query_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("latitude", "52.52"))
        .and(query_param("longitude", "13.41"))
        .and(query_param("temperature_unit", "celsius"))
        .and(query_param("current_weather", "true"))
        .and(query_param("daily", "sunset,sunrise"))
        .and(query_param("timezone", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast(0, 1, 20.0)))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = provider_for(&server).get_weather(&BERLIN).await.expect("fetch succeeds");

    assert!(snapshot.is_daytime);
    assert_eq!(snapshot.weather_status, Some(WeatherStatus::ClearDay));
    assert_eq!(snapshot.celsius_temp, 20.0);
    assert_eq!(snapshot.fahrenheit_temp, 68.0);
    assert_eq!(snapshot.wind_speed, 14.8);
}

#[tokio::test]
async fn raw_forecast_keeps_daily_sun_times() {
    let server = MockServer::start().await;
    let body = sample_forecast(3, 0, 1.0);
    mount_forecast(&server, ResponseTemplate::new(200).set_body_json(body)).await;

    let forecast = provider_for(&server).fetch_forecast(&BERLIN).await.expect("fetch succeeds");

    let daily = forecast.daily.expect("daily block");
    assert_eq!(daily.sunrise[0], "2024-01-15T08:10");
    assert_eq!(daily.sunset[1], "2024-01-16T16:32");
    assert_eq!(forecast.timezone.as_deref(), Some("Europe/Berlin"));
}

#[tokio::test]
async fn precipitation_codes_map_to_overcast() {
    let server = MockServer::start().await;
    let body = sample_forecast(95, 0, 15.0);
    mount_forecast(&server, ResponseTemplate::new(200).set_body_json(body)).await;

    let snapshot = provider_for(&server).get_weather(&BERLIN).await.expect("fetch succeeds");

    assert!(!snapshot.is_daytime);
    assert_eq!(snapshot.weather_status, Some(WeatherStatus::Overcast));
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let server = MockServer::start().await;
    mount_forecast(&server, ResponseTemplate::new(500).set_body_string("upstream exploded")).await;

    let err = provider_for(&server).get_weather(&BERLIN).await.unwrap_err();
    let msg = err.to_string();

    assert!(msg.contains("500"), "unexpected error: {msg}");
    assert!(msg.contains("upstream exploded"), "unexpected error: {msg}");
}

#[tokio::test]
async fn missing_current_weather_is_a_parse_error() {
    let server = MockServer::start().await;
    mount_forecast(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "latitude": 1.0 })),
    )
    .await;

    let err = provider_for(&server).get_weather(&BERLIN).await.unwrap_err();

    assert!(err.to_string().contains("Failed to parse Open-Meteo forecast JSON"));
}

// ============================================================================
// Resources end to end
// ============================================================================

#[tokio::test]
async fn shared_resource_issues_a_single_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("latitude", "48.85"))
        .and(query_param("longitude", "2.35"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast(1, 1, 12.5)))
        .expect(1)
        .mount(&server)
        .await;

    let registry = WeatherResources::new(
        Arc::new(provider_for(&server)),
        LocationSignal::resolved(Location::new(48.85, 2.35)),
    );

    let first = registry.weather(None, None);
    let second = registry.weather(None, None);
    assert!(first.ptr_eq(&second));

    let a = tokio::time::timeout(Duration::from_secs(5), first.settled()).await.expect("in time");
    let b = tokio::time::timeout(Duration::from_secs(5), second.settled()).await.expect("in time");

    assert_eq!(a.expect("first ok").weather_status, Some(WeatherStatus::CloudyDay));
    assert_eq!(b.expect("second ok").celsius_temp, 12.5);
}

#[tokio::test]
async fn resource_uses_overrides_over_location() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("latitude", "-33.87"))
        .and(query_param("longitude", "151.21"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_forecast(0, 0, 18.0)))
        .expect(1)
        .mount(&server)
        .await;

    let registry = WeatherResources::new(
        Arc::new(provider_for(&server)),
        LocationSignal::resolved(Location::new(48.85, 2.35)),
    );

    let resource = registry.weather(Some(-33.87), Some(151.21));
    let snapshot = tokio::time::timeout(Duration::from_secs(5), resource.settled())
        .await
        .expect("in time")
        .expect("fetch succeeds");

    assert_eq!(snapshot.weather_status, Some(WeatherStatus::ClearNight));
}

#[tokio::test]
async fn failed_request_leaves_no_data() {
    let server = MockServer::start().await;
    mount_forecast(&server, ResponseTemplate::new(503).set_body_string("maintenance")).await;

    let registry = WeatherResources::new(
        Arc::new(provider_for(&server)),
        LocationSignal::resolved(Location::new(48.85, 2.35)),
    );
    let resource = registry.weather(None, None);

    let err = tokio::time::timeout(Duration::from_secs(5), resource.settled())
        .await
        .expect("in time")
        .unwrap_err();

    assert!(matches!(err, ResourceError::Fetch(_)));
    assert!(resource.data().is_none());
    assert!(resource.error().is_some());
}
