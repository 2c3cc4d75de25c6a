//! Shared fixtures for the wiremock-backed tests.

#![allow(dead_code)]

use std::sync::Arc;

use skycast_core::Config;
use skycast_weather::{FetchClient, MemoryPreferences, TtlCache, WeatherService};
use wiremock::MockServer;

/// Config pointing both provider APIs at the mock server
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.provider.base_url = server.uri();
    config.provider.geo_url = server.uri();
    config.provider.api_key = Some("test-key".to_string());
    config.provider.timeout_secs = 5;
    config.dashboard.default_locations = vec!["London".to_string()];
    config.search.debounce_ms = 50;
    config
}

pub fn client_for(server: &MockServer) -> Arc<FetchClient> {
    let config = config_for(server);
    Arc::new(FetchClient::new(&config.provider, Arc::new(TtlCache::new())).unwrap())
}

pub fn service_for(server: &MockServer) -> Arc<WeatherService> {
    service_with(config_for(server))
}

pub fn service_with(config: Config) -> Arc<WeatherService> {
    Arc::new(WeatherService::new(&config, Arc::new(MemoryPreferences::new())).unwrap())
}

/// `/weather` response body
pub fn current_json(id: u64, name: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
        "main": {
            "temp": temp,
            "feels_like": temp - 1.0,
            "temp_min": temp - 2.0,
            "temp_max": temp + 2.0,
            "pressure": 1012,
            "humidity": 55
        },
        "wind": { "speed": 4.2 },
        "sys": { "country": "GB", "sunrise": 1714537800, "sunset": 1714591800 },
        "visibility": 10000
    })
}

/// `/forecast` response body with `count` three-hourly entries
pub fn forecast_json(id: u64, name: &str, count: usize) -> serde_json::Value {
    let start = 1714543200i64;
    let list: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "dt": start + (i as i64) * 10800,
                "dt_txt": "",
                "main": { "temp": 15.0 + i as f64, "temp_min": 14.0, "temp_max": 18.0, "pressure": 1010, "humidity": 60 },
                "weather": [{ "id": 500, "description": "light rain", "icon": "10d" }],
                "wind": { "speed": 3.0 }
            })
        })
        .collect();

    serde_json::json!({
        "cod": "200",
        "cnt": count,
        "list": list,
        "city": { "id": id, "name": name, "country": "GB" }
    })
}

/// `/direct` response body
pub fn geocode_json(names: &[&str]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            serde_json::json!({
                "name": name,
                "country": "FR",
                "lat": 48.5 + i as f64,
                "lon": 2.35
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}
