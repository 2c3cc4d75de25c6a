//! OpenWeatherMap client with a read-through TTL cache.
//!
//! Every lookup swallows provider failures: callers get `None` (or an empty
//! suggestion list) and the failure is logged.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use skycast_core::ProviderConfig;

use crate::cache::{CacheKey, TtlCache};
use crate::types::{
    Condition, FetchError, ForecastCity, ForecastPoint, ForecastSeries, GeoSuggestion,
    UnitSystem, WeatherSnapshot,
};

const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

/// Payload stored in the fetch cache
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Current(WeatherSnapshot),
    Forecast(ForecastSeries),
    Geocode(Vec<GeoSuggestion>),
}

/// A lookup result: decoded from a provider response, stored in the cache.
trait Cacheable: Clone + Sized {
    /// Response body as sent by the provider
    type Raw: DeserializeOwned;

    fn from_raw(raw: Self::Raw) -> Result<Self, FetchError>;
    fn into_payload(self) -> CachedPayload;
    fn from_payload(payload: CachedPayload) -> Option<Self>;
}

impl Cacheable for WeatherSnapshot {
    type Raw = ApiCurrent;

    fn from_raw(raw: ApiCurrent) -> Result<Self, FetchError> {
        Self::try_from(raw)
    }

    fn into_payload(self) -> CachedPayload {
        CachedPayload::Current(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Current(s) => Some(s),
            _ => None,
        }
    }
}

impl Cacheable for ForecastSeries {
    type Raw = ApiForecast;

    fn from_raw(raw: ApiForecast) -> Result<Self, FetchError> {
        Self::try_from(raw)
    }

    fn into_payload(self) -> CachedPayload {
        CachedPayload::Forecast(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Forecast(f) => Some(f),
            _ => None,
        }
    }
}

impl Cacheable for Vec<GeoSuggestion> {
    type Raw = Vec<GeoSuggestion>;

    fn from_raw(raw: Vec<GeoSuggestion>) -> Result<Self, FetchError> {
        Ok(raw)
    }

    fn into_payload(self) -> CachedPayload {
        CachedPayload::Geocode(self)
    }

    fn from_payload(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Geocode(g) => Some(g),
            _ => None,
        }
    }
}

// Provider response shapes

#[derive(Debug, Deserialize)]
struct ApiCondition {
    id: u32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    feels_like: Option<f64>,
    temp_min: f64,
    temp_max: f64,
    pressure: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct ApiWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ApiSys {
    country: Option<String>,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    id: u64,
    name: String,
    weather: Vec<ApiCondition>,
    main: ApiMain,
    wind: ApiWind,
    sys: ApiSys,
    visibility: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastEntry {
    dt: i64,
    #[serde(default)]
    dt_txt: String,
    main: ApiMain,
    weather: Vec<ApiCondition>,
    wind: ApiWind,
    visibility: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastCity {
    id: u64,
    name: String,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    list: Vec<ApiForecastEntry>,
    city: Option<ApiForecastCity>,
}

fn first_condition(weather: Vec<ApiCondition>) -> Result<Condition, FetchError> {
    let first = weather
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Parse("response has no weather condition".to_string()))?;
    Ok(Condition {
        code: first.id,
        description: first.description,
        icon: first.icon,
    })
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, FetchError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| FetchError::Parse(format!("timestamp out of range: {}", secs)))
}

impl TryFrom<ApiCurrent> for WeatherSnapshot {
    type Error = FetchError;

    fn try_from(api: ApiCurrent) -> Result<Self, Self::Error> {
        Ok(Self {
            id: api.id,
            name: api.name,
            country: api.sys.country,
            temperature: api.main.temp,
            feels_like: api.main.feels_like,
            temp_min: api.main.temp_min,
            temp_max: api.main.temp_max,
            humidity: api.main.humidity,
            pressure: api.main.pressure,
            wind_speed: api.wind.speed,
            condition: first_condition(api.weather)?,
            sunrise: timestamp(api.sys.sunrise)?,
            sunset: timestamp(api.sys.sunset)?,
            visibility: api.visibility,
        })
    }
}

impl TryFrom<ApiForecast> for ForecastSeries {
    type Error = FetchError;

    fn try_from(api: ApiForecast) -> Result<Self, Self::Error> {
        let points = api
            .list
            .into_iter()
            .map(|entry| {
                Ok(ForecastPoint {
                    time: timestamp(entry.dt)?,
                    time_text: entry.dt_txt,
                    temperature: entry.main.temp,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    humidity: entry.main.humidity,
                    pressure: entry.main.pressure,
                    wind_speed: entry.wind.speed,
                    condition: first_condition(entry.weather)?,
                    visibility: entry.visibility,
                })
            })
            .collect::<Result<Vec<_>, FetchError>>()?;

        Ok(Self {
            city: api.city.map(|c| ForecastCity {
                id: c.id,
                name: c.name,
                country: c.country,
            }),
            points,
        })
    }
}

/// Which provider API a lookup goes to
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Weather,
    Forecast,
    Geocode,
}

/// Weather provider client. Holds the active unit system and the cache.
#[derive(Debug)]
pub struct FetchClient {
    http: Client,
    api_key: String,
    base_url: String,
    geo_url: String,
    unit: RwLock<UnitSystem>,
    cache: Arc<TtlCache<CachedPayload>>,
}

impl FetchClient {
    pub fn new(
        config: &ProviderConfig,
        cache: Arc<TtlCache<CachedPayload>>,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.resolved_api_key(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            geo_url: config.geo_url.trim_end_matches('/').to_string(),
            unit: RwLock::new(UnitSystem::default()),
            cache,
        })
    }

    pub fn cache(&self) -> &Arc<TtlCache<CachedPayload>> {
        &self.cache
    }

    /// Unit system applied to current and forecast requests
    pub fn default_unit(&self) -> UnitSystem {
        *self.unit.read()
    }

    /// Switch the default unit and drop every cached entry.
    ///
    /// Both happen under the unit write lock, so no lookup can pair the new
    /// unit with data cached under the old one.
    pub(crate) fn switch_unit(&self, unit: UnitSystem) {
        let mut current = self.unit.write();
        *current = unit;
        self.cache.clear();
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn current_by_name(&self, name: &str) -> Option<WeatherSnapshot> {
        self.lookup::<WeatherSnapshot>(
            CacheKey::CurrentByName(name.to_string()),
            Endpoint::Weather,
            vec![("q", name.to_string())],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn current_by_id(&self, id: u64) -> Option<WeatherSnapshot> {
        self.lookup::<WeatherSnapshot>(
            CacheKey::CurrentById(id),
            Endpoint::Weather,
            vec![("id", id.to_string())],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn forecast_by_name(&self, name: &str) -> Option<ForecastSeries> {
        self.lookup::<ForecastSeries>(
            CacheKey::ForecastByName(name.to_string()),
            Endpoint::Forecast,
            vec![("q", name.to_string())],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn forecast_by_id(&self, id: u64) -> Option<ForecastSeries> {
        self.lookup::<ForecastSeries>(
            CacheKey::ForecastById(id),
            Endpoint::Forecast,
            vec![("id", id.to_string())],
        )
        .await
    }

    /// Geocoding search. Queries under two characters return nothing
    /// without a request.
    #[instrument(skip(self), level = "debug")]
    pub async fn search_geocode(&self, query: &str, limit: u32) -> Vec<GeoSuggestion> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Vec::new();
        }

        self.lookup::<Vec<GeoSuggestion>>(
            CacheKey::Geocode {
                query: query.to_string(),
                limit,
            },
            Endpoint::Geocode,
            vec![("q", query.to_string()), ("limit", limit.to_string())],
        )
        .await
        .unwrap_or_default()
    }

    /// Cache-first lookup; on a miss, fetch, convert, and cache unless the
    /// cache was cleared while the request was in flight.
    async fn lookup<T: Cacheable>(
        &self,
        key: CacheKey,
        endpoint: Endpoint,
        params: Vec<(&'static str, String)>,
    ) -> Option<T> {
        if let Some(hit) = self.cache.get(&key).and_then(T::from_payload) {
            tracing::debug!("Cache hit: {}", key);
            return Some(hit);
        }

        let (unit, epoch) = {
            let unit = self.unit.read();
            (*unit, self.cache.epoch())
        };

        let result = self
            .request::<T::Raw>(endpoint, params, unit)
            .await
            .and_then(T::from_raw);

        match result {
            Ok(value) => {
                self.cache
                    .put_if_epoch(key, value.clone().into_payload(), epoch);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Weather lookup {} failed: {}", key, e);
                None
            }
        }
    }

    async fn request<A: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        mut params: Vec<(&'static str, String)>,
        unit: UnitSystem,
    ) -> Result<A, FetchError> {
        let url = match endpoint {
            Endpoint::Weather => format!("{}/weather", self.base_url),
            Endpoint::Forecast => format!("{}/forecast", self.base_url),
            Endpoint::Geocode => format!("{}/direct", self.geo_url),
        };

        if !matches!(endpoint, Endpoint::Geocode) {
            params.push(("units", unit.as_param().to_string()));
        }
        params.push(("appid", self.api_key.clone()));

        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            let what = params
                .first()
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            return Err(FetchError::NotFound(what));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(FetchError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(FetchError::Network(format!("provider returned {}", status)));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1850147,
            "name": "Tokyo",
            "weather": [{ "id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d" }],
            "main": { "temp": 21.5, "feels_like": 21.0, "temp_min": 20.0, "temp_max": 23.0, "pressure": 1015, "humidity": 64 },
            "wind": { "speed": 3.6 },
            "sys": { "country": "JP", "sunrise": 1714507200, "sunset": 1714556400 },
            "visibility": 10000
        })
    }

    #[test]
    fn test_current_response_conversion() {
        let api: ApiCurrent = serde_json::from_value(current_json()).unwrap();
        let snapshot = WeatherSnapshot::try_from(api).unwrap();

        assert_eq!(snapshot.id, 1850147);
        assert_eq!(snapshot.country.as_deref(), Some("JP"));
        assert_eq!(snapshot.humidity, 64);
        assert_eq!(snapshot.condition.icon, "04d");
        assert_eq!(snapshot.sunrise.timestamp(), 1714507200);
        assert_eq!(snapshot.visibility, Some(10000));
    }

    #[test]
    fn test_current_without_condition_is_parse_error() {
        let mut json = current_json();
        json["weather"] = serde_json::json!([]);
        let api: ApiCurrent = serde_json::from_value(json).unwrap();
        assert!(matches!(
            WeatherSnapshot::try_from(api),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_forecast_response_conversion() {
        let json = serde_json::json!({
            "cod": "200",
            "cnt": 1,
            "list": [{
                "dt": 1714564800,
                "dt_txt": "2024-05-01 12:00:00",
                "main": { "temp": 18.0, "temp_min": 17.0, "temp_max": 19.0, "pressure": 1011, "humidity": 70 },
                "weather": [{ "id": 500, "description": "light rain", "icon": "10d" }],
                "wind": { "speed": 5.1 }
            }],
            "city": { "id": 2643743, "name": "London", "country": "GB" }
        });
        let api: ApiForecast = serde_json::from_value(json).unwrap();
        let series = ForecastSeries::try_from(api).unwrap();

        assert_eq!(series.points.len(), 1);
        assert_eq!(series.points[0].time_text, "2024-05-01 12:00:00");
        assert_eq!(series.points[0].visibility, None);
        assert_eq!(series.city.map(|c| c.name).as_deref(), Some("London"));
    }

    #[test]
    fn test_payload_kind_mismatch_is_not_a_hit() {
        let payload = CachedPayload::Geocode(Vec::new());
        assert!(WeatherSnapshot::from_payload(payload).is_none());
    }
}
