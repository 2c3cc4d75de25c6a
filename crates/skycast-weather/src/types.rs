use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Measurement system applied to temperature and wind speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Value of the provider's `units` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    pub fn wind_speed_unit(&self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Imperial => "mph",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit system: {0}")]
pub struct UnknownUnitSystem(pub String);

impl FromStr for UnitSystem {
    type Err = UnknownUnitSystem;

    /// Accepts the provider names and the temperature-scale aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" | "celsius" => Ok(Self::Metric),
            "imperial" | "fahrenheit" => Ok(Self::Imperial),
            _ => Err(UnknownUnitSystem(s.to_string())),
        }
    }
}

/// Condition categories mapped from provider condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionGroup {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl ConditionGroup {
    /// Convert an OpenWeatherMap condition id to a group
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_code(code: u32) -> Self {
        match code {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Fog,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // 800 and unknown codes
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }
}

/// Provider condition as reported for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: u32,
    pub description: String,
    /// Provider icon reference, e.g. `"10d"`
    pub icon: String,
}

impl Condition {
    pub fn group(&self) -> ConditionGroup {
        ConditionGroup::from_code(self.code)
    }
}

/// One point-in-time reading for a single location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub id: u64,
    pub name: String,
    pub country: Option<String>,
    pub temperature: f64,
    pub feels_like: Option<f64>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    /// Sea-level pressure in hPa
    pub pressure: f64,
    pub wind_speed: f64,
    pub condition: Condition,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    /// Visibility in meters, when reported
    pub visibility: Option<u32>,
}

/// One 3-hour step of a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: DateTime<Utc>,
    /// Provider's `dt_txt`, e.g. `"2024-05-01 12:00:00"`
    pub time_text: String,
    pub temperature: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: f64,
    pub wind_speed: f64,
    pub condition: Condition,
    pub visibility: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub id: u64,
    pub name: String,
    pub country: Option<String>,
}

/// 5-day forecast at 3-hour resolution, ordered by time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: Option<ForecastCity>,
    pub points: Vec<ForecastPoint>,
}

/// Per-day aggregate of forecast points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub min: f64,
    pub max: f64,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub avg_wind_speed: f64,
}

const HOURLY_POINTS: usize = 8;
const SUMMARY_DAYS: usize = 5;

impl ForecastSeries {
    /// The first `count` points, e.g. 8 for the next 24 hours
    pub fn next_hours(&self, count: usize) -> &[ForecastPoint] {
        &self.points[..count.min(self.points.len())]
    }

    /// The next 24 hours of points
    pub fn hourly(&self) -> &[ForecastPoint] {
        self.next_hours(HOURLY_POINTS)
    }

    /// Group points by UTC calendar day, at most five days in date order.
    pub fn daily_summaries(&self) -> Vec<DailySummary> {
        let mut days: BTreeMap<NaiveDate, Vec<&ForecastPoint>> = BTreeMap::new();
        for point in &self.points {
            days.entry(point.time.date_naive()).or_default().push(point);
        }

        days.into_iter()
            .take(SUMMARY_DAYS)
            .map(|(date, points)| {
                let n = points.len() as f64;
                DailySummary {
                    date,
                    min: points.iter().map(|p| p.temp_min).fold(f64::INFINITY, f64::min),
                    max: points.iter().map(|p| p.temp_max).fold(f64::NEG_INFINITY, f64::max),
                    avg_temperature: points.iter().map(|p| p.temperature).sum::<f64>() / n,
                    avg_humidity: points.iter().map(|p| f64::from(p.humidity)).sum::<f64>() / n,
                    avg_wind_speed: points.iter().map(|p| p.wind_speed).sum::<f64>() / n,
                }
            })
            .collect()
    }
}

/// Location search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoSuggestion {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GeoSuggestion {
    /// Display label, e.g. "Portland, Oregon, US"
    pub fn label(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        parts.extend(
            [&self.state, &self.country]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .filter(|s| !s.is_empty()),
        );
        parts.join(", ")
    }
}

/// Current conditions and forecast for one location
#[derive(Debug, Clone, PartialEq)]
pub struct LocationDetail {
    pub current: WeatherSnapshot,
    pub forecast: ForecastSeries,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Location not found: {0}")]
    NotFound(String),
    #[error("Rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("HTTP client error: {0}")]
    Client(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|s| format!(", retry after {}s", s))
        .unwrap_or_default()
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else if e.is_builder() {
            FetchError::Client(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(hour_offset: i64, temp: f64, humidity: u8, wind: f64) -> ForecastPoint {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let time = base + chrono::Duration::hours(hour_offset);
        ForecastPoint {
            time,
            time_text: time.format("%Y-%m-%d %H:%M:%S").to_string(),
            temperature: temp,
            temp_min: temp - 1.0,
            temp_max: temp + 1.0,
            humidity,
            pressure: 1012.0,
            wind_speed: wind,
            condition: Condition {
                code: 800,
                description: "clear sky".into(),
                icon: "01d".into(),
            },
            visibility: Some(10_000),
        }
    }

    #[test]
    fn test_unit_system_parse_aliases() {
        assert_eq!("metric".parse::<UnitSystem>(), Ok(UnitSystem::Metric));
        assert_eq!("Celsius".parse::<UnitSystem>(), Ok(UnitSystem::Metric));
        assert_eq!("imperial".parse::<UnitSystem>(), Ok(UnitSystem::Imperial));
        assert_eq!(" fahrenheit ".parse::<UnitSystem>(), Ok(UnitSystem::Imperial));
        assert!("kelvin".parse::<UnitSystem>().is_err());
    }

    #[test]
    fn test_unit_system_serde_is_lowercase() {
        let json = serde_json::to_string(&UnitSystem::Imperial).unwrap();
        assert_eq!(json, "\"imperial\"");
        assert_eq!(UnitSystem::default(), UnitSystem::Metric);
    }

    #[test]
    fn test_unit_display_helpers() {
        assert_eq!(UnitSystem::Metric.temperature_symbol(), "°C");
        assert_eq!(UnitSystem::Imperial.wind_speed_unit(), "mph");
    }

    #[test]
    fn test_condition_code_thunderstorm() {
        assert_eq!(ConditionGroup::from_code(200), ConditionGroup::Thunderstorm);
        assert_eq!(ConditionGroup::from_code(232), ConditionGroup::Thunderstorm);
    }

    #[test]
    fn test_condition_code_rain_and_sleet() {
        assert_eq!(ConditionGroup::from_code(300), ConditionGroup::Drizzle);
        assert_eq!(ConditionGroup::from_code(500), ConditionGroup::Rain);
        assert_eq!(ConditionGroup::from_code(502), ConditionGroup::HeavyRain);
        assert_eq!(ConditionGroup::from_code(511), ConditionGroup::Sleet);
        assert_eq!(ConditionGroup::from_code(612), ConditionGroup::Sleet);
        assert_eq!(ConditionGroup::from_code(601), ConditionGroup::Snow);
    }

    #[test]
    fn test_condition_code_sky() {
        assert_eq!(ConditionGroup::from_code(741), ConditionGroup::Fog);
        assert_eq!(ConditionGroup::from_code(800), ConditionGroup::Clear);
        assert_eq!(ConditionGroup::from_code(802), ConditionGroup::PartlyCloudy);
        assert_eq!(ConditionGroup::from_code(804), ConditionGroup::Cloudy);
        assert_eq!(ConditionGroup::from_code(999), ConditionGroup::Clear);
        assert_eq!(ConditionGroup::Cloudy.description(), "Cloudy");
    }

    #[test]
    fn test_geo_suggestion_label_skips_missing_parts() {
        let full = GeoSuggestion {
            name: "Portland".into(),
            state: Some("Oregon".into()),
            country: Some("US".into()),
            latitude: 45.5,
            longitude: -122.6,
        };
        assert_eq!(full.label(), "Portland, Oregon, US");

        let bare = GeoSuggestion {
            state: None,
            country: Some(String::new()),
            ..full
        };
        assert_eq!(bare.label(), "Portland");
    }

    #[test]
    fn test_geo_suggestion_deserializes_provider_shape() {
        let json = serde_json::json!({ "name": "Paris", "country": "FR", "lat": 48.85, "lon": 2.35 });
        let s: GeoSuggestion = serde_json::from_value(json).unwrap();
        assert_eq!(s.state, None);
        assert_eq!(s.country.as_deref(), Some("FR"));
        assert!((s.longitude - 2.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_next_hours_clamps_to_available_points() {
        let series = ForecastSeries {
            city: None,
            points: (0..3).map(|i| point(i * 3, 10.0, 50, 2.0)).collect(),
        };
        assert_eq!(series.hourly().len(), 3);
        assert_eq!(series.next_hours(2).len(), 2);
    }

    #[test]
    fn test_daily_summaries_group_by_day() {
        // 8 points on day one, 2 on day two
        let mut points: Vec<_> = (0..8).map(|i| point(i * 3, 10.0 + i as f64, 40, 2.0)).collect();
        points.push(point(24, 20.0, 60, 4.0));
        points.push(point(27, 22.0, 80, 6.0));
        let series = ForecastSeries { city: None, points };

        let days = series.daily_summaries();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!((days[0].min - 9.0).abs() < 1e-9);
        assert!((days[0].max - 18.0).abs() < 1e-9);
        assert!((days[0].avg_temperature - 13.5).abs() < 1e-9);
        assert!((days[1].avg_humidity - 70.0).abs() < 1e-9);
        assert!((days[1].avg_wind_speed - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_summaries_limited_to_five_days() {
        let points = (0..7).map(|d| point(d * 24, 10.0, 50, 1.0)).collect();
        let series = ForecastSeries { city: None, points };
        assert_eq!(series.daily_summaries().len(), 5);
    }

    #[test]
    fn test_rate_limited_message() {
        let err = FetchError::RateLimited { retry_after_secs: Some(30) };
        assert!(err.to_string().contains("retry after 30s"));
        let err = FetchError::RateLimited { retry_after_secs: None };
        assert_eq!(err.to_string(), "Rate limited by provider");
    }
}
