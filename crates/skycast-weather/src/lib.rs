//! Weather data access for SkyCast
//!
//! Current conditions, forecasts and location search from OpenWeatherMap,
//! behind a short-lived cache, with persisted unit and location preferences.

pub mod batch;
pub mod cache;
pub mod locations;
pub mod prefs;
pub mod provider;
pub mod refresh;
pub mod service;
pub mod suggest;
pub mod types;
pub mod units;

pub use batch::{BatchAggregator, BatchOutcome};
pub use cache::{CacheKey, TtlCache};
pub use locations::{merge_locations, LocationStore};
pub use prefs::{JsonFilePreferences, MemoryPreferences, PreferenceError, PreferenceStore};
pub use provider::{CachedPayload, FetchClient};
pub use refresh::{spawn_dashboard_refresh, spawn_detail_refresh, DashboardState, DetailState, RefreshHandle};
pub use service::WeatherService;
pub use suggest::SearchSuggester;
pub use types::*;
pub use units::UnitPreferenceStore;
