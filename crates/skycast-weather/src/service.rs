//! Consumer-facing weather service.
//!
//! Owns one cache, one client and the preference-backed stores. Build a
//! separate instance per test for isolation.

use std::sync::Arc;
use std::time::Duration;

use skycast_core::Config;

use crate::batch::{BatchAggregator, BatchOutcome};
use crate::cache::TtlCache;
use crate::locations::LocationStore;
use crate::prefs::PreferenceStore;
use crate::provider::FetchClient;
use crate::suggest::SearchSuggester;
use crate::types::{FetchError, ForecastSeries, GeoSuggestion, LocationDetail, UnitSystem, WeatherSnapshot};
use crate::units::UnitPreferenceStore;

pub struct WeatherService {
    client: Arc<FetchClient>,
    units: UnitPreferenceStore,
    locations: LocationStore,
    batch: BatchAggregator,
    suggester: SearchSuggester,
    default_locations: Vec<String>,
    search_limit: u32,
}

impl WeatherService {
    pub fn new(config: &Config, prefs: Arc<dyn PreferenceStore>) -> Result<Self, FetchError> {
        let cache = Arc::new(TtlCache::new());
        let client = Arc::new(FetchClient::new(&config.provider, cache)?);

        let units = UnitPreferenceStore::init(client.clone(), prefs.clone());
        let locations = LocationStore::load(prefs);
        let batch = BatchAggregator::with_concurrency(client.clone(), config.dashboard.concurrency);
        let suggester = SearchSuggester::new(
            client.clone(),
            Duration::from_millis(config.search.debounce_ms),
        );

        Ok(Self {
            client,
            units,
            locations,
            batch,
            suggester,
            default_locations: config.dashboard.default_locations.clone(),
            search_limit: config.search.limit,
        })
    }

    pub fn client(&self) -> &Arc<FetchClient> {
        &self.client
    }

    pub async fn fetch_current_by_name(&self, name: &str) -> Option<WeatherSnapshot> {
        self.client.current_by_name(name).await
    }

    pub async fn fetch_current_by_id(&self, id: u64) -> Option<WeatherSnapshot> {
        self.client.current_by_id(id).await
    }

    pub async fn fetch_forecast_by_name(&self, name: &str) -> Option<ForecastSeries> {
        self.client.forecast_by_name(name).await
    }

    pub async fn fetch_forecast_by_id(&self, id: u64) -> Option<ForecastSeries> {
        self.client.forecast_by_id(id).await
    }

    /// Current conditions and forecast together; `None` if either is missing.
    pub async fn fetch_detail(&self, id: u64) -> Option<LocationDetail> {
        let (current, forecast) =
            tokio::join!(self.client.current_by_id(id), self.client.forecast_by_id(id));

        match (current, forecast) {
            (Some(current), Some(forecast)) => Some(LocationDetail { current, forecast }),
            _ => {
                tracing::warn!("Incomplete weather detail for location {}", id);
                None
            }
        }
    }

    pub async fn fetch_batch(&self, names: &[String]) -> BatchOutcome {
        self.batch.fetch_batch(names).await
    }

    /// Favorites, then searches, then configured defaults
    pub fn dashboard_locations(&self) -> Vec<String> {
        self.locations.resolve(&self.default_locations)
    }

    pub async fn fetch_dashboard(&self) -> BatchOutcome {
        let names = self.dashboard_locations();
        tracing::debug!("Dashboard locations: {:?}", names);
        self.batch.fetch_batch(&names).await
    }

    /// Debounced suggestions; `limit` defaults to the configured one.
    pub async fn suggest(&self, query: &str, limit: Option<u32>) -> Vec<GeoSuggestion> {
        self.suggester
            .suggest(query, limit.unwrap_or(self.search_limit))
            .await
    }

    pub fn suggester(&self) -> &SearchSuggester {
        &self.suggester
    }

    /// Record a submitted search so the dashboard picks it up.
    pub fn submit_search(&self, term: &str) -> bool {
        self.suggester.cancel();
        self.locations.record_search(term)
    }

    pub fn set_unit(&self, unit: UnitSystem) -> bool {
        self.units.set_unit(unit)
    }

    pub fn unit(&self) -> UnitSystem {
        self.units.unit()
    }

    pub fn units(&self) -> &UnitPreferenceStore {
        &self.units
    }

    pub fn locations(&self) -> &LocationStore {
        &self.locations
    }
}
