//! Resolve many locations into snapshots, skipping the ones that fail.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::provider::FetchClient;
use crate::types::WeatherSnapshot;

/// Result of a batch lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Successful snapshots, in input order
    pub snapshots: Vec<WeatherSnapshot>,
    /// True when no location produced data
    pub all_failed: bool,
}

pub struct BatchAggregator {
    client: Arc<FetchClient>,
    concurrency: usize,
}

impl BatchAggregator {
    /// One lookup at a time, to stay under the provider's rate limit.
    pub fn sequential(client: Arc<FetchClient>) -> Self {
        Self::with_concurrency(client, 1)
    }

    /// At most `concurrency` lookups in flight (minimum 1).
    pub fn with_concurrency(client: Arc<FetchClient>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn fetch_batch(&self, names: &[String]) -> BatchOutcome {
        let results = if self.concurrency == 1 {
            self.fetch_sequential(names).await
        } else {
            self.fetch_pooled(names).await
        };

        let snapshots: Vec<WeatherSnapshot> = results.into_iter().flatten().collect();
        let all_failed = snapshots.is_empty();
        if all_failed {
            tracing::warn!("No weather data for any of {} locations", names.len());
        } else {
            tracing::info!(
                "Fetched weather for {} of {} locations",
                snapshots.len(),
                names.len()
            );
        }

        BatchOutcome {
            snapshots,
            all_failed,
        }
    }

    async fn fetch_sequential(&self, names: &[String]) -> Vec<Option<WeatherSnapshot>> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let snapshot = self.client.current_by_name(name).await;
            if snapshot.is_none() {
                tracing::warn!("Skipping {}: no weather data", name);
            }
            results.push(snapshot);
        }
        results
    }

    /// Results are slotted back by input index, so completion order does not
    /// affect output order.
    async fn fetch_pooled(&self, names: &[String]) -> Vec<Option<WeatherSnapshot>> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, name) in names.iter().cloned().enumerate() {
            let client = self.client.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let snapshot = client.current_by_name(&name).await;
                if snapshot.is_none() {
                    tracing::warn!("Skipping {}: no weather data", name);
                }
                (index, snapshot)
            });
        }

        let mut results = vec![None; names.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, snapshot)) => results[index] = snapshot,
                Err(e) => tracing::warn!("Weather lookup task failed: {}", e),
            }
        }
        results
    }
}
