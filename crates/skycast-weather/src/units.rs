//! Active unit system: loaded once at startup, switched at runtime.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::prefs::{read_pref, write_pref, PreferenceStore, UNIT_SYSTEM_KEY};
use crate::provider::FetchClient;
use crate::types::UnitSystem;

pub struct UnitPreferenceStore {
    client: Arc<FetchClient>,
    prefs: Arc<dyn PreferenceStore>,
    /// Serializes `set_unit` calls
    current: Mutex<UnitSystem>,
    changes: watch::Sender<UnitSystem>,
}

impl UnitPreferenceStore {
    /// Read the persisted unit (metric when missing or invalid) and apply it
    /// to the client.
    pub fn init(client: Arc<FetchClient>, prefs: Arc<dyn PreferenceStore>) -> Self {
        let unit = match read_pref::<String>(prefs.as_ref(), UNIT_SYSTEM_KEY) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; falling back to metric", e);
                UnitSystem::Metric
            }),
            None => UnitSystem::Metric,
        };

        client.switch_unit(unit);
        tracing::info!("Unit system: {}", unit);

        let (changes, _) = watch::channel(unit);
        Self {
            client,
            prefs,
            current: Mutex::new(unit),
            changes,
        }
    }

    pub fn unit(&self) -> UnitSystem {
        *self.current.lock()
    }

    /// Switch the unit system. Returns `false` when `unit` is already active.
    ///
    /// The client default and the cache clear change together; a failed
    /// write to the preference store is logged and the new unit still
    /// applies for this session.
    pub fn set_unit(&self, unit: UnitSystem) -> bool {
        let mut current = self.current.lock();
        if *current == unit {
            return false;
        }

        self.client.switch_unit(unit);
        *current = unit;
        write_pref(self.prefs.as_ref(), UNIT_SYSTEM_KEY, &unit.as_param());

        tracing::info!("Unit system switched to {}; weather cache cleared", unit);
        self.changes.send_replace(unit);
        true
    }

    /// Notified after every switch
    pub fn subscribe(&self) -> watch::Receiver<UnitSystem> {
        self.changes.subscribe()
    }
}
