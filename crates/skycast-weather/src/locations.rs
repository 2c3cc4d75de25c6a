//! Favorite and searched location lists.
//!
//! Every mutation is persisted (best-effort) and announced on a `watch`
//! channel so an active dashboard can reload without polling.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

use crate::prefs::{
    read_pref, write_pref, PreferenceStore, FAVORITE_LOCATIONS_KEY, SEARCHED_LOCATIONS_KEY,
};

/// Union of the three lists in priority order, keeping the first occurrence
/// of each name.
pub fn merge_locations(favorites: &[String], searched: &[String], defaults: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();
    for name in favorites.iter().chain(searched).chain(defaults) {
        if seen.insert(name.as_str()) {
            merged.push(name.clone());
        }
    }
    merged
}

#[derive(Debug, Default)]
struct Lists {
    favorites: Vec<String>,
    searched: Vec<String>,
}

pub struct LocationStore {
    prefs: Arc<dyn PreferenceStore>,
    lists: Mutex<Lists>,
    /// Revision counter, bumped on every change
    changes: watch::Sender<u64>,
}

impl LocationStore {
    pub fn load(prefs: Arc<dyn PreferenceStore>) -> Self {
        let lists = Lists {
            favorites: read_pref(prefs.as_ref(), FAVORITE_LOCATIONS_KEY).unwrap_or_default(),
            searched: read_pref(prefs.as_ref(), SEARCHED_LOCATIONS_KEY).unwrap_or_default(),
        };
        tracing::debug!(
            "Loaded {} favorite and {} searched locations",
            lists.favorites.len(),
            lists.searched.len()
        );

        let (changes, _) = watch::channel(0);
        Self {
            prefs,
            lists: Mutex::new(lists),
            changes,
        }
    }

    pub fn favorites(&self) -> Vec<String> {
        self.lists.lock().favorites.clone()
    }

    pub fn searched(&self) -> Vec<String> {
        self.lists.lock().searched.clone()
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        let name = name.trim();
        self.lists.lock().favorites.iter().any(|f| f == name)
    }

    /// Returns `false` if `name` is blank or already a favorite.
    pub fn add_favorite(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let mut lists = self.lists.lock();
        if lists.favorites.iter().any(|f| f == name) {
            return false;
        }
        lists.favorites.push(name.to_string());
        write_pref(self.prefs.as_ref(), FAVORITE_LOCATIONS_KEY, &lists.favorites);
        drop(lists);

        self.notify();
        true
    }

    /// Returns `false` if `name` was not a favorite.
    pub fn remove_favorite(&self, name: &str) -> bool {
        let name = name.trim();
        let mut lists = self.lists.lock();
        let before = lists.favorites.len();
        lists.favorites.retain(|f| f != name);
        if lists.favorites.len() == before {
            return false;
        }
        write_pref(self.prefs.as_ref(), FAVORITE_LOCATIONS_KEY, &lists.favorites);
        drop(lists);

        self.notify();
        true
    }

    /// Flip favorite status; returns the new status. Blank names are never
    /// favorites.
    pub fn toggle_favorite(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        if self.is_favorite(name) {
            self.remove_favorite(name);
            false
        } else {
            self.add_favorite(name);
            true
        }
    }

    /// Remember a submitted search term. Blank terms and repeats are ignored.
    pub fn record_search(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }

        let mut lists = self.lists.lock();
        if lists.searched.iter().any(|s| s == term) {
            return false;
        }
        lists.searched.push(term.to_string());
        write_pref(self.prefs.as_ref(), SEARCHED_LOCATIONS_KEY, &lists.searched);
        drop(lists);

        self.notify();
        true
    }

    /// Locations the dashboard should show: favorites, then searches, then
    /// `defaults`, without duplicates.
    pub fn resolve(&self, defaults: &[String]) -> Vec<String> {
        let lists = self.lists.lock();
        merge_locations(&lists.favorites, &lists.searched, defaults)
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|rev| *rev += 1);
    }
}
