//! Keyed request cache with stale-while-revalidate semantics
//!
//! Every fetch is tagged with a request id. Only the response matching the
//! latest id issued for a key is applied; older ones are dropped. While a key
//! is being refetched its last value keeps rendering, and a key that was never
//! loaded borrows the most recently loaded value of the same query.

use std::collections::HashMap;
use std::hash::Hash;

pub type RequestId = u64;

/// What the UI should draw for one key
#[derive(Debug, PartialEq)]
pub enum QueryStatus<'a, T> {
    /// Never requested
    Idle,
    /// In flight with nothing to show yet
    Loading,
    /// Last attempt failed
    Error(&'a str),
    Ready {
        value: &'a T,
        /// A fetch for this key is in flight
        refreshing: bool,
        /// `value` belongs to a different key
        placeholder: bool,
    },
}

#[derive(Debug)]
struct Entry<T> {
    value: Option<T>,
    error: Option<String>,
    in_flight: Option<RequestId>,
    stale: bool,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            in_flight: None,
            stale: false,
        }
    }
}

#[derive(Debug)]
pub struct QueryCache<K, T> {
    entries: HashMap<K, Entry<T>>,
    last_loaded: Option<K>,
}

impl<K: Copy + Eq + Hash, T> Default for QueryCache<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash, T> QueryCache<K, T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_loaded: None,
        }
    }

    /// Record that `request` is now the authoritative fetch for `key`
    pub fn begin(&mut self, key: K, request: RequestId) {
        let entry = self.entries.entry(key).or_default();
        entry.in_flight = Some(request);
        // nothing cached to fall back on: show the retry as loading
        if entry.value.is_none() {
            entry.error = None;
        }
    }

    /// Apply a response. Returns false if a newer request superseded it.
    pub fn resolve(&mut self, key: K, request: RequestId, result: Result<T, String>) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        if entry.in_flight != Some(request) {
            return false;
        }
        entry.in_flight = None;
        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.error = None;
                entry.stale = false;
                self.last_loaded = Some(key);
            }
            Err(msg) => {
                entry.error = Some(msg);
            }
        }
        true
    }

    /// Mark `key` as needing a refetch. Cached data stays visible.
    pub fn invalidate(&mut self, key: K) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.stale = true;
        }
    }

    pub fn is_stale(&self, key: K) -> bool {
        self.entries.get(&key).map_or(false, |e| e.stale)
    }

    pub fn is_fetching(&self, key: K) -> bool {
        self.entries.get(&key).map_or(false, |e| e.in_flight.is_some())
    }

    /// Value fetched for exactly this key, ignoring placeholders and errors
    pub fn value(&self, key: K) -> Option<&T> {
        self.entries.get(&key)?.value.as_ref()
    }

    pub fn status(&self, key: K) -> QueryStatus<'_, T> {
        let Some(entry) = self.entries.get(&key) else {
            return QueryStatus::Idle;
        };
        let refreshing = entry.in_flight.is_some();

        if let Some(msg) = &entry.error {
            return QueryStatus::Error(msg);
        }
        if let Some(value) = &entry.value {
            return QueryStatus::Ready { value, refreshing, placeholder: false };
        }
        if !refreshing {
            return QueryStatus::Idle;
        }
        match self.last_loaded.and_then(|k| self.value(k)) {
            Some(value) => QueryStatus::Ready { value, refreshing, placeholder: true },
            None => QueryStatus::Loading,
        }
    }
}
