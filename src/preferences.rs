// src/preferences.rs
use serde::{Deserialize, Serialize};

use crate::store::{VersionedStore, USER_PREFS_KEY, USER_PREFS_SCHEMA};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedLocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Dashboard settings remembered between sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserPreferences {
    pub location: Option<SavedLocation>,
    pub language: String,
    pub currency: String,
    pub categories: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            location: None,
            language: "en".to_string(),
            currency: "usd".to_string(),
            categories: vec!["world".to_string(), "markets".to_string()],
        }
    }
}

pub struct PreferencesStore {
    store: VersionedStore,
}

impl PreferencesStore {
    pub fn new(store: VersionedStore) -> Self {
        Self { store }
    }

    /// Stored preferences, or defaults when absent or unreadable.
    pub fn load(&self) -> UserPreferences {
        self.store
            .load(USER_PREFS_KEY, USER_PREFS_SCHEMA)
            .unwrap_or_default()
    }

    /// Replace the stored blob wholesale.
    pub fn save(&self, prefs: &UserPreferences) {
        self.store.save(USER_PREFS_KEY, USER_PREFS_SCHEMA, prefs);
    }
}
