//! User preference store (singleton per client)

use super::store::{KvStore, StoreName};
use crate::error::FolioError;
use crate::models::UserPreferences;

pub const PREFERENCES_STORE: StoreName = StoreName::new("folio.preferences", 1);

const KEY: &str = "user";

#[derive(Clone)]
pub struct PreferencesStore {
    kv: KvStore,
}

impl PreferencesStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Stored preferences, or defaults on first run
    pub fn get(&self) -> Result<UserPreferences, FolioError> {
        Ok(self.kv.get(PREFERENCES_STORE, KEY)?.unwrap_or_default())
    }

    pub fn set(&self, prefs: &UserPreferences) -> Result<(), FolioError> {
        self.kv.put(PREFERENCES_STORE, KEY, prefs)
    }

    pub fn update<F>(&self, edit: F) -> Result<UserPreferences, FolioError>
    where
        F: FnOnce(&mut UserPreferences),
    {
        let mut prefs = self.get()?;
        edit(&mut prefs);
        self.set(&prefs)?;
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;

    #[test]
    fn test_defaults_then_update() {
        let store = PreferencesStore::new(KvStore::in_memory().unwrap());
        assert_eq!(store.get().unwrap(), UserPreferences::default());

        store
            .update(|p| {
                p.theme = Theme::Dark;
                p.autosave = false;
            })
            .unwrap();

        let prefs = store.get().unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(!prefs.autosave);
        assert_eq!(prefs.reading_speed_wpm, 200);
    }
}
