//! Draft persistence and autosave
//!
//! Every field change is mirrored into the draft store right away. On top of
//! that, the [`Autosaver`] runs a fixed-interval timer that re-persists the
//! current draft whenever it has a title or body. The timer stops when
//! autosave is disabled or the autosaver is dropped. A draft that has been
//! discarded is never written back.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::preferences::PreferencesStore;
use super::store::{KvStore, StoreName};
use crate::error::FolioError;
use crate::models::{now_millis, StoryDraft, UserPreferences};

pub const DRAFT_STORE: StoreName = StoreName::new("folio.drafts", 1);

/// Default autosave cadence
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct DraftStore {
    kv: KvStore,
}

impl DraftStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Persist a draft, stamping `last_saved` and the autosave flag.
    ///
    /// `last_saved` strictly increases per draft even when two writes land in
    /// the same millisecond.
    pub fn save(&self, draft: &mut StoryDraft, autosaved: bool) -> Result<(), FolioError> {
        let previous = self
            .kv
            .get::<StoryDraft>(DRAFT_STORE, &draft.id)?
            .map(|d| d.last_saved)
            .unwrap_or(0);

        draft.last_saved = now_millis().max(previous + 1).max(draft.last_saved + 1);
        draft.autosaved = autosaved;
        self.kv.put(DRAFT_STORE, &draft.id, draft)?;

        debug!(draft_id = %draft.id, autosaved, "Draft saved");
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Option<StoryDraft>, FolioError> {
        self.kv.get(DRAFT_STORE, id)
    }

    /// Remove a draft (explicit discard or after publishing)
    pub fn discard(&self, id: &str) -> Result<bool, FolioError> {
        self.kv.delete(DRAFT_STORE, id)
    }

    /// All drafts, most recently saved first
    pub fn list(&self) -> Result<Vec<StoryDraft>, FolioError> {
        let mut drafts: Vec<StoryDraft> = self
            .kv
            .list(DRAFT_STORE)?
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        drafts.sort_by(|a, b| b.last_saved.cmp(&a.last_saved));
        Ok(drafts)
    }
}

/// Mirrors the draft being edited into the store
pub struct Autosaver {
    drafts: DraftStore,
    current: Arc<Mutex<Option<StoryDraft>>>,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl Autosaver {
    pub fn new(drafts: DraftStore, interval: Duration) -> Self {
        Self {
            drafts,
            current: Arc::new(Mutex::new(None)),
            interval,
            timer: None,
        }
    }

    /// Autosaver following the stored `autosave` preference. The timer is
    /// started when it is on, so this must run inside a tokio runtime.
    pub fn from_preferences(drafts: DraftStore, prefs: &PreferencesStore) -> Result<Self, FolioError> {
        let mut saver = Self::new(drafts, AUTOSAVE_INTERVAL);
        saver.apply_preferences(&prefs.get()?);
        Ok(saver)
    }

    pub fn apply_preferences(&mut self, prefs: &UserPreferences) {
        self.set_enabled(prefs.autosave);
    }

    /// Record a field change: persist immediately and remember it for the timer
    pub fn record_change(&self, mut draft: StoryDraft) -> Result<StoryDraft, FolioError> {
        self.drafts.save(&mut draft, true)?;
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(draft.clone());
        Ok(draft)
    }

    /// The draft as last recorded (with its current `last_saved`)
    pub fn current(&self) -> Option<StoryDraft> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Drop the current draft from the store and stop tracking it
    pub fn discard(&self, id: &str) -> Result<bool, FolioError> {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref().map(|d| d.id == id).unwrap_or(false) {
            *guard = None;
        }
        self.drafts.discard(id)
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Start the interval timer. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let drafts = self.drafts.clone();
        let current = self.current.clone();
        let period = self.interval;

        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                persist_current(&drafts, &current);
            }
        }));
    }

    /// Cancel the timer; nothing is persisted after this returns
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }
}

fn persist_current(drafts: &DraftStore, current: &Mutex<Option<StoryDraft>>) {
    let mut guard = current.lock().unwrap_or_else(|e| e.into_inner());
    let Some(draft) = guard.as_mut() else { return };
    if !draft.has_content() {
        return;
    }

    // Discarded elsewhere (explicitly or after publishing)
    match drafts.load(&draft.id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!(draft_id = %draft.id, "Draft gone from store, autosave stops tracking it");
            *guard = None;
            return;
        }
        Err(e) => {
            warn!(draft_id = %draft.id, error = %e, "Autosave failed");
            return;
        }
    }

    if let Err(e) = drafts.save(draft, true) {
        warn!(draft_id = %draft.id, error = %e, "Autosave failed");
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.stop();
    }
}
