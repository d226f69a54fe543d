use std::sync::Mutex;

use chrono::{DateTime, Local};

use crate::model::FetchResult;
use crate::store::{MOTD_KEY, Store, StoreError};

/// Mutable fields behind the context lock. Update rates are at most one per
/// second, so a single lock over the whole group is plenty.
#[derive(Debug, Default)]
struct State {
    fetch: FetchResult,
    last_fetched_at: Option<DateTime<Local>>,
    screen_updated_at: Option<DateTime<Local>>,
    motd_updated_at: Option<DateTime<Local>>,
    motd: String,
}

/// Consistent point-in-time copy of the context fields.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub fetch: FetchResult,
    pub last_fetched_at: Option<DateTime<Local>>,
    pub screen_updated_at: Option<DateTime<Local>>,
    pub motd_updated_at: Option<DateTime<Local>>,
    pub motd: String,
}

/// Single source of truth shared by the poller, the render loop, and the
/// HTTP control surface.
///
/// Each operation takes the lock for a short, await-free critical section;
/// readers always observe a complete write, never a partial one.
#[derive(Debug)]
pub struct SharedContext {
    state: Mutex<State>,
    store: Box<dyn Store>,
}

impl SharedContext {
    /// Build the context, seeding the motd from the store.
    pub fn new(store: Box<dyn Store>) -> Result<Self, StoreError> {
        let motd = store.get(MOTD_KEY)?.unwrap_or_default();
        let state = State { motd, ..State::default() };
        Ok(Self { state: Mutex::new(state), store })
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            fetch: state.fetch.clone(),
            last_fetched_at: state.last_fetched_at,
            screen_updated_at: state.screen_updated_at,
            motd_updated_at: state.motd_updated_at,
            motd: state.motd.clone(),
        }
    }

    /// Atomically replace the stored fetch outcome and stamp the fetch time.
    pub fn record_fetch(&self, result: FetchResult) {
        let mut state = self.lock();
        state.fetch = result;
        state.last_fetched_at = Some(Local::now());
    }

    /// Called after a successful display push.
    pub fn record_render(&self) {
        self.lock().screen_updated_at = Some(Local::now());
    }

    /// Replace the motd and persist it.
    ///
    /// The in-memory update happens first and is kept even when persistence
    /// fails; the failure is returned so the HTTP layer can report it.
    pub fn set_motd(&self, motd: &str) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            state.motd = motd.to_string();
            state.motd_updated_at = Some(Local::now());
        }
        self.store.set(MOTD_KEY, motd)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
