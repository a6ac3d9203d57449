//! Agent session lifecycle: creation, activity tracking, and idleness
//! eviction (§4.4).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::ids;

/// A single agent session's tracked state.
#[derive(Clone, Debug)]
pub struct Session {
    pub created_at: Instant,
    pub last_activity: Instant,
    pub intent_id: Option<String>,
    pub files: HashSet<String>,
}

impl Session {
    fn new(intent_id: Option<String>, now: Instant) -> Self {
        Self {
            created_at: now,
            last_activity: now,
            intent_id,
            files: HashSet::new(),
        }
    }
}

/// The default session idleness TTL before eviction (30 minutes, §3).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Tracks agent sessions: creation, last-activity, bound intent, and the
/// set of workspace-relative paths a session has touched.
///
/// One instance is owned per workspace (typically by [`crate::Orchestrator`]);
/// this is not process-wide global state (§9 Design Notes).
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a fresh session id (does not register it).
    #[must_use]
    pub fn create_id(&self) -> String {
        ids::session_id()
    }

    /// Register a new session under `id`, optionally bound to an intent.
    /// Overwrites any existing session with the same id.
    pub fn register(&self, id: &str, intent_id: Option<String>) {
        let mut sessions = self.lock();
        sessions.insert(id.to_owned(), Session::new(intent_id, Instant::now()));
    }

    /// Remove a session entirely.
    pub fn unregister(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Refresh `id`'s last-activity timestamp. No-op if the session does
    /// not exist (callers that need registration-on-first-touch should
    /// call `register` first).
    pub fn touch(&self, id: &str) {
        if let Some(session) = self.lock().get_mut(id) {
            session.last_activity = Instant::now();
        }
    }

    /// Record that session `id` has observed `path`, and bump its
    /// last-activity timestamp (read/write pre-hooks implicitly touch).
    pub fn add_file(&self, id: &str, path: &str) {
        if let Some(session) = self.lock().get_mut(id) {
            session.files.insert(path.to_owned());
            session.last_activity = Instant::now();
        }
    }

    /// Stop tracking `path` under session `id`.
    pub fn remove_file(&self, id: &str, path: &str) {
        if let Some(session) = self.lock().get_mut(id) {
            session.files.remove(path);
        }
    }

    /// `true` if `id` is currently registered.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Return the ids of all currently registered sessions.
    #[must_use]
    pub fn list_active(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Return a copy of session `id`'s state, if registered.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    /// Evict sessions whose last-activity is older than `max_age`.
    pub fn sweep(&self, max_age: Duration) {
        let mut sessions = self.lock();
        sessions.retain(|_, session| session.last_activity.elapsed() < max_age);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_is_active() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        assert!(registry.is_active("agt-1"));
    }

    #[test]
    fn unregister_removes_session() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        registry.unregister("agt-1");
        assert!(!registry.is_active("agt-1"));
    }

    #[test]
    fn new_session_has_creation_le_last_activity() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        let session = registry.get("agt-1").unwrap();
        assert!(session.last_activity >= session.created_at);
    }

    #[test]
    fn touch_updates_last_activity_without_touching_creation() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        let before = registry.get("agt-1").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        registry.touch("agt-1");
        let after = registry.get("agt-1").unwrap();
        assert_eq!(before.created_at, after.created_at);
        assert!(after.last_activity > before.last_activity);
    }

    #[test]
    fn touch_on_unknown_session_is_noop() {
        let registry = SessionRegistry::new();
        registry.touch("does-not-exist");
        assert!(!registry.is_active("does-not-exist"));
    }

    #[test]
    fn add_file_tracks_path_and_touches() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        registry.add_file("agt-1", "src/a.ts");
        let session = registry.get("agt-1").unwrap();
        assert!(session.files.contains("src/a.ts"));
    }

    #[test]
    fn remove_file_untracks_path() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        registry.add_file("agt-1", "src/a.ts");
        registry.remove_file("agt-1", "src/a.ts");
        let session = registry.get("agt-1").unwrap();
        assert!(!session.files.contains("src/a.ts"));
    }

    #[test]
    fn list_active_returns_all_registered_ids() {
        let registry = SessionRegistry::new();
        registry.register("agt-1", None);
        registry.register("agt-2", None);
        let mut active = registry.list_active();
        active.sort();
        assert_eq!(active, vec!["agt-1".to_owned(), "agt-2".to_owned()]);
    }

    #[test]
    fn sweep_evicts_only_idle_sessions() {
        let registry = SessionRegistry::new();
        registry.register("stale", None);
        // Backdate "stale" by touching then waiting past max_age.
        std::thread::sleep(Duration::from_millis(20));
        registry.register("fresh", None);

        registry.sweep(Duration::from_millis(10));

        assert!(!registry.is_active("stale"));
        assert!(registry.is_active("fresh"));
    }

    #[test]
    fn create_id_has_expected_prefix() {
        let registry = SessionRegistry::new();
        assert!(registry.create_id().starts_with("agt-"));
    }
}
