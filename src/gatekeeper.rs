//! Write Gatekeeper (§4.10): the pre-write enforcement pipeline. Runs the
//! optimistic-concurrency check, then intent presence/existence, then
//! scope match, in a fixed order with the first failure short-circuiting.

use std::path::Path;

use crate::intent::IntentCatalog;
use crate::path_match;
use crate::snapshot::SnapshotStore;

/// The context a write is attempted under.
pub struct WriteContext<'a> {
    pub workspace_root: &'a Path,
    pub intent_id: Option<&'a str>,
    pub agent_id: Option<&'a str>,
}

/// Why the gatekeeper blocked a write. Each variant carries enough detail
/// for a caller to surface an actionable message (§4.10).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GatekeeperError {
    #[error("stale file: '{path}' was modified since '{holder}' last observed it")]
    StaleFile { path: String, holder: String },

    #[error("must cite a valid active intent")]
    NoActiveIntent,

    #[error("intent '{intent_id}' not found")]
    IntentNotFound { intent_id: String },

    #[error("intent '{intent_id}' has no owned_scope")]
    NoOwnedScope { intent_id: String },

    #[error("scope violation: intent '{intent_name}' ({intent_id}) is not authorised to edit '{path}'")]
    ScopeViolation {
        intent_name: String,
        intent_id: String,
        path: String,
    },
}

impl GatekeeperError {
    /// `false` for errors that retrying the same write cannot fix (missing
    /// intent citation); `true` otherwise (§4.10 step 2's "non-recoverable
    /// by retry" note, generalised: everything else can in principle be
    /// retried after the caller corrects state — a fresh snapshot, a
    /// broadened scope, a registered intent).
    #[must_use]
    pub fn recoverable(&self) -> bool {
        !matches!(self, Self::NoActiveIntent)
    }
}

/// The gatekeeper's verdict for a single write attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum GatekeeperDecision {
    Pass,
    Blocked(GatekeeperError),
}

/// Enforces the write pipeline described in §4.10 against a proposed
/// `(path, content)` write.
pub struct WriteGatekeeper<'a> {
    pub snapshots: &'a SnapshotStore,
    pub intents: &'a IntentCatalog,
}

impl<'a> WriteGatekeeper<'a> {
    #[must_use]
    pub fn new(snapshots: &'a SnapshotStore, intents: &'a IntentCatalog) -> Self {
        Self { snapshots, intents }
    }

    /// Run the six-step pipeline against `path` under `context`. Performs
    /// at most one disk read (the optimistic `verify` in step 1).
    #[tracing::instrument(skip(self, context), fields(path = %path))]
    #[must_use]
    pub fn check(&self, path: &str, context: &WriteContext<'_>) -> GatekeeperDecision {
        // Step 1: optimistic check.
        if let Some(agent_id) = context.agent_id {
            if !self.snapshots.verify(context.workspace_root, path, agent_id) {
                return GatekeeperDecision::Blocked(GatekeeperError::StaleFile {
                    path: path.to_owned(),
                    holder: agent_id.to_owned(),
                });
            }
        }

        // Step 2: intent presence.
        let Some(intent_id) = context.intent_id else {
            return GatekeeperDecision::Blocked(GatekeeperError::NoActiveIntent);
        };

        // Step 3: intent existence.
        let intent = match self.intents.find_by_id(context.workspace_root, intent_id) {
            Ok(Some(intent)) => intent,
            Ok(None) => {
                return GatekeeperDecision::Blocked(GatekeeperError::IntentNotFound {
                    intent_id: intent_id.to_owned(),
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "intent catalog lookup failed; treating as not found");
                return GatekeeperDecision::Blocked(GatekeeperError::IntentNotFound {
                    intent_id: intent_id.to_owned(),
                });
            }
        };

        // Step 4: scope presence.
        if intent.owned_scope.is_empty() {
            return GatekeeperDecision::Blocked(GatekeeperError::NoOwnedScope {
                intent_id: intent_id.to_owned(),
            });
        }

        // Step 5: scope match.
        let normalized = path_match::normalize(Path::new(path), context.workspace_root);
        if !path_match::matches_any(Path::new(&normalized), &intent.owned_scope, context.workspace_root) {
            return GatekeeperDecision::Blocked(GatekeeperError::ScopeViolation {
                intent_name: intent.name,
                intent_id: intent_id.to_owned(),
                path: path.to_owned(),
            });
        }

        GatekeeperDecision::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn active_intents_yaml() -> &'static str {
        r"
intents:
  - id: INT-001
    name: Add login flow
    owned_scope:
      - src/auth/**
"
    }

    fn workspace_with_intent() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".orchestration")).unwrap();
        fs::write(
            dir.path().join(crate::intent::ACTIVE_INTENTS_PATH),
            active_intents_yaml(),
        )
        .unwrap();
        dir
    }

    #[test]
    fn passes_when_all_checks_succeed() {
        let ws = workspace_with_intent();
        let snapshots = SnapshotStore::new();
        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);

        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: Some("INT-001"),
            agent_id: None,
        };
        assert_eq!(
            gatekeeper.check("src/auth/login.ts", &context),
            GatekeeperDecision::Pass
        );
    }

    #[test]
    fn blocks_on_stale_snapshot() {
        let ws = workspace_with_intent();
        fs::create_dir_all(ws.path().join("src/auth")).unwrap();
        fs::write(ws.path().join("src/auth/login.ts"), "v1").unwrap();

        let snapshots = SnapshotStore::new();
        snapshots.capture_from_disk(ws.path(), "src/auth/login.ts", "agt-1").unwrap();
        fs::write(ws.path().join("src/auth/login.ts"), "v2").unwrap();

        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);
        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: Some("INT-001"),
            agent_id: Some("agt-1"),
        };

        let decision = gatekeeper.check("src/auth/login.ts", &context);
        assert!(matches!(
            decision,
            GatekeeperDecision::Blocked(GatekeeperError::StaleFile { .. })
        ));
    }

    #[test]
    fn blocks_on_missing_intent_id() {
        let ws = workspace_with_intent();
        let snapshots = SnapshotStore::new();
        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);

        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: None,
            agent_id: None,
        };
        assert_eq!(
            gatekeeper.check("src/auth/login.ts", &context),
            GatekeeperDecision::Blocked(GatekeeperError::NoActiveIntent)
        );
        assert!(!GatekeeperError::NoActiveIntent.recoverable());
    }

    #[test]
    fn blocks_on_unknown_intent() {
        let ws = workspace_with_intent();
        let snapshots = SnapshotStore::new();
        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);

        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: Some("INT-999"),
            agent_id: None,
        };
        assert_eq!(
            gatekeeper.check("src/auth/login.ts", &context),
            GatekeeperDecision::Blocked(GatekeeperError::IntentNotFound {
                intent_id: "INT-999".to_owned()
            })
        );
    }

    #[test]
    fn blocks_on_empty_owned_scope() {
        let ws = tempfile::tempdir().unwrap();
        fs::create_dir_all(ws.path().join(".orchestration")).unwrap();
        fs::write(
            ws.path().join(crate::intent::ACTIVE_INTENTS_PATH),
            r"
intents:
  - id: INT-002
    name: No scope
    owned_scope: []
",
        )
        .unwrap();

        let snapshots = SnapshotStore::new();
        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);

        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: Some("INT-002"),
            agent_id: None,
        };
        assert_eq!(
            gatekeeper.check("src/a.ts", &context),
            GatekeeperDecision::Blocked(GatekeeperError::NoOwnedScope {
                intent_id: "INT-002".to_owned()
            })
        );
    }

    #[test]
    fn blocks_on_scope_violation() {
        let ws = workspace_with_intent();
        let snapshots = SnapshotStore::new();
        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);

        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: Some("INT-001"),
            agent_id: None,
        };
        let decision = gatekeeper.check("src/other/file.ts", &context);
        assert!(matches!(
            decision,
            GatekeeperDecision::Blocked(GatekeeperError::ScopeViolation { .. })
        ));
    }

    #[test]
    fn check_is_idempotent_for_identical_state() {
        let ws = workspace_with_intent();
        let snapshots = SnapshotStore::new();
        let intents = IntentCatalog::new();
        let gatekeeper = WriteGatekeeper::new(&snapshots, &intents);
        let context = WriteContext {
            workspace_root: ws.path(),
            intent_id: Some("INT-001"),
            agent_id: None,
        };
        let first = gatekeeper.check("src/auth/login.ts", &context);
        let second = gatekeeper.check("src/auth/login.ts", &context);
        assert_eq!(first, second);
    }
}
