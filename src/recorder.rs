//! Post-Write Recorder (§4.11): builds a trace entry from a completed
//! write, appends it to the ledger, updates the intent map, and releases
//! the writer's snapshot — all wrapped in a single infallible boundary so
//! ledger-layer failure can never fail the tool call that triggered it.

use std::path::Path;

use crate::classify::{self, MutationClass};
use crate::hash;
use crate::intent_map;
use crate::ledger::LedgerWriter;
use crate::revision::RevisionProbe;
use crate::snapshot::SnapshotStore;
use crate::timestamp;
use crate::trace::{Contributor, Conversation, EntityType, FileEntry, Range, Related, RelatedType, TraceEntry, VcsInfo};

/// What the surrounding runtime knows about a completed write, passed to
/// [`PostWriteRecorder::record`].
pub struct WriteOutcome<'a> {
    pub workspace_root: &'a Path,
    pub path: &'a str,
    pub content: &'a str,
    pub old_content: Option<&'a str>,
    pub intent_id: Option<&'a str>,
    pub explicit_class: Option<&'a str>,
    pub session_id: Option<&'a str>,
    pub model_identifier: Option<&'a str>,
    pub agent_id: Option<&'a str>,
}

/// Builds and persists trace entries for completed writes (§4.11).
pub struct PostWriteRecorder<'a> {
    pub revisions: &'a RevisionProbe,
    pub ledger: &'a LedgerWriter,
    pub snapshots: &'a SnapshotStore,
}

impl<'a> PostWriteRecorder<'a> {
    #[must_use]
    pub fn new(
        revisions: &'a RevisionProbe,
        ledger: &'a LedgerWriter,
        snapshots: &'a SnapshotStore,
    ) -> Self {
        Self {
            revisions,
            ledger,
            snapshots,
        }
    }

    /// Run the seven-step post-write flow for `outcome`. Never returns an
    /// error: every internal failure is logged via `tracing::warn!` and
    /// swallowed, since a ledger/map failure must never fail the write
    /// that already committed (§4.11, §7).
    #[tracing::instrument(skip(self, outcome), fields(path = %outcome.path))]
    pub fn record(&self, outcome: &WriteOutcome<'_>) {
        // Step 1: no-op without an intent.
        let Some(intent_id) = outcome.intent_id else {
            return;
        };

        // Step 2: fetch revision.
        let revision_id = self.revisions.current_revision(outcome.workspace_root);

        // Step 3: resolve mutation class.
        let mutation_class = resolve_class(outcome);

        // Step 4: line count and range hash.
        let line_count = hash::line_count(outcome.content).max(1);
        let range_hash = format!("sha256:{}", hash::digest_range(outcome.content, 1, line_count));

        // Step 5: build the trace entry.
        let url = outcome
            .session_id
            .map(str::to_owned)
            .unwrap_or_else(|| format!("session://{}", timestamp::now_millis()));

        let entry = TraceEntry {
            id: crate::ids::trace_id(),
            timestamp: timestamp::now_millis(),
            vcs: VcsInfo { revision_id },
            files: vec![FileEntry {
                relative_path: outcome.path.to_owned(),
                conversations: vec![Conversation {
                    url,
                    contributor: Contributor {
                        entity_type: EntityType::Ai,
                        model_identifier: Some(
                            outcome.model_identifier.unwrap_or("unknown").to_owned(),
                        ),
                    },
                    ranges: vec![Range {
                        start_line: 1,
                        end_line: line_count,
                        content_hash: range_hash,
                    }],
                    related: vec![Related {
                        kind: RelatedType::Specification,
                        value: intent_id.to_owned(),
                    }],
                }],
            }],
            mutation_class,
        };

        // Step 6: append to the ledger, then update the intent map.
        if let Err(err) = self.ledger.append(outcome.workspace_root, &entry) {
            tracing::warn!(error = %err, "failed to append trace entry; write proceeds anyway");
            return;
        }
        if let Err(err) = intent_map::upsert(outcome.workspace_root, intent_id, outcome.path, None) {
            tracing::warn!(error = %err, "failed to update intent map after a successful trace append");
        }

        // Step 7: best-effort snapshot release.
        if let Some(agent_id) = outcome.agent_id {
            self.snapshots.release(outcome.path, agent_id);
        }
    }
}

fn resolve_class(outcome: &WriteOutcome<'_>) -> MutationClass {
    if let Some(old) = outcome.old_content {
        classify::resolve(outcome.explicit_class, old, outcome.content)
    } else if let Some(explicit) = outcome.explicit_class.and_then(MutationClass::parse_explicit) {
        explicit
    } else {
        MutationClass::AstRefactor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_stack() -> (RevisionProbe, LedgerWriter, SnapshotStore) {
        (RevisionProbe::new(), LedgerWriter::new(), SnapshotStore::new())
    }

    #[test]
    fn no_intent_id_is_a_noop() {
        let ws = tempfile::tempdir().unwrap();
        let (revisions, ledger, snapshots) = recorder_stack();
        let recorder = PostWriteRecorder::new(&revisions, &ledger, &snapshots);

        let outcome = WriteOutcome {
            workspace_root: ws.path(),
            path: "src/a.ts",
            content: "line one\n",
            old_content: None,
            intent_id: None,
            explicit_class: None,
            session_id: None,
            model_identifier: None,
            agent_id: None,
        };
        recorder.record(&outcome);

        assert!(ledger.read(ws.path()).is_empty());
    }

    #[test]
    fn records_a_trace_entry_and_updates_intent_map() {
        let ws = tempfile::tempdir().unwrap();
        let (revisions, ledger, snapshots) = recorder_stack();
        let recorder = PostWriteRecorder::new(&revisions, &ledger, &snapshots);

        let outcome = WriteOutcome {
            workspace_root: ws.path(),
            path: "src/a.ts",
            content: "line one\nline two\n",
            old_content: None,
            intent_id: Some("INT-001"),
            explicit_class: None,
            session_id: Some("agt-1"),
            model_identifier: Some("claude"),
            agent_id: Some("agt-1"),
        };
        recorder.record(&outcome);

        let entries = ledger.read(ws.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].files[0].relative_path, "src/a.ts");
        assert_eq!(entries[0].files[0].conversations[0].ranges[0].end_line, 2);
        assert_eq!(entries[0].mutation_class, MutationClass::AstRefactor);

        let map = std::fs::read_to_string(ws.path().join(crate::intent_map::INTENT_MAP_PATH)).unwrap();
        assert!(map.contains("INT-001"));
        assert!(map.contains("src/a.ts"));
    }

    #[test]
    fn releases_snapshot_after_recording() {
        let ws = tempfile::tempdir().unwrap();
        let (revisions, ledger, snapshots) = recorder_stack();
        snapshots.capture("src/a.ts", "old", "agt-1");

        let recorder = PostWriteRecorder::new(&revisions, &ledger, &snapshots);
        let outcome = WriteOutcome {
            workspace_root: ws.path(),
            path: "src/a.ts",
            content: "new content\n",
            old_content: None,
            intent_id: Some("INT-001"),
            explicit_class: None,
            session_id: None,
            model_identifier: None,
            agent_id: Some("agt-1"),
        };
        recorder.record(&outcome);

        assert!(snapshots.is_empty());
    }

    #[test]
    fn classifies_bug_fix_from_old_and_new_content() {
        let ws = tempfile::tempdir().unwrap();
        let (revisions, ledger, snapshots) = recorder_stack();
        let recorder = PostWriteRecorder::new(&revisions, &ledger, &snapshots);

        let outcome = WriteOutcome {
            workspace_root: ws.path(),
            path: "src/a.ts",
            content: "if (x !== null) { return x; }\n",
            old_content: Some("if (x != null) { return undefined; }\n"),
            intent_id: Some("INT-001"),
            explicit_class: None,
            session_id: None,
            model_identifier: None,
            agent_id: None,
        };
        recorder.record(&outcome);

        let entries = ledger.read(ws.path());
        assert_eq!(entries[0].mutation_class, MutationClass::BugFix);
    }

    #[test]
    fn explicit_class_overrides_heuristic() {
        let ws = tempfile::tempdir().unwrap();
        let (revisions, ledger, snapshots) = recorder_stack();
        let recorder = PostWriteRecorder::new(&revisions, &ledger, &snapshots);

        let outcome = WriteOutcome {
            workspace_root: ws.path(),
            path: "src/a.ts",
            content: "same\n",
            old_content: Some("same\n"),
            intent_id: Some("INT-001"),
            explicit_class: Some("INTENT_EVOLUTION"),
            session_id: None,
            model_identifier: None,
            agent_id: None,
        };
        recorder.record(&outcome);

        let entries = ledger.read(ws.path());
        assert_eq!(entries[0].mutation_class, MutationClass::IntentEvolution);
    }

    #[test]
    fn missing_old_content_defaults_to_ast_refactor() {
        let ws = tempfile::tempdir().unwrap();
        let (revisions, ledger, snapshots) = recorder_stack();
        let recorder = PostWriteRecorder::new(&revisions, &ledger, &snapshots);

        let outcome = WriteOutcome {
            workspace_root: ws.path(),
            path: "src/a.ts",
            content: "fresh file\n",
            old_content: None,
            intent_id: Some("INT-001"),
            explicit_class: None,
            session_id: None,
            model_identifier: None,
            agent_id: None,
        };
        recorder.record(&outcome);

        let entries = ledger.read(ws.path());
        assert_eq!(entries[0].mutation_class, MutationClass::AstRefactor);
    }
}
