//! Orchestration middleware for concurrent multi-agent file mutations.
//!
//! Sits between an agent-facing tool layer and the filesystem, enforcing
//! two contracts on every write — optimistic concurrency (a write must not
//! silently clobber content an agent never saw) and intent-scoped
//! gatekeeping (a write must be authorised by the active intent's declared
//! scope) — and recording every accepted write to an append-only,
//! content-addressed traceability ledger.
//!
//! [`Orchestrator`] is the facade: one instance per workspace root, owning
//! every stateful component and the two background sweepers that evict
//! idle sessions and expired snapshots.

pub mod classify;
pub mod config;
pub mod gatekeeper;
pub mod hash;
pub mod ids;
pub mod intent;
pub mod intent_map;
pub mod ledger;
pub mod lessons;
pub mod orchestrator;
pub mod path_match;
pub mod recorder;
pub mod revision;
pub mod session;
pub mod snapshot;
pub mod timestamp;
pub mod trace;

pub use config::OrchestratorConfig;
pub use gatekeeper::{GatekeeperDecision, GatekeeperError, WriteContext, WriteGatekeeper};
pub use orchestrator::Orchestrator;
pub use recorder::WriteOutcome;
pub use trace::TraceEntry;
