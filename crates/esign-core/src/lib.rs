//! E-signature document-processing core
//!
//! The tenant-scoped store, the signing-session state machine with
//! wave-ordered signature collection, workflow orchestration across
//! template chains, the append-only compliance trail, notification
//! payload assembly, and text-placeholder substitution. PDF mechanics
//! live in `shared-pdf`; entities in `shared-types`.

pub mod audit;
pub mod error;
pub mod notify;
pub mod object_store;
pub mod session;
pub mod signatures;
pub mod store;
pub mod vars;
pub mod workflow;

pub use audit::{compile_certificate, verify_trail};
pub use error::{CoreError, Result};
pub use notify::{download_url, signing_url, NotificationKind, NotificationPayload};
pub use object_store::{paths, MemoryObjectStore, ObjectStore};
pub use session::{
    active_external_wave, active_internal_wave, all_required_signed, can_act, next_signers,
    CompletionOutcome, DeclineOutcome, EngineConfig, SessionEngine, SignerSpec, SigningSession,
    VoidOutcome,
};
pub use signatures::{validate_mark, MAX_MARK_BYTES};
pub use store::{DashboardSummary, DocumentStats, MemoryStore, TenantScope, TokenResolution};
pub use vars::{substitute, VariableContext};
pub use workflow::{validate_workflow, AdvanceOutcome, StartOutcome, WorkflowEngine};
