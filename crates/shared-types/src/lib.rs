//! Shared data model for the e-signature document-processing engine
//!
//! Entities, status machines, captured signature marks, and the
//! hash-linked audit trail used by every other crate in the workspace.

pub mod audit;
pub mod model;
pub mod signature;
pub mod workflow;

pub use audit::{
    hash_document, AuditAction, AuditEntry, AuditTrail, CompletionCertificate, SignerAttestation,
};
pub use model::{
    validate_email, Document, DocumentStatus, Field, FieldKind, FieldRect, Signer, SignerRole,
    SignerStatus, Template, TemplateField, TemplateStatus,
};
pub use signature::{
    signature_font, RasterFormat, SignatureFont, SignatureMark, SignatureRecord, SIGNATURE_FONTS,
};
pub use workflow::{
    ExecutionStatus, ProceedCondition, Workflow, WorkflowExecution, WorkflowSigner, WorkflowStep,
};
