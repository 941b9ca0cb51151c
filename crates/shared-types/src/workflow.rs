//! Multi-step workflow definitions and executions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SignerRole;

/// Gate deciding whether an execution may advance past a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProceedCondition {
    /// The step's document reached `completed`.
    AllSigned,
    /// At least one signer-role party on the step's document has signed.
    AnySigned,
    /// The named field on the step's document holds the expected value.
    FieldValue { field_label: String, expected: String },
    /// Evaluated outside the core; gates like `AllSigned` here.
    Custom { key: String },
}

/// A party slot on a workflow step; resolved into a concrete `Signer`
/// when the step's document is instantiated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSigner {
    pub name: String,
    pub email: String,
    pub role: SignerRole,
    pub signing_order: u32,
    pub is_internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    /// Position in the chain; unique within a workflow, 1-based.
    pub order: u32,
    pub name: String,
    pub template_id: String,
    pub signers: Vec<WorkflowSigner>,
    pub proceed_condition: Option<ProceedCondition>,
}

/// An ordered chain of template-driven documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub steps: Vec<WorkflowStep>,
    pub default_message: Option<String>,
    pub default_expiry_days: Option<i64>,
    pub reminders_enabled: bool,
    pub reminder_cadence_days: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// One run of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: String,
    pub workflow_id: String,
    pub tenant_id: String,
    pub status: ExecutionStatus,
    /// 1-based order value of the step currently in flight.
    pub current_step: u32,
    /// Carried into every document the execution produces, e.g. a linked
    /// external-party id.
    pub context: serde_json::Value,
    /// Documents produced so far, in step order.
    pub document_ids: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
