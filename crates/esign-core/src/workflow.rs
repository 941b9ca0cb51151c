//! Multi-step workflow orchestration
//!
//! An execution walks a workflow's steps in order, instantiating one
//! document per step. A step's proceed-condition gates advancement; a
//! document-creation failure never fails the execution — the step can be
//! retried.

use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use shared_types::{
    validate_email, DocumentStatus, ExecutionStatus, ProceedCondition, SignerStatus, Workflow,
    WorkflowExecution, WorkflowStep,
};

use crate::error::{CoreError, Result};
use crate::notify::NotificationPayload;
use crate::session::{SessionEngine, SignerSpec};
use crate::store::TenantScope;

#[derive(Debug)]
pub struct StartOutcome {
    pub execution: WorkflowExecution,
    /// The step-1 document, when instantiation succeeded.
    pub document: Option<shared_types::Document>,
    pub notifications: Vec<NotificationPayload>,
}

#[derive(Debug)]
pub struct AdvanceOutcome {
    pub execution: WorkflowExecution,
    /// The next step's document, when one was created.
    pub document: Option<shared_types::Document>,
    pub notifications: Vec<NotificationPayload>,
    pub completed: bool,
}

/// Structural checks applied on save: at least one step, unique order
/// values, and every step named with a template and at least one signer.
pub fn validate_workflow(workflow: &Workflow) -> Result<()> {
    if workflow.steps.is_empty() {
        return Err(CoreError::Validation(
            "workflow must have at least one step".to_string(),
        ));
    }
    let mut orders: Vec<u32> = workflow.steps.iter().map(|s| s.order).collect();
    orders.sort_unstable();
    orders.dedup();
    if orders.len() != workflow.steps.len() {
        return Err(CoreError::Validation(
            "workflow step orders must be unique".to_string(),
        ));
    }
    for step in &workflow.steps {
        if step.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "step {} has no name",
                step.order
            )));
        }
        if step.template_id.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "step '{}' has no template",
                step.name
            )));
        }
        if step.signers.is_empty() {
            return Err(CoreError::Validation(format!(
                "step '{}' has no signers",
                step.name
            )));
        }
        for signer in &step.signers {
            validate_email(&signer.email).map_err(CoreError::Validation)?;
        }
    }
    Ok(())
}

pub struct WorkflowEngine<'a> {
    sessions: &'a SessionEngine<'a>,
}

impl<'a> WorkflowEngine<'a> {
    pub fn new(sessions: &'a SessionEngine<'a>) -> Self {
        Self { sessions }
    }

    /// Validate and persist a workflow definition.
    pub fn save_workflow(&self, tenant_id: &str, workflow: Workflow) -> Result<()> {
        validate_workflow(&workflow)?;
        self.sessions.store().tenant(tenant_id).insert_workflow(workflow)
    }

    /// Begin a run: the execution starts at the first step and its
    /// document is instantiated immediately.
    pub fn start_execution(
        &self,
        tenant_id: &str,
        workflow_id: &str,
        context: Value,
        actor: &str,
    ) -> Result<StartOutcome> {
        let now = Utc::now();
        let (workflow, mut execution) = {
            let mut scope = self.sessions.store().tenant(tenant_id);
            let workflow = scope.workflow(workflow_id)?;
            validate_workflow(&workflow)?;

            let first_order = sorted_steps(&workflow)[0].order;
            let execution = WorkflowExecution {
                id: Uuid::new_v4().to_string(),
                workflow_id: workflow_id.to_string(),
                tenant_id: tenant_id.to_string(),
                status: ExecutionStatus::Pending,
                current_step: first_order,
                context,
                document_ids: Vec::new(),
                started_at: now,
                updated_at: now,
            };
            scope.insert_execution(execution.clone())?;
            (workflow, execution)
        };

        let step = step_by_order(&workflow, execution.current_step)?.clone();
        match self.instantiate_step(tenant_id, &workflow, &step, actor) {
            Ok((document, notifications)) => {
                execution.status = ExecutionStatus::InProgress;
                execution.document_ids.push(document.id.clone());
                execution.updated_at = Utc::now();
                self.sessions
                    .store()
                    .tenant(tenant_id)
                    .update_execution(execution.clone())?;
                Ok(StartOutcome {
                    execution,
                    document: Some(document),
                    notifications,
                })
            }
            Err(e) => {
                // Retryable: the execution exists, the step document does not.
                tracing::warn!(
                    execution = %execution.id,
                    step = %step.name,
                    error = %e,
                    "step document creation failed at start"
                );
                Ok(StartOutcome {
                    execution,
                    document: None,
                    notifications: Vec::new(),
                })
            }
        }
    }

    /// Advance past the current step. The current step's condition must
    /// hold; when no later step exists the execution completes.
    pub fn advance(&self, tenant_id: &str, execution_id: &str, actor: &str) -> Result<AdvanceOutcome> {
        let (workflow, mut execution, next_step) = {
            let mut scope = self.sessions.store().tenant(tenant_id);
            let mut execution = scope.execution(execution_id)?;
            if matches!(
                execution.status,
                ExecutionStatus::Completed | ExecutionStatus::Cancelled
            ) {
                return Err(CoreError::State(format!(
                    "execution is {:?} and cannot advance",
                    execution.status
                )));
            }
            let workflow = scope.workflow(&execution.workflow_id)?;

            let steps = sorted_steps(&workflow);
            let position = steps
                .iter()
                .position(|s| s.order == execution.current_step)
                .ok_or_else(|| {
                    CoreError::State("execution points at a step that no longer exists".to_string())
                })?;
            let current_doc_id = execution.document_ids.get(position).cloned();

            if !self.step_condition_satisfied(&mut scope, steps[position], current_doc_id.as_deref())? {
                return Err(CoreError::State(format!(
                    "step '{}' has not met its proceed condition",
                    steps[position].name
                )));
            }

            let next_step = steps.get(position + 1).map(|s| (*s).clone());
            match &next_step {
                Some(step) => {
                    // Advancement happens before document creation; a
                    // failed creation is retried, not rolled back.
                    execution.current_step = step.order;
                    execution.updated_at = Utc::now();
                    scope.update_execution(execution.clone())?;
                }
                None => {
                    execution.status = ExecutionStatus::Completed;
                    execution.updated_at = Utc::now();
                    scope.update_execution(execution.clone())?;
                }
            }
            (workflow, execution, next_step)
        };

        let Some(step) = next_step else {
            return Ok(AdvanceOutcome {
                execution,
                document: None,
                notifications: Vec::new(),
                completed: true,
            });
        };

        match self.instantiate_step(tenant_id, &workflow, &step, actor) {
            Ok((document, notifications)) => {
                execution.document_ids.push(document.id.clone());
                execution.status = ExecutionStatus::InProgress;
                execution.updated_at = Utc::now();
                self.sessions
                    .store()
                    .tenant(tenant_id)
                    .update_execution(execution.clone())?;
                Ok(AdvanceOutcome {
                    execution,
                    document: Some(document),
                    notifications,
                    completed: false,
                })
            }
            Err(e) => {
                tracing::warn!(
                    execution = %execution.id,
                    step = %step.name,
                    error = %e,
                    "step document creation failed after advancement"
                );
                Ok(AdvanceOutcome {
                    execution,
                    document: None,
                    notifications: Vec::new(),
                    completed: false,
                })
            }
        }
    }

    /// Create the current step's document when an earlier attempt failed.
    pub fn retry_step_document(
        &self,
        tenant_id: &str,
        execution_id: &str,
        actor: &str,
    ) -> Result<AdvanceOutcome> {
        let (workflow, execution, step, position) = {
            let mut scope = self.sessions.store().tenant(tenant_id);
            let execution = scope.execution(execution_id)?;
            if matches!(
                execution.status,
                ExecutionStatus::Completed | ExecutionStatus::Cancelled
            ) {
                return Err(CoreError::State(format!(
                    "execution is {:?}",
                    execution.status
                )));
            }
            let workflow = scope.workflow(&execution.workflow_id)?;
            let steps = sorted_steps(&workflow);
            let position = steps
                .iter()
                .position(|s| s.order == execution.current_step)
                .ok_or_else(|| {
                    CoreError::State("execution points at a step that no longer exists".to_string())
                })?;
            if execution.document_ids.len() > position {
                return Err(CoreError::State(
                    "current step already has a document".to_string(),
                ));
            }
            let step = steps[position].clone();
            (workflow, execution, step, position)
        };

        let (document, notifications) = self.instantiate_step(tenant_id, &workflow, &step, actor)?;
        let mut execution = execution;
        debug_assert_eq!(execution.document_ids.len(), position);
        execution.document_ids.push(document.id.clone());
        execution.status = ExecutionStatus::InProgress;
        execution.updated_at = Utc::now();
        self.sessions
            .store()
            .tenant(tenant_id)
            .update_execution(execution.clone())?;

        Ok(AdvanceOutcome {
            execution,
            document: Some(document),
            notifications,
            completed: false,
        })
    }

    pub fn cancel_execution(&self, tenant_id: &str, execution_id: &str) -> Result<WorkflowExecution> {
        let mut scope = self.sessions.store().tenant(tenant_id);
        let mut execution = scope.execution(execution_id)?;
        if execution.status == ExecutionStatus::Completed {
            return Err(CoreError::State(
                "completed executions cannot be cancelled".to_string(),
            ));
        }
        execution.status = ExecutionStatus::Cancelled;
        execution.updated_at = Utc::now();
        scope.update_execution(execution.clone())?;
        Ok(execution)
    }

    /// Evaluate a step's proceed condition against its document. Absent
    /// condition means "the document completed".
    fn step_condition_satisfied(
        &self,
        scope: &mut TenantScope<'_>,
        step: &WorkflowStep,
        document_id: Option<&str>,
    ) -> Result<bool> {
        let Some(document_id) = document_id else {
            // The step's document was never created; nothing to gate on.
            return Ok(false);
        };
        let document = scope.document(document_id)?;

        let satisfied = match &step.proceed_condition {
            None | Some(ProceedCondition::AllSigned) => {
                document.status == DocumentStatus::Completed
            }
            Some(ProceedCondition::AnySigned) => scope
                .signers_for(document_id)
                .iter()
                .any(|s| s.role.gates_completion() && s.status == SignerStatus::Signed),
            Some(ProceedCondition::FieldValue {
                field_label,
                expected,
            }) => scope
                .fields_for(document_id)
                .iter()
                .find(|f| f.label.as_deref() == Some(field_label.as_str()))
                .and_then(|f| f.value.as_deref())
                .map(|v| v == expected)
                .unwrap_or(false),
            Some(ProceedCondition::Custom { key }) => {
                // Cannot be evaluated inside the core; gate on completion
                // and let bespoke callers gate before calling advance.
                tracing::warn!(key = %key, "custom proceed condition treated as all_signed");
                document.status == DocumentStatus::Completed
            }
        };
        Ok(satisfied)
    }

    fn instantiate_step(
        &self,
        tenant_id: &str,
        workflow: &Workflow,
        step: &WorkflowStep,
        actor: &str,
    ) -> Result<(shared_types::Document, Vec<NotificationPayload>)> {
        let specs: Vec<SignerSpec> = step
            .signers
            .iter()
            .map(|s| SignerSpec {
                name: s.name.clone(),
                email: s.email.clone(),
                role: s.role,
                signing_order: s.signing_order,
                is_internal: s.is_internal,
            })
            .collect();
        let expires_at = workflow
            .default_expiry_days
            .map(|days| Utc::now() + Duration::days(days));

        let document = self.sessions.prepare_from_template(
            tenant_id,
            &step.template_id,
            &format!("{}: {}", workflow.name, step.name),
            &specs,
            workflow.default_message.as_deref(),
            expires_at,
            actor,
        )?;
        let notifications = self.sessions.send(tenant_id, &document.id, actor)?;
        Ok((document, notifications))
    }
}

fn sorted_steps(workflow: &Workflow) -> Vec<&WorkflowStep> {
    let mut steps: Vec<&WorkflowStep> = workflow.steps.iter().collect();
    steps.sort_by_key(|s| s.order);
    steps
}

fn step_by_order(workflow: &Workflow, order: u32) -> Result<&WorkflowStep> {
    workflow
        .steps
        .iter()
        .find(|s| s.order == order)
        .ok_or_else(|| CoreError::State("workflow has no step at the execution's order".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{SignerRole, WorkflowSigner};

    fn step(order: u32, name: &str) -> WorkflowStep {
        WorkflowStep {
            id: Uuid::new_v4().to_string(),
            order,
            name: name.to_string(),
            template_id: "tpl-1".to_string(),
            signers: vec![WorkflowSigner {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                role: SignerRole::Signer,
                signing_order: 1,
                is_internal: false,
            }],
            proceed_condition: None,
        }
    }

    fn workflow(steps: Vec<WorkflowStep>) -> Workflow {
        Workflow {
            id: "wf-1".to_string(),
            tenant_id: "acme".to_string(),
            name: "Onboarding".to_string(),
            steps,
            default_message: None,
            default_expiry_days: None,
            reminders_enabled: true,
            reminder_cadence_days: 3,
            created_by: "ops@acme.test".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn workflows_need_at_least_one_step() {
        assert!(validate_workflow(&workflow(Vec::new())).is_err());
        assert!(validate_workflow(&workflow(vec![step(1, "Intake")])).is_ok());
    }

    #[test]
    fn duplicate_orders_are_rejected() {
        let wf = workflow(vec![step(1, "A"), step(1, "B")]);
        assert!(validate_workflow(&wf).is_err());
    }

    #[test]
    fn unnamed_steps_are_rejected() {
        let wf = workflow(vec![step(1, "  ")]);
        assert!(validate_workflow(&wf).is_err());
    }

    #[test]
    fn steps_without_signers_are_rejected() {
        let mut s = step(1, "Intake");
        s.signers.clear();
        assert!(validate_workflow(&workflow(vec![s])).is_err());
    }

    #[test]
    fn steps_without_template_are_rejected() {
        let mut s = step(1, "Intake");
        s.template_id = String::new();
        assert!(validate_workflow(&workflow(vec![s])).is_err());
    }

    #[test]
    fn bad_signer_emails_are_rejected() {
        let mut s = step(1, "Intake");
        s.signers[0].email = "not-an-email".to_string();
        assert!(validate_workflow(&workflow(vec![s])).is_err());
    }
}
