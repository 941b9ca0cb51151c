//! Tenant-scoped in-memory store
//!
//! The only way to touch data is `MemoryStore::tenant`, which returns a
//! scope holding the store lock for its lifetime. Compound check+write
//! sequences performed through one scope are a single logical unit, and
//! no call can read another tenant's tables. Persistence mechanics behind
//! this interface are an external concern.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared_types::{
    AuditAction, AuditEntry, AuditTrail, Document, DocumentStatus, Field, SignatureRecord, Signer,
    Template, TemplateStatus, Workflow, WorkflowExecution,
};

use crate::error::{CoreError, Result};

#[derive(Default)]
struct TenantTables {
    templates: HashMap<String, Template>,
    documents: HashMap<String, Document>,
    signers: HashMap<String, Signer>,
    fields: HashMap<String, Field>,
    signatures: HashMap<String, SignatureRecord>,
    workflows: HashMap<String, Workflow>,
    executions: HashMap<String, WorkflowExecution>,
    trails: HashMap<String, AuditTrail>,
}

#[derive(Default)]
struct StoreInner {
    tenants: HashMap<String, TenantTables>,
    /// access token -> owning scope. Tokens arrive without tenant context
    /// (the signing link carries only the token), so this index exists
    /// solely to recover the scope; all reads then go through it.
    tokens: HashMap<String, TokenResolution>,
}

/// Which tenant/document/signer an access token belongs to.
#[derive(Debug, Clone)]
pub struct TokenResolution {
    pub tenant_id: String,
    pub document_id: String,
    pub signer_id: String,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an exclusive scope on one tenant's tables.
    pub fn tenant(&self, tenant_id: &str) -> TenantScope<'_> {
        TenantScope {
            tenant_id: tenant_id.to_string(),
            guard: self.inner.write().expect("store lock"),
        }
    }

    /// Recover the tenant scope an access token belongs to.
    pub fn resolve_token(&self, token: &str) -> Option<TokenResolution> {
        self.inner
            .read()
            .expect("store lock")
            .tokens
            .get(token)
            .cloned()
    }
}

/// Per-document completion statistics.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total_signers: usize,
    pub signed_signers: usize,
    pub total_fields: usize,
    pub filled_fields: usize,
    pub required_fields: usize,
    pub filled_required_fields: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_documents: usize,
    pub completed_documents: usize,
    /// Completed over total, 0.0 when there is nothing yet.
    pub completion_rate: f64,
    /// Mean days from creation to completion across completed documents.
    pub avg_days_to_completion: Option<f64>,
    pub by_status: BTreeMap<String, usize>,
}

pub struct TenantScope<'a> {
    tenant_id: String,
    guard: RwLockWriteGuard<'a, StoreInner>,
}

impl TenantScope<'_> {
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    fn tables(&mut self) -> &mut TenantTables {
        self.guard
            .tenants
            .entry(self.tenant_id.clone())
            .or_default()
    }

    fn assert_tenant(&self, entity_tenant: &str) -> Result<()> {
        if entity_tenant != self.tenant_id {
            return Err(CoreError::Validation(format!(
                "entity belongs to tenant {}, scope is {}",
                entity_tenant, self.tenant_id
            )));
        }
        Ok(())
    }

    // ---- templates ----

    pub fn insert_template(&mut self, template: Template) -> Result<()> {
        self.assert_tenant(&template.tenant_id)?;
        for field in &template.fields {
            field
                .rect
                .validate()
                .map_err(CoreError::Validation)?;
        }
        self.tables().templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn template(&mut self, id: &str) -> Result<Template> {
        self.tables()
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("template", id))
    }

    pub fn templates(&mut self) -> Vec<Template> {
        let mut all: Vec<_> = self.tables().templates.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    pub fn update_template(&mut self, template: Template) -> Result<()> {
        self.assert_tenant(&template.tenant_id)?;
        if !self.tables().templates.contains_key(&template.id) {
            return Err(CoreError::not_found("template", &template.id));
        }
        self.tables().templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Deep-copy a template, fields included, as a new draft.
    pub fn duplicate_template(&mut self, id: &str, new_name: &str, now: DateTime<Utc>) -> Result<Template> {
        let source = self.template(id)?;
        let mut copy = source.clone();
        copy.id = Uuid::new_v4().to_string();
        copy.name = new_name.to_string();
        copy.status = TemplateStatus::Draft;
        copy.created_at = now;
        copy.updated_at = now;
        for field in &mut copy.fields {
            field.id = Uuid::new_v4().to_string();
        }
        self.tables().templates.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    /// Remove a template, or archive it if documents were produced from
    /// it — used templates are never hard-deleted.
    pub fn delete_template(&mut self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let used = self
            .tables()
            .documents
            .values()
            .any(|d| d.template_id.as_deref() == Some(id));
        if used {
            let mut template = self.template(id)?;
            template.status = TemplateStatus::Archived;
            template.updated_at = now;
            self.tables().templates.insert(id.to_string(), template);
        } else if self.tables().templates.remove(id).is_none() {
            return Err(CoreError::not_found("template", id));
        }
        Ok(())
    }

    // ---- documents ----

    pub fn insert_document(&mut self, document: Document) -> Result<()> {
        self.assert_tenant(&document.tenant_id)?;
        self.tables().documents.insert(document.id.clone(), document);
        Ok(())
    }

    pub fn document(&mut self, id: &str) -> Result<Document> {
        self.tables()
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("document", id))
    }

    pub fn documents(&mut self) -> Vec<Document> {
        let mut all: Vec<_> = self.tables().documents.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    pub fn update_document(&mut self, document: Document) -> Result<()> {
        self.assert_tenant(&document.tenant_id)?;
        if !self.tables().documents.contains_key(&document.id) {
            return Err(CoreError::not_found("document", &document.id));
        }
        self.tables().documents.insert(document.id.clone(), document);
        Ok(())
    }

    // ---- signers ----

    pub fn insert_signer(&mut self, signer: Signer) -> Result<()> {
        if self.guard.tokens.contains_key(&signer.access_token) {
            return Err(CoreError::Validation(
                "access token already in use".to_string(),
            ));
        }
        let resolution = TokenResolution {
            tenant_id: self.tenant_id.clone(),
            document_id: signer.document_id.clone(),
            signer_id: signer.id.clone(),
        };
        self.guard
            .tokens
            .insert(signer.access_token.clone(), resolution);
        self.tables().signers.insert(signer.id.clone(), signer);
        Ok(())
    }

    pub fn signer(&mut self, id: &str) -> Result<Signer> {
        self.tables()
            .signers
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("signer", id))
    }

    /// All signers of a document, ordered by signing order then name.
    pub fn signers_for(&mut self, document_id: &str) -> Vec<Signer> {
        let mut list: Vec<_> = self
            .tables()
            .signers
            .values()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            a.signing_order
                .cmp(&b.signing_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        list
    }

    pub fn update_signer(&mut self, signer: Signer) -> Result<()> {
        if !self.tables().signers.contains_key(&signer.id) {
            return Err(CoreError::not_found("signer", &signer.id));
        }
        self.tables().signers.insert(signer.id.clone(), signer);
        Ok(())
    }

    // ---- fields ----

    pub fn insert_field(&mut self, field: Field) -> Result<()> {
        field.rect.validate().map_err(CoreError::Validation)?;
        self.tables().fields.insert(field.id.clone(), field);
        Ok(())
    }

    pub fn field(&mut self, id: &str) -> Result<Field> {
        self.tables()
            .fields
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("field", id))
    }

    pub fn fields_for(&mut self, document_id: &str) -> Vec<Field> {
        let mut list: Vec<_> = self
            .tables()
            .fields
            .values()
            .filter(|f| f.document_id == document_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            a.page
                .cmp(&b.page)
                .then_with(|| a.rect.y.total_cmp(&b.rect.y))
                .then_with(|| a.rect.x.total_cmp(&b.rect.x))
        });
        list
    }

    pub fn update_field(&mut self, field: Field) -> Result<()> {
        field.rect.validate().map_err(CoreError::Validation)?;
        if !self.tables().fields.contains_key(&field.id) {
            return Err(CoreError::not_found("field", &field.id));
        }
        self.tables().fields.insert(field.id.clone(), field);
        Ok(())
    }

    // ---- signature records ----

    pub fn put_signature(&mut self, record: SignatureRecord) {
        self.tables()
            .signatures
            .insert(record.signer_id.clone(), record);
    }

    pub fn signature_for(&mut self, signer_id: &str) -> Option<SignatureRecord> {
        self.tables().signatures.get(signer_id).cloned()
    }

    // ---- workflows ----

    pub fn insert_workflow(&mut self, workflow: Workflow) -> Result<()> {
        self.assert_tenant(&workflow.tenant_id)?;
        self.tables().workflows.insert(workflow.id.clone(), workflow);
        Ok(())
    }

    pub fn workflow(&mut self, id: &str) -> Result<Workflow> {
        self.tables()
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("workflow", id))
    }

    pub fn insert_execution(&mut self, execution: WorkflowExecution) -> Result<()> {
        self.assert_tenant(&execution.tenant_id)?;
        self.tables()
            .executions
            .insert(execution.id.clone(), execution);
        Ok(())
    }

    pub fn execution(&mut self, id: &str) -> Result<WorkflowExecution> {
        self.tables()
            .executions
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("execution", id))
    }

    pub fn update_execution(&mut self, execution: WorkflowExecution) -> Result<()> {
        self.assert_tenant(&execution.tenant_id)?;
        if !self.tables().executions.contains_key(&execution.id) {
            return Err(CoreError::not_found("execution", &execution.id));
        }
        self.tables()
            .executions
            .insert(execution.id.clone(), execution);
        Ok(())
    }

    // ---- audit trail ----

    /// Append one entry to a document's trail. Entries are never mutated
    /// or removed afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn append_audit(
        &mut self,
        document_id: &str,
        action: AuditAction,
        signer_id: Option<&str>,
        actor: &str,
        detail: serde_json::Value,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuditEntry {
        let trail = self
            .tables()
            .trails
            .entry(document_id.to_string())
            .or_insert_with(|| AuditTrail::new(document_id));
        trail
            .append(action, signer_id, actor, detail, ip_address, user_agent, now)
            .clone()
    }

    pub fn trail(&mut self, document_id: &str) -> AuditTrail {
        self.tables()
            .trails
            .get(document_id)
            .cloned()
            .unwrap_or_else(|| AuditTrail::new(document_id))
    }

    // ---- derived queries ----

    pub fn document_stats(&mut self, document_id: &str) -> Result<DocumentStats> {
        self.document(document_id)?;
        let signers = self.signers_for(document_id);
        let fields = self.fields_for(document_id);
        Ok(DocumentStats {
            total_signers: signers.len(),
            signed_signers: signers
                .iter()
                .filter(|s| s.status == shared_types::SignerStatus::Signed)
                .count(),
            total_fields: fields.len(),
            filled_fields: fields.iter().filter(|f| f.has_value()).count(),
            required_fields: fields.iter().filter(|f| f.required).count(),
            filled_required_fields: fields
                .iter()
                .filter(|f| f.required && f.has_value())
                .count(),
        })
    }

    /// Documents owed a reminder: reminders on, not expired, still open,
    /// and at least the cadence has elapsed since the last nudge (or
    /// since creation when none was ever sent).
    pub fn documents_due_for_reminder(&mut self, now: DateTime<Utc>) -> Vec<Document> {
        self.documents()
            .into_iter()
            .filter(|d| {
                d.reminders_enabled
                    && d.status.is_signable()
                    && !d.is_expired(now)
                    && {
                        let anchor = d.last_reminder_at.unwrap_or(d.created_at);
                        (now - anchor).num_days() >= d.reminder_cadence_days
                    }
            })
            .collect()
    }

    /// Past their expiry but not yet transitioned.
    pub fn expired_unmarked(&mut self, now: DateTime<Utc>) -> Vec<Document> {
        self.documents()
            .into_iter()
            .filter(|d| !d.status.is_terminal() && d.is_expired(now))
            .collect()
    }

    pub fn status_counts(&mut self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for doc in self.tables().documents.values() {
            *counts.entry(doc.status.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn dashboard_summary(&mut self) -> DashboardSummary {
        let documents = self.documents();
        let total = documents.len();
        let completed: Vec<_> = documents
            .iter()
            .filter(|d| d.status == DocumentStatus::Completed)
            .collect();
        let avg_days = if completed.is_empty() {
            None
        } else {
            let total_days: f64 = completed
                .iter()
                .filter_map(|d| d.completed_at.map(|c| (c - d.created_at).num_seconds()))
                .map(|secs| secs as f64 / 86_400.0)
                .sum();
            Some(total_days / completed.len() as f64)
        };
        DashboardSummary {
            total_documents: total,
            completed_documents: completed.len(),
            completion_rate: if total == 0 {
                0.0
            } else {
                completed.len() as f64 / total as f64
            },
            avg_days_to_completion: avg_days,
            by_status: self.status_counts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use shared_types::{FieldKind, FieldRect, SignerRole, SignerStatus, TemplateField};

    fn template(tenant: &str, now: DateTime<Utc>) -> Template {
        Template {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.to_string(),
            name: "Lease".to_string(),
            source_ref: "acme/templates/t1/source.pdf".to_string(),
            page_count: 2,
            status: TemplateStatus::Active,
            fields: vec![TemplateField {
                id: Uuid::new_v4().to_string(),
                kind: FieldKind::Signature,
                page: 1,
                rect: FieldRect::new(10.0, 80.0, 25.0, 6.0),
                required: true,
                signer_order: 1,
                label: None,
                options: Vec::new(),
                group: None,
                formula: None,
            }],
            created_by: "ops@acme.test".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn document(tenant: &str, now: DateTime<Utc>) -> Document {
        Document {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.to_string(),
            template_id: None,
            name: "Lease for unit 4B".to_string(),
            source_ref: "acme/documents/d/source.pdf".to_string(),
            signed_ref: None,
            status: DocumentStatus::Pending,
            message: None,
            expires_at: None,
            reminders_enabled: true,
            reminder_cadence_days: 3,
            last_reminder_at: None,
            completed_at: None,
            created_by: "ops@acme.test".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tenants_are_isolated() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tpl = template("acme", now);
        let id = tpl.id.clone();
        store.tenant("acme").insert_template(tpl).unwrap();

        assert!(store.tenant("acme").template(&id).is_ok());
        assert!(matches!(
            store.tenant("rival").template(&id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn scope_rejects_cross_tenant_writes() {
        let store = MemoryStore::new();
        let tpl = template("acme", Utc::now());
        let result = store.tenant("rival").insert_template(tpl);
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn duplicate_template_deep_copies_fields() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tpl = template("acme", now);
        let id = tpl.id.clone();
        let original_field_id = tpl.fields[0].id.clone();
        store.tenant("acme").insert_template(tpl).unwrap();

        let copy = store
            .tenant("acme")
            .duplicate_template(&id, "Lease (copy)", now)
            .unwrap();
        assert_ne!(copy.id, id);
        assert_eq!(copy.name, "Lease (copy)");
        assert_eq!(copy.status, TemplateStatus::Draft);
        assert_eq!(copy.fields.len(), 1);
        assert_ne!(copy.fields[0].id, original_field_id);
    }

    #[test]
    fn used_templates_archive_instead_of_deleting() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tpl = template("acme", now);
        let tpl_id = tpl.id.clone();
        let mut doc = document("acme", now);
        doc.template_id = Some(tpl_id.clone());

        {
            let mut scope = store.tenant("acme");
            scope.insert_template(tpl).unwrap();
            scope.insert_document(doc).unwrap();
            scope.delete_template(&tpl_id, now).unwrap();
        }
        let archived = store.tenant("acme").template(&tpl_id).unwrap();
        assert_eq!(archived.status, TemplateStatus::Archived);
    }

    #[test]
    fn token_collisions_are_rejected() {
        let store = MemoryStore::new();
        let mut scope = store.tenant("acme");
        let mut a = Signer::new("d1", "A", "a@x.com", SignerRole::Signer, 1);
        a.access_token = "fixed".to_string();
        let mut b = Signer::new("d2", "B", "b@x.com", SignerRole::Signer, 1);
        b.access_token = "fixed".to_string();
        scope.insert_signer(a).unwrap();
        assert!(scope.insert_signer(b).is_err());
    }

    #[test]
    fn resolve_token_recovers_scope() {
        let store = MemoryStore::new();
        let signer = Signer::new("d1", "A", "a@x.com", SignerRole::Signer, 1);
        let token = signer.access_token.clone();
        store.tenant("acme").insert_signer(signer).unwrap();

        let resolution = store.resolve_token(&token).unwrap();
        assert_eq!(resolution.tenant_id, "acme");
        assert_eq!(resolution.document_id, "d1");
        assert!(store.resolve_token("unknown").is_none());
    }

    #[test]
    fn invalid_geometry_is_rejected_on_insert() {
        let store = MemoryStore::new();
        let field = Field {
            id: "f1".to_string(),
            document_id: "d1".to_string(),
            template_field_id: None,
            kind: FieldKind::Text,
            page: 1,
            rect: FieldRect::new(95.0, 10.0, 20.0, 5.0),
            required: false,
            signer_id: None,
            value: None,
            label: None,
            options: Vec::new(),
            group: None,
            formula: None,
        };
        assert!(matches!(
            store.tenant("acme").insert_field(field),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn reminder_query_honours_cadence_and_expiry() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut scope = store.tenant("acme");

        let mut due = document("acme", now - Duration::days(5));
        due.id = "due".to_string();
        let mut fresh = document("acme", now - Duration::days(1));
        fresh.id = "fresh".to_string();
        let mut expired = document("acme", now - Duration::days(5));
        expired.id = "expired".to_string();
        expired.expires_at = Some(now - Duration::days(1));
        let mut muted = document("acme", now - Duration::days(5));
        muted.id = "muted".to_string();
        muted.reminders_enabled = false;

        for doc in [due, fresh, expired, muted] {
            scope.insert_document(doc).unwrap();
        }

        let due_ids: Vec<_> = scope
            .documents_due_for_reminder(now)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(due_ids, vec!["due".to_string()]);
    }

    #[test]
    fn expired_unmarked_finds_overdue_open_documents() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut scope = store.tenant("acme");

        let mut overdue = document("acme", now - Duration::days(10));
        overdue.id = "overdue".to_string();
        overdue.expires_at = Some(now - Duration::days(2));
        let mut done = document("acme", now - Duration::days(10));
        done.id = "done".to_string();
        done.expires_at = Some(now - Duration::days(2));
        done.status = DocumentStatus::Completed;

        scope.insert_document(overdue).unwrap();
        scope.insert_document(done).unwrap();

        let found: Vec<_> = scope
            .expired_unmarked(now)
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(found, vec!["overdue".to_string()]);
    }

    #[test]
    fn dashboard_summary_computes_rates() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut scope = store.tenant("acme");

        let mut completed = document("acme", now - Duration::days(4));
        completed.id = "c1".to_string();
        completed.status = DocumentStatus::Completed;
        completed.completed_at = Some(now - Duration::days(2));
        let open = document("acme", now);

        scope.insert_document(completed).unwrap();
        scope.insert_document(open).unwrap();

        let summary = scope.dashboard_summary();
        assert_eq!(summary.total_documents, 2);
        assert_eq!(summary.completed_documents, 1);
        assert!((summary.completion_rate - 0.5).abs() < 1e-9);
        let avg = summary.avg_days_to_completion.unwrap();
        assert!((avg - 2.0).abs() < 0.1);
        assert_eq!(summary.by_status.get("completed"), Some(&1));
    }

    #[test]
    fn audit_appends_are_chained_per_document() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut scope = store.tenant("acme");
        scope.append_audit(
            "d1",
            AuditAction::Created,
            None,
            "ops@acme.test",
            serde_json::json!({}),
            None,
            None,
            now,
        );
        scope.append_audit(
            "d1",
            AuditAction::Sent,
            None,
            "ops@acme.test",
            serde_json::json!({}),
            None,
            None,
            now,
        );
        let trail = scope.trail("d1");
        assert_eq!(trail.action_sequence(), vec!["created", "sent"]);
        assert!(trail.verify().is_ok());
    }

    #[test]
    fn document_stats_count_required_fields() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut scope = store.tenant("acme");
        let doc = document("acme", now);
        let doc_id = doc.id.clone();
        scope.insert_document(doc).unwrap();

        let mut signer = Signer::new(&doc_id, "A", "a@x.com", SignerRole::Signer, 1);
        signer.status = SignerStatus::Signed;
        scope.insert_signer(signer).unwrap();

        for (i, value) in [Some("filled"), None].iter().enumerate() {
            let field = Field {
                id: format!("f{}", i),
                document_id: doc_id.clone(),
                template_field_id: None,
                kind: FieldKind::Text,
                page: 1,
                rect: FieldRect::new(10.0, 10.0 + i as f64 * 10.0, 20.0, 5.0),
                required: true,
                signer_id: None,
                value: value.map(str::to_string),
                label: None,
                options: Vec::new(),
                group: None,
                formula: None,
            };
            scope.insert_field(field).unwrap();
        }

        let stats = scope.document_stats(&doc_id).unwrap();
        assert_eq!(stats.total_signers, 1);
        assert_eq!(stats.signed_signers, 1);
        assert_eq!(stats.required_fields, 2);
        assert_eq!(stats.filled_required_fields, 1);
    }
}
