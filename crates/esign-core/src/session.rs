//! Signing-session state machine
//!
//! Document status runs `draft -> pending -> in_progress` and terminates
//! in `completed | declined | voided | expired`. Signer status runs
//! `pending -> sent -> viewed -> signed | declined`. Signing order is
//! wave-based: all earlier waves must fully resolve before a later wave
//! may act, and members of one wave act in parallel. Internal
//! counter-signers only become eligible once every external party is
//! terminal.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use shared_pdf::{append_certificate, embed_fields, flatten, EmbedOptions};
use shared_types::{
    AuditAction, Document, DocumentStatus, Field, FieldKind, SignatureMark, SignatureRecord,
    Signer, SignerRole, SignerStatus, Template, TemplateStatus, validate_email,
    CompletionCertificate,
};

use crate::audit;
use crate::error::{CoreError, Result};
use crate::notify::{self, NotificationPayload};
use crate::object_store::{paths, ObjectStore};
use crate::signatures::validate_mark;
use crate::store::{MemoryStore, TenantScope};
use crate::vars::{substitute, VariableContext};

// ---- wave logic -----------------------------------------------------------

fn gating_externals(signers: &[Signer]) -> impl Iterator<Item = &Signer> {
    signers
        .iter()
        .filter(|s| s.role.gates_completion() && !s.is_internal)
}

fn gating_internals(signers: &[Signer]) -> impl Iterator<Item = &Signer> {
    signers
        .iter()
        .filter(|s| s.role.gates_completion() && s.is_internal)
}

/// Lowest not-yet-terminal order among external signing parties.
pub fn active_external_wave(signers: &[Signer]) -> Option<u32> {
    gating_externals(signers)
        .filter(|s| !s.status.is_terminal())
        .map(|s| s.signing_order)
        .min()
}

/// Lowest not-yet-terminal order among internal counter-signers.
pub fn active_internal_wave(signers: &[Signer]) -> Option<u32> {
    gating_internals(signers)
        .filter(|s| !s.status.is_terminal())
        .map(|s| s.signing_order)
        .min()
}

/// Every external signing party has signed or declined.
pub fn externals_resolved(signers: &[Signer]) -> bool {
    gating_externals(signers).all(|s| s.status.is_terminal())
}

/// The full active wave, for batch notification.
pub fn next_signers(signers: &[Signer]) -> Vec<Signer> {
    if let Some(wave) = active_external_wave(signers) {
        return gating_externals(signers)
            .filter(|s| !s.status.is_terminal() && s.signing_order == wave)
            .cloned()
            .collect();
    }
    if let Some(wave) = active_internal_wave(signers) {
        return gating_internals(signers)
            .filter(|s| !s.status.is_terminal() && s.signing_order == wave)
            .cloned()
            .collect();
    }
    Vec::new()
}

/// Whether this signer may act right now. The reason string is safe to
/// show to the actor.
pub fn can_act(signer: &Signer, all: &[Signer]) -> std::result::Result<(), String> {
    if signer.status.is_terminal() {
        return Err(format!("this signing session is already {}", signer.status));
    }
    if !signer.role.gates_completion() {
        return Err("this recipient is view-only and cannot sign".to_string());
    }
    if signer.is_internal {
        if !externals_resolved(all) {
            return Err("external signers have not finished yet".to_string());
        }
        if active_internal_wave(all) != Some(signer.signing_order) {
            return Err("it is not this signer's turn yet".to_string());
        }
    } else if active_external_wave(all) != Some(signer.signing_order) {
        return Err("it is not this signer's turn yet".to_string());
    }
    Ok(())
}

/// Completion gate: every non-CC participant has signed.
pub fn all_required_signed(signers: &[Signer]) -> bool {
    signers
        .iter()
        .filter(|s| s.role.gates_completion())
        .all(|s| s.status == SignerStatus::Signed)
}

// ---- engine ---------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base for signing and download links.
    pub base_url: String,
    pub company_name: String,
    pub default_reminder_cadence_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sign.example.com".to_string(),
            company_name: String::new(),
            default_reminder_cadence_days: 3,
        }
    }
}

/// A party to attach when preparing a document.
#[derive(Debug, Clone)]
pub struct SignerSpec {
    pub name: String,
    pub email: String,
    pub role: SignerRole,
    pub signing_order: u32,
    pub is_internal: bool,
}

/// Everything a signing UI needs for one token.
#[derive(Debug, Clone)]
pub struct SigningSession {
    pub document: Document,
    pub signer: Signer,
    /// Only the fields owned by this signer.
    pub fields: Vec<Field>,
    pub template: Option<Template>,
}

#[derive(Debug)]
pub struct CompletionOutcome {
    pub document: Document,
    pub document_completed: bool,
    /// The wave activated by this completion, empty when none.
    pub next_wave: Vec<Signer>,
    pub notifications: Vec<NotificationPayload>,
    /// Best-effort finalization problems; never fatal.
    pub finalization_warnings: Vec<String>,
}

#[derive(Debug)]
pub struct DeclineOutcome {
    pub document: Document,
    pub notifications: Vec<NotificationPayload>,
}

#[derive(Debug)]
pub struct VoidOutcome {
    pub document: Document,
    /// External parties that were already notified and should receive a
    /// void notice.
    pub signers_needing_notice: Vec<Signer>,
    pub notifications: Vec<NotificationPayload>,
}

pub struct SessionEngine<'a> {
    store: &'a MemoryStore,
    objects: &'a dyn ObjectStore,
    config: EngineConfig,
}

impl<'a> SessionEngine<'a> {
    pub fn new(store: &'a MemoryStore, objects: &'a dyn ObjectStore, config: EngineConfig) -> Self {
        Self {
            store,
            objects,
            config,
        }
    }

    pub fn store(&self) -> &MemoryStore {
        self.store
    }

    // ---- preparation ----

    /// Instantiate a document from an active template: copy its source
    /// bytes, its fields, and attach the given parties. Source-copy
    /// failures propagate; there is no fallback content at this point.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_from_template(
        &self,
        tenant_id: &str,
        template_id: &str,
        name: &str,
        signers: &[SignerSpec],
        message: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<Document> {
        validate_signer_specs(signers)?;

        let template = {
            let mut scope = self.store.tenant(tenant_id);
            let template = scope.template(template_id)?;
            if template.status != TemplateStatus::Active {
                return Err(CoreError::State(format!(
                    "template {} is not active",
                    template_id
                )));
            }
            template
        };

        // Copy the template source outside the scope lock.
        let source = self.objects.fetch(&template.source_ref)?;
        let document_id = Uuid::new_v4().to_string();
        let source_ref = self.objects.put(
            &paths::document_source(tenant_id, &document_id),
            &source,
            "application/pdf",
        )?;

        let now = Utc::now();
        let document = Document {
            id: document_id.clone(),
            tenant_id: tenant_id.to_string(),
            template_id: Some(template.id.clone()),
            name: name.to_string(),
            source_ref,
            signed_ref: None,
            status: DocumentStatus::Draft,
            message: message.map(str::to_string),
            expires_at,
            reminders_enabled: true,
            reminder_cadence_days: self.config.default_reminder_cadence_days,
            last_reminder_at: None,
            completed_at: None,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut scope = self.store.tenant(tenant_id);
        scope.insert_document(document.clone())?;

        let mut created_signers = Vec::with_capacity(signers.len());
        for spec in signers {
            let mut signer = Signer::new(
                &document_id,
                &spec.name,
                &spec.email,
                spec.role,
                spec.signing_order,
            );
            signer.is_internal = spec.is_internal;
            scope.insert_signer(signer.clone())?;
            created_signers.push(signer);
        }

        for tf in &template.fields {
            let owner = created_signers
                .iter()
                .find(|s| s.role.gates_completion() && s.signing_order == tf.signer_order)
                .map(|s| s.id.clone());
            let field = Field {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.clone(),
                template_field_id: Some(tf.id.clone()),
                kind: tf.kind,
                page: tf.page,
                rect: tf.rect,
                required: tf.required,
                signer_id: owner,
                value: None,
                label: tf.label.clone(),
                options: tf.options.clone(),
                group: tf.group.clone(),
                formula: tf.formula.clone(),
            };
            scope.insert_field(field)?;
        }

        scope.append_audit(
            &document_id,
            AuditAction::Created,
            None,
            actor,
            json!({ "template_id": template.id, "name": name }),
            None,
            None,
            now,
        );

        Ok(document)
    }

    /// Prepare a standalone upload: store the bytes and attach parties.
    /// Fields are added afterwards while the document is still a draft.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_standalone(
        &self,
        tenant_id: &str,
        name: &str,
        source: &[u8],
        signers: &[SignerSpec],
        message: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        actor: &str,
    ) -> Result<Document> {
        validate_signer_specs(signers)?;

        let document_id = Uuid::new_v4().to_string();
        let source_ref = self.objects.put(
            &paths::document_source(tenant_id, &document_id),
            source,
            "application/pdf",
        )?;

        let now = Utc::now();
        let document = Document {
            id: document_id.clone(),
            tenant_id: tenant_id.to_string(),
            template_id: None,
            name: name.to_string(),
            source_ref,
            signed_ref: None,
            status: DocumentStatus::Draft,
            message: message.map(str::to_string),
            expires_at,
            reminders_enabled: true,
            reminder_cadence_days: self.config.default_reminder_cadence_days,
            last_reminder_at: None,
            completed_at: None,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut scope = self.store.tenant(tenant_id);
        scope.insert_document(document.clone())?;
        for spec in signers {
            let mut signer = Signer::new(
                &document_id,
                &spec.name,
                &spec.email,
                spec.role,
                spec.signing_order,
            );
            signer.is_internal = spec.is_internal;
            scope.insert_signer(signer)?;
        }
        scope.append_audit(
            &document_id,
            AuditAction::Created,
            None,
            actor,
            json!({ "name": name, "standalone": true }),
            None,
            None,
            now,
        );

        Ok(document)
    }

    /// Place an ad-hoc field. Only drafts can gain fields.
    pub fn add_field(&self, tenant_id: &str, field: Field) -> Result<()> {
        let mut scope = self.store.tenant(tenant_id);
        let document = scope.document(&field.document_id)?;
        if document.status != DocumentStatus::Draft {
            return Err(CoreError::State(format!(
                "fields can only be added to drafts, document is {}",
                document.status
            )));
        }
        scope.insert_field(field)
    }

    // ---- sending ----

    /// Move a draft out for signature: first wave goes to `sent`, and the
    /// returned payloads carry their signing links.
    pub fn send(&self, tenant_id: &str, document_id: &str, actor: &str) -> Result<Vec<NotificationPayload>> {
        let now = Utc::now();
        let mut scope = self.store.tenant(tenant_id);
        let mut document = scope.document(document_id)?;
        if document.status != DocumentStatus::Draft {
            return Err(CoreError::State(format!(
                "document is {}, only drafts can be sent",
                document.status
            )));
        }

        let signers = scope.signers_for(document_id);
        if !signers.iter().any(|s| s.role.gates_completion()) {
            return Err(CoreError::Validation(
                "document has no signing parties".to_string(),
            ));
        }

        document.status = DocumentStatus::Pending;
        document.updated_at = now;
        scope.update_document(document.clone())?;

        let wave = next_signers(&signers);
        let notifications = self.activate_wave(&mut scope, &document, &wave, now)?;

        scope.append_audit(
            document_id,
            AuditAction::Sent,
            None,
            actor,
            json!({ "wave": wave.iter().map(|s| s.signing_order).collect::<Vec<_>>() }),
            None,
            None,
            now,
        );

        Ok(notifications)
    }

    /// Mark wave members as sent and build their signature requests.
    fn activate_wave(
        &self,
        scope: &mut TenantScope<'_>,
        document: &Document,
        wave: &[Signer],
        now: DateTime<Utc>,
    ) -> Result<Vec<NotificationPayload>> {
        let mut notifications = Vec::new();
        for member in wave {
            let mut signer = scope.signer(&member.id)?;
            if signer.status != SignerStatus::Pending {
                continue;
            }
            signer.status = SignerStatus::Sent;
            signer.sent_at = Some(now);
            scope.update_signer(signer.clone())?;

            let message = document.message.as_deref().map(|m| {
                let ctx = VariableContext {
                    signer_name: Some(signer.name.clone()),
                    signer_email: Some(signer.email.clone()),
                    creator_email: Some(document.created_by.clone()),
                    document_name: Some(document.name.clone()),
                    expiry_date: document
                        .expires_at
                        .map(|e| e.format("%B %-d, %Y").to_string()),
                    company_name: Some(self.config.company_name.clone()),
                    ..VariableContext::now(now)
                };
                substitute(m, &ctx)
            });
            notifications.push(notify::signature_request(
                &self.config.base_url,
                document,
                &signer,
                message.as_deref(),
            ));
        }
        Ok(notifications)
    }

    // ---- sessions ----

    /// Resolve an access token into a signing session, rejecting tokens
    /// whose document or turn does not permit acting.
    pub fn session(&self, token: &str) -> Result<SigningSession> {
        let resolution = self
            .store
            .resolve_token(token)
            .ok_or_else(|| CoreError::State("invalid access token".to_string()))?;
        let mut scope = self.store.tenant(&resolution.tenant_id);
        self.session_in_scope(&mut scope, &resolution.document_id, &resolution.signer_id)
    }

    fn session_in_scope(
        &self,
        scope: &mut TenantScope<'_>,
        document_id: &str,
        signer_id: &str,
    ) -> Result<SigningSession> {
        let document = scope.document(document_id)?;
        if !document.status.is_signable() {
            return Err(CoreError::State(format!(
                "this document is {} and can no longer be signed",
                document.status
            )));
        }
        if document.is_expired(Utc::now()) {
            return Err(CoreError::State("this document has expired".to_string()));
        }

        let signer = scope.signer(signer_id)?;
        let all = scope.signers_for(document_id);
        if signer.role.gates_completion() {
            can_act(&signer, &all).map_err(CoreError::State)?;
        }

        let fields = scope
            .fields_for(document_id)
            .into_iter()
            .filter(|f| f.signer_id.as_deref() == Some(signer_id))
            .collect();
        let template = match &document.template_id {
            Some(id) => scope.template(id).ok(),
            None => None,
        };

        Ok(SigningSession {
            document,
            signer,
            fields,
            template,
        })
    }

    /// First view moves a pending document to `in_progress` and stamps
    /// the signer exactly once; later views are no-ops.
    pub fn record_view(
        &self,
        token: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<SigningSession> {
        let resolution = self
            .store
            .resolve_token(token)
            .ok_or_else(|| CoreError::State("invalid access token".to_string()))?;
        let now = Utc::now();
        let mut scope = self.store.tenant(&resolution.tenant_id);
        let session =
            self.session_in_scope(&mut scope, &resolution.document_id, &resolution.signer_id)?;

        let mut signer = session.signer.clone();
        if signer.first_viewed_at.is_some() {
            return Ok(session);
        }

        signer.first_viewed_at = Some(now);
        if matches!(signer.status, SignerStatus::Pending | SignerStatus::Sent) {
            signer.status = SignerStatus::Viewed;
        }
        signer.ip_address = ip_address.map(str::to_string);
        signer.user_agent = user_agent.map(str::to_string);
        scope.update_signer(signer.clone())?;

        let mut document = session.document.clone();
        if document.status == DocumentStatus::Pending {
            document.status = DocumentStatus::InProgress;
            document.updated_at = now;
            scope.update_document(document.clone())?;
        }

        scope.append_audit(
            &document.id,
            AuditAction::Viewed,
            Some(&signer.id),
            &signer.email,
            json!({}),
            ip_address,
            user_agent,
            now,
        );

        Ok(SigningSession {
            document,
            signer,
            fields: session.fields,
            template: session.template,
        })
    }

    // ---- completion ----

    /// Persist a signer's submission as one unit: all values, the mark,
    /// the status change, and the audit entries — or nothing. The wave
    /// rule is re-checked here, under the same scope that writes.
    pub fn complete_signing(
        &self,
        token: &str,
        values: &HashMap<String, String>,
        mark: Option<SignatureMark>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<CompletionOutcome> {
        let resolution = self
            .store
            .resolve_token(token)
            .ok_or_else(|| CoreError::State("invalid access token".to_string()))?;
        let tenant_id = resolution.tenant_id.clone();
        let now = Utc::now();

        let (mut outcome, completed) = {
            let mut scope = self.store.tenant(&tenant_id);

            let mut document = scope.document(&resolution.document_id)?;
            if !document.status.is_signable() {
                return Err(CoreError::State(format!(
                    "this document is {} and can no longer be signed",
                    document.status
                )));
            }
            if document.is_expired(now) {
                return Err(CoreError::State("this document has expired".to_string()));
            }

            let mut signer = scope.signer(&resolution.signer_id)?;
            let all = scope.signers_for(&document.id);
            can_act(&signer, &all).map_err(CoreError::State)?;

            let owned: Vec<Field> = scope
                .fields_for(&document.id)
                .into_iter()
                .filter(|f| f.signer_id.as_deref() == Some(signer.id.as_str()))
                .collect();

            for field_id in values.keys() {
                if !owned.iter().any(|f| f.id == *field_id) {
                    return Err(CoreError::Validation(format!(
                        "field {} is not owned by this signer",
                        field_id
                    )));
                }
            }

            // Stage every change first; nothing is written until the
            // whole submission validates.
            let mut staged: Vec<Field> = Vec::new();
            let mut missing: Vec<String> = Vec::new();
            for field in &owned {
                let mut updated = field.clone();
                match field.kind {
                    FieldKind::Signature | FieldKind::Initials => {
                        if mark.is_some() {
                            updated.value = Some("signed".to_string());
                        } else if field.required {
                            missing.push(field_name(field));
                        }
                    }
                    FieldKind::DateSigned => {
                        updated.value = Some(now.to_rfc3339());
                    }
                    _ => {
                        if let Some(value) = values.get(&field.id) {
                            updated.value = Some(value.clone());
                        }
                        if field.required && !updated.has_value() {
                            missing.push(field_name(field));
                        }
                    }
                }
                if updated.value != field.value {
                    staged.push(updated);
                }
            }
            if !missing.is_empty() {
                return Err(CoreError::Validation(format!(
                    "required fields missing values: {}",
                    missing.join(", ")
                )));
            }

            if let Some(mark) = &mark {
                validate_mark(mark)?;
            }

            // Point of no return: write the staged values.
            for field in staged {
                scope.update_field(field.clone())?;
                scope.append_audit(
                    &document.id,
                    AuditAction::FieldFilled,
                    Some(&signer.id),
                    &signer.email,
                    json!({ "field_id": field.id, "kind": field.kind.as_str() }),
                    ip_address,
                    user_agent,
                    now,
                );
            }

            if let Some(mark) = mark {
                scope.put_signature(SignatureRecord {
                    id: Uuid::new_v4().to_string(),
                    signer_id: signer.id.clone(),
                    mark,
                    created_at: now,
                });
            }

            signer.status = SignerStatus::Signed;
            signer.signed_at = Some(now);
            if signer.ip_address.is_none() {
                signer.ip_address = ip_address.map(str::to_string);
            }
            if signer.user_agent.is_none() {
                signer.user_agent = user_agent.map(str::to_string);
            }
            scope.update_signer(signer.clone())?;

            let action = if signer.is_internal {
                AuditAction::CounterSigned
            } else {
                AuditAction::Signed
            };
            scope.append_audit(
                &document.id,
                action,
                Some(&signer.id),
                &signer.email,
                json!({ "signing_order": signer.signing_order }),
                ip_address,
                user_agent,
                now,
            );

            let all = scope.signers_for(&document.id);
            let mut notifications = Vec::new();
            let completed = all_required_signed(&all);
            let next_wave;
            if completed {
                document.status = DocumentStatus::Completed;
                document.completed_at = Some(now);
                document.updated_at = now;
                scope.update_document(document.clone())?;
                next_wave = Vec::new();

                notifications.push(notify::signed_confirmation(
                    &self.config.base_url,
                    &document,
                    &signer,
                ));
                notifications.push(notify::document_completed(
                    &self.config.base_url,
                    &document,
                    &document.created_by,
                    &document.created_by,
                    all.iter().filter(|s| s.role.gates_completion()).count(),
                ));
                for party in all.iter().filter(|s| s.id != signer.id) {
                    notifications.push(notify::document_completed(
                        &self.config.base_url,
                        &document,
                        &party.email,
                        &party.name,
                        all.iter().filter(|s| s.role.gates_completion()).count(),
                    ));
                }
            } else {
                document.updated_at = now;
                scope.update_document(document.clone())?;

                notifications.push(notify::signed_confirmation(
                    &self.config.base_url,
                    &document,
                    &signer,
                ));
                next_wave = next_signers(&all);
                let newly_notified = self.activate_wave(&mut scope, &document, &next_wave, now)?;
                if !newly_notified.is_empty() {
                    scope.append_audit(
                        &document.id,
                        AuditAction::Sent,
                        None,
                        &signer.email,
                        json!({
                            "wave": next_wave
                                .iter()
                                .map(|s| s.signing_order)
                                .collect::<Vec<_>>()
                        }),
                        None,
                        None,
                        now,
                    );
                }
                notifications.extend(newly_notified);
            }

            (
                CompletionOutcome {
                    document,
                    document_completed: completed,
                    next_wave,
                    notifications,
                    finalization_warnings: Vec::new(),
                },
                completed,
            )
        };

        // Finalization is best-effort and runs outside the scope lock:
        // a failure keeps the pre-finalization source as fallback.
        if completed {
            outcome.finalization_warnings = self.finalize(&tenant_id, &outcome.document.id);
            let mut scope = self.store.tenant(&tenant_id);
            if let Ok(doc) = scope.document(&outcome.document.id) {
                outcome.document = doc;
            }
        }

        Ok(outcome)
    }

    /// Embed, flatten, verify, append the certificate and upload. Every
    /// failure is reported as a warning, never an error: the document is
    /// already completed.
    fn finalize(&self, tenant_id: &str, document_id: &str) -> Vec<String> {
        let mut warnings = Vec::new();

        let (document, fields, signers, marks) = {
            let mut scope = self.store.tenant(tenant_id);
            let Ok(document) = scope.document(document_id) else {
                return vec![format!("document {} vanished before finalization", document_id)];
            };
            let fields = scope.fields_for(document_id);
            let signers = scope.signers_for(document_id);
            let mut marks = HashMap::new();
            for signer in &signers {
                if let Some(record) = scope.signature_for(&signer.id) {
                    marks.insert(signer.id.clone(), record.mark);
                }
            }
            (document, fields, signers, marks)
        };

        let source = match self.objects.fetch(&document.source_ref) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(document = document_id, error = %e, "finalization fetch failed");
                return vec![format!("could not fetch source: {}", e)];
            }
        };

        let outcome = match embed_fields(
            &source,
            &fields,
            &signers,
            &marks,
            &EmbedOptions::final_output(),
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(document = document_id, error = %e, "embedding failed");
                return vec![format!("embedding failed: {}", e)];
            }
        };
        for warning in &outcome.warnings {
            warnings.push(format!("field {}: {}", warning.field_id, warning.message));
        }

        match flatten::verify(&outcome.bytes) {
            Ok(report) if report.is_flat => {}
            Ok(report) => {
                tracing::warn!(
                    document = document_id,
                    issues = ?report.issues,
                    "flatten verification failed"
                );
                warnings.extend(report.issues);
                return warnings;
            }
            Err(e) => {
                warnings.push(format!("verification failed: {}", e));
                return warnings;
            }
        }

        let certificate = {
            let mut scope = self.store.tenant(tenant_id);
            audit::compile_certificate(&mut scope, document_id)
        };
        let final_bytes = match certificate {
            Ok(cert) => match append_certificate(&outcome.bytes, &cert) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warnings.push(format!("certificate page not appended: {}", e));
                    outcome.bytes
                }
            },
            Err(e) => {
                warnings.push(format!("certificate not compiled: {}", e));
                outcome.bytes
            }
        };

        match self.objects.put(
            &paths::signed_output(tenant_id, document_id),
            &final_bytes,
            "application/pdf",
        ) {
            Ok(reference) => {
                let mut scope = self.store.tenant(tenant_id);
                if let Ok(mut document) = scope.document(document_id) {
                    document.signed_ref = Some(reference);
                    document.updated_at = Utc::now();
                    if let Err(e) = scope.update_document(document) {
                        warnings.push(format!("signed reference not recorded: {}", e));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(document = document_id, error = %e, "signed upload failed");
                warnings.push(format!("signed output not uploaded: {}", e));
            }
        }

        warnings
    }

    // ---- decline / void ----

    /// Decline a signing session. Only signing parties may decline; a
    /// decline terminates the whole document.
    pub fn decline(
        &self,
        token: &str,
        reason: Option<&str>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<DeclineOutcome> {
        let resolution = self
            .store
            .resolve_token(token)
            .ok_or_else(|| CoreError::State("invalid access token".to_string()))?;
        let now = Utc::now();
        let mut scope = self.store.tenant(&resolution.tenant_id);

        let mut document = scope.document(&resolution.document_id)?;
        if !document.status.is_signable() {
            return Err(CoreError::State(format!(
                "this document is {} and can no longer be declined",
                document.status
            )));
        }

        let mut signer = scope.signer(&resolution.signer_id)?;
        if !signer.role.gates_completion() {
            return Err(CoreError::State(
                "this recipient is view-only and cannot decline".to_string(),
            ));
        }
        if signer.status.is_terminal() {
            return Err(CoreError::State(format!(
                "this signing session is already {}",
                signer.status
            )));
        }

        signer.status = SignerStatus::Declined;
        signer.declined_reason = reason.map(str::to_string);
        scope.update_signer(signer.clone())?;

        document.status = DocumentStatus::Declined;
        document.updated_at = now;
        scope.update_document(document.clone())?;

        scope.append_audit(
            &document.id,
            AuditAction::Declined,
            Some(&signer.id),
            &signer.email,
            json!({ "reason": reason.unwrap_or("") }),
            ip_address,
            user_agent,
            now,
        );

        let notifications = vec![notify::declined(
            &document,
            &document.created_by,
            &signer,
            reason,
        )];

        Ok(DeclineOutcome {
            document,
            notifications,
        })
    }

    /// Administrative void: allowed from draft, pending or in-progress,
    /// always audited.
    pub fn void(
        &self,
        tenant_id: &str,
        document_id: &str,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<VoidOutcome> {
        let now = Utc::now();
        let mut scope = self.store.tenant(tenant_id);

        let mut document = scope.document(document_id)?;
        if !matches!(
            document.status,
            DocumentStatus::Draft | DocumentStatus::Pending | DocumentStatus::InProgress
        ) {
            return Err(CoreError::State(format!(
                "document is {} and cannot be voided",
                document.status
            )));
        }

        document.status = DocumentStatus::Voided;
        document.updated_at = now;
        scope.update_document(document.clone())?;

        scope.append_audit(
            document_id,
            AuditAction::Voided,
            None,
            actor,
            json!({ "reason": reason.unwrap_or("") }),
            None,
            None,
            now,
        );

        let signers_needing_notice: Vec<Signer> = scope
            .signers_for(document_id)
            .into_iter()
            .filter(|s| {
                !s.is_internal
                    && !s.status.is_terminal()
                    && matches!(s.status, SignerStatus::Sent | SignerStatus::Viewed)
            })
            .collect();

        let notifications = signers_needing_notice
            .iter()
            .map(|s| notify::voided(&document, &s.email, reason))
            .collect();

        Ok(VoidOutcome {
            document,
            signers_needing_notice,
            notifications,
        })
    }

    // ---- outbound sweeps ----

    /// Re-issue signing links for the current wave.
    pub fn resend(&self, tenant_id: &str, document_id: &str, actor: &str) -> Result<Vec<NotificationPayload>> {
        let now = Utc::now();
        let mut scope = self.store.tenant(tenant_id);
        let document = scope.document(document_id)?;
        if !document.status.is_signable() {
            return Err(CoreError::State(format!(
                "document is {}, nothing to resend",
                document.status
            )));
        }
        let signers = scope.signers_for(document_id);
        let wave = next_signers(&signers);
        let notifications: Vec<_> = wave
            .iter()
            .map(|s| notify::signature_request(&self.config.base_url, &document, s, document.message.as_deref()))
            .collect();
        if !notifications.is_empty() {
            scope.append_audit(
                document_id,
                AuditAction::Resent,
                None,
                actor,
                json!({ "recipients": wave.iter().map(|s| s.email.clone()).collect::<Vec<_>>() }),
                None,
                None,
                now,
            );
        }
        Ok(notifications)
    }

    /// Reminders for every document past its cadence. Stamps
    /// `last_reminder_at` and audits each document touched.
    pub fn send_reminders(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<Vec<NotificationPayload>> {
        let mut scope = self.store.tenant(tenant_id);
        let mut notifications = Vec::new();
        for mut document in scope.documents_due_for_reminder(now) {
            let signers = scope.signers_for(&document.id);
            let wave = next_signers(&signers);
            if wave.is_empty() {
                continue;
            }
            for signer in &wave {
                notifications.push(notify::reminder(&self.config.base_url, &document, signer));
            }
            document.last_reminder_at = Some(now);
            document.updated_at = now;
            scope.update_document(document.clone())?;
            scope.append_audit(
                &document.id,
                AuditAction::ReminderSent,
                None,
                "system",
                json!({ "recipients": wave.iter().map(|s| s.email.clone()).collect::<Vec<_>>() }),
                None,
                None,
                now,
            );
        }
        Ok(notifications)
    }

    /// Warnings for open documents expiring within `within_days`. A pure
    /// read: no transition, no audit entry.
    pub fn expiration_warnings(
        &self,
        tenant_id: &str,
        now: DateTime<Utc>,
        within_days: i64,
    ) -> Result<Vec<NotificationPayload>> {
        let mut scope = self.store.tenant(tenant_id);
        let mut notifications = Vec::new();
        for document in scope.documents() {
            let Some(expires_at) = document.expires_at else {
                continue;
            };
            if !document.status.is_signable() || document.is_expired(now) {
                continue;
            }
            if (expires_at - now).num_days() >= within_days {
                continue;
            }
            let signers = scope.signers_for(&document.id);
            for signer in next_signers(&signers) {
                notifications.push(notify::expiration_warning(
                    &self.config.base_url,
                    &document,
                    &signer,
                ));
            }
        }
        Ok(notifications)
    }

    /// Transition every overdue document to `expired`.
    pub fn sweep_expired(&self, tenant_id: &str, now: DateTime<Utc>) -> Result<Vec<Document>> {
        let mut scope = self.store.tenant(tenant_id);
        let mut expired = Vec::new();
        for mut document in scope.expired_unmarked(now) {
            document.status = DocumentStatus::Expired;
            document.updated_at = now;
            scope.update_document(document.clone())?;
            scope.append_audit(
                &document.id,
                AuditAction::Expired,
                None,
                "system",
                json!({}),
                None,
                None,
                now,
            );
            expired.push(document);
        }
        Ok(expired)
    }

    /// Record a download of the source or signed output.
    pub fn record_download(
        &self,
        tenant_id: &str,
        document_id: &str,
        actor: &str,
        signed: bool,
    ) -> Result<()> {
        let mut scope = self.store.tenant(tenant_id);
        scope.document(document_id)?;
        scope.append_audit(
            document_id,
            AuditAction::Downloaded,
            None,
            actor,
            json!({ "signed": signed }),
            None,
            None,
            Utc::now(),
        );
        Ok(())
    }

    // ---- previews & certificates ----

    /// Overlay the current values without flattening, for signing UIs.
    pub fn preview(&self, tenant_id: &str, document_id: &str, draw_borders: bool) -> Result<Vec<u8>> {
        let (document, fields, signers, marks) = {
            let mut scope = self.store.tenant(tenant_id);
            let document = scope.document(document_id)?;
            let fields = scope.fields_for(document_id);
            let signers = scope.signers_for(document_id);
            let mut marks = HashMap::new();
            for signer in &signers {
                if let Some(record) = scope.signature_for(&signer.id) {
                    marks.insert(signer.id.clone(), record.mark);
                }
            }
            (document, fields, signers, marks)
        };
        let source = self.objects.fetch(&document.source_ref)?;
        let outcome = embed_fields(
            &source,
            &fields,
            &signers,
            &marks,
            &EmbedOptions::preview(draw_borders),
        )?;
        Ok(outcome.bytes)
    }

    pub fn compile_certificate(&self, tenant_id: &str, document_id: &str) -> Result<CompletionCertificate> {
        let mut scope = self.store.tenant(tenant_id);
        audit::compile_certificate(&mut scope, document_id)
    }
}

fn field_name(field: &Field) -> String {
    field
        .label
        .clone()
        .unwrap_or_else(|| format!("{} ({})", field.kind.as_str(), field.id))
}

fn validate_signer_specs(specs: &[SignerSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(CoreError::Validation(
            "at least one signer is required".to_string(),
        ));
    }
    for spec in specs {
        validate_email(&spec.email).map_err(CoreError::Validation)?;
        if spec.name.trim().is_empty() {
            return Err(CoreError::Validation(
                "signer name must not be empty".to_string(),
            ));
        }
        if spec.signing_order == 0 {
            return Err(CoreError::Validation(
                "signing order must be a positive integer".to_string(),
            ));
        }
    }
    Ok(())
}
