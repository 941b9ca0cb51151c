//! Core data model for the e-signature engine
//!
//! Entities are tenant-scoped; `tenant_id` is carried on every aggregate
//! root and the store refuses access without an explicit tenant scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field geometry in storage space: percentages of the page, origin
/// top-left, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FieldRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Geometry must stay inside the unit page: `0 <= x, y` and
    /// `x+width <= 100`, `y+height <= 100`.
    pub fn validate(&self) -> Result<(), String> {
        if self.x < 0.0 || self.y < 0.0 {
            return Err("field position must be non-negative".to_string());
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err("field dimensions must be positive".to_string());
        }
        if self.x + self.width > 100.0 {
            return Err("field extends beyond page right edge".to_string());
        }
        if self.y + self.height > 100.0 {
            return Err("field extends beyond page bottom edge".to_string());
        }
        Ok(())
    }
}

/// Every kind of data slot that can be placed on a page.
///
/// The enum is closed on purpose: embedding dispatches with an exhaustive
/// match, so adding a kind is a compile-time change, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Signature,
    Initials,
    Text,
    Name,
    Date,
    DateSigned,
    Number,
    Checkbox,
    CheckboxGroup,
    Radio,
    Dropdown,
    Formula,
    Note,
    Attachment,
}

impl FieldKind {
    /// Parse a kind from its wire name. Unknown names fall closed to
    /// `Text` with a warning so the value is still rendered somewhere
    /// visible instead of dropped.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "signature" => FieldKind::Signature,
            "initials" => FieldKind::Initials,
            "text" => FieldKind::Text,
            "name" => FieldKind::Name,
            "date" => FieldKind::Date,
            "date_signed" => FieldKind::DateSigned,
            "number" => FieldKind::Number,
            "checkbox" => FieldKind::Checkbox,
            "checkbox_group" => FieldKind::CheckboxGroup,
            "radio" => FieldKind::Radio,
            "dropdown" => FieldKind::Dropdown,
            "formula" => FieldKind::Formula,
            "note" => FieldKind::Note,
            "attachment" => FieldKind::Attachment,
            other => {
                tracing::warn!(kind = other, "unknown field kind, rendering as text");
                FieldKind::Text
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Signature => "signature",
            FieldKind::Initials => "initials",
            FieldKind::Text => "text",
            FieldKind::Name => "name",
            FieldKind::Date => "date",
            FieldKind::DateSigned => "date_signed",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::CheckboxGroup => "checkbox_group",
            FieldKind::Radio => "radio",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Formula => "formula",
            FieldKind::Note => "note",
            FieldKind::Attachment => "attachment",
        }
    }
}

/// Template lifecycle. Archived templates are kept forever once a document
/// has been produced from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Draft,
    Active,
    Archived,
}

/// A positioned, typed slot defined on a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateField {
    pub id: String,
    pub kind: FieldKind,
    pub page: u32,
    pub rect: FieldRect,
    pub required: bool,
    /// Which signing-order slot fills this field.
    pub signer_order: u32,
    pub label: Option<String>,
    pub options: Vec<String>,
    pub group: Option<String>,
    pub formula: Option<String>,
}

/// Reusable document definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Object-store reference to the source PDF.
    pub source_ref: String,
    pub page_count: u32,
    pub status: TemplateStatus,
    pub fields: Vec<TemplateField>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Pending,
    InProgress,
    Completed,
    Declined,
    Voided,
    Expired,
}

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Completed
                | DocumentStatus::Declined
                | DocumentStatus::Voided
                | DocumentStatus::Expired
        )
    }

    /// Statuses from which signers may still act.
    pub fn is_signable(&self) -> bool {
        matches!(self, DocumentStatus::Pending | DocumentStatus::InProgress)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Pending => "pending",
            DocumentStatus::InProgress => "in_progress",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Declined => "declined",
            DocumentStatus::Voided => "voided",
            DocumentStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// A document instantiated from a template (or uploaded standalone) and
/// sent out for signature. Retained indefinitely once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub tenant_id: String,
    pub template_id: Option<String>,
    pub name: String,
    pub source_ref: String,
    /// Set after successful finalization; absent means callers fall back
    /// to `source_ref`.
    pub signed_ref: Option<String>,
    pub status: DocumentStatus,
    pub message: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reminders_enabled: bool,
    pub reminder_cadence_days: i64,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|e| e < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    Signer,
    Cc,
    Viewer,
    Approver,
}

impl SignerRole {
    /// Roles whose resolution gates document completion.
    pub fn gates_completion(&self) -> bool {
        matches!(self, SignerRole::Signer | SignerRole::Approver)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerStatus {
    Pending,
    Sent,
    Viewed,
    Signed,
    Declined,
}

impl SignerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SignerStatus::Signed | SignerStatus::Declined)
    }
}

impl std::fmt::Display for SignerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignerStatus::Pending => "pending",
            SignerStatus::Sent => "sent",
            SignerStatus::Viewed => "viewed",
            SignerStatus::Signed => "signed",
            SignerStatus::Declined => "declined",
        };
        write!(f, "{}", s)
    }
}

/// A party attached to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    pub id: String,
    pub document_id: String,
    pub name: String,
    pub email: String,
    pub role: SignerRole,
    /// Positive, not necessarily contiguous.
    pub signing_order: u32,
    /// Counter-signers sign after all external parties have resolved.
    pub is_internal: bool,
    /// Unguessable, unique, scoped to exactly this document.
    pub access_token: String,
    pub status: SignerStatus,
    pub declined_reason: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub first_viewed_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Signer {
    pub fn new(document_id: &str, name: &str, email: &str, role: SignerRole, order: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            signing_order: order.max(1),
            is_internal: false,
            access_token: Uuid::new_v4().simple().to_string(),
            status: SignerStatus::Pending,
            declined_reason: None,
            sent_at: None,
            first_viewed_at: None,
            signed_at: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn internal(mut self) -> Self {
        self.is_internal = true;
        self
    }
}

/// A positioned, typed data slot on a concrete document. Values are
/// writable only by the owning signer while it is their turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub document_id: String,
    pub template_field_id: Option<String>,
    pub kind: FieldKind,
    pub page: u32,
    pub rect: FieldRect,
    pub required: bool,
    pub signer_id: Option<String>,
    pub value: Option<String>,
    pub label: Option<String>,
    pub options: Vec<String>,
    pub group: Option<String>,
    pub formula: Option<String>,
}

impl Field {
    pub fn has_value(&self) -> bool {
        self.value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
    }
}

/// Validate an email the way the sending layer expects: one `@`, non-empty
/// local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), String> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| format!("invalid email: {}", email))?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        return Err(format!("invalid email: {}", email));
    }
    if email.contains(char::is_whitespace) {
        return Err(format!("invalid email: {}", email));
    }
    Ok(())
}
