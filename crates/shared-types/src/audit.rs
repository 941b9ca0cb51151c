//! Tamper-evident audit trail for document events
//!
//! Entries are append-only and hash-linked; the trail for a document is the
//! legally defensible record of who did what, when, and from where.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Every state-changing action the engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Sent,
    Viewed,
    FieldFilled,
    Signed,
    Declined,
    Voided,
    ReminderSent,
    Resent,
    CounterSigned,
    Expired,
    Downloaded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Sent => "sent",
            AuditAction::Viewed => "viewed",
            AuditAction::FieldFilled => "field_filled",
            AuditAction::Signed => "signed",
            AuditAction::Declined => "declined",
            AuditAction::Voided => "voided",
            AuditAction::ReminderSent => "reminder_sent",
            AuditAction::Resent => "resent",
            AuditAction::CounterSigned => "counter_signed",
            AuditAction::Expired => "expired",
            AuditAction::Downloaded => "downloaded",
        }
    }
}

/// A single immutable fact about a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub document_id: String,
    pub signer_id: Option<String>,
    pub action: AuditAction,
    /// Structured free-form payload (field ids, reasons, wave numbers).
    pub detail: serde_json::Value,
    /// Who performed the action: a signer email or a staff identity.
    pub actor: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Hash of the preceding entry in this document's trail.
    pub previous_hash: Option<String>,
}

impl AuditEntry {
    /// Hash covering everything a later entry links to.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.document_id.as_bytes());
        if let Some(signer) = &self.signer_id {
            hasher.update(signer.as_bytes());
        }
        hasher.update(self.action.as_str().as_bytes());
        hasher.update(self.detail.to_string().as_bytes());
        hasher.update(self.actor.as_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        if let Some(prev) = &self.previous_hash {
            hasher.update(prev.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// The ordered, hash-linked trail of one document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    pub document_id: String,
    pub entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn last_hash(&self) -> Option<String> {
        self.entries.last().map(|e| e.content_hash())
    }

    /// Append an entry, linking it to the current chain head.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        action: AuditAction,
        signer_id: Option<&str>,
        actor: &str,
        detail: serde_json::Value,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> &AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            document_id: self.document_id.clone(),
            signer_id: signer_id.map(str::to_string),
            action,
            detail,
            actor: actor.to_string(),
            ip_address: ip_address.map(str::to_string),
            user_agent: user_agent.map(str::to_string),
            timestamp: now,
            previous_hash: self.last_hash(),
        };
        self.entries.push(entry);
        self.entries.last().expect("just pushed")
    }

    /// Walk the chain and confirm every link still holds.
    pub fn verify(&self) -> Result<(), String> {
        let mut expected_prev: Option<String> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.previous_hash != expected_prev {
                return Err(format!(
                    "audit chain broken at entry {}: expected prev {:?}, got {:?}",
                    i, expected_prev, entry.previous_hash
                ));
            }
            expected_prev = Some(entry.content_hash());
        }
        Ok(())
    }

    /// Action names in order, for assertions and summaries.
    pub fn action_sequence(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.action.as_str()).collect()
    }
}

/// One row of the certificate's signer table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerAttestation {
    pub name: String,
    pub email: String,
    pub role: String,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Everything needed to reconstruct exactly what happened and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionCertificate {
    pub document_id: String,
    pub document_name: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub signers: Vec<SignerAttestation>,
    pub trail: AuditTrail,
}

/// SHA-256 digest of document bytes, hex-encoded.
pub fn hash_document(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
