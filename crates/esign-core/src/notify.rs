//! Notification payload assembly
//!
//! Delivery and content rendering belong to an external messaging
//! collaborator; the core assembles `{recipient, template_key, data}`
//! tuples and decides when each is due.

use serde::Serialize;
use serde_json::json;
use shared_types::{Document, Signer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    SignatureRequest,
    Reminder,
    SignedConfirmation,
    DocumentCompleted,
    Declined,
    Voided,
    ExpirationWarning,
}

impl NotificationKind {
    pub fn template_key(&self) -> &'static str {
        match self {
            NotificationKind::SignatureRequest => "signature_request",
            NotificationKind::Reminder => "reminder",
            NotificationKind::SignedConfirmation => "signed_confirmation",
            NotificationKind::DocumentCompleted => "document_completed",
            NotificationKind::Declined => "declined",
            NotificationKind::Voided => "voided",
            NotificationKind::ExpirationWarning => "expiration_warning",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub recipient: String,
    pub template_key: String,
    pub data: serde_json::Value,
}

/// `{base}/sign/{accessToken}`
pub fn signing_url(base: &str, access_token: &str) -> String {
    format!("{}/sign/{}", base.trim_end_matches('/'), access_token)
}

/// `{base}/documents/{documentId}/download[?signed=true]`
pub fn download_url(base: &str, document_id: &str, signed: bool) -> String {
    let mut url = format!(
        "{}/documents/{}/download",
        base.trim_end_matches('/'),
        document_id
    );
    if signed {
        url.push_str("?signed=true");
    }
    url
}

pub fn signature_request(
    base: &str,
    document: &Document,
    signer: &Signer,
    message: Option<&str>,
) -> NotificationPayload {
    NotificationPayload {
        recipient: signer.email.clone(),
        template_key: NotificationKind::SignatureRequest.template_key().to_string(),
        data: json!({
            "signer_name": signer.name,
            "document_name": document.name,
            "signing_link": signing_url(base, &signer.access_token),
            "message": message.unwrap_or(""),
            "expires_at": document.expires_at.map(|e| e.to_rfc3339()),
        }),
    }
}

pub fn reminder(base: &str, document: &Document, signer: &Signer) -> NotificationPayload {
    NotificationPayload {
        recipient: signer.email.clone(),
        template_key: NotificationKind::Reminder.template_key().to_string(),
        data: json!({
            "signer_name": signer.name,
            "document_name": document.name,
            "signing_link": signing_url(base, &signer.access_token),
            "expires_at": document.expires_at.map(|e| e.to_rfc3339()),
        }),
    }
}

pub fn signed_confirmation(base: &str, document: &Document, signer: &Signer) -> NotificationPayload {
    NotificationPayload {
        recipient: signer.email.clone(),
        template_key: NotificationKind::SignedConfirmation
            .template_key()
            .to_string(),
        data: json!({
            "signer_name": signer.name,
            "document_name": document.name,
            "download_link": download_url(base, &document.id, false),
        }),
    }
}

pub fn document_completed(
    base: &str,
    document: &Document,
    recipient_email: &str,
    recipient_name: &str,
    signer_count: usize,
) -> NotificationPayload {
    NotificationPayload {
        recipient: recipient_email.to_string(),
        template_key: NotificationKind::DocumentCompleted
            .template_key()
            .to_string(),
        data: json!({
            "recipient_name": recipient_name,
            "document_name": document.name,
            "signer_count": signer_count,
            "completed_at": document.completed_at.map(|t| t.to_rfc3339()),
            "download_link": download_url(base, &document.id, true),
        }),
    }
}

pub fn declined(
    document: &Document,
    recipient_email: &str,
    decliner: &Signer,
    reason: Option<&str>,
) -> NotificationPayload {
    NotificationPayload {
        recipient: recipient_email.to_string(),
        template_key: NotificationKind::Declined.template_key().to_string(),
        data: json!({
            "document_name": document.name,
            "declined_by": decliner.name,
            "reason": reason.unwrap_or(""),
        }),
    }
}

pub fn voided(document: &Document, recipient_email: &str, reason: Option<&str>) -> NotificationPayload {
    NotificationPayload {
        recipient: recipient_email.to_string(),
        template_key: NotificationKind::Voided.template_key().to_string(),
        data: json!({
            "document_name": document.name,
            "reason": reason.unwrap_or(""),
        }),
    }
}

pub fn expiration_warning(base: &str, document: &Document, signer: &Signer) -> NotificationPayload {
    NotificationPayload {
        recipient: signer.email.clone(),
        template_key: NotificationKind::ExpirationWarning
            .template_key()
            .to_string(),
        data: json!({
            "signer_name": signer.name,
            "document_name": document.name,
            "signing_link": signing_url(base, &signer.access_token),
            "expires_at": document.expires_at.map(|e| e.to_rfc3339()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn urls_are_shaped_per_contract() {
        assert_eq!(
            signing_url("https://sign.example.com/", "tok123"),
            "https://sign.example.com/sign/tok123"
        );
        assert_eq!(
            download_url("https://sign.example.com", "d1", false),
            "https://sign.example.com/documents/d1/download"
        );
        assert_eq!(
            download_url("https://sign.example.com", "d1", true),
            "https://sign.example.com/documents/d1/download?signed=true"
        );
    }

    #[test]
    fn template_keys_are_stable() {
        assert_eq!(
            NotificationKind::SignatureRequest.template_key(),
            "signature_request"
        );
        assert_eq!(
            NotificationKind::ExpirationWarning.template_key(),
            "expiration_warning"
        );
    }
}
