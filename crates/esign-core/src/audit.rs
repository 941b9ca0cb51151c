//! Compliance-trail assembly
//!
//! Recording happens at each state transition via the store; this module
//! compiles the defensible record: the certificate data and chain checks.

use shared_types::{CompletionCertificate, SignerAttestation, SignerRole};

use crate::error::Result;
use crate::store::TenantScope;

/// Assemble everything needed to reconstruct what happened and when:
/// document identity and timestamps, the ordered signer roster, and the
/// full hash-linked trail.
pub fn compile_certificate(
    scope: &mut TenantScope<'_>,
    document_id: &str,
) -> Result<CompletionCertificate> {
    let document = scope.document(document_id)?;
    let signers = scope.signers_for(document_id);
    let trail = scope.trail(document_id);

    let attestations = signers
        .iter()
        .map(|s| SignerAttestation {
            name: s.name.clone(),
            email: s.email.clone(),
            role: role_name(s.role).to_string(),
            signed_at: s.signed_at,
            ip_address: s.ip_address.clone(),
            user_agent: s.user_agent.clone(),
        })
        .collect();

    Ok(CompletionCertificate {
        document_id: document.id.clone(),
        document_name: document.name.clone(),
        created_at: document.created_at,
        completed_at: document.completed_at,
        signers: attestations,
        trail,
    })
}

/// Re-check the hash chain of a document's trail.
pub fn verify_trail(scope: &mut TenantScope<'_>, document_id: &str) -> std::result::Result<(), String> {
    scope.trail(document_id).verify()
}

fn role_name(role: SignerRole) -> &'static str {
    match role {
        SignerRole::Signer => "signer",
        SignerRole::Cc => "cc",
        SignerRole::Viewer => "viewer",
        SignerRole::Approver => "approver",
    }
}
