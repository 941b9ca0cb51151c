//! Binary object store interface
//!
//! The store itself is an external collaborator; the core only calls this
//! seam. Paths are namespaced by tenant and entity id so a misrouted
//! write is visible at a glance.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{CoreError, Result};

pub trait ObjectStore: Send + Sync {
    /// Fetch the bytes behind a reference.
    fn fetch(&self, reference: &str) -> Result<Vec<u8>>;

    /// Store bytes and return the reference to hand back later.
    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    fn delete(&self, reference: &str) -> Result<()>;
}

/// Canonical object paths.
pub mod paths {
    pub fn template_source(tenant_id: &str, template_id: &str) -> String {
        format!("{}/templates/{}/source.pdf", tenant_id, template_id)
    }

    pub fn document_source(tenant_id: &str, document_id: &str) -> String {
        format!("{}/documents/{}/source.pdf", tenant_id, document_id)
    }

    pub fn signed_output(tenant_id: &str, document_id: &str) -> String {
        format!("{}/documents/{}/signed.pdf", tenant_id, document_id)
    }

    pub fn preview(tenant_id: &str, document_id: &str) -> String {
        format!("{}/documents/{}/preview.pdf", tenant_id, document_id)
    }

    pub fn signature_image(tenant_id: &str, signer_id: &str) -> String {
        format!("{}/signatures/{}.png", tenant_id, signer_id)
    }
}

/// In-process store used by tests and single-node deployments.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("object store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .expect("object store lock")
            .get(reference)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| CoreError::Storage(format!("object not found: {}", reference)))
    }

    fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        self.objects
            .write()
            .expect("object store lock")
            .insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(path.to_string())
    }

    fn delete(&self, reference: &str) -> Result<()> {
        self.objects
            .write()
            .expect("object store lock")
            .remove(reference);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_fetch_delete_round_trip() {
        let store = MemoryObjectStore::new();
        let path = paths::document_source("acme", "doc-1");
        let reference = store.put(&path, b"pdf bytes", "application/pdf").unwrap();
        assert_eq!(store.fetch(&reference).unwrap(), b"pdf bytes");
        store.delete(&reference).unwrap();
        assert!(store.fetch(&reference).is_err());
    }

    #[test]
    fn paths_are_tenant_namespaced() {
        assert_eq!(
            paths::signed_output("acme", "d1"),
            "acme/documents/d1/signed.pdf"
        );
        assert_eq!(
            paths::preview("acme", "d1"),
            "acme/documents/d1/preview.pdf"
        );
        assert!(paths::signature_image("acme", "s1").starts_with("acme/"));
        assert!(paths::template_source("acme", "t1").starts_with("acme/templates/"));
    }
}
