//! Supporting documents attached to a lead and the storage collaborator behind them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{DocumentId, LeadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Identity,
    IncomeProof,
    AddressProof,
    BankStatement,
    Other,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::Identity => "identity",
            DocumentKind::IncomeProof => "income_proof",
            DocumentKind::AddressProof => "address_proof",
            DocumentKind::BankStatement => "bank_statement",
            DocumentKind::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" => Some(Self::Identity),
            "income_proof" => Some(Self::IncomeProof),
            "address_proof" => Some(Self::AddressProof),
            "bank_statement" => Some(Self::BankStatement),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Raw upload as received from the applicant.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub kind: DocumentKind,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Metadata persisted alongside the stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub lead_id: LeadId,
    pub kind: DocumentKind,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReceipt {
    pub document: DocumentRecord,
    pub access_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("no file was provided")]
    Empty,
    #[error("file name is required")]
    MissingFileName,
    #[error("file of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },
    #[error("file type '{0}' is not allowed; only PDF, JPEG and PNG are accepted")]
    UnsupportedType(String),
    #[error("document storage failed: {0}")]
    Storage(String),
}

/// Upload limits enforced before anything reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentPolicy {
    pub max_bytes: usize,
    pub url_ttl: chrono::Duration,
}

impl DocumentPolicy {
    /// Check size and content type, returning the resolved MIME type.
    pub fn validate(&self, upload: &DocumentUpload) -> Result<Mime, DocumentError> {
        if upload.file_name.trim().is_empty() {
            return Err(DocumentError::MissingFileName);
        }
        if upload.bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(DocumentError::TooLarge {
                size: upload.bytes.len(),
                max: self.max_bytes,
            });
        }
        resolve_content_type(upload)
    }
}

/// Prefer the declared content type, otherwise guess from the file name.
pub fn resolve_content_type(upload: &DocumentUpload) -> Result<Mime, DocumentError> {
    let declared = upload
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != mime::APPLICATION_OCTET_STREAM.essence_str());

    let mime = match declared {
        Some(raw) => raw
            .parse::<Mime>()
            .map_err(|_| DocumentError::UnsupportedType(raw.to_string()))?,
        None => mime_guess::from_path(&upload.file_name)
            .first()
            .ok_or_else(|| DocumentError::UnsupportedType(upload.file_name.clone()))?,
    };

    if extension_for(&mime).is_some() {
        Ok(mime)
    } else {
        Err(DocumentError::UnsupportedType(mime.essence_str().to_string()))
    }
}

pub(crate) fn extension_for(mime: &Mime) -> Option<&'static str> {
    let (kind, subtype) = (mime.type_(), mime.subtype());
    if kind == mime::APPLICATION && subtype == mime::PDF {
        Some("pdf")
    } else if kind == mime::IMAGE && subtype == mime::JPEG {
        Some("jpg")
    } else if kind == mime::IMAGE && subtype == mime::PNG {
        Some("png")
    } else {
        None
    }
}

pub(crate) fn storage_path(lead_id: &LeadId, kind: DocumentKind, mime: &Mime) -> String {
    let extension = extension_for(mime).unwrap_or("bin");
    format!(
        "{lead_id}/{}_{}.{extension}",
        kind.label(),
        Uuid::new_v4().simple()
    )
}

/// Object storage collaborator holding document bytes.
pub trait DocumentStore: Send + Sync {
    fn put(&self, path: &str, content_type: &Mime, bytes: &[u8]) -> Result<(), DocumentError>;
    fn signed_url(&self, path: &str, expires_at: DateTime<Utc>) -> Result<String, DocumentError>;
    /// Remove an object; deleting a missing path is not an error.
    fn delete(&self, path: &str) -> Result<(), DocumentError>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// Process-local store used by the API binary and tests.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    base_url: String,
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl InMemoryDocumentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Arc::default(),
        }
    }

    pub fn object(&self, path: &str) -> Option<(String, Vec<u8>)> {
        let guard = self.objects.lock().ok()?;
        guard
            .get(path)
            .map(|object| (object.content_type.clone(), object.bytes.clone()))
    }

    pub fn object_count(&self) -> Result<usize, DocumentError> {
        Ok(self.objects()?.len())
    }

    fn objects(&self) -> Result<MutexGuard<'_, HashMap<String, StoredObject>>, DocumentError> {
        self.objects
            .lock()
            .map_err(|_| DocumentError::Storage("document store lock poisoned".to_string()))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new("http://localhost:3000/storage")
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, path: &str, content_type: &Mime, bytes: &[u8]) -> Result<(), DocumentError> {
        self.objects()?.insert(
            path.to_string(),
            StoredObject {
                content_type: content_type.essence_str().to_string(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(())
    }

    fn signed_url(&self, path: &str, expires_at: DateTime<Utc>) -> Result<String, DocumentError> {
        if !self.objects()?.contains_key(path) {
            return Err(DocumentError::Storage(format!("object '{path}' missing")));
        }
        Ok(format!(
            "{}/{path}?expires={}&token={}",
            self.base_url,
            expires_at.timestamp(),
            Uuid::new_v4().simple()
        ))
    }

    fn delete(&self, path: &str) -> Result<(), DocumentError> {
        self.objects()?.remove(path);
        Ok(())
    }
}
