use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HalError;
use crate::hal::{Embedded, EmbeddedSidecar, IdLookup, from_json, id_lookup};
use crate::models::Label;
use crate::table::Row;

/// Shown in place of a label whose ID is missing from the sidecar.
pub const UNKNOWN_LABEL: &str = "???";

/// A stored document revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document ID.
    pub id: String,
    /// Owner's user ID.
    pub user_id: String,
    /// ID of the binary content.
    pub blob_id: String,
    /// Revision number, increases with every new upload.
    pub revision_number: u64,
    /// Display name.
    pub name: String,
    /// IDs of attached labels, resolved through [`DocumentEmbedded::labels`].
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// MIME type of the content.
    pub content_type: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Content size in bytes.
    pub size: u64,
}

impl Document {
    /// Whether the content can be shown inline (only PDFs are).
    pub fn is_previewable(&self) -> bool {
        self.content_type == "application/pdf"
    }

    /// Resolve this document's label names, in `label_ids` order.
    pub fn label_names<'a>(&'a self, labels: &'a IdLookup<Label>) -> Vec<&'a str> {
        self.label_ids
            .iter()
            .map(|id| labels.get(id).map_or(UNKNOWN_LABEL, |l| l.name.as_str()))
            .collect()
    }
}

impl Row for Document {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Relations embedded alongside documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentEmbedded {
    /// Labels referenced by the documents, keyed by label ID.
    pub labels: IdLookup<Label>,
}

impl Embedded for DocumentEmbedded {
    fn from_sidecar(sidecar: &mut EmbeddedSidecar) -> Result<Self, HalError> {
        Ok(Self {
            labels: sidecar.decode("labels", |raw| id_lookup(raw, from_json("label")))?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hal::{HalPage, decode_page};
    use serde_json::json;

    fn page() -> HalPage<Document, DocumentEmbedded> {
        decode_page(json!({
            "items": [{
                "id": "d1",
                "userId": "u1",
                "blobId": "b1",
                "revisionNumber": 3,
                "name": "invoice.pdf",
                "labelIds": ["l1", "l9"],
                "contentType": "application/pdf",
                "createdAt": "2024-03-01T10:00:00Z",
                "updatedAt": "2024-03-02T10:00:00Z",
                "size": 2048
            }],
            "totalItems": 1,
            "_embedded": { "labels": { "l1": { "id": "l1", "name": "finance" } } }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_camel_case_fields() {
        let page = page();
        let doc = &page.items[0];
        assert_eq!(doc.blob_id, "b1");
        assert_eq!(doc.revision_number, 3);
        assert_eq!(doc.size, 2048);
        assert_eq!(doc.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(doc.is_previewable());
    }

    #[test]
    fn unknown_label_ids_resolve_to_placeholder() {
        let page = page();
        let names = page.items[0].label_names(&page.embedded.labels);
        assert_eq!(names, vec!["finance", UNKNOWN_LABEL]);
    }
}
