use serde::{Deserialize, Serialize};

/// A label attached to documents. Only ever seen in the `labels` relation of
/// a document envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Label ID.
    pub id: String,
    /// Display name.
    pub name: String,
}
