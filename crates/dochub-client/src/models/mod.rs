//! Records exchanged with the dochub service.

mod api_key;
mod document;
mod label;
mod principal;

pub use api_key::{ApiKey, CreatedApiKey, Scope, ScopeParseError};
pub use document::{Document, DocumentEmbedded, UNKNOWN_LABEL};
pub use label::Label;
pub use principal::Principal;
