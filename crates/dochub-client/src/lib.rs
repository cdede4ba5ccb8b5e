//! Typed client for the dochub document service.
//!
//! Upload, search, download and manage documents and API keys. Responses are
//! HAL envelopes ([`hal`]); listings are driven through a headless
//! [`table::PaginatedTable`]; failures are classified for presentation by
//! [`error_info`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dochub_client::Dochub;
//!
//! # async fn example() -> Result<(), dochub_client::DochubError> {
//! let client = Dochub::new("http://localhost:8080")?;
//! let page = client.list_documents(0, 25).await?;
//! for doc in &page.items {
//!     let labels = doc.label_names(&page.embedded.labels);
//!     println!("{} ({} labels)", doc.name, labels.len());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod context;
mod error;
pub mod error_info;
pub mod format;
pub mod hal;
pub mod models;
mod pages;
pub mod search;
pub mod table;

pub use client::{API_KEYS_PATH, DOCUMENTS_PATH, LOGIN_PATH, SEARCH_PATH};
pub use error::{DochubError, HalError};
pub use pages::{ApiKeyPages, DocumentPages, SearchPages};

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const USER_AGENT: &str = concat!("dochub-client/", env!("CARGO_PKG_VERSION"));

/// Configuration for the [`Dochub`] client.
#[derive(Debug, Clone, Default)]
pub struct DochubConfig {
    /// Service base URL. Empty falls back to `DOCHUB_URL`, then
    /// `http://localhost:8080`.
    pub base_url: String,
    /// Access token sent as a bearer credential. `None` falls back to
    /// `DOCHUB_TOKEN`; without either, requests go out unauthenticated.
    pub token: Option<String>,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// dochub service client.
///
/// Every accessor issues exactly one request and either decodes the envelope
/// or hands back the transport failure unchanged. There is no retry and no
/// caching; callers re-fetch after mutations.
#[derive(Debug, Clone)]
pub struct Dochub {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}
