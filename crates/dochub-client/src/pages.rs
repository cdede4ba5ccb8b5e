//! [`PageSource`] adapters over the [`Dochub`] accessors.

use async_trait::async_trait;

use crate::Dochub;
use crate::error::DochubError;
use crate::hal::HalPage;
use crate::models::{ApiKey, Document, DocumentEmbedded};
use crate::table::PageSource;

/// All documents, as served by [`Dochub::list_documents`].
#[derive(Debug, Clone)]
pub struct DocumentPages {
    client: Dochub,
}

impl DocumentPages {
    /// Page through every document.
    pub fn new(client: Dochub) -> Self {
        Self { client }
    }

    /// Client used for fetching.
    pub fn client(&self) -> &Dochub {
        &self.client
    }
}

#[async_trait]
impl PageSource for DocumentPages {
    type Item = Document;
    type Embedded = DocumentEmbedded;

    async fn fetch(
        &self,
        from: u64,
        limit: u64,
    ) -> Result<HalPage<Document, DocumentEmbedded>, DochubError> {
        self.client.list_documents(from, limit).await
    }
}

/// Documents matching a full-text query.
#[derive(Debug, Clone)]
pub struct SearchPages {
    client: Dochub,
    query: String,
}

impl SearchPages {
    /// Page through the results of `query`.
    pub fn new(client: Dochub, query: impl Into<String>) -> Self {
        Self {
            client,
            query: query.into(),
        }
    }

    /// The query being paged.
    pub fn query(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl PageSource for SearchPages {
    type Item = Document;
    type Embedded = DocumentEmbedded;

    async fn fetch(
        &self,
        from: u64,
        limit: u64,
    ) -> Result<HalPage<Document, DocumentEmbedded>, DochubError> {
        self.client.search_documents(&self.query, from, limit).await
    }
}

/// The caller's API keys.
#[derive(Debug, Clone)]
pub struct ApiKeyPages {
    client: Dochub,
}

impl ApiKeyPages {
    /// Page through the caller's API keys.
    pub fn new(client: Dochub) -> Self {
        Self { client }
    }

    /// Client used for fetching, also handy for bulk actions.
    pub fn client(&self) -> &Dochub {
        &self.client
    }
}

#[async_trait]
impl PageSource for ApiKeyPages {
    type Item = ApiKey;
    type Embedded = ();

    async fn fetch(&self, from: u64, limit: u64) -> Result<HalPage<ApiKey, ()>, DochubError> {
        self.client.list_api_keys(from, limit).await
    }
}
