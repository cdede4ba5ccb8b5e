//! `Dochub` accessors: one method per service route.

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::{DochubError, HalError};
use crate::hal::{HalPage, HalResource, decode_page, decode_resource};
use crate::models::{ApiKey, CreatedApiKey, Document, DocumentEmbedded, Scope};
use crate::{DEFAULT_BASE_URL, Dochub, DochubConfig, USER_AGENT};

/// Document collection route.
pub const DOCUMENTS_PATH: &str = "/api/documents";
/// Full-text document search route.
pub const SEARCH_PATH: &str = "/api/documents/search";
/// API key collection route.
pub const API_KEYS_PATH: &str = "/api/api-keys";
/// Login entry point; the browser is redirected here, not fetched.
pub const LOGIN_PATH: &str = "/api/auth/github";

const PREVIEW_FRAGMENT: &str = "#toolbar=0&navpanes=0";

impl Dochub {
    /// Create a client for `base_url`. The token is read from `DOCHUB_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns `DochubError::Config` if the URL does not parse.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DochubError> {
        Self::with_config(DochubConfig {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    /// Create a client with full configuration.
    ///
    /// # Errors
    ///
    /// Returns `DochubError::Config` if the base URL does not parse or the
    /// HTTP client cannot be built.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(cfg: DochubConfig) -> Result<Self, DochubError> {
        let base_url = first_non_empty(&[
            &cfg.base_url,
            &std::env::var("DOCHUB_URL").unwrap_or_default(),
            DEFAULT_BASE_URL,
        ])
        .trim_end_matches('/')
        .to_owned();

        reqwest::Url::parse(&base_url)
            .map_err(|e| DochubError::Config(format!("invalid base URL \"{base_url}\": {e}")))?;

        let token = cfg
            .token
            .clone()
            .or_else(|| std::env::var("DOCHUB_TOKEN").ok())
            .filter(|t| !t.is_empty());

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DochubError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    /// Service base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Access token, if configured.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    // --- Documents ---

    /// List documents, newest first as ordered by the service.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and malformed envelopes.
    pub async fn list_documents(
        &self,
        from: u64,
        limit: u64,
    ) -> Result<HalPage<Document, DocumentEmbedded>, DochubError> {
        let req = self
            .client
            .get(self.url(DOCUMENTS_PATH))
            .query(&[("from", from), ("limit", limit)]);
        Ok(decode_page(self.send_json(req).await?)?)
    }

    /// Full-text search over documents.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and malformed envelopes.
    pub async fn search_documents(
        &self,
        query: &str,
        from: u64,
        limit: u64,
    ) -> Result<HalPage<Document, DocumentEmbedded>, DochubError> {
        let req = self
            .client
            .get(self.url(SEARCH_PATH))
            .query(&[("query", query)])
            .query(&[("from", from), ("limit", limit)]);
        Ok(decode_page(self.send_json(req).await?)?)
    }

    /// Fetch one document with its labels.
    ///
    /// # Errors
    ///
    /// A missing document surfaces as `DochubError::Http` with status 404.
    pub async fn retrieve_document(
        &self,
        document_id: &str,
    ) -> Result<HalResource<Document, DocumentEmbedded>, DochubError> {
        let req = self.client.get(self.url(&document_path(document_id)));
        Ok(decode_resource(self.send_json(req).await?)?)
    }

    /// Upload new content as a document.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and malformed envelopes.
    pub async fn create_document(
        &self,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<HalResource<Document, DocumentEmbedded>, DochubError> {
        let req = self
            .client
            .post(self.url(DOCUMENTS_PATH))
            .query(&[("name", name)])
            .header(CONTENT_TYPE, content_type)
            .body(data);
        Ok(decode_resource(self.send_json(req).await?)?)
    }

    /// Download the content of one document revision.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn download_document(
        &self,
        document_id: &str,
        revision_number: u64,
    ) -> Result<Vec<u8>, DochubError> {
        let req = self
            .client
            .get(self.url(&download_path(document_id, revision_number)));
        self.send(req).await?.bytes().await
    }

    /// Link that downloads a revision without further credentials, for
    /// handing to a browser or another process.
    pub fn download_url(&self, document: &Document) -> String {
        let mut url = self.url(&download_path(&document.id, document.revision_number));
        if let Some(token) = &self.token {
            url.push_str("?token=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    /// Like [`Self::download_url`], with viewer hints for inline PDF preview.
    pub fn preview_url(&self, document: &Document) -> String {
        let mut url = self.download_url(document);
        url.push_str(PREVIEW_FRAGMENT);
        url
    }

    /// Ask the service to run text recognition on a document.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn ocr_document(&self, document_id: &str) -> Result<(), DochubError> {
        let path = format!("{}/ocr", document_path(document_id));
        self.send(self.client.post(self.url(&path))).await?;
        Ok(())
    }

    // --- API keys ---

    /// List the caller's API keys. Secrets are never included.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and malformed envelopes.
    pub async fn list_api_keys(
        &self,
        from: u64,
        limit: u64,
    ) -> Result<HalPage<ApiKey, ()>, DochubError> {
        let req = self
            .client
            .get(self.url(API_KEYS_PATH))
            .query(&[("from", from), ("limit", limit)]);
        Ok(decode_page(self.send_json(req).await?)?)
    }

    /// Create an API key. The returned secret is the only copy.
    ///
    /// An empty `scopes` slice sends no scopes, so the key inherits the
    /// owner's permissions.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and malformed envelopes.
    pub async fn create_api_key(
        &self,
        name: &str,
        scopes: &[Scope],
    ) -> Result<HalResource<CreatedApiKey, ()>, DochubError> {
        let scopes: Vec<(&str, &str)> = scopes.iter().map(|s| ("scopes", s.as_str())).collect();
        let req = self
            .client
            .post(self.url(API_KEYS_PATH))
            .query(&[("name", name)])
            .query(&scopes);
        Ok(decode_resource(self.send_json(req).await?)?)
    }

    /// Delete an API key.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn delete_api_key(&self, api_key_id: &str) -> Result<(), DochubError> {
        let path = format!("{API_KEYS_PATH}/{}", urlencoding::encode(api_key_id));
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }

    // --- Auth ---

    /// Where to send a user to log in.
    pub fn login_url(&self) -> String {
        self.url(LOGIN_PATH)
    }

    // --- Private ---

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Sent, DochubError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let req = req
            .build()
            .map_err(|e| DochubError::Config(format!("invalid request: {e}")))?;
        let method = req.method().as_str().to_owned();
        let url = req.url().to_string();
        debug!(%method, %url, "sending request");

        let resp = match self.client.execute(req).await {
            Ok(resp) => resp,
            Err(source) => return Err(DochubError::Network { method, url, source }),
        };

        let status = resp.status();
        debug!(%method, %url, status = status.as_u16(), "received response");
        if status.is_success() {
            return Ok(Sent {
                method,
                url,
                status: status.as_u16(),
                resp,
            });
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DochubError::Http {
            method,
            url,
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json(&self, req: RequestBuilder) -> Result<Value, DochubError> {
        let body = self.send(req).await?.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| HalError::json("response body", e).into())
    }
}

/// A successful response together with the request it answers.
struct Sent {
    method: String,
    url: String,
    status: u16,
    resp: Response,
}

impl Sent {
    async fn bytes(self) -> Result<Vec<u8>, DochubError> {
        let Self {
            method,
            url,
            status,
            resp,
        } = self;
        match resp.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(source) => Err(DochubError::Body {
                method,
                url,
                status,
                source,
            }),
        }
    }
}

fn document_path(document_id: &str) -> String {
    format!("{DOCUMENTS_PATH}/{}", urlencoding::encode(document_id))
}

fn download_path(document_id: &str, revision_number: u64) -> String {
    format!("{}/{revision_number}/download", document_path(document_id))
}

fn first_non_empty(vals: &[&str]) -> String {
    for v in vals {
        if !v.is_empty() {
            return (*v).to_owned();
        }
    }
    String::new()
}
