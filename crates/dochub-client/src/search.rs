//! Search-as-you-type.
//!
//! Keystrokes go into a [`Debouncer`]; once input has been quiet for
//! [`SEARCH_DEBOUNCE`] the trimmed text becomes the committed query.
//! [`SearchState::begin`] hands out a [`SearchTicket`] per committed query and
//! [`SearchState::apply`] only accepts a result that is newer than what is
//! already shown, so a slow response can never overwrite a faster, later one.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::Dochub;
use crate::error::DochubError;
use crate::hal::HalPage;
use crate::models::{Document, DocumentEmbedded};

/// Quiet period before input becomes a query.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Number of results requested per query.
pub const SEARCH_LIMIT: u64 = 10;

/// Shown when there is nothing to list.
pub const NO_RESULTS_MESSAGE: &str = "No search results.";

/// Shown when the last query failed.
pub const SEARCH_FAILED_MESSAGE: &str = "An error occured.";

/// Collapses bursts of input into one committed value.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
    committed: String,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl Debouncer {
    /// Create a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            committed: String::new(),
        }
    }

    /// Record new input at `now`, restarting the quiet period.
    pub fn input(&mut self, text: &str, now: Instant) {
        self.pending = Some((text.to_owned(), now + self.delay));
    }

    /// When the pending input will be committed, if there is any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// The last committed value.
    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// Commit the pending input if its quiet period has elapsed by `now`.
    /// Returns the new value only if it differs from the last one.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if *at <= now => {}
            _ => return None,
        }
        let (text, _) = self.pending.take()?;
        let text = text.trim();
        if text == self.committed {
            return None;
        }
        self.committed = text.to_owned();
        Some(self.committed.clone())
    }

    /// Wait out the quiet period and commit. Returns `None` when there is
    /// nothing pending or the value did not change.
    pub async fn settle(&mut self) -> Option<String> {
        let deadline = self.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.poll(Instant::now())
    }
}

/// One issued query. Run it, then hand the result to [`SearchState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    seq: u64,
    query: String,
}

impl SearchTicket {
    /// The query this ticket was issued for.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Fetch the first [`SEARCH_LIMIT`] matches.
    ///
    /// # Errors
    ///
    /// Propagates the accessor's error.
    pub async fn run(
        &self,
        client: &Dochub,
    ) -> Result<HalPage<Document, DocumentEmbedded>, DochubError> {
        client.search_documents(&self.query, 0, SEARCH_LIMIT).await
    }
}

/// What the results popup currently shows.
#[derive(Debug)]
pub enum SearchOutcome {
    /// No query yet, or the query is empty.
    Idle,
    /// The most recent applied result.
    Results(HalPage<Document, DocumentEmbedded>),
    /// The most recent applied query failed.
    Failed(DochubError),
}

/// Results of the most recent query plus keyboard navigation over them.
#[derive(Debug)]
pub struct SearchState {
    next_seq: u64,
    shown_seq: u64,
    outcome: SearchOutcome,
    active: usize,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            next_seq: 1,
            shown_seq: 0,
            outcome: SearchOutcome::Idle,
            active: 0,
        }
    }
}

impl SearchState {
    /// Create an idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a query. An empty query clears the results right away and
    /// returns `None`; otherwise the caller runs the returned ticket.
    pub fn begin(&mut self, query: &str) -> Option<SearchTicket> {
        let seq = self.next_seq;
        self.next_seq += 1;
        if query.is_empty() {
            self.shown_seq = seq;
            self.show(SearchOutcome::Idle);
            return None;
        }
        debug!(seq, query, "search issued");
        Some(SearchTicket {
            seq,
            query: query.to_owned(),
        })
    }

    /// Show the result for `ticket` unless something newer is already shown.
    /// Returns whether the result was applied.
    pub fn apply(
        &mut self,
        ticket: &SearchTicket,
        result: Result<HalPage<Document, DocumentEmbedded>, DochubError>,
    ) -> bool {
        if ticket.seq <= self.shown_seq {
            warn!(
                seq = ticket.seq,
                shown = self.shown_seq,
                query = %ticket.query,
                "discarding stale search response"
            );
            return false;
        }
        self.shown_seq = ticket.seq;
        self.show(match result {
            Ok(page) => SearchOutcome::Results(page),
            Err(e) => SearchOutcome::Failed(e),
        });
        true
    }

    fn show(&mut self, outcome: SearchOutcome) {
        self.outcome = outcome;
        self.active = 0;
    }

    /// What is shown.
    pub fn outcome(&self) -> &SearchOutcome {
        &self.outcome
    }

    /// Documents shown, empty unless the last applied query succeeded.
    pub fn results(&self) -> &[Document] {
        match &self.outcome {
            SearchOutcome::Results(page) => &page.items,
            _ => &[],
        }
    }

    /// Placeholder text when no results are listed.
    pub fn message(&self) -> Option<&'static str> {
        match &self.outcome {
            SearchOutcome::Failed(_) => Some(SEARCH_FAILED_MESSAGE),
            SearchOutcome::Results(page) if !page.items.is_empty() => None,
            _ => Some(NO_RESULTS_MESSAGE),
        }
    }

    /// Index of the highlighted result.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Highlight the result under the pointer.
    pub fn set_active(&mut self, index: usize) {
        self.active = index;
    }

    /// Highlight the previous result, wrapping to the last.
    pub fn move_up(&mut self) {
        let len = self.results().len();
        if len == 0 {
            return;
        }
        self.active = if self.active > 0 && self.active < len {
            self.active - 1
        } else {
            len - 1
        };
    }

    /// Highlight the next result, wrapping to the first.
    pub fn move_down(&mut self) {
        let len = self.results().len();
        if len == 0 {
            return;
        }
        self.active = if self.active + 1 < len {
            self.active + 1
        } else {
            0
        };
    }

    /// Forget the highlight, e.g. when the input loses focus.
    pub fn reset_active(&mut self) {
        self.active = 0;
    }

    /// The highlighted document, to navigate to.
    pub fn activate(&self) -> Option<&Document> {
        self.results().get(self.active)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::hal::IdLookup;

    fn doc(id: &str) -> Document {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Document {
            id: id.to_owned(),
            user_id: "u1".to_owned(),
            blob_id: format!("blob-{id}"),
            revision_number: 1,
            name: format!("{id}.pdf"),
            label_ids: Vec::new(),
            content_type: "application/pdf".to_owned(),
            created_at: ts,
            updated_at: ts,
            size: 10,
        }
    }

    fn page(ids: &[&str]) -> HalPage<Document, DocumentEmbedded> {
        HalPage {
            items: ids.iter().map(|id| doc(id)).collect(),
            total_items: ids.len() as u64,
            embedded: DocumentEmbedded {
                labels: IdLookup::default(),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_commits_after_quiet_period() {
        let mut debouncer = Debouncer::default();
        let start = Instant::now();
        debouncer.input("inv", start);
        debouncer.input("invoice ", start + Duration::from_millis(100));

        assert_eq!(debouncer.poll(start + Duration::from_millis(300)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(350)),
            Some("invoice".to_owned())
        );
        assert_eq!(debouncer.committed(), "invoice");
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_deadline() {
        let mut debouncer = Debouncer::default();
        let start = Instant::now();
        debouncer.input("  tax  ", start);
        assert_eq!(debouncer.settle().await, Some("tax".to_owned()));
        assert!(Instant::now() >= start + SEARCH_DEBOUNCE);
        assert_eq!(debouncer.settle().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_query_is_not_recommitted() {
        let mut debouncer = Debouncer::default();
        debouncer.input("tax", Instant::now());
        assert!(debouncer.settle().await.is_some());
        debouncer.input("tax ", Instant::now());
        assert_eq!(debouncer.settle().await, None);
    }

    #[test]
    fn empty_query_issues_no_request() {
        let mut state = SearchState::new();
        assert!(state.begin("").is_none());
        assert_eq!(state.message(), Some(NO_RESULTS_MESSAGE));
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut state = SearchState::new();
        let slow = state.begin("inv").unwrap();
        let fast = state.begin("invoice").unwrap();

        assert!(state.apply(&fast, Ok(page(&["d2"]))));
        assert!(!state.apply(&slow, Ok(page(&["d1"]))));
        assert_eq!(state.results()[0].id, "d2");
    }

    #[test]
    fn clearing_the_query_discards_in_flight_results() {
        let mut state = SearchState::new();
        let ticket = state.begin("inv").unwrap();
        assert!(state.begin("").is_none());
        assert!(!state.apply(&ticket, Ok(page(&["d1"]))));
        assert!(state.results().is_empty());
    }

    #[test]
    fn failures_show_error_message() {
        let mut state = SearchState::new();
        let ticket = state.begin("x").unwrap();
        state.apply(&ticket, Err(DochubError::Config("down".to_owned())));
        assert_eq!(state.message(), Some(SEARCH_FAILED_MESSAGE));
        assert!(state.activate().is_none());
    }

    #[test]
    fn navigation_wraps_and_resets_on_new_results() {
        let mut state = SearchState::new();
        let ticket = state.begin("d").unwrap();
        state.apply(&ticket, Ok(page(&["a", "b", "c"])));
        assert_eq!(state.message(), None);

        state.move_up();
        assert_eq!(state.active_index(), 2);
        state.move_down();
        assert_eq!(state.active_index(), 0);
        state.move_down();
        assert_eq!(state.activate().unwrap().id, "b");

        let ticket = state.begin("dd").unwrap();
        state.apply(&ticket, Ok(page(&["x"])));
        assert_eq!(state.active_index(), 0);
    }

    #[test]
    fn navigation_without_results_is_a_no_op() {
        let mut state = SearchState::new();
        state.move_down();
        state.move_up();
        assert_eq!(state.active_index(), 0);
        assert!(state.activate().is_none());
    }
}
