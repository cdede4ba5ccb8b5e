//! Headless paginated table.
//!
//! [`PaginatedTable`] owns the state behind a listing screen: which page is
//! shown, how many rows per page, which rows are selected, and the last page
//! the [`PageSource`] returned. Rendering is left to the caller, which reads
//! [`PaginatedTable::body`], [`PaginatedTable::header_checkbox`],
//! [`PaginatedTable::bulk_selection`] and [`PaginatedTable::pagination`].
//!
//! Selection is page-local: moving to another page or changing the page
//! size clears it.

use async_trait::async_trait;
use tracing::debug;

use crate::context::RefreshListener;
use crate::error::DochubError;
use crate::hal::HalPage;

/// Page sizes a table can be switched to.
pub const ROWS_PER_PAGE_OPTIONS: [u64; 5] = [5, 10, 25, 50, 100];

/// Page size of a fresh table.
pub const DEFAULT_ROWS_PER_PAGE: u64 = 25;

/// A record that can be shown as a table row.
pub trait Row {
    /// Unique identifier, used for selection.
    fn id(&self) -> &str;
}

/// Fetches one page of rows.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Row type.
    type Item: Row + Send;
    /// Sidecar accompanying each page.
    type Embedded: Send;

    /// Fetch `limit` rows starting at offset `from`.
    async fn fetch(
        &self,
        from: u64,
        limit: u64,
    ) -> Result<HalPage<Self::Item, Self::Embedded>, DochubError>;
}

/// State of the select-all checkbox in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckboxState {
    /// Every visible row is selected.
    Checked,
    /// Some, but not all, visible rows are selected.
    Indeterminate,
    /// No visible row is selected.
    Unchecked,
}

/// What the table body should show.
#[derive(Debug, PartialEq)]
pub enum TableBody<'a, R> {
    /// No page has resolved yet; render nothing.
    Loading,
    /// The page resolved with no rows; render the caller's placeholder.
    Empty,
    /// Rows to render, in order.
    Rows(&'a [R]),
}

/// Handed to bulk actions while at least one row is selected.
#[derive(Debug)]
pub struct BulkSelection<'a, R, E> {
    /// Selected row IDs, in selection order.
    pub selected: &'a [String],
    /// The page the selection was made on.
    pub page: &'a HalPage<R, E>,
}

/// Data for the pagination footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Total rows across all pages.
    pub count: u64,
    /// Zero-based current page.
    pub page: u64,
    /// Rows per page.
    pub rows_per_page: u64,
}

impl PaginationInfo {
    /// Number of pages; at least one, so an empty listing still has page 0.
    pub fn page_count(&self) -> u64 {
        self.count.div_ceil(self.rows_per_page).max(1)
    }

    /// Whether a previous page exists.
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    /// Whether a next page exists.
    pub fn has_next(&self) -> bool {
        self.page
            .saturating_add(1)
            .saturating_mul(self.rows_per_page)
            < self.count
    }

    /// `"26-50 of 57"` style label. A page past the end collapses onto the
    /// last row, so `from` never exceeds `to`.
    pub fn range_label(&self) -> String {
        let to = self
            .page
            .saturating_add(1)
            .saturating_mul(self.rows_per_page)
            .min(self.count);
        let from = if self.count == 0 {
            0
        } else {
            self.page
                .saturating_mul(self.rows_per_page)
                .saturating_add(1)
                .min(to)
        };
        format!("{from}-{to} of {}", self.count)
    }
}

/// One page of a listing plus its selection state.
pub struct PaginatedTable<S: PageSource> {
    title: String,
    source: S,
    page_index: u64,
    rows_per_page: u64,
    selected: Vec<String>,
    page: Option<HalPage<S::Item, S::Embedded>>,
    refresh: Option<RefreshListener>,
}

impl<S: PageSource> PaginatedTable<S> {
    /// Create a table on page 0 with the default page size. Nothing is
    /// fetched until [`Self::load`] is called.
    pub fn new(title: impl Into<String>, source: S) -> Self {
        Self {
            title: title.into(),
            source,
            page_index: 0,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            selected: Vec::new(),
            page: None,
            refresh: None,
        }
    }

    /// Re-fetch whenever `listener`'s signal fires (see [`Self::poll_refresh`]).
    #[must_use]
    pub fn with_refresh(mut self, listener: RefreshListener) -> Self {
        self.refresh = Some(listener);
        self
    }

    /// The source rows are fetched from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Table title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Zero-based current page.
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// Current page size.
    pub fn rows_per_page(&self) -> u64 {
        self.rows_per_page
    }

    /// Offset of the first row on the current page.
    pub fn offset(&self) -> u64 {
        self.page_index.saturating_mul(self.rows_per_page)
    }

    /// The last page fetched, if any.
    pub fn page(&self) -> Option<&HalPage<S::Item, S::Embedded>> {
        self.page.as_ref()
    }

    // --- Fetching ---

    /// Fetch the current page again.
    ///
    /// # Errors
    ///
    /// Propagates the source's error; the previous page stays in place.
    pub async fn load(&mut self) -> Result<(), DochubError> {
        self.fetch_at(self.page_index, self.rows_per_page).await
    }

    /// Move to `page_index` and fetch it.
    ///
    /// # Errors
    ///
    /// Returns `DochubError::Config` if the page offset overflows, or
    /// propagates the source's error; the table stays on the old page.
    pub async fn set_page(&mut self, page_index: u64) -> Result<(), DochubError> {
        self.fetch_at(page_index, self.rows_per_page).await
    }

    /// Move to the next page if there is one. Returns whether it moved.
    ///
    /// # Errors
    ///
    /// Propagates the source's error.
    pub async fn next_page(&mut self) -> Result<bool, DochubError> {
        match self.pagination() {
            Some(info) if info.has_next() => {
                self.set_page(self.page_index + 1).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Move to the previous page if there is one. Returns whether it moved.
    ///
    /// # Errors
    ///
    /// Propagates the source's error.
    pub async fn previous_page(&mut self) -> Result<bool, DochubError> {
        if self.page_index == 0 {
            return Ok(false);
        }
        self.set_page(self.page_index - 1).await?;
        Ok(true)
    }

    /// Change the page size and go back to page 0.
    ///
    /// # Errors
    ///
    /// Returns `DochubError::Config` for a size outside
    /// [`ROWS_PER_PAGE_OPTIONS`], or the source's error.
    pub async fn set_rows_per_page(&mut self, rows_per_page: u64) -> Result<(), DochubError> {
        check_rows_per_page(rows_per_page)?;
        self.fetch_at(0, rows_per_page).await
    }

    /// Jump to `page_index` at `rows_per_page` with a single fetch.
    ///
    /// # Errors
    ///
    /// Returns `DochubError::Config` for a size outside
    /// [`ROWS_PER_PAGE_OPTIONS`] or an offset past `u64::MAX`, or the
    /// source's error.
    pub async fn load_page(
        &mut self,
        page_index: u64,
        rows_per_page: u64,
    ) -> Result<(), DochubError> {
        check_rows_per_page(rows_per_page)?;
        self.fetch_at(page_index, rows_per_page).await
    }

    /// Re-fetch the current page if the refresh signal fired since the last
    /// poll. Returns whether a fetch happened.
    ///
    /// # Errors
    ///
    /// Propagates the source's error.
    pub async fn poll_refresh(&mut self) -> Result<bool, DochubError> {
        let Some(listener) = self.refresh.as_mut() else {
            return Ok(false);
        };
        if !listener.has_changed() {
            return Ok(false);
        }
        listener.mark_seen();
        self.load().await?;
        Ok(true)
    }

    async fn fetch_at(&mut self, page_index: u64, rows_per_page: u64) -> Result<(), DochubError> {
        let from = page_index.checked_mul(rows_per_page).ok_or_else(|| {
            DochubError::Config(format!(
                "page {page_index} at {rows_per_page} rows per page is out of range"
            ))
        })?;
        debug!(table = %self.title, from, limit = rows_per_page, "fetching page");
        let page = self.source.fetch(from, rows_per_page).await?;
        if page_index != self.page_index || rows_per_page != self.rows_per_page {
            self.selected.clear();
        }
        self.page_index = page_index;
        self.rows_per_page = rows_per_page;
        self.page = Some(page);
        Ok(())
    }

    // --- Rendering ---

    /// What the body should show.
    pub fn body(&self) -> TableBody<'_, S::Item> {
        match &self.page {
            None => TableBody::Loading,
            Some(page) if page.items.is_empty() => TableBody::Empty,
            Some(page) => TableBody::Rows(&page.items),
        }
    }

    /// The table title, or `"{n} selected"` while rows are selected.
    pub fn toolbar_title(&self) -> String {
        if self.selected.is_empty() {
            self.title.clone()
        } else {
            format!("{} selected", self.selected.len())
        }
    }

    /// Footer data, once a page has resolved.
    pub fn pagination(&self) -> Option<PaginationInfo> {
        self.page.as_ref().map(|page| PaginationInfo {
            count: page.total_items,
            page: self.page_index,
            rows_per_page: self.rows_per_page,
        })
    }

    // --- Selection ---

    /// Selected row IDs, in selection order.
    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Whether the row with `id` is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    /// Select or deselect one row.
    pub fn toggle_row(&mut self, id: &str, checked: bool) {
        self.selected.retain(|s| s != id);
        if checked {
            self.selected.push(id.to_owned());
        }
    }

    /// Select every visible row, or clear the selection.
    pub fn toggle_all(&mut self, checked: bool) {
        self.selected = match (&self.page, checked) {
            (Some(page), true) => page.items.iter().map(|r| r.id().to_owned()).collect(),
            _ => Vec::new(),
        };
    }

    /// Clear the selection.
    pub fn unselect_all(&mut self) {
        self.selected.clear();
    }

    /// Header checkbox state relative to the visible rows.
    pub fn header_checkbox(&self) -> CheckboxState {
        let Some(page) = &self.page else {
            return CheckboxState::Unchecked;
        };
        let visible = page.items.len();
        let hits = page
            .items
            .iter()
            .filter(|row| self.is_selected(row.id()))
            .count();
        if visible > 0 && hits == visible {
            CheckboxState::Checked
        } else if hits > 0 {
            CheckboxState::Indeterminate
        } else {
            CheckboxState::Unchecked
        }
    }

    /// Bulk-action input, only while at least one row is selected.
    pub fn bulk_selection(&self) -> Option<BulkSelection<'_, S::Item, S::Embedded>> {
        match &self.page {
            Some(page) if !self.selected.is_empty() => Some(BulkSelection {
                selected: &self.selected,
                page,
            }),
            _ => None,
        }
    }
}

fn check_rows_per_page(rows_per_page: u64) -> Result<(), DochubError> {
    if ROWS_PER_PAGE_OPTIONS.contains(&rows_per_page) {
        Ok(())
    } else {
        Err(DochubError::Config(format!(
            "unsupported page size {rows_per_page}, expected one of {ROWS_PER_PAGE_OPTIONS:?}"
        )))
    }
}
