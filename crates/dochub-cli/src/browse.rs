//! Interactive listings.
//!
//! A line-oriented loop over a [`PaginatedTable`]: page through rows, change
//! the page size, select rows and run bulk actions. The documents view also
//! has search-as-you-type (`/text`, then `j`/`k` and an empty line to open
//! the highlighted result).

use std::io::{IsTerminal as _, Write as _};

use anyhow::{Context, Result};
use chrono::Utc;
use dochub_client::context::{RefreshSignal, TitleHandle};
use dochub_client::error_info::inspect_dochub_error;
use dochub_client::format::{content_type_extension, format_file_size, format_time_passed};
use dochub_client::models::{ApiKey, Document, DocumentEmbedded};
use dochub_client::search::{Debouncer, SearchState};
use dochub_client::table::{CheckboxState, PageSource, PaginatedTable, Row, TableBody};
use dochub_client::{ApiKeyPages, Dochub, DochubError, DocumentPages};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::Instant;
use tracing::info;

use crate::{BOLD, CYAN, DIM, RESET, YELLOW, header, print_document, print_error_info, success};

const BASE_TITLE: &str = "dochub";
const BULK_DELETE_CONFIRMATION: &str =
    "Sure you want to delete the selected API keys? This cannot be undone.";

/// A listing the loop can show.
pub trait View: PageSource {
    /// Shown in the toolbar and window title.
    const TITLE: &'static str;
    /// Shown instead of rows when the listing is empty.
    const EMPTY: &'static str;

    /// One line for `row`.
    fn render_row(row: &Self::Item, embedded: &Self::Embedded) -> String;

    /// Client for bulk deletion, if this listing supports it.
    fn bulk_delete_client(&self) -> Option<&Dochub> {
        None
    }
}

impl View for DocumentPages {
    const TITLE: &'static str = "Documents";
    const EMPTY: &'static str = "No documents yet. Upload one with `dochub documents upload`.";

    fn render_row(doc: &Document, embedded: &DocumentEmbedded) -> String {
        let labels = doc.label_names(&embedded.labels);
        let labels = if labels.is_empty() {
            String::new()
        } else {
            format!(" {CYAN}[{}]{RESET}", labels.join(", "))
        };
        format!(
            "{:<4} {}{labels} {DIM}{} · {} · {}{RESET}",
            content_type_extension(&doc.content_type),
            doc.name,
            format_file_size(doc.size),
            format_time_passed(Utc::now(), doc.updated_at),
            doc.id
        )
    }
}

impl View for ApiKeyPages {
    const TITLE: &'static str = "API keys";
    const EMPTY: &'static str = "No API keys yet. Create one with `dochub api-keys create`.";

    fn render_row(key: &ApiKey, _embedded: &()) -> String {
        let now = Utc::now();
        let last_used = key.last_used_at.map_or_else(
            || "never used".to_owned(),
            |t| format!("used {}", format_time_passed(now, t)),
        );
        let scopes = if key.scopes.is_some() {
            key.scopes_label()
        } else {
            "inherited".to_owned()
        };
        format!(
            "{} {DIM}({scopes}) · created {} · {last_used} · {}{RESET}",
            key.name,
            format_time_passed(now, key.created_at),
            key.id
        )
    }

    fn bulk_delete_client(&self) -> Option<&Dochub> {
        Some(self.client())
    }
}

/// Print the toolbar, rows and pagination footer of `table`.
pub fn render<V: View>(table: &PaginatedTable<V>) {
    let checkbox = match (table.body(), table.header_checkbox()) {
        (TableBody::Rows(_), CheckboxState::Checked) => "[x] ",
        (TableBody::Rows(_), CheckboxState::Indeterminate) => "[-] ",
        (TableBody::Rows(_), CheckboxState::Unchecked) => "[ ] ",
        _ => "",
    };
    header("▤", &format!("{checkbox}{}", table.toolbar_title()));

    match (table.body(), table.page()) {
        (TableBody::Rows(rows), Some(page)) => {
            for (i, row) in rows.iter().enumerate() {
                let mark = if table.is_selected(row.id()) {
                    format!("{YELLOW}[x]{RESET}")
                } else {
                    "[ ]".to_owned()
                };
                println!(
                    "  {mark} {DIM}{:>3}{RESET} {}",
                    i + 1,
                    V::render_row(row, &page.embedded)
                );
            }
        }
        (TableBody::Empty, _) => println!("  {DIM}{}{RESET}", V::EMPTY),
        _ => println!("  {DIM}loading...{RESET}"),
    }

    if let Some(info) = table.pagination() {
        println!(
            "{DIM}  {} · page {}/{} · {} rows per page{RESET}",
            info.range_label(),
            info.page + 1,
            info.page_count(),
            info.rows_per_page
        );
    }
    println!();
}

/// Browse all documents.
pub async fn browse_documents(client: Dochub) -> Result<()> {
    let search = SearchSession::new(client.clone());
    run(DocumentPages::new(client), Some(search)).await
}

/// Browse the caller's API keys.
pub async fn browse_api_keys(client: Dochub) -> Result<()> {
    run(ApiKeyPages::new(client), None).await
}

fn help(has_bulk_delete: bool, has_search: bool) {
    println!("  {DIM}n / p          next / previous page{RESET}");
    println!("  {DIM}g <page>       go to page (1-based){RESET}");
    println!("  {DIM}size <n>       rows per page (5, 10, 25, 50, 100){RESET}");
    println!("  {DIM}x <row>        toggle selection of a row{RESET}");
    println!("  {DIM}a              select or unselect all rows{RESET}");
    if has_bulk_delete {
        println!("  {DIM}d              delete selected rows{RESET}");
    }
    if has_search {
        println!("  {DIM}/<text>        search; j / k move, empty line opens{RESET}");
    }
    println!("  {DIM}r              refresh{RESET}");
    println!("  {DIM}q              quit{RESET}");
    println!();
}

async fn run<V: View>(source: V, mut search: Option<SearchSession>) -> Result<()> {
    let title = window_title();
    let _title_guard = title.set(Some(V::TITLE));
    let refresh = RefreshSignal::new();
    let mut table = PaginatedTable::new(V::TITLE, source).with_refresh(refresh.subscribe());
    let has_bulk_delete = table.source().bulk_delete_client().is_some();

    report(table.load().await);
    render(&table);
    help(has_bulk_delete, search.is_some());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };
        let line = line.trim();
        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        if let Some(session) = search.as_mut() {
            if session.handle(line, &title, &mut lines).await? {
                continue;
            }
        }

        match command {
            "q" | "quit" => break,
            "n" | "next" => report(table.next_page().await.map(|_| ())),
            "p" | "prev" => report(table.previous_page().await.map(|_| ())),
            "g" | "page" => match arg.parse::<u64>() {
                Ok(page) if page > 0 => report(table.set_page(page - 1).await),
                _ => println!("  {DIM}usage: g <page>{RESET}"),
            },
            "size" => match arg.parse::<u64>() {
                Ok(size) => report(table.set_rows_per_page(size).await),
                Err(_) => println!("  {DIM}usage: size <n>{RESET}"),
            },
            "x" => toggle_row(&mut table, arg),
            "a" => {
                let all = table.header_checkbox() != CheckboxState::Checked;
                table.toggle_all(all);
            }
            "d" if has_bulk_delete => {
                if table.bulk_selection().is_some()
                    && !confirm(BULK_DELETE_CONFIRMATION, &mut lines).await?
                {
                    println!("  {DIM}nothing deleted{RESET}");
                } else if bulk_delete(&table).await {
                    table.unselect_all();
                    refresh.trigger();
                }
            }
            "r" | "refresh" => refresh.trigger(),
            "h" | "help" | "?" => {
                help(has_bulk_delete, search.is_some());
                continue;
            }
            "" => continue,
            other => {
                println!("  {DIM}unknown command \"{other}\", type h for help{RESET}");
                continue;
            }
        }

        report(table.poll_refresh().await.map(|_| ()));
        render(&table);
    }
    Ok(())
}

fn toggle_row<V: View>(table: &mut PaginatedTable<V>, arg: &str) {
    let id = match (table.body(), arg.parse::<usize>()) {
        (TableBody::Rows(rows), Ok(n)) if n >= 1 && n <= rows.len() => rows[n - 1].id().to_owned(),
        _ => {
            println!("  {DIM}usage: x <row>{RESET}");
            return;
        }
    };
    let checked = !table.is_selected(&id);
    table.toggle_row(&id, checked);
}

/// Delete the selected rows one after another. Returns whether anything
/// changed on the service.
async fn bulk_delete<V: View>(table: &PaginatedTable<V>) -> bool {
    let (Some(client), Some(bulk)) = (table.source().bulk_delete_client(), table.bulk_selection())
    else {
        println!("  {DIM}select rows with x or a first{RESET}");
        return false;
    };
    let mut deleted = 0;
    for id in bulk.selected {
        match client.delete_api_key(id).await {
            Ok(()) => {
                deleted += 1;
                success(&format!("Deleted {id}"));
            }
            Err(e) => {
                print_error_info(&inspect_dochub_error(&e));
                break;
            }
        }
    }
    info!(deleted, selected = bulk.selected.len(), "bulk delete finished");
    deleted > 0
}

/// Ask a yes/no question. Anything but `y` or `yes`, including end of
/// input, is a no.
async fn confirm<R: AsyncBufRead + Unpin>(question: &str, lines: &mut Lines<R>) -> Result<bool> {
    print!("  {YELLOW}{question}{RESET} [y/N] ");
    std::io::stdout().flush().context("failed to flush stdout")?;
    let answer = lines.next_line().await.context("failed to read input")?;
    Ok(answer.is_some_and(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes")))
}

fn report(result: Result<(), DochubError>) {
    if let Err(e) = result {
        print_error_info(&inspect_dochub_error(&e));
    }
}

fn prompt() -> Result<()> {
    print!("{BOLD}{CYAN}›{RESET} ");
    std::io::stdout().flush().context("failed to flush stdout")
}

fn window_title() -> TitleHandle {
    let title = TitleHandle::new(BASE_TITLE);
    if std::io::stdout().is_terminal() {
        title.with_observer(|t| {
            print!("\x1b]0;{t}\x07");
            let _ = std::io::stdout().flush();
        })
    } else {
        title
    }
}

/// Search popup state for the documents view.
struct SearchSession {
    client: Dochub,
    debouncer: Debouncer,
    state: SearchState,
}

impl SearchSession {
    fn new(client: Dochub) -> Self {
        Self {
            client,
            debouncer: Debouncer::default(),
            state: SearchState::new(),
        }
    }

    /// Handle search input. Returns `false` if `line` is not meant for search.
    async fn handle(
        &mut self,
        line: &str,
        title: &TitleHandle,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> Result<bool> {
        if let Some(text) = line.strip_prefix('/') {
            self.debouncer.input(text, Instant::now());
            if let Some(query) = self.debouncer.settle().await {
                if let Some(ticket) = self.state.begin(&query) {
                    let result = ticket.run(&self.client).await;
                    self.state.apply(&ticket, result);
                }
            }
            self.render();
            return Ok(true);
        }

        if self.state.results().is_empty() {
            return Ok(false);
        }
        match line {
            "j" => self.state.move_down(),
            "k" => self.state.move_up(),
            "" => {
                if let Some(doc) = self.state.activate() {
                    self.open(doc.id.clone(), title, lines).await?;
                }
                self.state.reset_active();
            }
            _ => return Ok(false),
        }
        self.render();
        Ok(true)
    }

    fn render(&self) {
        header("🔎", &format!("Search: {}", self.debouncer.committed()));
        if let Some(message) = self.state.message() {
            println!("  {DIM}{message}{RESET}");
        }
        for (i, doc) in self.state.results().iter().enumerate() {
            if i == self.state.active_index() {
                println!("  {YELLOW}{BOLD}›{RESET} {BOLD}{}{RESET}", doc.name);
            } else {
                println!("    {}", doc.name);
            }
        }
        println!();
    }

    /// Show one document until the user presses enter.
    async fn open(
        &self,
        id: String,
        title: &TitleHandle,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> Result<()> {
        match self.client.retrieve_document(&id).await {
            Ok(doc) => {
                let _guard = title.set(Some(doc.name.as_str()));
                println!();
                print_document(&self.client, &doc, &doc.label_names(&doc.embedded.labels));
                println!("  {DIM}press enter to go back{RESET}");
                lines.next_line().await.context("failed to read input")?;
            }
            Err(e) => print_error_info(&inspect_dochub_error(&e)),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn answer(input: &'static [u8]) -> bool {
        let mut lines = BufReader::new(input).lines();
        confirm(BULK_DELETE_CONFIRMATION, &mut lines).await.unwrap()
    }

    #[tokio::test]
    async fn confirm_accepts_only_yes() {
        assert!(answer(b"y\n").await);
        assert!(answer(b" YES \n").await);
        assert!(!answer(b"n\n").await);
        assert!(!answer(b"\n").await);
        assert!(!answer(b"yep\n").await);
        assert!(!answer(b"").await);
    }

    #[tokio::test]
    async fn confirm_consumes_one_line() {
        let mut lines = BufReader::new(&b"n\nq\n"[..]).lines();
        assert!(!confirm("?", &mut lines).await.unwrap());
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("q"));
    }
}
