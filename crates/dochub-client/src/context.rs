//! Process-wide handles shared by views: the global refresh signal and the
//! window title.
//!
//! Both are plain values passed to whoever needs them rather than globals.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

/// Asks every subscribed listing to re-fetch its current page.
///
/// Mutating operations trigger it after they complete; tables holding a
/// [`RefreshListener`] pick it up on their next poll.
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshSignal {
    /// Create a signal with no pending refresh.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Request a refresh from every listener.
    pub fn trigger(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
        debug!(generation = self.generation(), "global refresh triggered");
    }

    /// Number of refreshes triggered so far.
    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Subscribe; refreshes triggered before this call are not reported.
    pub fn subscribe(&self) -> RefreshListener {
        RefreshListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`RefreshSignal`].
#[derive(Debug)]
pub struct RefreshListener {
    rx: watch::Receiver<u64>,
}

impl RefreshListener {
    /// Whether a refresh was triggered since the last [`Self::mark_seen`].
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Acknowledge all refreshes triggered so far.
    pub fn mark_seen(&mut self) {
        self.rx.borrow_and_update();
    }

    /// Wait for the next refresh. Returns `false` once every signal handle
    /// is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

type TitleObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// The title shown for the current view, e.g. a terminal window title.
///
/// Views set a title for as long as they are shown; dropping the returned
/// [`TitleGuard`] restores whatever was shown before.
#[derive(Clone)]
pub struct TitleHandle {
    base: Arc<str>,
    current: Arc<Mutex<String>>,
    observer: Option<TitleObserver>,
}

impl fmt::Debug for TitleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TitleHandle")
            .field("base", &self.base)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl TitleHandle {
    /// Create a handle whose base title is `base`.
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            current: Arc::new(Mutex::new(base.clone())),
            base: base.into(),
            observer: None,
        }
    }

    /// Call `observer` with every new title, e.g. to forward it to a terminal.
    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// The title shown when no view sets one.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The title currently shown.
    pub fn current(&self) -> String {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Show `"{title} - {base}"`, or the base title for `None`, until the
    /// guard is dropped.
    pub fn set(&self, title: Option<&str>) -> TitleGuard {
        let full = match title {
            Some(t) if !t.is_empty() => format!("{t} - {}", self.base),
            _ => self.base.to_string(),
        };
        let previous = self.current();
        self.write(full);
        TitleGuard {
            handle: self.clone(),
            previous,
        }
    }

    fn write(&self, title: String) {
        if let Some(observer) = &self.observer {
            observer(&title);
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = title;
    }
}

/// Restores the title shown before [`TitleHandle::set`] when dropped.
#[must_use = "the title is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TitleGuard {
    handle: TitleHandle,
    previous: String,
}

impl Drop for TitleGuard {
    fn drop(&mut self) {
        self.handle.write(std::mem::take(&mut self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_sees_triggers_after_subscribe() {
        let signal = RefreshSignal::new();
        signal.trigger();
        let mut listener = signal.subscribe();
        assert!(!listener.has_changed());

        signal.clone().trigger();
        assert!(listener.has_changed());
        listener.mark_seen();
        assert!(!listener.has_changed());
        assert_eq!(signal.generation(), 2);
    }

    #[tokio::test]
    async fn changed_resolves_on_trigger() {
        let signal = RefreshSignal::new();
        let mut listener = signal.subscribe();
        let waiter = tokio::spawn(async move { listener.changed().await });
        signal.trigger();
        assert!(matches!(waiter.await, Ok(true)));
    }

    #[test]
    fn title_guard_restores_base() {
        let title = TitleHandle::new("dochub");
        {
            let _guard = title.set(Some("API keys"));
            assert_eq!(title.current(), "API keys - dochub");
        }
        assert_eq!(title.current(), "dochub");
    }

    #[test]
    fn nested_guards_restore_previous_title() {
        let title = TitleHandle::new("dochub");
        let outer = title.set(Some("Documents"));
        {
            let _inner = title.set(Some("invoice.pdf"));
            assert_eq!(title.current(), "invoice.pdf - dochub");
        }
        assert_eq!(title.current(), "Documents - dochub");
        drop(outer);
        assert_eq!(title.current(), "dochub");
    }

    #[test]
    fn observer_sees_every_title() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let title = TitleHandle::new("dochub").with_observer(move |t| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(t.to_owned());
        });
        drop(title.set(Some("invoice.pdf")));
        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner).clone();
        assert_eq!(seen, vec!["invoice.pdf - dochub", "dochub"]);
    }
}
