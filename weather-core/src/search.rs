//! Search-as-you-type for city names.
//!
//! [`SuggestionSearch`] is the clock-injected state machine: keystrokes arm a
//! debounce deadline, an elapsed deadline issues one sequence-numbered lookup, and
//! only the newest issued lookup may write the visible list. [`SearchController`]
//! drives it on tokio with one abortable debounce task at a time.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{sync::Notify, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    config::SearchConfig, error::WeatherError, model::LocationSuggestion,
    provider::LocationSearch,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Debouncing { pending: String, deadline: Instant },
    Querying { text: String, seq: u64 },
    Settled { for_text: String },
}

/// A lookup the caller must run and report back through [`SuggestionSearch::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionQuery {
    pub text: String,
    pub seq: u64,
}

#[derive(Debug)]
pub struct SuggestionSearch {
    config: SearchConfig,
    phase: SearchPhase,
    input: String,
    results: Vec<LocationSuggestion>,
    open: bool,
    /// Highest sequence number handed out.
    issued: u64,
    /// Lookups up to and including this number were abandoned by the user.
    abandoned_through: u64,
}

impl SuggestionSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            phase: SearchPhase::Idle,
            input: String::new(),
            results: Vec::new(),
            open: false,
            issued: 0,
            abandoned_through: 0,
        }
    }

    pub fn phase(&self) -> &SearchPhase {
        &self.phase
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[LocationSuggestion] {
        &self.results
    }

    /// Whether the suggestion list should be on screen.
    pub fn is_visible(&self) -> bool {
        self.open && self.meets(self.config.display_min_chars) && !self.results.is_empty()
    }

    /// The suggestions a user may see and pick from; empty while the list is hidden.
    pub fn visible_suggestions(&self) -> &[LocationSuggestion] {
        if self.is_visible() {
            &self.results
        } else {
            &[]
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.phase {
            SearchPhase::Debouncing { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// True while a debounce is armed or the newest lookup is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.phase,
            SearchPhase::Debouncing { .. } | SearchPhase::Querying { .. }
        )
    }

    fn meets(&self, min_chars: usize) -> bool {
        let len = self.input.chars().count();
        len > 0 && len >= min_chars
    }

    /// Record the full current contents of the input box.
    pub fn on_input(&mut self, text: impl Into<String>, now: Instant) {
        self.input = text.into();

        if self.meets(self.config.trigger_min_chars) {
            self.phase = SearchPhase::Debouncing {
                pending: self.input.clone(),
                deadline: now + self.config.debounce(),
            };
            self.open = self.meets(self.config.display_min_chars);
        } else {
            self.phase = SearchPhase::Idle;
            self.results.clear();
            self.open = false;
            self.abandon_outstanding();
        }
    }

    /// Issue the pending lookup once its debounce deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<SuggestionQuery> {
        let text = match &self.phase {
            SearchPhase::Debouncing { pending, deadline } if now >= *deadline => pending.clone(),
            _ => return None,
        };

        self.issued += 1;
        let seq = self.issued;
        info!(seq, text = %text, "issuing location lookup");
        self.phase = SearchPhase::Querying {
            text: text.clone(),
            seq,
        };

        Some(SuggestionQuery { text, seq })
    }

    /// Apply a lookup result. Returns `false` when the result was stale and ignored.
    ///
    /// Failures clear the list and are only logged.
    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<Vec<LocationSuggestion>, WeatherError>,
    ) -> bool {
        if seq != self.issued || seq <= self.abandoned_through {
            debug!(seq, newest = self.issued, "discarding stale lookup result");
            return false;
        }

        let for_text = match &self.phase {
            SearchPhase::Querying { text, seq: current } if *current == seq => Some(text.clone()),
            _ => None,
        };

        match result {
            Ok(mut suggestions) => {
                suggestions.truncate(self.config.max_suggestions);
                self.results = suggestions;
                if let Some(for_text) = for_text {
                    self.phase = SearchPhase::Settled { for_text };
                }
            }
            Err(err) => {
                warn!(seq, error = %err, "location lookup failed");
                self.results.clear();
                if for_text.is_some() {
                    self.phase = SearchPhase::Idle;
                }
            }
        }

        true
    }

    /// Close the list and forget the input.
    pub fn dismiss(&mut self) {
        self.phase = SearchPhase::Idle;
        self.input.clear();
        self.results.clear();
        self.open = false;
        self.abandon_outstanding();
    }

    /// Take the suggestion at `index` and dismiss.
    pub fn select(&mut self, index: usize) -> Option<LocationSuggestion> {
        let choice = self.results.get(index).cloned()?;
        self.dismiss();
        Some(choice)
    }

    fn abandon_outstanding(&mut self) {
        self.abandoned_through = self.issued;
    }
}

#[derive(Debug)]
struct Shared {
    search: Mutex<SuggestionSearch>,
    changed: Notify,
}

/// Async driver for [`SuggestionSearch`].
///
/// Each keystroke aborts the pending debounce task and arms a new one. Lookups
/// that were already issued keep running; their results are filtered by sequence
/// number instead.
#[derive(Debug)]
pub struct SearchController {
    shared: Arc<Shared>,
    backend: Arc<dyn LocationSearch>,
    debounce: Option<JoinHandle<()>>,
}

impl SearchController {
    pub fn new(config: SearchConfig, backend: Arc<dyn LocationSearch>) -> Self {
        Self {
            shared: Arc::new(Shared {
                search: Mutex::new(SuggestionSearch::new(config)),
                changed: Notify::new(),
            }),
            backend,
            debounce: None,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn input(&mut self, text: impl Into<String>) {
        let deadline = {
            let mut search = self.shared.search.lock();
            search.on_input(text, Instant::now());
            search.deadline()
        };

        self.cancel_debounce();
        self.shared.changed.notify_waiters();

        let Some(deadline) = deadline else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let backend = Arc::clone(&self.backend);
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let query = shared.search.lock().poll(Instant::now());
            if let Some(query) = query {
                tokio::spawn(run_lookup(shared, backend, query));
            }
        }));
    }

    pub fn dismiss(&mut self) {
        self.cancel_debounce();
        self.shared.search.lock().dismiss();
        self.shared.changed.notify_waiters();
    }

    pub fn select(&mut self, index: usize) -> Option<LocationSuggestion> {
        self.cancel_debounce();
        let choice = self.shared.search.lock().select(index);
        self.shared.changed.notify_waiters();
        choice
    }

    pub fn suggestions(&self) -> Vec<LocationSuggestion> {
        self.shared.search.lock().suggestions().to_vec()
    }

    pub fn is_visible(&self) -> bool {
        self.shared.search.lock().is_visible()
    }

    pub fn visible_suggestions(&self) -> Vec<LocationSuggestion> {
        self.shared.search.lock().visible_suggestions().to_vec()
    }

    pub fn phase(&self) -> SearchPhase {
        self.shared.search.lock().phase().clone()
    }

    /// Wait until no debounce is armed and the newest lookup has come back.
    pub async fn settled(&self) {
        loop {
            let changed = self.shared.changed.notified();
            if !self.shared.search.lock().is_busy() {
                return;
            }
            changed.await;
        }
    }

    fn cancel_debounce(&mut self) {
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.cancel_debounce();
    }
}

async fn run_lookup(shared: Arc<Shared>, backend: Arc<dyn LocationSearch>, query: SuggestionQuery) {
    let result = backend.search(&query.text).await;
    shared.search.lock().complete(query.seq, result);
    shared.changed.notify_waiters();
}
