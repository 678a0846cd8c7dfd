//! LIFO stack of active span scopes.
//!
//! Each entry pairs a span-carrying [`Context`] with the [`ContextGuard`]
//! returned when that context was made ambient. Dropping the guard restores
//! the previously ambient context, so guards must be dropped in exact
//! reverse order of creation; the stack enforces that by construction.

use std::time::SystemTime;

use opentelemetry::trace::{SpanRef, TraceContextExt};
use opentelemetry::{Context, ContextGuard};

struct ScopeEntry {
    cx: Context,
    // Held only for its drop side effect: restoring the prior context.
    _guard: ContextGuard,
}

/// A stack of not-yet-finished span scopes, pushed in start order and
/// popped in strict reverse order.
#[derive(Default)]
pub struct SpanStack {
    entries: Vec<ScopeEntry>,
}

impl SpanStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Make `cx` the ambient context and push its scope onto the stack.
    pub fn push(&mut self, cx: Context) {
        let guard = cx.clone().attach();
        self.entries.push(ScopeEntry { cx, _guard: guard });
    }

    /// Pop the top scope: augment and end its span, then restore the prior
    /// ambient context.
    ///
    /// If the span is not recording (already finished, or sampled out), the
    /// augmentation and the end call are skipped; the context is still
    /// restored. Popping an empty stack is a no-op.
    pub fn pop_and_finalize(&mut self, end: SystemTime, augment: impl FnOnce(&SpanRef<'_>)) {
        let Some(entry) = self.entries.pop() else {
            tracing::debug!("span stack popped while empty; ignoring");
            return;
        };

        let span = entry.cx.span();
        if span.is_recording() {
            augment(&span);
            span.end_with_timestamp(end);
        }
        // entry (and its guard) dropped here, detaching the context
    }
}

impl Drop for SpanStack {
    fn drop(&mut self) {
        // Pop in LIFO order so context guards detach in reverse attach
        // order even when a run is abandoned mid-suite.
        while self.entries.pop().is_some() {}
    }
}
