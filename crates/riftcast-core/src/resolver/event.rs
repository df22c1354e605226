//! Event resolver: the cast event log and presentation hooks.
//!
//! Events do not change the arena. The resolver appends each one to an
//! internal log, drained by the host with [`EventResolver::take_events`],
//! and forwards it to the [`Presentation`] collaborator in resolution order.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::arena::Arena;
use crate::collab::{Presentation, Silent};
use crate::output::{OutputEnvelope, OutputKind};

use super::Resolver;

/// Resolver that records events and notifies presentation.
///
/// # Example
///
/// ```
/// use riftcast_core::output::OutputKind;
/// use riftcast_core::resolver::{EventResolver, Resolver};
///
/// let resolver = EventResolver::new();
/// assert!(resolver.handles().contains(&OutputKind::Event));
/// assert!(resolver.take_events().is_empty());
/// ```
pub struct EventResolver {
    event_log: Mutex<Vec<OutputEnvelope>>,
    presentation: Arc<dyn Presentation>,
}

impl EventResolver {
    /// Creates an event resolver with silent presentation.
    #[must_use]
    pub fn new() -> Self {
        Self::with_presentation(Arc::new(Silent))
    }

    /// Creates an event resolver that forwards to `presentation`.
    #[must_use]
    pub fn with_presentation(presentation: Arc<dyn Presentation>) -> Self {
        Self {
            event_log: Mutex::new(Vec::new()),
            presentation,
        }
    }

    /// Drains the log, oldest first.
    pub fn take_events(&self) -> Vec<OutputEnvelope> {
        let mut log = self.event_log.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *log)
    }

    /// Number of undrained events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no events are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    /// Discards the log.
    pub fn clear(&self) {
        self.event_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for EventResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventResolver")
            .field("event_count", &self.event_count())
            .finish_non_exhaustive()
    }
}

impl Resolver for EventResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Event]
    }

    fn resolve(&self, outputs: &[&OutputEnvelope], _current: &Arena, _next: &mut Arena) {
        let mut log = self.event_log.lock().unwrap_or_else(PoisonError::into_inner);
        for envelope in outputs {
            if let Some(event) = envelope.event() {
                self.presentation.notify(event);
                log.push((*envelope).clone());
            }
        }
    }
}
