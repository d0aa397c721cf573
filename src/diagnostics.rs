//! Non-fatal watermarking events.
//!
//! Conditions such as an invisible watermark or a font fallback are reported
//! through a [`Diagnostics`] value supplied by the caller instead of a global
//! logger, so they can be observed in tests.

use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// A non-fatal condition noticed while building or applying a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The composited result is pixel-identical to the source in RGB.
    InvisibleWatermark,
    /// The mark text rendered no visible pixels.
    EmptyMark,
    /// A font could not be loaded and the next candidate is being tried.
    FontFallback {
        /// Font that failed to load.
        path: PathBuf,
        /// Why it failed.
        reason: String,
    },
    /// The anchor name was not recognized; bottom-right is used instead.
    UnknownAnchor(String),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvisibleWatermark => f.write_str(
                "result identical to source; watermark not visible (increase opacity or verify font)",
            ),
            Self::EmptyMark => {
                f.write_str("generated mark image is empty; check mark text and font path")
            }
            Self::FontFallback { path, reason } => {
                write!(f, "failed to load font {}, falling back: {reason}", path.display())
            }
            Self::UnknownAnchor(name) => {
                write!(f, "unknown position {name:?}, using bottom-right")
            }
        }
    }
}

/// Receiver for [`Event`]s.
pub trait Diagnostics: Send + Sync {
    /// Report a non-fatal event.
    fn report(&self, event: Event);
}

/// Forwards every event to `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, event: Event) {
        tracing::warn!(target: "text_watermark", "{event}");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Diagnostics for Silent {
    fn report(&self, _event: Event) {}
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Whether `event` has been recorded.
    #[must_use]
    pub fn contains(&self, event: &Event) -> bool {
        self.events().contains(event)
    }
}

impl Diagnostics for EventLog {
    fn report(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
