//! # Event Bus
//!
//! Broadcasts what happened in the library so presentation layers can refresh
//! without polling. Built on `tokio::sync::broadcast`, which also runs on the
//! browser's single-threaded executor.
//!
//! ```text
//! AppController ──emit──> EventBus ──subscribe──> view models, loggers, tests
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//!
//! bus.emit(CoreEvent::Library(LibraryEvent::PlaylistCreated {
//!     playlist_id: "p-1".to_string(),
//!     name: "Practice".to_string(),
//! }));
//!
//! assert!(matches!(events.recv().await, Ok(CoreEvent::Library(_))));
//! # }
//! ```
//!
//! ## Lagging subscribers
//!
//! A subscriber that falls more than `capacity` events behind receives
//! `RecvError::Lagged(n)` and resumes from the oldest retained event. A page
//! by page import of a long score can produce a burst, size the buffer
//! accordingly.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Library and playlist mutations
    Library(LibraryEvent),
    /// Progress of a document import
    Import(ImportEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Import(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Import(ImportEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Import(ImportEvent::PageRendered { .. }) => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSeverity::Debug => write!(f, "DEBUG"),
            EventSeverity::Info => write!(f, "INFO"),
            EventSeverity::Warning => write!(f, "WARNING"),
            EventSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// Persisted state changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    ItemImported {
        item_id: String,
        name: String,
        page_count: usize,
    },
    ItemDeleted {
        item_id: String,
    },
    PlaylistCreated {
        playlist_id: String,
        name: String,
    },
    PlaylistDeleted {
        playlist_id: String,
    },
    /// Membership of a playlist changed.
    PlaylistUpdated {
        playlist_id: String,
        /// Number of member ids after the change
        item_count: usize,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::ItemImported { .. } => "Sheet music imported",
            LibraryEvent::ItemDeleted { .. } => "Sheet music deleted",
            LibraryEvent::PlaylistCreated { .. } => "Playlist created",
            LibraryEvent::PlaylistDeleted { .. } => "Playlist deleted",
            LibraryEvent::PlaylistUpdated { .. } => "Playlist updated",
        }
    }
}

/// Lifecycle of a single document import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ImportEvent {
    Started {
        file_name: String,
    },
    /// One more page finished rendering. `page` is one-based.
    PageRendered {
        file_name: String,
        page: usize,
        total: usize,
    },
    Completed {
        file_name: String,
        item_id: String,
    },
    Failed {
        file_name: String,
        reason: String,
    },
}

impl ImportEvent {
    fn description(&self) -> &str {
        match self {
            ImportEvent::Started { .. } => "Import started",
            ImportEvent::PageRendered { .. } => "Page rendered",
            ImportEvent::Completed { .. } => "Import completed",
            ImportEvent::Failed { .. } => "Import failed",
        }
    }
}

/// Broadcast channel shared by everything that publishes core events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event and returns how many subscribers received it.
    ///
    /// Nobody listening is a normal state (e.g. a headless import), so it
    /// yields `0` instead of an error.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a receiver for all future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
