//! Uniform event emission for a run
//!
//! The engine is the only writer. Extraction and outreach logic hand their
//! results back to it instead of notifying observers themselves.
//!
//! Sinks are called synchronously on the run's own path and must return
//! quickly. A slow consumer should use [`ChannelSink`] and do its work on the
//! receiving side.

use prospector_core::Contact;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Notification produced by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A card was turned into a contact
    Captured(Contact),
    /// Both the connect and the send controls were activated
    InviteSent {
        contact: Contact,
        source_query: String,
    },
    /// One line of the progress narrative
    Log(String),
}

/// Receiver of run events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

impl<F> EventSink for F
where
    F: Fn(RunEvent) + Send + Sync,
{
    fn emit(&self, event: RunEvent) {
        self(event)
    }
}

/// Hands events off to an unbounded channel
///
/// Sending never blocks. Events emitted after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: RunEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn captured(&self) -> Vec<Contact> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::Captured(contact) => Some(contact),
                _ => None,
            })
            .collect()
    }

    /// `(contact, source_query)` pairs, in emission order
    pub fn invites(&self) -> Vec<(Contact, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::InviteSent {
                    contact,
                    source_query,
                } => Some((contact, source_query)),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
