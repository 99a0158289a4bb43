//! Inbound host events and outbound plugin notifications
//!
//! Inbound: the host wrapper implements [`EventSource`] and forwards document
//! lifecycle callbacks to registered [`DocumentEventHandler`]s.
//! Outbound: [`EventBus`] broadcasts [`PluginEvent`]s; publishing never blocks,
//! so the UI layer can surface failures without holding up a document close.

use crate::host::HostDocument;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Document lifecycle notification delivered by the host
#[derive(Clone, Copy)]
pub enum HostEvent<'a> {
    DocumentOpened(&'a dyn HostDocument),
    DocumentSynchronized(&'a dyn HostDocument),
    DocumentClosing(&'a dyn HostDocument),
}

/// Inbound handler entry points
pub trait DocumentEventHandler: Send + Sync {
    fn on_document_opened(&self, doc: &dyn HostDocument);
    fn on_document_synchronized(&self, doc: &dyn HostDocument);
    fn on_document_closing(&self, doc: &dyn HostDocument);

    /// Route a [`HostEvent`] to the matching handler.
    fn dispatch(&self, event: HostEvent<'_>) {
        match event {
            HostEvent::DocumentOpened(doc) => self.on_document_opened(doc),
            HostEvent::DocumentSynchronized(doc) => self.on_document_synchronized(doc),
            HostEvent::DocumentClosing(doc) => self.on_document_closing(doc),
        }
    }
}

/// Registration handle returned by [`EventSource::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Something that delivers host document events to handlers
pub trait EventSource {
    fn register(&mut self, handler: Arc<dyn DocumentEventHandler>) -> SubscriptionId;

    /// Returns false if `id` was not registered.
    fn deregister(&mut self, id: SubscriptionId) -> bool;
}

/// In-process event source: fans each event out to its handlers in
/// registration order on the caller's thread.
#[derive(Default)]
pub struct LocalEventSource {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Arc<dyn DocumentEventHandler>)>,
}

impl LocalEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: HostEvent<'_>) {
        for (_, handler) in &self.handlers {
            handler.dispatch(event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl EventSource for LocalEventSource {
    fn register(&mut self, handler: Arc<dyn DocumentEventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    fn deregister(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }
}

/// Notifications emitted by the plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    /// Export toggle changed
    ExportToggled { enabled: bool },
    /// A row was appended to a monthly log
    RecordAppended { path: PathBuf, project: String },
    /// A close could not be logged
    ExportFailed { project: String, message: String },
}

/// Event bus for broadcasting plugin notifications
///
/// Uses tokio::broadcast; receivers drain with `try_recv`, no runtime needed.
pub struct EventBus {
    sender: broadcast::Sender<PluginEvent>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create with default capacity (64 events)
    pub fn default_capacity() -> Self {
        Self::new(64)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: PluginEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PluginEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
