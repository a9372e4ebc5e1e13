use tokio::sync::mpsc;

use crate::models::event_types::UiEvent;

/// Receives every UI change the controller and monitor produce.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Forwards events to an unbounded channel; the receiving end drives the UI.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: UiEvent) {
        // Receiver gone means the front end shut down; nothing left to update.
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log as JSON. Handy for headless runs.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: UiEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::debug!("[ui] {}", json),
            Err(e) => log::warn!("[ui] failed to serialize {}: {}", event.name(), e),
        }
    }
}
