//! Message reconciliation.
//!
//! The reconciler is the single source of truth for what the user sees and
//! what has or hasn't reached the backend. It owns the visible history, the
//! queue of messages composed while offline, and the one-outstanding-
//! round-trip gate. It is driven from a single task; operations are plain
//! synchronous calls and sends are fire-and-forget.

use tracing::{debug, info, warn};

use finchat_core::{ClientEvent, Message, MessageId};

use crate::error::ClientError;
use crate::store::MessageStore;

/// Transmit side of the connection as seen by the reconciler.
///
/// Implemented by [`crate::Connection`]; tests substitute a recording fake.
pub trait Transport {
    /// True while a socket is connected (not merely retrying).
    fn is_live(&self) -> bool;

    /// Fire-and-forget send over the live connection.
    fn send(&self, event: ClientEvent) -> Result<(), ClientError>;
}

/// What happened to a composed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Transmitted over the live connection.
    Sent,
    /// Held in the pending queue until the next reconnect.
    Queued,
    /// Dropped: empty input, or a reply is still outstanding.
    Ignored,
}

/// Owns history, the pending queue, and the awaiting-reply gate.
pub struct Reconciler<T: Transport> {
    history: Vec<Message>,
    pending_queue: Vec<Message>,
    awaiting_reply: bool,
    store: MessageStore,
    transport: T,
}

impl<T: Transport> Reconciler<T> {
    /// Create a reconciler with empty state. Call [`load`](Self::load) to
    /// pick up the persisted history.
    pub fn new(store: MessageStore, transport: T) -> Self {
        Self {
            history: Vec::new(),
            pending_queue: Vec::new(),
            awaiting_reply: false,
            store,
            transport,
        }
    }

    /// Initialize history from the store. Called once at startup.
    ///
    /// Entries persisted with the pending flag belong to a previous session
    /// that never confirmed delivery; the store drops them on load.
    pub fn load(&mut self) {
        self.history = self.store.load();
        info!(count = self.history.len(), "history loaded");
    }

    /// Accept user input: transmit now if the connection is live, otherwise
    /// hold it pending. The message shows up in history either way, so the
    /// user sees it immediately regardless of connectivity.
    pub fn compose_and_send(&mut self, text: &str) -> ComposeOutcome {
        let text = text.trim();
        if text.is_empty() {
            return ComposeOutcome::Ignored;
        }
        if self.awaiting_reply {
            debug!("reply outstanding, input ignored");
            return ComposeOutcome::Ignored;
        }

        let live = self.transport.is_live();
        let message = Message::user(text, !live);
        self.history.push(message.clone());
        self.persist();

        if live {
            self.transmit(&message);
            self.awaiting_reply = true;
            ComposeOutcome::Sent
        } else {
            debug!(id = %message.id, "connection down, message queued");
            self.pending_queue.push(message);
            ComposeOutcome::Queued
        }
    }

    /// Flush the pending queue over the now-live connection, in enqueue
    /// order. Runs as one synchronous unit of work, so no compose call can
    /// interleave mid-flush.
    pub fn on_connected(&mut self) {
        if self.pending_queue.is_empty() {
            // A reply cannot survive a reconnect; release the gate.
            self.awaiting_reply = false;
            return;
        }

        let queued = std::mem::take(&mut self.pending_queue);
        info!(count = queued.len(), "flushing pending messages");
        for message in &queued {
            self.transmit(message);
            self.mark_delivered(&message.id);
        }
        self.persist();
        self.awaiting_reply = true;
    }

    /// Merge an inbound bot message into history. The only path that clears
    /// the awaiting-reply gate while connected.
    pub fn on_bot_message(&mut self, message: Message) {
        self.history.push(message);
        self.awaiting_reply = false;
        self.persist();
    }

    /// Empty the visible history. Used for both the user action and the
    /// server-pushed clear. A clear is a view reset, not a connectivity
    /// event: messages already queued for delivery stay queued.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.persist();
        info!("history cleared");
    }

    /// The visible history, in insertion order.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Number of messages held for the next reconnect.
    pub fn pending_len(&self) -> usize {
        self.pending_queue.len()
    }

    /// True while a transmitted message has no reply yet.
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    fn transmit(&self, message: &Message) {
        let event = ClientEvent::UserMessage {
            text: message.text.clone(),
        };
        if let Err(e) = self.transport.send(event) {
            // The connection dropped mid-flight; no confirmation will come.
            warn!(id = %message.id, error = %e, "transmit failed");
        }
    }

    fn mark_delivered(&mut self, id: &MessageId) {
        if let Some(entry) = self.history.iter_mut().find(|m| &m.id == id) {
            entry.pending = false;
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.history) {
            warn!(error = %e, "failed to persist history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use finchat_core::{now_timestamp, Sender};

    /// Recording transport with a switchable live flag.
    #[derive(Default)]
    struct FakeTransport {
        live: Cell<bool>,
        sent: RefCell<Vec<ClientEvent>>,
    }

    impl Transport for &FakeTransport {
        fn is_live(&self) -> bool {
            self.live.get()
        }

        fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
            self.sent.borrow_mut().push(event);
            Ok(())
        }
    }

    fn reconciler<'a>(
        dir: &tempfile::TempDir,
        transport: &'a FakeTransport,
    ) -> Reconciler<&'a FakeTransport> {
        let store = MessageStore::new(dir.path().join("messages.json"));
        Reconciler::new(store, transport)
    }

    fn sent_texts(transport: &FakeTransport) -> Vec<String> {
        transport
            .sent
            .borrow()
            .iter()
            .map(|e| match e {
                ClientEvent::UserMessage { text } => text.clone(),
            })
            .collect()
    }

    fn bot_reply(text: &str) -> Message {
        Message {
            id: MessageId::generate(),
            text: text.to_string(),
            sender: Sender::Bot,
            timestamp: now_timestamp(),
            pending: false,
        }
    }

    #[test]
    fn test_send_while_connected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        transport.live.set(true);
        let mut rec = reconciler(&dir, &transport);

        assert_eq!(rec.compose_and_send("ajuda"), ComposeOutcome::Sent);
        assert_eq!(rec.history().len(), 1);
        assert!(!rec.history()[0].pending);
        assert!(rec.is_awaiting_reply());
        assert_eq!(sent_texts(&transport), vec!["ajuda"]);
    }

    #[test]
    fn test_offline_compose_queues_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        let mut rec = reconciler(&dir, &transport);

        assert_eq!(rec.compose_and_send("saldo"), ComposeOutcome::Queued);
        assert_eq!(rec.compose_and_send("extrato"), ComposeOutcome::Queued);

        assert_eq!(rec.pending_len(), 2);
        assert!(rec.history().iter().all(|m| m.pending));
        assert_eq!(rec.history()[0].text, "saldo");
        assert_eq!(rec.history()[1].text, "extrato");
        assert!(sent_texts(&transport).is_empty());
        assert!(!rec.is_awaiting_reply());
    }

    #[test]
    fn test_flush_on_connect() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        let mut rec = reconciler(&dir, &transport);

        rec.compose_and_send("saldo");
        rec.compose_and_send("extrato");

        transport.live.set(true);
        rec.on_connected();

        assert_eq!(sent_texts(&transport), vec!["saldo", "extrato"]);
        assert_eq!(rec.pending_len(), 0);
        assert!(rec.history().iter().all(|m| !m.pending));
        assert!(rec.is_awaiting_reply());
    }

    #[test]
    fn test_reconnect_with_empty_queue_releases_gate() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        transport.live.set(true);
        let mut rec = reconciler(&dir, &transport);

        rec.compose_and_send("ajuda");
        assert!(rec.is_awaiting_reply());

        // The connection dropped and came back without a reply in between.
        rec.on_connected();
        assert!(!rec.is_awaiting_reply());
    }

    #[test]
    fn test_bot_message_clears_gate() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        transport.live.set(true);
        let mut rec = reconciler(&dir, &transport);

        rec.compose_and_send("saldo");
        assert_eq!(rec.compose_and_send("extrato"), ComposeOutcome::Ignored);
        assert_eq!(rec.history().len(), 1);

        rec.on_bot_message(bot_reply("R$ 10,00"));
        assert!(!rec.is_awaiting_reply());
        assert_eq!(rec.history().len(), 2);
        assert_eq!(rec.compose_and_send("extrato"), ComposeOutcome::Sent);
    }

    #[test]
    fn test_whitespace_input_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        transport.live.set(true);
        let mut rec = reconciler(&dir, &transport);

        assert_eq!(rec.compose_and_send("   "), ComposeOutcome::Ignored);
        assert!(rec.history().is_empty());
        assert!(sent_texts(&transport).is_empty());
    }

    #[test]
    fn test_clear_leaves_pending_queue() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        let mut rec = reconciler(&dir, &transport);

        rec.compose_and_send("saldo");
        rec.clear_history();

        assert!(rec.history().is_empty());
        assert_eq!(rec.pending_len(), 1);

        // The queued message still flushes on the next connect.
        transport.live.set(true);
        rec.on_connected();
        assert_eq!(sent_texts(&transport), vec!["saldo"]);
    }

    #[test]
    fn test_load_drops_stale_pendings() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        transport.live.set(true);

        {
            let mut rec = reconciler(&dir, &transport);
            rec.compose_and_send("saldo");
            rec.on_bot_message(bot_reply("R$ 10,00"));
            transport.live.set(false);
            rec.compose_and_send("extrato"); // composed offline, never delivered
        }

        let mut rec = reconciler(&dir, &transport);
        rec.load();
        let texts: Vec<&str> = rec.history().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["saldo", "R$ 10,00"]);
        assert_eq!(rec.pending_len(), 0);
    }

    #[test]
    fn test_history_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::default();
        transport.live.set(true);

        {
            let mut rec = reconciler(&dir, &transport);
            rec.compose_and_send("ajuda");
            rec.on_bot_message(bot_reply("Comandos: saldo, extrato"));
        }

        let mut rec = reconciler(&dir, &transport);
        rec.load();
        assert_eq!(rec.history().len(), 2);
        assert_eq!(rec.history()[1].sender, Sender::Bot);
    }
}
