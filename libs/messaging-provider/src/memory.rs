//! In-process messaging factory for tests and local runs.
//!
//! Nothing here talks to a broker: senders record what they were asked to
//! send and listeners only deliver what the caller hands them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::errors::MessagingError;
use crate::routing::RoutingInfo;
use crate::traits::{
    Headers, MessageListener, MessageSender, MessagingFactory, SharedListener, SharedReceiver,
    SharedSender,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Message captured by an [`InMemorySender`].
#[derive(Clone, Debug, PartialEq)]
pub struct SentMessage {
    pub headers: Headers,
    pub body: String,
}

/// Sender that keeps every message in memory.
pub struct InMemorySender {
    routing: Arc<RoutingInfo>,
    sent: Mutex<Vec<SentMessage>>,
}

impl InMemorySender {
    pub fn new(routing: Arc<RoutingInfo>) -> Self {
        Self {
            routing,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn routing(&self) -> &Arc<RoutingInfo> {
        &self.routing
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }
}

impl MessageSender for InMemorySender {
    fn send_message(&self, headers: &Headers, body: &str) -> Result<(), MessagingError> {
        debug!(
            host = %self.routing.hostname(),
            protocol = self.routing.protocol(),
            "recording in-memory message"
        );
        lock(&self.sent).push(SentMessage {
            headers: headers.clone(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
struct ListenerState {
    receiver: Option<SharedReceiver>,
    stopped: bool,
}

/// Listener whose deliveries are driven by the caller.
pub struct InMemoryListener {
    routing: Option<Arc<RoutingInfo>>,
    state: Mutex<ListenerState>,
}

impl InMemoryListener {
    pub fn new(routing: Option<Arc<RoutingInfo>>) -> Self {
        Self {
            routing,
            state: Mutex::new(ListenerState::default()),
        }
    }

    pub fn routing(&self) -> Option<&Arc<RoutingInfo>> {
        self.routing.as_ref()
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.state).receiver.is_some()
    }

    /// Hands one message to the attached receiver.
    pub fn deliver(
        &self,
        headers: &HashMap<String, String>,
        body: &str,
    ) -> Result<(), MessagingError> {
        let receiver = {
            let state = lock(&self.state);
            if state.stopped {
                return Err(closed());
            }
            state.receiver.clone().ok_or_else(|| {
                MessagingError::new("no_receiver", "no receiver is listening on this topic")
            })?
        };
        receiver.receive_message(headers, body);
        Ok(())
    }

    /// Simulates the connection going away: the receiver is detached and
    /// told that the topic closed.
    pub fn close(&self) {
        let receiver = lock(&self.state).receiver.take();
        if let Some(receiver) = receiver {
            receiver.topic_closed();
        }
    }
}

fn closed() -> MessagingError {
    MessagingError::new("listener_closed", "listener has stopped listening")
}

impl MessageListener for InMemoryListener {
    fn listen(&self, receiver: SharedReceiver) -> Result<(), MessagingError> {
        let mut state = lock(&self.state);
        if state.stopped {
            return Err(closed());
        }
        state.receiver = Some(receiver);
        Ok(())
    }

    fn stop_listening(&self) -> Result<(), MessagingError> {
        let mut state = lock(&self.state);
        state.stopped = true;
        state.receiver = None;
        Ok(())
    }
}

/// Factory producing [`InMemorySender`]s and [`InMemoryListener`]s and
/// remembering each of them.
#[derive(Default)]
pub struct InMemoryMessagingFactory {
    senders: Mutex<Vec<Arc<InMemorySender>>>,
    listeners: Mutex<Vec<Arc<InMemoryListener>>>,
}

impl InMemoryMessagingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn senders(&self) -> Vec<Arc<InMemorySender>> {
        lock(&self.senders).clone()
    }

    pub fn listeners(&self) -> Vec<Arc<InMemoryListener>> {
        lock(&self.listeners).clone()
    }

    pub fn last_sender(&self) -> Option<Arc<InMemorySender>> {
        lock(&self.senders).last().cloned()
    }

    pub fn last_listener(&self) -> Option<Arc<InMemoryListener>> {
        lock(&self.listeners).last().cloned()
    }
}

impl MessagingFactory for InMemoryMessagingFactory {
    fn factor_topic_message_sender(
        &self,
        routing: Arc<RoutingInfo>,
    ) -> Result<SharedSender, MessagingError> {
        let sender = Arc::new(InMemorySender::new(routing));
        lock(&self.senders).push(sender.clone());
        Ok(sender)
    }

    fn factor_topic_message_listener(
        &self,
        routing: Option<Arc<RoutingInfo>>,
    ) -> Result<SharedListener, MessagingError> {
        let listener = Arc::new(InMemoryListener::new(routing));
        lock(&self.listeners).push(listener.clone());
        Ok(listener)
    }
}
