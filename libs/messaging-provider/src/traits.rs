use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use serde_json::Value;

use crate::errors::MessagingError;
use crate::routing::RoutingInfo;

/// Headers attached to an outgoing message.
pub type Headers = HashMap<String, Value>;

pub type SharedFactory = Arc<dyn MessagingFactory>;
pub type SharedSender = Arc<dyn MessageSender>;
pub type SharedListener = Arc<dyn MessageListener>;
pub type SharedReceiver = Arc<dyn MessageReceiver>;

/// Sends messages to the channel it was created for. Server details such as
/// hostname and port are fixed when the sender is factored.
pub trait MessageSender: Send + Sync {
    fn send_message(&self, headers: &Headers, body: &str) -> Result<(), MessagingError>;
}

/// Application side of a listener.
///
/// `receive_message` is called once per delivered message and may be called
/// from several threads at the same time.
pub trait MessageReceiver: Send + Sync {
    fn receive_message(&self, headers: &HashMap<String, String>, body: &str);

    /// Called when the connection behind the topic is torn down.
    fn topic_closed(&self);
}

/// Delivers messages from one channel to a [`MessageReceiver`].
pub trait MessageListener: Send + Sync {
    fn listen(&self, receiver: SharedReceiver) -> Result<(), MessagingError>;

    fn stop_listening(&self) -> Result<(), MessagingError>;
}

/// Bridge to a concrete broker. Exactly one implementation is expected to be
/// registered in a running process.
pub trait MessagingFactory: Send + Sync {
    fn factor_topic_message_sender(
        &self,
        routing: Arc<RoutingInfo>,
    ) -> Result<SharedSender, MessagingError>;

    /// `routing` may be `None`; implementations decide what an unspecified
    /// channel means for them.
    fn factor_topic_message_listener(
        &self,
        routing: Option<Arc<RoutingInfo>>,
    ) -> Result<SharedListener, MessagingError>;

    /// Name reported when the factory is discovered.
    fn implementation_name(&self) -> &'static str {
        simple_type_name(std::any::type_name::<Self>())
    }
}

impl Debug for dyn MessagingFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingFactory")
            .field("implementation", &self.implementation_name())
            .finish_non_exhaustive()
    }
}

impl Debug for dyn MessageSender {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSender").finish_non_exhaustive()
    }
}

impl Debug for dyn MessageListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageListener").finish_non_exhaustive()
    }
}

/// Strips module path and generic arguments from a type name.
pub(crate) fn simple_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
