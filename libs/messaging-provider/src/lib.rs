//! Broker-neutral access to message senders and listeners.
//!
//! Application code asks a [`MessagingProvider`] for a sender or listener
//! and describes the channel with a [`RoutingInfo`]. The broker bridge that
//! does the actual work is a [`MessagingFactory`] registered in a
//! [`FactoryRegistry`] at start-up; exactly one must be present.

pub mod config;
pub mod errors;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod routing;
pub mod starter;
pub mod traits;

pub use config::{ChannelCatalog, ConfigError};
pub use errors::{InitializationError, MessagingError, ProviderError};
pub use memory::{InMemoryListener, InMemoryMessagingFactory, InMemorySender, SentMessage};
pub use provider::{MessagingProvider, messaging_id};
pub use registry::{FactoryRegistry, RegistryError};
pub use routing::{
    AmqpListenerRouting, AmqpSenderRouting, Endpoint, GenericRouting, JmsRouting, ListenerSource,
    RoutingInfo,
};
pub use starter::{MessagingModuleStarter, ModuleStarter};
pub use traits::{
    Headers, MessageListener, MessageReceiver, MessageSender, MessagingFactory, SharedFactory,
    SharedListener, SharedReceiver, SharedSender,
};
