//! Routing information describing how to reach a messaging channel.
//!
//! Values are passed through to the factory as given. Hostnames, ports and
//! routing-key patterns are interpreted by the receiving broker, not here.

use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize};

/// Host and port of the message server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub hostname: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }
}

/// Broker-neutral routing: an endpoint plus a routing key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericRouting {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub routing_key: String,
}

/// Routing for JMS style brokers, which authenticate per connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JmsRouting {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub routing_key: String,
    pub username: String,
    pub password: String,
}

impl Debug for JmsRouting {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("JmsRouting")
            .field("endpoint", &self.endpoint)
            .field("routing_key", &self.routing_key)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Routing for publishing to an AMQP exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmqpSenderRouting {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub virtual_host: String,
    pub exchange: String,
    pub routing_key: String,
}

/// Where an AMQP listener takes its messages from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerSource {
    /// Consume from a queue that already exists on the broker.
    Queue { queue_name: String },
    /// Let the broker create a queue and bind it to `exchange` using
    /// `routing_key`. The key format must match the exchange type.
    Binding {
        exchange: String,
        routing_key: String,
    },
}

/// Routing for consuming from an AMQP broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmqpListenerRouting {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub virtual_host: String,
    pub source: ListenerSource,
}

/// How to reach a channel, one case per broker protocol shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum RoutingInfo {
    Generic(GenericRouting),
    Jms(JmsRouting),
    AmqpSender(AmqpSenderRouting),
    AmqpListener(AmqpListenerRouting),
}

impl RoutingInfo {
    pub fn generic(
        hostname: impl Into<String>,
        port: u16,
        routing_key: impl Into<String>,
    ) -> Self {
        RoutingInfo::Generic(GenericRouting {
            endpoint: Endpoint::new(hostname, port),
            routing_key: routing_key.into(),
        })
    }

    pub fn jms(
        hostname: impl Into<String>,
        port: u16,
        routing_key: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        RoutingInfo::Jms(JmsRouting {
            endpoint: Endpoint::new(hostname, port),
            routing_key: routing_key.into(),
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn amqp_sender(
        hostname: impl Into<String>,
        port: u16,
        virtual_host: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        RoutingInfo::AmqpSender(AmqpSenderRouting {
            endpoint: Endpoint::new(hostname, port),
            virtual_host: virtual_host.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        })
    }

    /// Listener routing that connects to an existing queue.
    pub fn amqp_listener_for_queue(
        hostname: impl Into<String>,
        port: u16,
        virtual_host: impl Into<String>,
        queue_name: impl Into<String>,
    ) -> Self {
        RoutingInfo::AmqpListener(AmqpListenerRouting {
            endpoint: Endpoint::new(hostname, port),
            virtual_host: virtual_host.into(),
            source: ListenerSource::Queue {
                queue_name: queue_name.into(),
            },
        })
    }

    /// Listener routing whose queue and binding are created by the broker.
    pub fn amqp_listener_with_binding(
        hostname: impl Into<String>,
        port: u16,
        virtual_host: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        RoutingInfo::AmqpListener(AmqpListenerRouting {
            endpoint: Endpoint::new(hostname, port),
            virtual_host: virtual_host.into(),
            source: ListenerSource::Binding {
                exchange: exchange.into(),
                routing_key: routing_key.into(),
            },
        })
    }

    /// Tag used for this case in serialized form.
    pub fn protocol(&self) -> &'static str {
        match self {
            RoutingInfo::Generic(_) => "generic",
            RoutingInfo::Jms(_) => "jms",
            RoutingInfo::AmqpSender(_) => "amqp_sender",
            RoutingInfo::AmqpListener(_) => "amqp_listener",
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        match self {
            RoutingInfo::Generic(info) => &info.endpoint,
            RoutingInfo::Jms(info) => &info.endpoint,
            RoutingInfo::AmqpSender(info) => &info.endpoint,
            RoutingInfo::AmqpListener(info) => &info.endpoint,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.endpoint().hostname
    }

    pub fn port(&self) -> u16 {
        self.endpoint().port
    }

    pub fn virtual_host(&self) -> Option<&str> {
        match self {
            RoutingInfo::AmqpSender(info) => Some(&info.virtual_host),
            RoutingInfo::AmqpListener(info) => Some(&info.virtual_host),
            RoutingInfo::Generic(_) | RoutingInfo::Jms(_) => None,
        }
    }

    pub fn exchange(&self) -> Option<&str> {
        match self {
            RoutingInfo::AmqpSender(info) => Some(&info.exchange),
            RoutingInfo::AmqpListener(AmqpListenerRouting {
                source: ListenerSource::Binding { exchange, .. },
                ..
            }) => Some(exchange),
            _ => None,
        }
    }

    pub fn routing_key(&self) -> Option<&str> {
        match self {
            RoutingInfo::Generic(info) => Some(&info.routing_key),
            RoutingInfo::Jms(info) => Some(&info.routing_key),
            RoutingInfo::AmqpSender(info) => Some(&info.routing_key),
            RoutingInfo::AmqpListener(AmqpListenerRouting {
                source: ListenerSource::Binding { routing_key, .. },
                ..
            }) => Some(routing_key),
            RoutingInfo::AmqpListener(_) => None,
        }
    }

    pub fn queue_name(&self) -> Option<&str> {
        match self {
            RoutingInfo::AmqpListener(AmqpListenerRouting {
                source: ListenerSource::Queue { queue_name },
                ..
            }) => Some(queue_name),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            RoutingInfo::Jms(info) => Some(&info.username),
            _ => None,
        }
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            RoutingInfo::Jms(info) => Some(&info.password),
            _ => None,
        }
    }
}
