use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::ChannelCatalog;
use crate::errors::{InitializationError, ProviderError};
use crate::registry::FactoryRegistry;
use crate::routing::RoutingInfo;
use crate::starter::{MessagingModuleStarter, ModuleStarter};
use crate::traits::{SharedFactory, SharedListener, SharedSender};

static MESSAGING_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Identifier of this process towards the messaging system. Generated on
/// first use and never changed afterwards.
pub fn messaging_id() -> &'static str {
    MESSAGING_ID.as_str()
}

/// Entry point for obtaining senders and listeners.
///
/// Build one per process at start-up and share it by reference or `Arc`.
/// The factory is discovered on first use from the registry handed to
/// [`MessagingProvider::new`]; concurrent first callers wait on the same
/// discovery and all observe the factory it produced.
///
/// Discovery holds the provider's lock while registry constructors and the
/// starter run, so neither may call back into the same provider; doing so
/// deadlocks.
pub struct MessagingProvider {
    registry: FactoryRegistry,
    starter: Arc<dyn ModuleStarter>,
    factory: Mutex<Option<SharedFactory>>,
}

impl MessagingProvider {
    pub fn new(registry: FactoryRegistry) -> Self {
        Self {
            registry,
            starter: Arc::new(MessagingModuleStarter::new()),
            factory: Mutex::new(None),
        }
    }

    /// Replaces the policy used to choose among registered factories.
    pub fn with_starter(mut self, starter: Arc<dyn ModuleStarter>) -> Self {
        self.starter = starter;
        self
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Returns a new sender for the topic described by `routing`.
    pub fn topic_message_sender(
        &self,
        routing: Arc<RoutingInfo>,
    ) -> Result<SharedSender, ProviderError> {
        let factory = self.ensure_messaging_factory()?;
        Ok(factory.factor_topic_message_sender(routing)?)
    }

    /// Returns a new listener for the topic described by `routing`. `None`
    /// is passed to the factory as is.
    pub fn topic_message_listener(
        &self,
        routing: Option<Arc<RoutingInfo>>,
    ) -> Result<SharedListener, ProviderError> {
        let factory = self.ensure_messaging_factory()?;
        Ok(factory.factor_topic_message_listener(routing)?)
    }

    /// Sender for a channel configured in `catalog`.
    pub fn channel_sender(
        &self,
        catalog: &ChannelCatalog,
        channel: &str,
    ) -> Result<SharedSender, ProviderError> {
        let routing = catalog
            .get(channel)
            .ok_or_else(|| ProviderError::UnknownChannel(channel.to_string()))?;
        self.topic_message_sender(routing)
    }

    /// Listener for a channel configured in `catalog`.
    pub fn channel_listener(
        &self,
        catalog: &ChannelCatalog,
        channel: &str,
    ) -> Result<SharedListener, ProviderError> {
        let routing = catalog
            .get(channel)
            .ok_or_else(|| ProviderError::UnknownChannel(channel.to_string()))?;
        self.topic_message_listener(Some(routing))
    }

    pub fn messaging_id(&self) -> &'static str {
        messaging_id()
    }

    /// Installs `factory` without running discovery, or clears the current
    /// one so the next request discovers again. Meant for tests of code that
    /// sends or listens; production processes register a bridge instead.
    pub fn set_messaging_factory(&self, factory: Option<SharedFactory>) {
        *self.slot() = factory;
    }

    pub fn is_started(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<SharedFactory>> {
        self.factory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(level = "debug", skip(self))]
    fn ensure_messaging_factory(&self) -> Result<SharedFactory, InitializationError> {
        let mut slot = self.slot();
        if let Some(factory) = slot.as_ref() {
            return Ok(factory.clone());
        }

        info!("MessagingProvider starting...");
        let factory = self
            .starter
            .start_using_factory_implementations(&mut self.registry.candidates())?;
        *slot = Some(factory.clone());
        info!("MessagingProvider started");
        Ok(factory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MessagingError;
    use crate::memory::InMemoryMessagingFactory;
    use crate::traits::MessagingFactory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use tracing_test::traced_test;

    /// Records the last routing it was given and the handles it returned.
    #[derive(Default)]
    struct MessagingFactorySpy {
        inner: InMemoryMessagingFactory,
        routing: Mutex<Option<Option<Arc<RoutingInfo>>>>,
        sender: Mutex<Option<SharedSender>>,
        listener: Mutex<Option<SharedListener>>,
    }

    impl MessagingFactory for MessagingFactorySpy {
        fn factor_topic_message_sender(
            &self,
            routing: Arc<RoutingInfo>,
        ) -> Result<SharedSender, MessagingError> {
            *self.routing.lock().unwrap() = Some(Some(routing.clone()));
            let sender = self.inner.factor_topic_message_sender(routing)?;
            *self.sender.lock().unwrap() = Some(sender.clone());
            Ok(sender)
        }

        fn factor_topic_message_listener(
            &self,
            routing: Option<Arc<RoutingInfo>>,
        ) -> Result<SharedListener, MessagingError> {
            *self.routing.lock().unwrap() = Some(routing.clone());
            let listener = self.inner.factor_topic_message_listener(routing)?;
            *self.listener.lock().unwrap() = Some(listener.clone());
            Ok(listener)
        }
    }

    /// Counts calls and returns the same factory every time.
    struct ModuleStarterSpy {
        calls: AtomicUsize,
        factory: SharedFactory,
    }

    impl ModuleStarterSpy {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                factory: Arc::new(InMemoryMessagingFactory::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ModuleStarter for ModuleStarterSpy {
        fn start_using_factory_implementations(
            &self,
            _candidates: &mut dyn Iterator<Item = SharedFactory>,
        ) -> Result<SharedFactory, InitializationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.factory.clone())
        }
    }

    /// Fails until `fail_times` calls have been made.
    struct FlakyStarter {
        calls: AtomicUsize,
        fail_times: usize,
    }

    impl ModuleStarter for FlakyStarter {
        fn start_using_factory_implementations(
            &self,
            _candidates: &mut dyn Iterator<Item = SharedFactory>,
        ) -> Result<SharedFactory, InitializationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_times {
                return Err(InitializationError::NoImplementation);
            }
            Ok(Arc::new(InMemoryMessagingFactory::new()))
        }
    }

    fn routing() -> Arc<RoutingInfo> {
        Arc::new(RoutingInfo::generic(
            "messaging.alvin-portal.org",
            5672,
            "alvin",
        ))
    }

    fn provider_with_spy_starter() -> (MessagingProvider, Arc<ModuleStarterSpy>) {
        let starter = Arc::new(ModuleStarterSpy::new());
        let provider =
            MessagingProvider::new(FactoryRegistry::new()).with_starter(starter.clone());
        (provider, starter)
    }

    #[test]
    fn overridden_factory_receives_routing_by_identity() {
        let provider = MessagingProvider::new(FactoryRegistry::new());
        let spy = Arc::new(MessagingFactorySpy::default());
        provider.set_messaging_factory(Some(spy.clone()));
        let routing = routing();

        let sender = provider.topic_message_sender(routing.clone()).unwrap();

        let seen = spy.routing.lock().unwrap().clone().flatten().unwrap();
        assert!(Arc::ptr_eq(&seen, &routing));
        let produced = spy.sender.lock().unwrap().clone().unwrap();
        assert!(Arc::ptr_eq(&sender, &produced));
    }

    #[test]
    fn listener_uses_routing_from_caller() {
        let provider = MessagingProvider::new(FactoryRegistry::new());
        let spy = Arc::new(MessagingFactorySpy::default());
        provider.set_messaging_factory(Some(spy.clone()));
        let routing = Arc::new(RoutingInfo::jms(
            "tcp://dev-diva-drafts",
            61617,
            "fedora.apim.*",
            "admin",
            "admin",
        ));

        let listener = provider
            .topic_message_listener(Some(routing.clone()))
            .unwrap();

        let seen = spy.routing.lock().unwrap().clone().flatten().unwrap();
        assert!(Arc::ptr_eq(&seen, &routing));
        assert_eq!(seen.username(), Some("admin"));
        let produced = spy.listener.lock().unwrap().clone().unwrap();
        assert!(Arc::ptr_eq(&listener, &produced));
    }

    #[test]
    fn listener_without_routing_is_delegated() {
        let provider = MessagingProvider::new(FactoryRegistry::new());
        let spy = Arc::new(MessagingFactorySpy::default());
        provider.set_messaging_factory(Some(spy.clone()));

        provider.topic_message_listener(None).unwrap();

        assert_eq!(spy.routing.lock().unwrap().clone(), Some(None));
    }

    #[test]
    fn first_request_runs_starter_once() {
        let (provider, starter) = provider_with_spy_starter();
        assert!(!provider.is_started());

        provider.topic_message_sender(routing()).unwrap();
        provider.topic_message_listener(None).unwrap();

        assert_eq!(starter.calls(), 1);
        assert!(provider.is_started());
    }

    #[test]
    #[traced_test]
    fn start_is_logged() {
        let (provider, _starter) = provider_with_spy_starter();

        provider.topic_message_listener(Some(routing())).unwrap();

        logs_assert(|lines: &[&str]| {
            let starting = lines
                .iter()
                .position(|line| line.contains("MessagingProvider starting..."));
            let started = lines
                .iter()
                .position(|line| line.contains("MessagingProvider started"));
            match (starting, started) {
                (Some(a), Some(b)) if a < b => Ok(()),
                _ => Err(format!("missing start log lines: {lines:?}")),
            }
        });
    }

    #[test]
    fn default_starter_reports_missing_implementation() {
        let provider = MessagingProvider::new(FactoryRegistry::new());

        let err = provider.topic_message_sender(routing()).unwrap_err();

        assert_eq!(
            err.as_initialization(),
            Some(InitializationError::NoImplementation)
        );
        assert_eq!(err.to_string(), "No implementations found for MessagingFactory");
        assert!(!provider.is_started());
    }

    #[test]
    fn default_starter_reports_ambiguous_implementations() {
        let registry = FactoryRegistry::new()
            .with("amqp", || Arc::new(InMemoryMessagingFactory::new()))
            .unwrap()
            .with("jms", || Arc::new(InMemoryMessagingFactory::new()))
            .unwrap();
        let provider = MessagingProvider::new(registry);

        let err = provider.topic_message_listener(None).unwrap_err();

        assert_eq!(
            err.as_initialization(),
            Some(InitializationError::AmbiguousImplementation)
        );
    }

    #[test]
    fn failed_discovery_is_retried() {
        let starter = Arc::new(FlakyStarter {
            calls: AtomicUsize::new(0),
            fail_times: 2,
        });
        let provider =
            MessagingProvider::new(FactoryRegistry::new()).with_starter(starter.clone());

        assert!(provider.topic_message_sender(routing()).is_err());
        assert!(provider.topic_message_sender(routing()).is_err());
        assert!(provider.topic_message_sender(routing()).is_ok());
        assert!(provider.topic_message_sender(routing()).is_ok());

        assert_eq!(starter.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn clearing_the_factory_forces_rediscovery() {
        let (provider, starter) = provider_with_spy_starter();
        provider.set_messaging_factory(Some(Arc::new(InMemoryMessagingFactory::new())));

        provider.topic_message_sender(routing()).unwrap();
        assert_eq!(starter.calls(), 0);

        provider.set_messaging_factory(None);
        provider.topic_message_sender(routing()).unwrap();
        assert_eq!(starter.calls(), 1);
    }

    #[test]
    fn concurrent_first_use_discovers_once() {
        const THREADS: usize = 16;
        let shared = Arc::new(InMemoryMessagingFactory::new());
        let discovered = Arc::new(AtomicUsize::new(0));
        let registry = {
            let shared = shared.clone();
            let discovered = discovered.clone();
            FactoryRegistry::new()
                .with("memory", move || {
                    discovered.fetch_add(1, Ordering::SeqCst);
                    shared.clone()
                })
                .unwrap()
        };
        let provider = MessagingProvider::new(registry);
        let barrier = Barrier::new(THREADS);

        thread::scope(|scope| {
            for _ in 0..THREADS {
                scope.spawn(|| {
                    barrier.wait();
                    provider.topic_message_sender(routing()).unwrap();
                });
            }
        });

        assert_eq!(discovered.load(Ordering::SeqCst), 1);
        assert_eq!(shared.senders().len(), THREADS);
        let resolved = provider.ensure_messaging_factory().unwrap();
        let expected: SharedFactory = shared;
        assert!(Arc::ptr_eq(&resolved, &expected));
    }

    #[test]
    fn messaging_id_is_stable() {
        let first = MessagingProvider::new(FactoryRegistry::new());
        let second = MessagingProvider::new(FactoryRegistry::new());

        let id = first.messaging_id();
        assert!(!id.is_empty());
        assert_eq!(first.messaging_id(), id);
        assert_eq!(second.messaging_id(), id);
        assert_eq!(messaging_id(), id);
        assert!(Uuid::parse_str(id).is_ok());
    }
}
