use std::sync::Arc;

use crate::traits::SharedFactory;

type FactoryConstructor = Arc<dyn Fn() -> SharedFactory + Send + Sync>;

struct FactoryEntry {
    name: String,
    constructor: FactoryConstructor,
}

/// Factory implementations made available to the process at start-up.
///
/// Broker bridge crates register a constructor here; discovery asks the
/// registry for fresh candidates every time it runs.
#[derive(Default)]
pub struct FactoryRegistry {
    entries: Vec<FactoryEntry>,
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("messaging factory `{0}` already registered")]
    AlreadyRegistered(String),
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `constructor` runs during provider discovery, with the provider
    /// locked; it must not use the provider it is registered with.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        constructor: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> SharedFactory + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.entries.push(FactoryEntry {
            name,
            constructor: Arc::new(constructor),
        });
        Ok(())
    }

    /// Builder-style variant of [`FactoryRegistry::register`].
    pub fn with<F>(
        mut self,
        name: impl Into<String>,
        constructor: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn() -> SharedFactory + Send + Sync + 'static,
    {
        self.register(name, constructor)?;
        Ok(self)
    }

    /// Constructs one candidate per registered entry, in registration order.
    pub fn candidates(&self) -> impl Iterator<Item = SharedFactory> + '_ {
        self.entries.iter().map(|entry| (entry.constructor)())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
