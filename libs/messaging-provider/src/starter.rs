use tracing::{error, info};

use crate::errors::InitializationError;
use crate::traits::SharedFactory;

/// Picks the factory the provider will use from the available candidates.
pub trait ModuleStarter: Send + Sync {
    fn start_using_factory_implementations(
        &self,
        candidates: &mut dyn Iterator<Item = SharedFactory>,
    ) -> Result<SharedFactory, InitializationError>;
}

/// Accepts exactly one candidate; none or several is a deployment error.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessagingModuleStarter;

impl MessagingModuleStarter {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleStarter for MessagingModuleStarter {
    fn start_using_factory_implementations(
        &self,
        candidates: &mut dyn Iterator<Item = SharedFactory>,
    ) -> Result<SharedFactory, InitializationError> {
        let mut found = None;
        let mut count = 0usize;
        for candidate in candidates {
            count += 1;
            info!(
                "{} found as implementation for MessagingFactory",
                candidate.implementation_name()
            );
            found = Some(candidate);
        }

        match (count, found) {
            (1, Some(factory)) => Ok(factory),
            (0, _) => Err(fatal(InitializationError::NoImplementation)),
            _ => Err(fatal(InitializationError::AmbiguousImplementation)),
        }
    }
}

fn fatal(err: InitializationError) -> InitializationError {
    error!("{err}");
    err
}
