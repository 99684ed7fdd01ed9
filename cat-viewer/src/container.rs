use crate::types::{ContainerError, Result};
use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

// Each instance is an `Arc<T>` boxed as `Any`, which lets trait objects
// (`Arc<dyn CatService>`) be stored and handed back out.
type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn(&ServiceContainer) -> Result<Instance> + Send + Sync>;

/// Named, lazily built singletons.
///
/// Factories receive the container so they can resolve their own
/// dependencies; each factory runs at most once per successful build.
#[derive(Default)]
pub struct ServiceContainer {
    factories: HashMap<String, Factory>,
    instances: Mutex<HashMap<String, Instance>>,
    resolving: Mutex<HashSet<String>>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T, F>(&mut self, key: &str, factory: F) -> Result<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceContainer) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        if self.factories.contains_key(key) {
            return Err(ContainerError::AlreadyRegistered { key: key.to_string() }.into());
        }

        let factory: Factory = Box::new(move |container| {
            let service = factory(container)?;
            Ok(Arc::new(service) as Instance)
        });
        self.factories.insert(key.to_string(), factory);
        debug!("Registered service {}", key);
        Ok(())
    }

    pub fn get<T>(&self, key: &str) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let cached = lock(&self.instances).get(key).cloned();
        let instance = match cached {
            Some(instance) => instance,
            None => self.build(key)?,
        };

        instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| {
                ContainerError::TypeMismatch {
                    key: key.to_string(),
                    expected: type_name::<T>(),
                }
                .into()
            })
    }

    pub fn has(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    fn build(&self, key: &str) -> Result<Instance> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| ContainerError::Missing { key: key.to_string() })?;

        if !lock(&self.resolving).insert(key.to_string()) {
            return Err(ContainerError::Cycle { key: key.to_string() }.into());
        }

        // No lock is held while the factory runs; it may call back into `get`.
        let built = factory(self);
        lock(&self.resolving).remove(key);
        let instance = built?;

        debug!("Built service {}", key);
        let mut instances = lock(&self.instances);
        Ok(instances.entry(key.to_string()).or_insert(instance).clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
