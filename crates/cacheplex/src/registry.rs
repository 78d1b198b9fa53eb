// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dispatch from (provider, options) type pairs to registered factories.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use cacheplex_provider::{Error, ProviderFactory, Result};

type Constructor = Box<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>> + Send + Sync>;

struct Registration {
    provider: &'static str,
    options: &'static str,
    construct: Constructor,
}

/// A table of provider constructors keyed by the provider type they build and the options
/// type they consume.
///
/// Registries are populated once through [`FactoryRegistry::builder`] and are immutable
/// afterwards, so a single registry can be shared freely between threads. Adding a backend
/// only requires registering its factory; callers keep asking for the provider type they
/// need.
///
/// # Examples
///
/// ```
/// use cacheplex::{FactoryRegistry, MemoryCacheProvider, MemoryProviderFactory, MemoryProviderOptions};
/// use tick::Clock;
///
/// let registry = FactoryRegistry::builder()
///     .register(MemoryProviderFactory::new(Clock::new_frozen()))
///     .build();
///
/// let provider: MemoryCacheProvider = registry.create(MemoryProviderOptions::new()).unwrap();
/// assert!(registry.contains::<MemoryCacheProvider, MemoryProviderOptions>());
/// assert!(registry.create::<MemoryCacheProvider, String>("other".to_string()).is_err());
/// # drop(provider);
/// ```
pub struct FactoryRegistry {
    factories: HashMap<(TypeId, TypeId), Registration>,
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.factories.values().map(|r| (r.provider, r.options)))
            .finish()
    }
}

impl FactoryRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> FactoryRegistryBuilder {
        FactoryRegistryBuilder::default()
    }

    /// Builds a `P` from `options` with the factory registered for `(P, O)`.
    ///
    /// # Errors
    ///
    /// Returns `NoFactoryRegistered` when nothing is registered for the pair, or whatever
    /// error the factory reports for the options.
    pub fn create<P: 'static, O: 'static>(&self, options: O) -> Result<P> {
        let Some(registration) = self.factories.get(&key::<P, O>()) else {
            tracing::debug!(
                cache.provider = type_name::<P>(),
                cache.options = type_name::<O>(),
                "no provider factory registered"
            );
            return Err(Error::no_factory_registered(type_name::<P>(), type_name::<O>()));
        };

        let built = (registration.construct)(Box::new(options))?;
        built
            .downcast::<P>()
            .map(|provider| *provider)
            .map_err(|_built| Error::no_factory_registered(type_name::<P>(), type_name::<O>()))
    }

    /// Returns whether a factory is registered for `(P, O)`.
    #[must_use]
    pub fn contains<P: 'static, O: 'static>(&self) -> bool {
        self.factories.contains_key(&key::<P, O>())
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` when no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Builder for [`FactoryRegistry`].
///
/// A later registration for the same (provider, options) pair replaces the earlier one.
#[derive(Default)]
pub struct FactoryRegistryBuilder {
    factories: HashMap<(TypeId, TypeId), Registration>,
}

impl fmt::Debug for FactoryRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistryBuilder")
            .field("registered", &self.factories.len())
            .finish()
    }
}

impl FactoryRegistryBuilder {
    /// Registers a [`ProviderFactory`] for its provider and options types.
    #[must_use]
    pub fn register<F>(self, factory: F) -> Self
    where
        F: ProviderFactory + 'static,
        F::Provider: 'static,
        F::Options: 'static,
    {
        self.register_fn(move |options: F::Options| factory.create(options))
    }

    /// Registers a constructor closure building a `P` from an `O`.
    ///
    /// The closure may produce any type, including boxed or wrapped providers such as
    /// [`Instrumented`][crate::Instrumented], so a capability can be registered without a
    /// dedicated factory type.
    ///
    /// # Examples
    ///
    /// ```
    /// use cacheplex::{Error, FactoryRegistry, Result};
    ///
    /// #[derive(Debug)]
    /// struct Shard(u8);
    ///
    /// let registry = FactoryRegistry::builder()
    ///     .register_fn(|index: u8| -> Result<Shard> {
    ///         if index < 4 { Ok(Shard(index)) } else { Err(Error::invalid_configuration("no such shard")) }
    ///     })
    ///     .build();
    ///
    /// assert_eq!(registry.create::<Shard, u8>(2).unwrap().0, 2);
    /// assert!(registry.create::<Shard, u8>(9).is_err());
    /// ```
    #[must_use]
    pub fn register_fn<P, O, F>(mut self, construct: F) -> Self
    where
        P: 'static,
        O: 'static,
        F: Fn(O) -> Result<P> + Send + Sync + 'static,
    {
        let registration = Registration {
            provider: type_name::<P>(),
            options: type_name::<O>(),
            construct: Box::new(move |options: Box<dyn Any>| {
                let options = options
                    .downcast::<O>()
                    .map_err(|_options| Error::no_factory_registered(type_name::<P>(), type_name::<O>()))?;
                let provider: Box<dyn Any> = Box::new(construct(*options)?);
                Ok(provider)
            }),
        };

        if self.factories.insert(key::<P, O>(), registration).is_some() {
            tracing::info!(
                cache.provider = type_name::<P>(),
                cache.options = type_name::<O>(),
                "provider factory replaced"
            );
        } else {
            tracing::debug!(
                cache.provider = type_name::<P>(),
                cache.options = type_name::<O>(),
                "provider factory registered"
            );
        }
        self
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> FactoryRegistry {
        FactoryRegistry {
            factories: self.factories,
        }
    }
}

fn key<P: 'static, O: 'static>() -> (TypeId, TypeId) {
    (TypeId::of::<P>(), TypeId::of::<O>())
}
