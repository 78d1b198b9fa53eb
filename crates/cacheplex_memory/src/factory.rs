// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Factory for in-memory providers.

use cacheplex_provider::{ProviderFactory, Result};
use tick::Clock;

use crate::{MemoryCacheProvider, MemoryProviderOptions};

/// Builds [`MemoryCacheProvider`]s from [`MemoryProviderOptions`].
///
/// Every created provider owns a fresh table; providers built from the same factory
/// share nothing but the clock.
///
/// # Examples
///
/// ```
/// use cacheplex_memory::{MemoryProviderFactory, MemoryProviderOptions};
/// use cacheplex_provider::ProviderFactory;
/// use tick::Clock;
///
/// let factory = MemoryProviderFactory::new(Clock::new_frozen());
/// let provider = factory.create(MemoryProviderOptions::new().name("sessions")).unwrap();
/// assert_eq!(provider.name(), Some("sessions"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryProviderFactory {
    clock: Clock,
}

impl MemoryProviderFactory {
    /// Creates a factory whose providers resolve absolute expirations with `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }
}

impl ProviderFactory for MemoryProviderFactory {
    type Provider = MemoryCacheProvider;
    type Options = MemoryProviderOptions;

    fn create(&self, options: MemoryProviderOptions) -> Result<MemoryCacheProvider> {
        MemoryCacheProvider::new(&options, self.clock.clone())
    }
}
