// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Factory for grid providers.

use std::sync::Arc;

use anyspawn::Spawner;
use cacheplex_provider::{Error, ProviderFactory, Result};
use tick::Clock;

use crate::{GridCacheProvider, GridConnector, GridProviderOptions};

/// Builds [`GridCacheProvider`]s by opening named caches through a [`GridConnector`].
///
/// Each call to `create` opens the cache named by the options with the options'
/// connection settings and applies their lock timing.
#[derive(Debug, Clone)]
pub struct GridProviderFactory<K> {
    connector: K,
    clock: Clock,
    spawner: Spawner,
}

impl<K: GridConnector> GridProviderFactory<K> {
    /// Creates a factory opening caches through `connector`.
    ///
    /// Lock handles of the providers it builds are released in the background on `spawner`
    /// when dropped without an explicit release.
    #[must_use]
    pub fn new(connector: K, clock: Clock, spawner: Spawner) -> Self {
        Self { connector, clock, spawner }
    }

    /// Returns the connector.
    #[must_use]
    pub fn connector(&self) -> &K {
        &self.connector
    }
}

impl<K: GridConnector> ProviderFactory for GridProviderFactory<K> {
    type Provider = GridCacheProvider<K::Client>;
    type Options = GridProviderOptions;

    fn create(&self, options: GridProviderOptions) -> Result<GridCacheProvider<K::Client>> {
        let cache_name = options.validate()?;

        let client = self
            .connector
            .connect(cache_name, options.connection_settings())
            .map_err(|e| Error::backend(format!("opening cache '{cache_name}'"), e))?;

        tracing::debug!(cache.name = cache_name, "grid cache opened");

        Ok(GridCacheProvider::new(Arc::new(client), self.clock.clone(), self.spawner.clone())
            .with_default_lock_wait(options.lock_wait_or_default())
            .with_lock_lease(options.lock_lease_or_default()))
    }
}
