// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Factory for remote key-value providers.

use std::sync::Arc;

use cacheplex_provider::factory::ensure_identity;
use cacheplex_provider::{ProviderFactory, Result, validate};
use tick::Clock;

use crate::{KeyValueClient, RedisCacheProvider, RedisProviderOptions};

/// Builds [`RedisCacheProvider`]s over one already-connected client.
///
/// Options must name the endpoint the client is connected to; options naming another
/// server are rejected rather than silently served by the wrong one.
#[derive(Debug)]
pub struct RedisProviderFactory<C> {
    client: Arc<C>,
    clock: Clock,
}

impl<C> Clone for RedisProviderFactory<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            clock: self.clock.clone(),
        }
    }
}

impl<C: KeyValueClient> RedisProviderFactory<C> {
    /// Creates a factory bound to `client`.
    #[must_use]
    pub fn new(client: Arc<C>, clock: Clock) -> Self {
        Self { client, clock }
    }
}

impl<C: KeyValueClient> ProviderFactory for RedisProviderFactory<C> {
    type Provider = RedisCacheProvider<C>;
    type Options = RedisProviderOptions;

    fn create(&self, options: RedisProviderOptions) -> Result<RedisCacheProvider<C>> {
        let endpoint = validate::required_option("endpoint", options.endpoint.as_deref())?;
        ensure_identity(self.client.endpoint(), endpoint)?;

        let provider = RedisCacheProvider::new(Arc::clone(&self.client), self.clock.clone());
        Ok(match options.key_prefix {
            Some(prefix) => provider.with_key_prefix(prefix),
            None => provider,
        })
    }
}
