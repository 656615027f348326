//! Cache configuration and builder.
//!
//! ## Example
//!
//! ```rust
//! use opaque_cache::builder::CacheBuilder;
//! use opaque_cache::callbacks::CallbackTable;
//!
//! let cache = CacheBuilder::new("decl-types")
//!     .initial_capacity(256)
//!     .build(CallbackTable::<u32, String>::new(|k| u64::from(*k), |a, b| a == b));
//! cache.set(1, "Int".to_string()).unwrap();
//! assert_eq!(cache.get_cloned(&1).unwrap().as_deref(), Some("Int"));
//! ```

use std::hash::Hash;

use crate::cache::Cache;
use crate::callbacks::DefaultCallbacks;
use crate::error::ConfigError;
use crate::traits::CacheCallbacks;

/// Plain configuration consumed by [`Cache::with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Diagnostic name; shows up in tracing fields and error messages.
    pub name: String,
    /// Number of distinct hashes to pre-size the table for.
    pub initial_capacity: usize,
}

impl CacheConfig {
    /// Configuration with the given name and no pre-sizing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_capacity: 0,
        }
    }

    /// Checks the configuration for values a caller most likely did not mean.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::new("cache name must not be empty"));
        }
        Ok(())
    }
}

/// Builder for creating cache instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Create a new builder for a cache called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: CacheConfig::new(name),
        }
    }

    /// Pre-size the table for `capacity` distinct hashes.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Build a cache bound to `callbacks` without validation.
    pub fn build<K, V, C>(self, callbacks: C) -> Cache<K, V, C>
    where
        C: CacheCallbacks<K, V>,
    {
        Cache::with_config(self.config, callbacks)
    }

    /// Validate the configuration, then build a cache bound to `callbacks`.
    pub fn try_build<K, V, C>(self, callbacks: C) -> Result<Cache<K, V, C>, ConfigError>
    where
        C: CacheCallbacks<K, V>,
    {
        self.config.validate()?;
        Ok(self.build(callbacks))
    }

    /// Build a cache keyed by `K`'s own `Hash` and `Eq`.
    pub fn build_default<K, V>(self) -> Cache<K, V>
    where
        K: Hash + Eq,
    {
        self.build(DefaultCallbacks::new())
    }

    /// Validate, then build a cache keyed by `K`'s own `Hash` and `Eq`.
    pub fn try_build_default<K, V>(self) -> Result<Cache<K, V>, ConfigError>
    where
        K: Hash + Eq,
    {
        self.try_build(DefaultCallbacks::new())
    }
}
