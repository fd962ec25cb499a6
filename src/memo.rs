//! Memoization Module
//!
//! Wraps an async unit of work with a cache: derive a key from the
//! arguments, return the cached result on a hit, run and store on a miss.
//!
//! # Fallback
//! If any step fails (key derivation, cache read, the work itself, or the
//! cache write), the error is passed to [`MemoHooks::on_error`] and the work
//! is run once more without the cache. An error from that second run is
//! returned to the caller. A failing unit of work therefore runs twice.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::LruCache;
use crate::error::{CacheError, Result};
use crate::storage::Storage;

// == Memo Cache ==
/// The narrow cache capability the adapter needs.
#[async_trait]
pub trait MemoCache<V>: Send {
    async fn get(&mut self, key: &str) -> Result<Option<V>>;
    async fn set(&mut self, key: &str, value: V) -> Result<()>;
}

#[async_trait]
impl<V, S> MemoCache<V> for LruCache<V, S>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Storage + Clone + 'static,
{
    async fn get(&mut self, key: &str) -> Result<Option<V>> {
        LruCache::get(self, key).await
    }

    async fn set(&mut self, key: &str, value: V) -> Result<()> {
        LruCache::set(self, key, value).await
    }
}

// == Hooks ==
/// Observation points around each memoized call. All default to no-ops.
pub trait MemoHooks<A>: Send + Sync {
    fn on_cache_hit(&self, _args: &A) {}
    fn on_cache_miss(&self, _args: &A) {}
    fn on_error(&self, _err: &anyhow::Error, _args: &A) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl<A> MemoHooks<A> for NoopHooks {}

/// Hooks that log through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHooks;

impl<A: std::fmt::Debug> MemoHooks<A> for TracingHooks {
    fn on_cache_hit(&self, args: &A) {
        debug!(?args, "memo cache hit");
    }

    fn on_cache_miss(&self, args: &A) {
        debug!(?args, "memo cache miss");
    }

    fn on_error(&self, err: &anyhow::Error, args: &A) {
        warn!(?args, error = %err, "memoized call failed, running uncached");
    }
}

/// Derives a cache key from call arguments.
pub type KeyResolver<A> = Box<dyn Fn(&A) -> anyhow::Result<String> + Send + Sync>;

// == Key Hashing ==
/// Lowercase hex SHA-256 of the JSON encoding of `args`.
pub fn hash_args<A: Serialize + ?Sized>(args: &A) -> Result<String> {
    let encoded = serde_json::to_vec(args)?;
    Ok(format!("{:x}", Sha256::digest(&encoded)))
}

// == Builder ==
/// Assembles a [`Memoized`] call.
pub struct MemoizeBuilder<A, R, F, C> {
    func: F,
    key_resolver: Option<KeyResolver<A>>,
    cache: Option<C>,
    hooks: Arc<dyn MemoHooks<A>>,
    _result: PhantomData<fn() -> R>,
}

impl<A, R, F, Fut, C> MemoizeBuilder<A, R, F, C>
where
    A: Serialize + 'static,
    F: Fn(&A) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
    C: MemoCache<R>,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            key_resolver: None,
            cache: None,
            hooks: Arc::new(NoopHooks),
            _result: PhantomData,
        }
    }

    /// Replaces argument hashing with a custom key function.
    pub fn key_resolver(
        mut self,
        resolver: impl Fn(&A) -> anyhow::Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.key_resolver = Some(Box::new(resolver));
        self
    }

    pub fn cache(mut self, cache: C) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn hooks(mut self, hooks: impl MemoHooks<A> + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Fails with `InvalidConfiguration` when no cache was supplied.
    pub fn build(self) -> Result<Memoized<A, R, F, C>> {
        let cache = self.cache.ok_or_else(|| {
            CacheError::InvalidConfiguration("memoization requires a cache".to_string())
        })?;
        Ok(Memoized {
            func: self.func,
            key_resolver: self.key_resolver,
            cache: Mutex::new(cache),
            hooks: self.hooks,
            _result: PhantomData,
        })
    }
}

// == Memoized ==
/// A unit of work fronted by a cache.
pub struct Memoized<A, R, F, C> {
    func: F,
    key_resolver: Option<KeyResolver<A>>,
    cache: Mutex<C>,
    hooks: Arc<dyn MemoHooks<A>>,
    _result: PhantomData<fn() -> R>,
}

impl<A, R, F, Fut, C> Memoized<A, R, F, C>
where
    A: Serialize,
    R: Clone,
    F: Fn(&A) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
    C: MemoCache<R>,
{
    /// Returns the cached result for `args`, or runs the work and caches it.
    pub async fn call(&self, args: A) -> anyhow::Result<R> {
        match self.call_cached(&args).await {
            Ok(result) => Ok(result),
            Err(err) => {
                self.hooks.on_error(&err, &args);
                (self.func)(&args).await
            }
        }
    }

    /// Key that `args` is cached under.
    pub fn key_for(&self, args: &A) -> anyhow::Result<String> {
        match &self.key_resolver {
            Some(resolver) => resolver(args),
            None => Ok(hash_args(args)?),
        }
    }

    /// Gives direct access to the underlying cache.
    pub async fn with_cache<T>(&self, f: impl FnOnce(&mut C) -> T) -> T {
        let mut cache = self.cache.lock().await;
        f(&mut *cache)
    }

    async fn call_cached(&self, args: &A) -> anyhow::Result<R> {
        let key = self.key_for(args)?;

        let cached = self.cache.lock().await.get(&key).await?;
        if let Some(result) = cached {
            self.hooks.on_cache_hit(args);
            return Ok(result);
        }

        self.hooks.on_cache_miss(args);
        let result = (self.func)(args).await?;
        self.cache.lock().await.set(&key, result.clone()).await?;
        Ok(result)
    }
}
