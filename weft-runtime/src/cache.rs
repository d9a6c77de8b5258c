//! Memoization of a wrapped primitive's results.
//!
//! Entries expire by TTL and are evicted least-recently-used once the store
//! exceeds `max_size`, whichever triggers first. The store is internally
//! synchronized, but concurrent misses for the same key are NOT de-duplicated:
//! both callers execute the wrapped primitive and the later completion
//! overwrites the earlier one. This is a documented property of the design,
//! not an oversight — callers needing single-flight semantics must provide
//! it themselves.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use weft_core::prelude::*;

/// Function deriving the cache key from the input and context.
pub type KeyFn<I> = Arc<dyn Fn(&I, &ExecutionContext) -> String + Send + Sync>;

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Internally synchronized TTL + LRU store.
struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Keys from least to most recently used.
    order: VecDeque<String>,
    max_size: usize,
}

impl<V: Clone> CacheStore<V> {
    fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.order.retain(|k| k != key);
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.order.retain(|k| k != key);
                self.order.push_back(key.to_string());
                Some(value)
            }
            None => None,
        }
    }

    fn insert(&mut self, key: String, value: V, ttl: Duration) {
        if self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        )
        .is_some()
        {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key);

        while self.entries.len() > self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Memoizes the wrapped primitive's results by caller-supplied key.
///
/// On a hit the wrapped primitive is not invoked at all (so no child span is
/// recorded) and the span carries `cache.hit = true`. On a miss the wrapped
/// primitive executes and its result is stored.
pub struct Cache<P: Primitive>
where
    P::Output: Clone,
{
    inner: P,
    key_fn: KeyFn<P::Input>,
    ttl: Duration,
    store: Mutex<CacheStore<P::Output>>,
}

impl<P> Cache<P>
where
    P: Primitive,
    P::Output: Clone,
{
    /// Wrap a primitive with a cache.
    pub fn new<F>(inner: P, key_fn: F, ttl: Duration, max_size: usize) -> Self
    where
        F: Fn(&P::Input, &ExecutionContext) -> String + Send + Sync + 'static,
    {
        Self {
            inner,
            key_fn: Arc::new(key_fn),
            ttl,
            store: Mutex::new(CacheStore::new(max_size.max(1))),
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.store.lock().len()
    }
}

impl<P> Primitive for Cache<P>
where
    P: Primitive,
    P::Output: Clone,
{
    type Input = P::Input;
    type Output = P::Output;

    fn info(&self) -> PrimitiveInfo {
        PrimitiveInfo::new(format!("cache:{}", self.inner.info().name), "cache")
    }

    fn execute<'a>(
        &'a self,
        input: Self::Input,
        ctx: ExecutionContext,
    ) -> PrimitiveFuture<'a, Self::Output> {
        Box::pin(async move {
            let key = (self.key_fn)(&input, &ctx);
            ctx.record_attribute("cache.key", key.clone());

            if let Some(value) = self.store.lock().get(&key) {
                ctx.record_attribute("cache.hit", true);
                return Ok(value);
            }
            ctx.record_attribute("cache.hit", false);

            // The lock is not held across the await: concurrent misses for
            // the same key each execute the wrapped primitive.
            let output = self.inner.execute(input, ctx.clone()).await?;
            self.store.lock().insert(key, output.clone(), self.ttl);

            Ok(output)
        })
    }
}
