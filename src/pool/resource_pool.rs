// ABOUTME: Reuse pool for expensive, not-thread-safe helper objects.
// ABOUTME: Instances move out on acquire and back on guard drop, so none is ever shared.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::error::PoolError;

/// Builds one pooled instance. Failures propagate to the caller of `acquire`.
type Factory<T> = Box<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

/// A pool of fungible instances produced by a single factory.
///
/// `acquire` never blocks: it pops an idle instance or builds a new one. The
/// pool grows with demand and has no upper bound on live instances; `max_idle`
/// only caps how many are kept around after release.
///
/// Exclusivity comes from ownership. An instance lives either in the idle set
/// or inside exactly one [`PoolGuard`], never both.
pub struct ResourcePool<T> {
    idle: Mutex<Vec<T>>,
    factory: Factory<T>,
    max_idle: Option<usize>,
    created: AtomicUsize,
    in_use: AtomicUsize,
}

impl<T> ResourcePool<T> {
    /// Create a pool with one warm instance.
    pub fn new<F>(factory: F) -> Result<Self, PoolError>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::with_config(factory, &PoolConfig::default())
    }

    /// Create a pool, constructing `warm_instances` instances up front.
    pub fn with_config<F>(factory: F, config: &PoolConfig) -> Result<Self, PoolError>
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        config
            .validate()
            .map_err(|e| PoolError::InvalidConfig(e.to_string()))?;

        let pool = Self {
            idle: Mutex::new(Vec::with_capacity(config.warm_instances)),
            factory: Box::new(factory),
            max_idle: config.max_idle,
            created: AtomicUsize::new(0),
            in_use: AtomicUsize::new(0),
        };

        for _ in 0..config.warm_instances {
            let item = pool.construct()?;
            pool.idle.lock().push(item);
        }

        Ok(pool)
    }

    /// Take an idle instance, or build a new one if none is idle.
    pub fn acquire(&self) -> Result<PoolGuard<'_, T>, PoolError> {
        // The idle lock is released before the factory runs.
        let reused = self.idle.lock().pop();
        let item = match reused {
            Some(item) => item,
            None => {
                let item = self.construct()?;
                tracing::debug!(
                    created = self.created_count(),
                    "pool grew to meet demand"
                );
                item
            }
        };

        self.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(PoolGuard {
            pool: self,
            item: Some(item),
        })
    }

    /// Acquire an instance, run `f` on it, and release it on every exit path.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, PoolError> {
        let mut guard = self.acquire()?;
        Ok(f(&mut guard))
    }

    /// Instances currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Instances currently held by callers.
    pub fn in_use_count(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    /// Instances the factory has produced since creation.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn construct(&self) -> Result<T, PoolError> {
        let item = (self.factory)().map_err(PoolError::Construction)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(item)
    }

    fn give_back(&self, item: T) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);

        let mut idle = self.idle.lock();
        if let Some(max_idle) = self.max_idle {
            if idle.len() >= max_idle {
                tracing::trace!(max_idle, "dropping surplus pooled instance");
                return;
            }
        }
        idle.push(item);
    }
}

impl<T> std::fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("idle", &self.idle_count())
            .field("in_use", &self.in_use_count())
            .field("created", &self.created_count())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Exclusive handle to a pooled instance. Returns it to the pool on drop.
pub struct PoolGuard<'a, T> {
    pool: &'a ResourcePool<T>,
    item: Option<T>,
}

impl<T> PoolGuard<'_, T> {
    /// Return the instance now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }

    /// Take the instance out of the pool for good.
    pub fn detach(mut self) -> T {
        self.pool.in_use.fetch_sub(1, Ordering::SeqCst);
        match self.item.take() {
            Some(item) => item,
            None => unreachable!("pool guard holds its instance until dropped"),
        }
    }
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.item {
            Some(item) => item,
            None => unreachable!("pool guard holds its instance until dropped"),
        }
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pool guard holds its instance until dropped"),
        }
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.give_back(item);
        }
    }
}
