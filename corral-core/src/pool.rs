//! Fixed-capacity resource pool.
//!
//! A [`ResourcePool`] owns a fixed set of interchangeable resources (worker
//! threads, database connections) and lends them out one holder at a time.
//!
//! - `acquire()` suspends until a resource is free. Waiters are served in
//!   FIFO order by a `tokio::sync::Semaphore`.
//! - A [`PooledResource`] guard gives exclusive `&mut R` access and returns
//!   the resource to the pool when dropped.
//! - `close()` rejects new acquires; `shutdown()` additionally waits for
//!   every held resource to come back and hands the set to the caller for
//!   teardown.
//!
//! ```rust
//! use corral_core::ResourcePool;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), corral_core::PoolError> {
//! let pool = ResourcePool::new(vec![String::from("a"), String::from("b")])?;
//!
//! let mut first = pool.acquire().await?;
//! first.push('!');
//! assert_eq!(pool.status().in_use, 1);
//!
//! first.release();
//! assert_eq!(pool.status().available, 2);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info};

use crate::error::{CoreResult, PoolError};

/// Configuration for a resource pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of resources to create.
    pub capacity: usize,
    /// Maximum time `acquire()` waits; `None` waits forever.
    pub acquire_timeout: Option<Duration>,
    /// Name used in log output.
    pub name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: num_cpus::get().max(1),
            acquire_timeout: None,
            name: "pool".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a config with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// One worker per available CPU, no acquire deadline.
    #[must_use]
    pub fn for_cpu_work() -> Self {
        Self {
            capacity: num_cpus::get().max(1),
            acquire_timeout: None,
            name: "workers".to_string(),
        }
    }

    /// A small connection pool for I/O-bound queries.
    #[must_use]
    pub fn for_queries() -> Self {
        Self {
            capacity: 6,
            acquire_timeout: Some(Duration::from_secs(30)),
            name: "connections".to_string(),
        }
    }

    /// Set the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the acquire deadline.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Wait forever in `acquire()`.
    #[must_use]
    pub fn without_acquire_timeout(mut self) -> Self {
        self.acquire_timeout = None;
        self
    }

    /// Set the pool name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Fixed number of resources.
    pub capacity: usize,
    /// Resources currently idle.
    pub available: usize,
    /// Resources currently held.
    pub in_use: usize,
    /// Callers suspended in `acquire()`.
    pub waiting: usize,
    /// Highest `in_use` observed since creation or the last reset.
    pub peak_in_use: usize,
    /// Whether teardown has begun.
    pub closed: bool,
}

struct Shared<R> {
    name: String,
    capacity: usize,
    acquire_timeout: Option<Duration>,
    semaphore: Arc<Semaphore>,
    idle: Mutex<VecDeque<R>>,
    in_use: AtomicUsize,
    peak_in_use: AtomicUsize,
    waiting: AtomicUsize,
    released: Notify,
}

/// A fixed-capacity pool of interchangeable resources.
///
/// Cloning is cheap; clones share the same resources.
pub struct ResourcePool<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> ResourcePool<R> {
    /// Create a pool that owns `resources`, with no acquire deadline.
    ///
    /// Fails with [`PoolError::InvalidCapacity`] if `resources` is empty.
    pub fn new(resources: Vec<R>) -> CoreResult<Self> {
        Self::from_resources(resources, &PoolConfig::default())
    }

    /// Create a pool from existing resources.
    ///
    /// The capacity is the number of resources; `config.capacity` is ignored.
    pub fn from_resources(resources: Vec<R>, config: &PoolConfig) -> CoreResult<Self> {
        let capacity = resources.len();
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        info!(
            pool = %config.name,
            capacity,
            acquire_timeout_ms = ?config.acquire_timeout.map(|t| t.as_millis()),
            "Resource pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                name: config.name.clone(),
                capacity,
                acquire_timeout: config.acquire_timeout,
                semaphore: Arc::new(Semaphore::new(capacity)),
                idle: Mutex::new(resources.into()),
                in_use: AtomicUsize::new(0),
                peak_in_use: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                released: Notify::new(),
            }),
        })
    }

    /// Create `config.capacity` resources with a fallible factory.
    ///
    /// Capacity is validated before the factory is called.
    pub fn from_fn<E, F>(config: &PoolConfig, mut factory: F) -> CoreResult<Self>
    where
        E: fmt::Display,
        F: FnMut(usize) -> Result<R, E>,
    {
        if config.capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        let resources = (0..config.capacity)
            .map(|index| {
                factory(index).map_err(|e| PoolError::ResourceInit {
                    index,
                    message: e.to_string(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Self::from_resources(resources, config)
    }

    /// Acquire a resource, suspending until one is free.
    ///
    /// Returns [`PoolError::ExhaustedTimeout`] if the configured deadline
    /// passes first, or [`PoolError::Closed`] once teardown has begun.
    pub async fn acquire(&self) -> CoreResult<PooledResource<R>> {
        let started = Instant::now();
        let waiting = WaitingGuard::enter(&self.shared.waiting);

        let acquire = Arc::clone(&self.shared.semaphore).acquire_owned();
        let permit = match self.shared.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                PoolError::ExhaustedTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                }
            })?,
            None => acquire.await,
        }
        .map_err(|_| PoolError::Closed)?;
        drop(waiting);

        let resource = self.checkout(permit)?;
        debug!(
            pool = %self.shared.name,
            waited_us = started.elapsed().as_micros() as u64,
            "Resource acquired"
        );
        Ok(resource)
    }

    /// Acquire a resource only if one is free right now.
    pub fn try_acquire(&self) -> CoreResult<Option<PooledResource<R>>> {
        match Arc::clone(&self.shared.semaphore).try_acquire_owned() {
            Ok(permit) => self.checkout(permit).map(Some),
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => Err(PoolError::Closed),
        }
    }

    fn checkout(&self, permit: OwnedSemaphorePermit) -> CoreResult<PooledResource<R>> {
        // `in_use` only changes under the idle lock, so `shutdown` never sees
        // a resource that is neither idle nor counted.
        let resource = {
            let mut idle = self.shared.idle.lock();
            // A permit guarantees an idle resource unless shutdown already reclaimed them.
            let resource = idle.pop_front().ok_or(PoolError::Closed)?;
            let in_use = self.shared.in_use.fetch_add(1, Ordering::SeqCst) + 1;
            self.shared.peak_in_use.fetch_max(in_use, Ordering::SeqCst);
            resource
        };

        Ok(PooledResource {
            resource: Some(resource),
            shared: Arc::clone(&self.shared),
            acquired_at: Instant::now(),
            _permit: permit,
        })
    }

    /// Fixed capacity of the pool.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Pool name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current pool status.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            capacity: self.shared.capacity,
            available: self.shared.idle.lock().len(),
            in_use: self.shared.in_use.load(Ordering::SeqCst),
            waiting: self.shared.waiting.load(Ordering::SeqCst),
            peak_in_use: self.shared.peak_in_use.load(Ordering::SeqCst),
            closed: self.shared.semaphore.is_closed(),
        }
    }

    /// Reset the peak-in-use counter to the current in-use count.
    pub fn reset_peak(&self) {
        let in_use = self.shared.in_use.load(Ordering::SeqCst);
        self.shared.peak_in_use.store(in_use, Ordering::SeqCst);
    }

    /// Check whether teardown has begun.
    pub fn is_closed(&self) -> bool {
        self.shared.semaphore.is_closed()
    }

    /// Reject all further `acquire()` calls, including queued waiters.
    ///
    /// Resources already held stay valid until their guards are dropped.
    pub fn close(&self) {
        if !self.shared.semaphore.is_closed() {
            self.shared.semaphore.close();
            info!(pool = %self.shared.name, "Resource pool closed");
        }
    }

    /// Close the pool, wait for every held resource to be released, and
    /// return the resources for teardown.
    ///
    /// Calling this again after it completed returns an empty set.
    pub async fn shutdown(&self) -> Vec<R> {
        self.close();

        let resources: Vec<R> = loop {
            // Register before checking so a release in between is not missed.
            let released = self.shared.released.notified();
            let in_use = {
                let mut idle = self.shared.idle.lock();
                let in_use = self.shared.in_use.load(Ordering::SeqCst);
                if in_use == 0 {
                    break idle.drain(..).collect();
                }
                in_use
            };
            debug!(pool = %self.shared.name, in_use, "Waiting for held resources");
            released.await;
        };
        info!(
            pool = %self.shared.name,
            reclaimed = resources.len(),
            "Resource pool shut down"
        );
        resources
    }
}

impl<R> fmt::Debug for ResourcePool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.shared.name)
            .field("status", &self.status())
            .finish()
    }
}

/// Exclusive handle to one pool resource.
///
/// The resource goes back to the pool when the guard is dropped.
pub struct PooledResource<R> {
    // `Some` until the guard is dropped.
    resource: Option<R>,
    shared: Arc<Shared<R>>,
    acquired_at: Instant,
    // Dropped after `Drop::drop` has returned the resource to the idle list.
    _permit: OwnedSemaphorePermit,
}

impl<R> PooledResource<R> {
    /// Return the resource to the pool.
    pub fn release(self) {
        drop(self);
    }

    /// How long this guard has held the resource.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    fn resource(&self) -> &R {
        match &self.resource {
            Some(resource) => resource,
            None => unreachable!("pooled resource read after release"),
        }
    }

    fn resource_mut(&mut self) -> &mut R {
        match &mut self.resource {
            Some(resource) => resource,
            None => unreachable!("pooled resource read after release"),
        }
    }
}

impl<R> Deref for PooledResource<R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.resource()
    }
}

impl<R> DerefMut for PooledResource<R> {
    fn deref_mut(&mut self) -> &mut R {
        self.resource_mut()
    }
}

impl<R> Drop for PooledResource<R> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            let mut idle = self.shared.idle.lock();
            idle.push_back(resource);
            self.shared.in_use.fetch_sub(1, Ordering::SeqCst);
        }
        self.shared.released.notify_waiters();
    }
}

/// Counts a caller as waiting until it leaves `acquire()`, even on cancellation.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
