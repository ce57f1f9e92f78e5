//! Fixed-size pool of agents with rotation of bad ones.
//!
//! Agents are checked out one caller at a time. Idle agents sit in a queue
//! guarded by a semaphore whose permit count always equals the queue length,
//! so waiting for an agent is an `await` on the semaphore and closing the
//! pool wakes every waiter with [`Error::PoolClosed`].

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::Semaphore;

use super::{Agent, Roller};
use crate::error::{Error, Result};
use crate::timeouts::with_deadline;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct PoolInner {
    roller: Roller,
    size: usize,
    dial_timeout: Option<Duration>,
    idle: Mutex<VecDeque<Arc<Agent>>>,
    available: Semaphore,
    /// Agents in circulation: idle plus checked out.
    live: AtomicUsize,
    closed: AtomicBool,
    /// Seeds for every roll after construction. Held while rolling so two
    /// callers never top the pool up past `size`.
    seeds: Mutex<StdRng>,
}

impl PoolInner {
    /// Queue `agent` as idle, or stop it if the pool has closed. The closed
    /// flag is read under the queue lock so `close` cannot miss it.
    fn check_in(&self, agent: Arc<Agent>) {
        let mut idle = lock(&self.idle);
        if self.closed.load(Ordering::Acquire) {
            drop(idle);
            self.retire(&agent);
            return;
        }
        tracing::trace!(agent = agent.id(), "agent checked in");
        idle.push_back(agent);
        drop(idle);
        self.available.add_permits(1);
    }

    fn retire(&self, agent: &Agent) {
        agent.stop();
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    /// Roll agents until `size` are in circulation again.
    fn replenish(&self) -> Result<()> {
        let mut seeds = lock(&self.seeds);
        while !self.closed.load(Ordering::Acquire) && self.live.load(Ordering::Acquire) < self.size {
            let seed = seeds.next_u64();
            let agent = self.roller.roll(seed, self.dial_timeout)?;
            tracing::debug!(
                agent = agent.id(),
                client = agent.client(),
                version = agent.version(),
                "rolled replacement agent"
            );
            self.live.fetch_add(1, Ordering::AcqRel);
            self.check_in(Arc::new(agent));
        }
        Ok(())
    }

    async fn check_out(&self) -> Result<Arc<Agent>> {
        let permit = self.available.acquire().await.map_err(|_| Error::PoolClosed)?;
        permit.forget();
        let agent = lock(&self.idle).pop_front().ok_or(Error::PoolClosed)?;
        tracing::trace!(agent = agent.id(), "agent checked out");
        Ok(agent)
    }
}

/// Holds a checked-out agent and returns it to the pool when dropped, so a
/// cancelled caller never leaks an agent.
struct Lease<'a> {
    pool: &'a PoolInner,
    agent: Option<Arc<Agent>>,
}

impl Lease<'_> {
    /// Take the agent out of circulation for good.
    fn discard(mut self) {
        if let Some(agent) = self.agent.take() {
            tracing::debug!(
                agent = agent.id(),
                client = agent.client(),
                version = agent.version(),
                "discarding bad agent"
            );
            self.pool.retire(&agent);
        }
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(agent) = self.agent.take() {
            self.pool.check_in(agent);
        }
    }
}

/// A bounded, self-healing collection of agents.
///
/// `live()` stays at `size()` for the pool's lifetime unless a replacement
/// roll fails. Later calls to [`AgentPool::run`] retry the roll before
/// checking out and keep serving from the remaining agents; the roll error
/// only surfaces again once no agent is left.
#[derive(Clone)]
pub struct AgentPool {
    inner: Arc<PoolInner>,
    acquire_timeout: Option<Duration>,
}

impl AgentPool {
    /// Roll `size` agents up front. Fails with the first roll error.
    ///
    /// Roll seeds are drawn from a PRNG seeded with `seed`, so a pool built
    /// from the same inputs holds the same identities.
    pub fn new(
        dial_timeout: Option<Duration>,
        size: usize,
        roller: Roller,
        seed: u64,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidConfig("pool size must be at least 1".into()));
        }

        let inner = PoolInner {
            roller,
            size,
            dial_timeout,
            idle: Mutex::new(VecDeque::with_capacity(size)),
            available: Semaphore::new(0),
            live: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            seeds: Mutex::new(StdRng::seed_from_u64(seed)),
        };
        inner.replenish()?;
        tracing::debug!(size, "agent pool ready");

        Ok(Self {
            inner: Arc::new(inner),
            acquire_timeout: None,
        })
    }

    /// Fail [`AgentPool::run`] with [`Error::PoolAcquireTimeout`] when no
    /// agent frees up within `timeout`.
    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Check out an agent, hand it to `work`, and check it back in.
    ///
    /// `work` returns `(is_bad, result)`. A bad agent is stopped and replaced
    /// by a freshly rolled one before `run` returns. `result` is always
    /// passed through; if the replacement roll fails, that error is returned
    /// only when `result` was a success.
    pub async fn run<F, Fut, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(Arc<Agent>) -> Fut,
        Fut: Future<Output = (bool, Result<T>)>,
    {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        // Top up after an earlier failed rotation. Only an empty pool has
        // nothing to wait for.
        if let Err(roll_err) = self.inner.replenish() {
            if self.live() == 0 {
                return Err(roll_err);
            }
            tracing::warn!(
                error = %roll_err,
                live = self.live(),
                "pool below size, continuing with remaining agents"
            );
        }

        let agent = with_deadline(
            self.acquire_timeout,
            self.inner.check_out(),
            Error::PoolAcquireTimeout,
        )
        .await?;
        let lease = Lease {
            pool: &self.inner,
            agent: Some(Arc::clone(&agent)),
        };

        let (is_bad, result) = work(agent).await;
        if !is_bad {
            drop(lease);
            return result;
        }

        lease.discard();
        if let Err(roll_err) = self.inner.replenish() {
            tracing::warn!(error = %roll_err, "failed to roll replacement agent");
            if result.is_ok() {
                return Err(roll_err);
            }
        }
        result
    }

    /// Stop every idle agent and refuse further work. Agents still checked
    /// out are stopped as they come back. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.available.close();
        let drained: Vec<_> = lock(&self.inner.idle).drain(..).collect();
        for agent in &drained {
            self.inner.retire(agent);
        }
        tracing::debug!(stopped = drained.len(), "agent pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Configured number of agents.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Agents waiting in the pool.
    pub fn idle(&self) -> usize {
        lock(&self.inner.idle).len()
    }

    /// Agents in circulation, idle or checked out.
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Acquire)
    }

    pub fn roller(&self) -> &Roller {
        &self.inner.roller
    }
}

impl fmt::Debug for AgentPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentPool")
            .field("size", &self.size())
            .field("idle", &self.idle())
            .field("live", &self.live())
            .field("closed", &self.is_closed())
            .finish()
    }
}
