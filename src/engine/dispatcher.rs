//! Worker pool and lane dispatch.
//!
//! ## Purpose
//!
//! The dispatcher owns the persistent rayon thread pool and one `Workspace`
//! per worker. The update and predict engines hand it a list of lanes (units
//! of independent work); it runs every lane on its own worker and returns the
//! lane results in lane order.
//!
//! ## Design notes
//!
//! * **Persistent pool**: The pool is built once per worker count and reused
//!   by every call; a single worker runs inline without a pool.
//! * **Ordered results**: Lanes are collected through an indexed parallel
//!   iterator, so callers can reduce them in a fixed order.
//! * **Derived state**: The dispatcher is never persisted. A restored model
//!   starts without a pool and rebuilds it on the next `ensure`.
//!
//! ## Invariants
//!
//! * Lane `k` always uses workspace `k`; no workspace is shared between
//!   concurrently running lanes.

// External dependencies
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

// Internal dependencies
use crate::engine::workspace::Workspace;
use crate::primitives::errors::LwprError;

/// Persistent worker pool with per-worker scratch space.
#[derive(Debug, Default)]
pub struct Dispatcher {
    workers: usize,
    n_in: usize,
    pool: Option<Arc<ThreadPool>>,
    workspaces: Vec<Mutex<Workspace>>,
}

impl Clone for Dispatcher {
    fn clone(&self) -> Self {
        Self {
            workers: self.workers,
            n_in: self.n_in,
            pool: self.pool.clone(),
            workspaces: (0..self.workspaces.len())
                .map(|_| Mutex::new(Workspace::new(self.n_in)))
                .collect(),
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher with `workers` workers for `n_in` inputs.
    pub fn new(workers: usize, n_in: usize) -> Result<Self, LwprError> {
        let mut dispatcher = Self::default();
        dispatcher.ensure(workers, n_in)?;
        Ok(dispatcher)
    }

    /// Number of workers the dispatcher is currently built for.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Whether the dispatcher matches the requested shape.
    #[inline]
    pub fn is_ready(&self, workers: usize, n_in: usize) -> bool {
        self.workers == workers && self.n_in == n_in && self.workspaces.len() == workers
    }

    /// Rebuild the pool and workspaces if the worker count changed.
    pub fn ensure(&mut self, workers: usize, n_in: usize) -> Result<(), LwprError> {
        if self.is_ready(workers, n_in) {
            return Ok(());
        }
        let pool = if workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("lwpr-worker-{i}"))
                .build()
                .map_err(|e| LwprError::ThreadPool(e.to_string()))?;
            Some(Arc::new(pool))
        } else {
            None
        };
        info!(workers, n_in, "worker pool built");

        self.pool = pool;
        self.workers = workers;
        self.n_in = n_in;
        self.workspaces = (0..workers)
            .map(|_| Mutex::new(Workspace::new(n_in)))
            .collect();
        Ok(())
    }

    /// Run `f` on every lane and return the results in lane order.
    ///
    /// Lanes run in parallel when a pool exists and there is more than one
    /// lane; otherwise they run inline on the calling thread.
    pub fn run<L, R, F>(&self, lanes: Vec<L>, f: F) -> Vec<R>
    where
        L: Send,
        R: Send,
        F: Fn(L, &mut Workspace) -> R + Sync + Send,
    {
        let run_lane = |(k, lane): (usize, L)| -> R {
            match self.workspaces.get(k) {
                Some(slot) => {
                    let mut ws = slot.lock().unwrap_or_else(PoisonError::into_inner);
                    f(lane, &mut ws)
                }
                None => {
                    let mut ws = Workspace::new(self.n_in);
                    f(lane, &mut ws)
                }
            }
        };

        match &self.pool {
            Some(pool) if lanes.len() > 1 => pool.install(|| {
                lanes
                    .into_par_iter()
                    .enumerate()
                    .map(run_lane)
                    .collect()
            }),
            _ => lanes.into_iter().enumerate().map(run_lane).collect(),
        }
    }
}
