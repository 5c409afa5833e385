//! Next-item selection over a shuffled cycle of the content pool
//!
//! Each cycle posts every pool index exactly once, in an order drawn when
//! the cycle starts. Selecting does not record anything; the caller reports
//! a finished item with [`Selector::mark_posted`]. The only write made by
//! selection is committing a freshly drawn order.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CyclecastError, Result, StoreError};
use crate::store::{load_json, save_json, DocumentStore};
use crate::types::{parse_pool, ContentItem, PostingState};

/// Progress summary for the current cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleStatus {
    pub pool_size: usize,
    pub posted: usize,
    pub remaining: usize,
}

pub struct Selector {
    store: Arc<dyn DocumentStore>,
    pool_key: String,
    state_key: String,
    rng: StdRng,
}

impl Selector {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        pool_key: impl Into<String>,
        state_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            pool_key: pool_key.into(),
            state_key: state_key.into(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            store,
            config.pool_path().to_string_lossy().into_owned(),
            config.state_path().to_string_lossy().into_owned(),
        )
    }

    /// Replace the random source, for reproducible orders
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Load the content pool; a missing or empty pool is an error
    pub fn load_pool(&self) -> Result<Vec<ContentItem>> {
        let raw = self
            .store
            .load(&self.pool_key)?
            .ok_or_else(|| StoreError::NotFound(self.pool_key.clone()))?;
        let pool = parse_pool(&raw, &self.pool_key)?;

        if pool.is_empty() {
            return Err(CyclecastError::InvalidInput(format!(
                "Content pool {} is empty",
                self.pool_key
            )));
        }

        Ok(pool)
    }

    /// Load the posting state; a missing document is an empty state
    pub fn load_state(&self) -> Result<PostingState> {
        Ok(load_json(self.store.as_ref(), &self.state_key)?.unwrap_or_default())
    }

    fn save_state(&self, state: &PostingState) -> Result<()> {
        save_json(self.store.as_ref(), &self.state_key, state, false)
    }

    /// Start a new cycle: fresh permutation, nothing posted, persisted at once
    fn reshuffle(&mut self, state: &mut PostingState, pool_size: usize) -> Result<()> {
        let mut order: Vec<usize> = (0..pool_size).collect();
        order.shuffle(&mut self.rng);

        state.shuffled_order = order;
        state.posted_indices.clear();
        self.save_state(state)?;

        info!("Started a new cycle over {} items", pool_size);
        Ok(())
    }

    /// Pick the next unposted item of the current cycle
    ///
    /// Repeated calls without [`mark_posted`](Self::mark_posted) in between
    /// return the same index.
    pub fn select_next(&mut self) -> Result<(usize, ContentItem)> {
        let pool = self.load_pool()?;
        let mut state = self.load_state()?;

        if state.needs_reshuffle(pool.len()) {
            self.reshuffle(&mut state, pool.len())?;
        }

        let index = match state.next_unposted(pool.len()) {
            Some(index) => index,
            None => {
                // The order no longer fits the pool (e.g. the pool file shrank).
                debug!("No unposted index left in the stored order, reshuffling");
                self.reshuffle(&mut state, pool.len())?;
                state.shuffled_order[0]
            }
        };

        debug!(
            index,
            remaining = state.remaining(pool.len()),
            "Selected next item"
        );

        let item = pool[index].clone();
        Ok((index, item))
    }

    /// Record `index` as posted in the current cycle
    ///
    /// Appends unconditionally; calling twice for one selection records the
    /// index twice.
    pub fn mark_posted(&self, index: usize) -> Result<()> {
        let mut state = self.load_state()?;
        state.posted_indices.push(index);
        self.save_state(&state)?;

        debug!(index, posted = state.posted_indices.len(), "Marked item as posted");
        Ok(())
    }

    pub fn status(&self) -> Result<CycleStatus> {
        let pool = self.load_pool()?;
        let state = self.load_state()?;

        let remaining = if state.needs_reshuffle(pool.len()) {
            pool.len()
        } else {
            state.remaining(pool.len())
        };

        Ok(CycleStatus {
            pool_size: pool.len(),
            posted: pool.len() - remaining,
            remaining,
        })
    }
}
