//! One scheduled run: select, refresh, publish, commit
//!
//! The run is strictly sequential. A failure at any stage returns the error
//! without touching the stages after it, so an item whose publish failed is
//! never marked as posted and will be selected again on the next run.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ClientCredentials, Config, ThreadPolicy};
use crate::error::{CyclecastError, Result};
use crate::platforms::ApiClient;
use crate::publisher::Publisher;
use crate::selector::{CycleStatus, Selector};
use crate::store::DocumentStore;
use crate::types::{ContentItem, ContentKind};

/// Furthest point a run reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Item selected, nothing sent yet
    Idle,
    TokenRefreshed,
    Published,
    StateCommitted,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStage::Idle => write!(f, "idle"),
            RunStage::TokenRefreshed => write!(f, "token_refreshed"),
            RunStage::Published => write!(f, "published"),
            RunStage::StateCommitted => write!(f, "state_committed"),
        }
    }
}

/// Outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Pool index of the selected item
    pub index: usize,
    pub kind: ContentKind,
    /// Created post IDs in publish order; empty for a dry run
    pub post_ids: Vec<String>,
    pub stage: RunStage,
    /// Thread indices marked as posted without publishing
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<usize>,
    pub item: ContentItem,
}

struct Selection {
    index: usize,
    item: ContentItem,
    skipped: Vec<usize>,
}

pub struct Runner {
    selector: Selector,
    publisher: Publisher,
    thread_policy: ThreadPolicy,
}

impl Runner {
    pub fn new(selector: Selector, publisher: Publisher) -> Self {
        Self {
            selector,
            publisher,
            thread_policy: ThreadPolicy::default(),
        }
    }

    /// Wire a runner from configuration, sharing one store between
    /// selector and publisher
    pub fn from_config(
        config: &Config,
        api: Arc<dyn ApiClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let selector = Selector::from_config(config, store.clone());
        let publisher = Publisher::from_config(config, api, store);
        Self::new(selector, publisher).with_thread_policy(config.posting.thread_policy)
    }

    pub fn with_thread_policy(mut self, policy: ThreadPolicy) -> Self {
        self.thread_policy = policy;
        self
    }

    pub fn status(&self) -> Result<CycleStatus> {
        self.selector.status()
    }

    /// Execute one full run
    ///
    /// # Errors
    ///
    /// Missing credentials are reported before any network call. A failed
    /// refresh leaves the stored tokens as they were. A failed publish
    /// leaves the posting state as it was; for a thread, posts published
    /// before the failure stay published.
    pub async fn run_once(&mut self, client: &ClientCredentials) -> Result<RunReport> {
        let Selection {
            index,
            item,
            skipped,
        } = self.select()?;
        info!(index, kind = %item.kind, stage = %RunStage::Idle, "Selected item");

        let access_token = self.publisher.refresh_access_token(client).await?;
        info!(stage = %RunStage::TokenRefreshed, "Credentials ready");

        let post_ids = self.publisher.publish(&access_token, &item).await?;
        info!(index, posts = post_ids.len(), stage = %RunStage::Published, "Item published");

        self.selector.mark_posted(index)?;
        info!(index, stage = %RunStage::StateCommitted, "Posting state committed");

        Ok(RunReport {
            index,
            kind: item.kind,
            post_ids,
            stage: RunStage::StateCommitted,
            skipped,
            item,
        })
    }

    /// Select the next item without refreshing, publishing or committing
    ///
    /// Only a freshly drawn cycle order is persisted. Threads are reported
    /// as selected even under [`ThreadPolicy::Skip`], since skipping writes
    /// state.
    pub fn dry_run(&mut self) -> Result<RunReport> {
        let (index, item) = self.selector.select_next()?;
        info!(index, kind = %item.kind, "Dry run selected item");

        Ok(RunReport {
            index,
            kind: item.kind,
            post_ids: Vec::new(),
            stage: RunStage::Idle,
            skipped: Vec::new(),
            item,
        })
    }

    fn select(&mut self) -> Result<Selection> {
        if self.thread_policy == ThreadPolicy::Publish {
            let (index, item) = self.selector.select_next()?;
            return Ok(Selection {
                index,
                item,
                skipped: Vec::new(),
            });
        }

        let pool = self.selector.load_pool()?;
        if pool.iter().all(|item| item.kind == ContentKind::Thread) {
            return Err(CyclecastError::InvalidInput(
                "thread_policy is \"skip\" but the content pool has no single items".to_string(),
            ));
        }

        let mut skipped = Vec::new();
        // Worst case: the threads left in this cycle, then the threads that
        // open the next one. Each run is shorter than the pool.
        for _ in 0..2 * pool.len() {
            let (index, item) = self.selector.select_next()?;
            if item.kind == ContentKind::Single {
                return Ok(Selection {
                    index,
                    item,
                    skipped,
                });
            }

            warn!(index, "Skipping thread item, marking it as posted");
            self.selector.mark_posted(index)?;
            skipped.push(index);
        }

        Err(CyclecastError::InvalidInput(format!(
            "No single item found after skipping {} threads",
            skipped.len()
        )))
    }
}
