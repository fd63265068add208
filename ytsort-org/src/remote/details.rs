//! Fan-out for item detail lookups
//!
//! Ids are split into chunks no larger than the remote's batch limit. Chunks
//! are dispatched in batches of `workers` concurrent requests; within a batch
//! each worker starts `start_delay` after the previous one, and the whole
//! batch is awaited before the next batch starts.

use super::{ItemDetails, RemoteError};
use crate::models::{Item, ItemId};
use futures::future::join_all;
use std::time::Duration;
use tracing::debug;
use ytsort_common::config::ApiConfig;

/// Chunking and pacing for detail lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailFetchPlan {
    pub chunk_size: usize,
    pub workers: usize,
    pub start_delay: Duration,
}

impl DetailFetchPlan {
    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            chunk_size: api.page_size.max(1) as usize,
            workers: api.detail_workers.max(1),
            start_delay: Duration::from_millis(api.worker_start_delay_ms),
        }
    }
}

impl Default for DetailFetchPlan {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            workers: 4,
            start_delay: Duration::from_millis(100),
        }
    }
}

/// Fetch details for `item_ids`, preserving the remote's answer order per chunk
///
/// Any failed chunk fails the whole lookup once its batch has finished.
pub async fn fetch_details(
    source: &dyn ItemDetails,
    item_ids: &[ItemId],
    plan: &DetailFetchPlan,
) -> Result<Vec<Item>, RemoteError> {
    if item_ids.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = plan.chunk_size.min(source.max_batch()).max(1);
    let chunks: Vec<&[ItemId]> = item_ids.chunks(chunk_size).collect();
    let mut items = Vec::with_capacity(item_ids.len());

    for (batch_index, batch) in chunks.chunks(plan.workers.max(1)).enumerate() {
        debug!(
            batch = batch_index,
            workers = batch.len(),
            "Dispatching detail lookup batch"
        );

        let futures = batch.iter().enumerate().map(|(worker, chunk)| async move {
            let delay = plan.start_delay * worker as u32;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            source.fetch_items(chunk).await
        });

        // Barrier: every worker in the batch finishes before the next batch starts
        for result in join_all(futures).await {
            items.extend(result?);
        }
    }

    Ok(items)
}
