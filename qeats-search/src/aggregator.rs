//! Multi-criteria search aggregation.
//!
//! Runs every [`Criterion`] for a query and merges their results in
//! precedence order. Each criterion runs in its own task under a timeout;
//! a criterion that errors, panics or times out contributes nothing and the
//! rest of the search proceeds.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use qeats_core::{Coordinate, QeatsResult, RestaurantRecord, SearchConfig, SearchError};
use qeats_storage::RestaurantStore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::error::Elapsed;
use tracing::warn;

use crate::criteria::{CriteriaSearcher, Criterion};

/// How the criteria of one search are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One criterion at a time, in precedence order.
    #[default]
    Sequential,
    /// All criteria at once, joined before merging.
    Concurrent,
}

type CriterionOutcome = Result<Result<QeatsResult<Vec<RestaurantRecord>>, Elapsed>, JoinError>;

/// Combines the per-criterion searches into one result list.
pub struct Aggregator<S: ?Sized> {
    searcher: CriteriaSearcher<S>,
    task_timeout: Duration,
}

impl<S> Aggregator<S>
where
    S: RestaurantStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, config: &SearchConfig) -> Self {
        Self {
            searcher: CriteriaSearcher::new(store, config.match_cuisines),
            task_timeout: config.task_timeout(),
        }
    }

    /// Restaurants matching `query` by any criterion, without duplicates.
    ///
    /// An empty query matches nothing and performs no lookups.
    pub async fn combine(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
        mode: ExecutionMode,
    ) -> Vec<RestaurantRecord> {
        if query.is_empty() {
            return Vec::new();
        }

        let mut contributions = Vec::with_capacity(Criterion::PRECEDENCE.len());
        match mode {
            ExecutionMode::Sequential => {
                for criterion in Criterion::PRECEDENCE {
                    let handle = self.spawn(criterion, origin, query, time, radius_km);
                    contributions.push(self.settle(criterion, handle.await));
                }
            }
            ExecutionMode::Concurrent => {
                let handles: Vec<_> = Criterion::PRECEDENCE
                    .into_iter()
                    .map(|c| (c, self.spawn(c, origin, query, time, radius_km)))
                    .collect();
                // Await in precedence order; every handle completes before merging.
                for (criterion, handle) in handles {
                    contributions.push(self.settle(criterion, handle.await));
                }
            }
        }

        merge_dedup(contributions)
    }

    fn spawn(
        &self,
        criterion: Criterion,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> JoinHandle<Result<QeatsResult<Vec<RestaurantRecord>>, Elapsed>> {
        let searcher = self.searcher.clone();
        let query = query.to_string();
        let limit = self.task_timeout;
        tokio::spawn(async move {
            tokio::time::timeout(
                limit,
                searcher.search(criterion, origin, &query, time, radius_km),
            )
            .await
        })
    }

    fn settle(&self, criterion: Criterion, outcome: CriterionOutcome) -> Vec<RestaurantRecord> {
        let error = match outcome {
            Ok(Ok(Ok(found))) => return found,
            Ok(Ok(Err(e))) => SearchError::TaskFailed {
                criterion: criterion.to_string(),
                reason: e.to_string(),
            },
            Ok(Err(_)) => SearchError::TaskTimedOut {
                criterion: criterion.to_string(),
                timeout: self.task_timeout,
            },
            Err(e) => SearchError::TaskFailed {
                criterion: criterion.to_string(),
                reason: e.to_string(),
            },
        };
        warn!(criterion = %criterion, error = %error, "criterion contributed no results");
        Vec::new()
    }
}

/// Concatenate `contributions` in order, keeping only the first occurrence
/// of each restaurant id.
pub fn merge_dedup<I>(contributions: I) -> Vec<RestaurantRecord>
where
    I: IntoIterator<Item = Vec<RestaurantRecord>>,
{
    let mut seen = HashSet::new();
    contributions
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.restaurant_id.clone()))
        .collect()
}
