//! Call statistics aggregated over a dispatch tree.

use std::sync::Arc;

use crate::node::{DispatchNode, flatten_active};
use crate::registration::Registration;

/// A leaf and its call count at the moment the record was taken.
#[derive(Debug, Clone)]
pub struct StatRecord {
    /// The leaf the count belongs to.
    pub registration: Arc<Registration>,
    /// Number of invocations.
    pub call_count: u64,
}

impl StatRecord {
    pub(crate) fn new(registration: Arc<Registration>) -> Self {
        let call_count = registration.call_count();
        Self {
            registration,
            call_count,
        }
    }
}

/// Aggregates call counts across every active node under a root.
///
/// Disabled nodes and their subtrees do not contribute.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    root: Arc<DispatchNode>,
}

impl StatisticsAggregator {
    /// Aggregate over the tree rooted at `root`.
    #[must_use]
    pub fn new(root: Arc<DispatchNode>) -> Self {
        Self { root }
    }

    /// Every leaf's record, in traversal order.
    #[must_use]
    pub fn records(&self) -> Vec<StatRecord> {
        flatten_active(&self.root)
            .iter()
            .flat_map(|node| node.statistics())
            .collect()
    }

    /// Sum of all leaf counters in the active tree.
    #[must_use]
    pub fn total_call_count(&self) -> u64 {
        flatten_active(&self.root)
            .iter()
            .map(|node| node.total_call_count())
            .fold(0, u64::saturating_add)
    }

    /// The `n` most called leaves, highest first.
    ///
    /// Ties keep traversal order.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Vec<StatRecord> {
        let mut records = self.records();
        records.sort_by(|a, b| b.call_count.cmp(&a.call_count));
        records.truncate(n);
        records
    }
}

/// Tree-wide call total over the active part of `root`.
#[must_use]
pub fn total_call_count(root: &Arc<DispatchNode>) -> u64 {
    StatisticsAggregator::new(Arc::clone(root)).total_call_count()
}

/// The `n` most called leaves under `root`, highest first.
#[must_use]
pub fn top_n(root: &Arc<DispatchNode>, n: usize) -> Vec<StatRecord> {
    StatisticsAggregator::new(Arc::clone(root)).top_n(n)
}
