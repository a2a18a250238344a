//! Command handle into a running pool.

use tokio::sync::mpsc;

use crate::error::PoolClosed;

/// Commands the controller (or any handle holder) issues to the pool loop.
pub(crate) enum PoolCmd<P> {
    /// Enqueue one work item for a child instance.
    Submit(P),
    /// Adjust the concurrency threshold at runtime.
    SetThreshold(usize),
    /// Store one entry in the aggregate result map.
    Record(String, P),
    /// Acknowledge a `<scope>.quiet` proposal.
    ConfirmQuiet,
}

/// Cloneable command endpoint for a [`Pool`](crate::pool::Pool).
///
/// Typically captured by the controller context so controller handlers can
/// submit work and record results; additional clones may feed the pool from
/// outside.
pub struct PoolHandle<P> {
    tx: mpsc::UnboundedSender<PoolCmd<P>>,
}

impl<P> Clone for PoolHandle<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P> PoolHandle<P> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<PoolCmd<P>>) -> Self {
        Self { tx }
    }

    /// Queues one work item. Spawns immediately when a slot is free,
    /// otherwise waits in FIFO order.
    pub fn submit(&self, item: P) -> Result<(), PoolClosed> {
        self.tx.send(PoolCmd::Submit(item)).map_err(|_| PoolClosed)
    }

    /// Changes the concurrency threshold; a raise back-fills free slots from
    /// the queue, a lowered value takes effect as live children finish.
    pub fn set_threshold(&self, threshold: usize) -> Result<(), PoolClosed> {
        self.tx
            .send(PoolCmd::SetThreshold(threshold))
            .map_err(|_| PoolClosed)
    }

    /// Stores one entry in the aggregate result map returned when the pool
    /// finishes. A repeated key overwrites the earlier value.
    pub fn record(&self, key: impl Into<String>, value: P) -> Result<(), PoolClosed> {
        self.tx
            .send(PoolCmd::Record(key.into(), value))
            .map_err(|_| PoolClosed)
    }

    /// Acknowledges a `<scope>.quiet` proposal; the usual reply from the
    /// controller's quiet handler.
    ///
    /// The pool resolves only if nothing was submitted between the proposal
    /// and the acknowledgment. A stale acknowledgment is ignored and
    /// quiescence is proposed again once the new work settles.
    pub fn confirm_quiet(&self) -> Result<(), PoolClosed> {
        self.tx.send(PoolCmd::ConfirmQuiet).map_err(|_| PoolClosed)
    }
}
