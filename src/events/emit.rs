//! # Event emission from an instance to its owner.
//!
//! [`Emitter`] is a thin wrapper around an unbounded mpsc sender. Every
//! machine owns exactly one emitter; everything it emits travels through one
//! sender clone, so the owner observes that instance's events in emission
//! order (mpsc preserves per-sender FIFO).
//!
//! Top-level machines get a *detached* emitter: emissions are dropped, the
//! machine itself is unaffected.

use tokio::sync::mpsc;

use crate::machine::MachineId;

use super::name::EventName;

/// One event emitted by a child instance, as seen by its owner.
#[derive(Debug, Clone)]
pub struct Emitted<P> {
    /// The emitting instance.
    pub from: MachineId,
    /// Event name as fired by the child (unscoped).
    pub name: EventName,
    pub payload: Option<P>,
}

/// Emission point handed to hooks and action handlers via
/// [`Fire`](crate::chart::Fire).
#[derive(Debug)]
pub struct Emitter<P> {
    from: MachineId,
    tx: Option<mpsc::UnboundedSender<Emitted<P>>>,
}

impl<P> Emitter<P> {
    /// Emitter wired to an owner.
    pub(crate) fn attached(from: MachineId, tx: mpsc::UnboundedSender<Emitted<P>>) -> Self {
        Self { from, tx: Some(tx) }
    }

    /// Emitter for a machine with no owner; emissions are dropped.
    pub(crate) fn detached(from: MachineId) -> Self {
        Self { from, tx: None }
    }

    /// Sends one event to the owner. Never blocks; if the owner is gone the
    /// event is dropped.
    pub fn emit(&self, name: EventName, payload: Option<P>) {
        let Some(tx) = &self.tx else { return };
        if tx
            .send(Emitted {
                from: self.from,
                name,
                payload,
            })
            .is_err()
        {
            tracing::debug!(machine = %self.from, "owner gone; emitted event dropped");
        }
    }
}
