//! # Machine: one running cursor through a chart.
//!
//! A [`Machine`] owns its private context, an unbounded injection inbox, and
//! an emission point toward its owner. It is driven by the executor loop in
//! [`run`](Machine::run): state transitions within one machine are strictly
//! sequential, and nothing outside the loop ever touches the context.
//!
//! ## Wiring
//! - [`MachineHandle::inject`] is the event-injection point (external or
//!   synthetic events).
//! - [`Machine::with_emitter`] wires the machine's emission point to an
//!   owner's channel; [`Machine::new`] builds a top-level machine whose
//!   emissions are dropped.
//!
//! ## Exit
//! [`MachineExit`] is the terminal outcome: completed (with an optional final
//! value), faulted (reported to the owner, never thrown), or cancelled.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chart::Chart;
use crate::error::MachineError;
use crate::events::{Emitted, Emitter, Event};
use crate::ops::OpProvider;

use super::executor;

/// Global machine id counter.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one actor instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MachineId(u64);

impl MachineId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Terminal outcome of one machine run.
#[derive(Debug, Clone)]
pub enum MachineExit<P> {
    /// The machine reached an exit directive, optionally yielding a final
    /// value to its owner.
    Completed(Option<P>),
    /// Fatal-to-this-machine condition; the owner decides what it means.
    Faulted(MachineError),
    /// The cancellation token fired at a suspension point.
    Cancelled,
}

/// Injection point for external events.
pub struct MachineHandle<P> {
    id: MachineId,
    tx: mpsc::UnboundedSender<Event<P>>,
}

impl<P> Clone for MachineHandle<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

impl<P> MachineHandle<P> {
    pub fn id(&self) -> MachineId {
        self.id
    }

    /// Queues an event for the machine's current state. Returns `false` if
    /// the machine is gone.
    pub fn inject(&self, event: Event<P>) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// An independent sequential cursor over a state graph.
pub struct Machine<C, P> {
    pub(crate) id: MachineId,
    pub(crate) chart: Arc<Chart<C, P>>,
    pub(crate) ctx: C,
    pub(crate) provider: Arc<dyn OpProvider<P>>,
    pub(crate) emitter: Emitter<P>,
    pub(crate) inbox_tx: mpsc::UnboundedSender<Event<P>>,
    pub(crate) inbox_rx: mpsc::UnboundedReceiver<Event<P>>,
}

impl<C, P> Machine<C, P>
where
    C: Send + 'static,
    P: Clone + Send + 'static,
{
    /// Top-level machine; emitted events are dropped.
    pub fn new(chart: Arc<Chart<C, P>>, ctx: C, provider: Arc<dyn OpProvider<P>>) -> Self {
        let id = MachineId::next();
        Self::build(id, chart, ctx, provider, Emitter::detached(id))
    }

    /// Machine wired to an owner: everything it emits arrives on `owner` in
    /// emission order.
    pub fn with_emitter(
        chart: Arc<Chart<C, P>>,
        ctx: C,
        provider: Arc<dyn OpProvider<P>>,
        owner: mpsc::UnboundedSender<Emitted<P>>,
    ) -> Self {
        let id = MachineId::next();
        Self::build(id, chart, ctx, provider, Emitter::attached(id, owner))
    }

    fn build(
        id: MachineId,
        chart: Arc<Chart<C, P>>,
        ctx: C,
        provider: Arc<dyn OpProvider<P>>,
        emitter: Emitter<P>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            id,
            chart,
            ctx,
            provider,
            emitter,
            inbox_tx,
            inbox_rx,
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    /// Injection handle; valid for the machine's whole lifetime.
    pub fn handle(&self) -> MachineHandle<P> {
        MachineHandle {
            id: self.id,
            tx: self.inbox_tx.clone(),
        }
    }

    /// Drives the machine from its start state until a terminal outcome.
    ///
    /// `args` is the argument bundle carried into the start state.
    /// Cancellation is cooperative: the token is observed at suspension
    /// points only.
    pub async fn run(self, args: Option<P>, token: CancellationToken) -> MachineExit<P> {
        executor::drive(self, args, token).await
    }
}
