//! # Pool: threshold-bounded fan-out of child machines.
//!
//! A [`Pool`] runs one controller machine plus up to `threshold` concurrent
//! child machines, all sharing one operation provider:
//!
//! ```text
//!              submit / set_threshold / record
//!   ┌────────────┐ ───────────────────────────▶ ┌───────────┐
//!   │ controller │                              │ pool loop │──▶ results
//!   │  machine   │ ◀─────────────────────────── └─────┬─────┘
//!   └────────────┘   <scope>.* forwarded events       │ spawn ≤ threshold
//!                                                ┌────┴────┐
//!                                                │ children │
//!                                                └─────────┘
//! ```
//!
//! ## Rules
//! - At most `threshold` children are live at once (`0` means unlimited);
//!   excess submissions wait in a FIFO queue.
//! - Each child exit frees exactly one slot and triggers exactly one spawn
//!   attempt, so the queue drains without ever overshooting.
//! - Child emissions are forwarded to the controller as `<scope>.<event>`,
//!   per-child in emission order.
//! - `<scope>.threshold` tells the controller capacity is idle with an empty
//!   queue; `<scope>.quiet` proposes quiescence: no children live, nothing
//!   queued.
//! - A child fault becomes a `<scope>.err` event; it never takes the pool
//!   down.
//! - Quiescence is a handshake. The controller answers `<scope>.quiet` with
//!   [`PoolHandle::confirm_quiet`]; the pool resolves only if the
//!   acknowledgment still holds. A submission racing the proposal (a child's
//!   last emission can trigger one) makes the acknowledgment stale: it is
//!   ignored and quiescence is proposed again once the new work settles.
//! - The pool also finishes when its controller machine finishes; accepted
//!   work still pending at that point is driven to completion first. The
//!   aggregate result map is the return value.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::chart::Chart;
use crate::config::PoolConfig;
use crate::error::{OpError, PoolError};
use crate::events::{Emitted, Event, EventName};
use crate::machine::{Machine, MachineExit, MachineHandle, MachineId};
use crate::ops::OpProvider;

use super::handle::{PoolCmd, PoolHandle};

/// A controller machine plus a bounded set of child machines.
///
/// `C` is the controller context, `W` the per-child context, `P` the shared
/// payload type.
pub struct Pool<C, W, P> {
    cfg: PoolConfig,
    controller_chart: Arc<Chart<C, P>>,
    controller_ctx: C,
    worker_chart: Arc<Chart<W, P>>,
    worker_ctx: Box<dyn Fn() -> W + Send + Sync>,
    provider: Arc<dyn OpProvider<P>>,
    cmd_tx: mpsc::UnboundedSender<PoolCmd<P>>,
    cmd_rx: mpsc::UnboundedReceiver<PoolCmd<P>>,
}

impl<C, W, P> Pool<C, W, P>
where
    C: Send + 'static,
    W: Send + 'static,
    P: Clone + Send + 'static,
{
    /// Builds a pool. `controller_ctx` receives the pool's own handle so
    /// controller handlers can submit work and record results; `worker_ctx`
    /// produces a fresh private context per spawned child.
    pub fn new(
        cfg: PoolConfig,
        controller_chart: Arc<Chart<C, P>>,
        controller_ctx: impl FnOnce(PoolHandle<P>) -> C,
        worker_chart: Arc<Chart<W, P>>,
        worker_ctx: impl Fn() -> W + Send + Sync + 'static,
        provider: Arc<dyn OpProvider<P>>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let controller_ctx = controller_ctx(PoolHandle::new(cmd_tx.clone()));
        Self {
            cfg,
            controller_chart,
            controller_ctx,
            worker_chart,
            worker_ctx: Box::new(worker_ctx),
            provider,
            cmd_tx,
            cmd_rx,
        }
    }

    /// External command endpoint; usable before and during [`run`](Self::run).
    pub fn handle(&self) -> PoolHandle<P> {
        PoolHandle::new(self.cmd_tx.clone())
    }

    /// Runs the pool to completion.
    ///
    /// Resolves with the aggregate result map (accumulated through
    /// [`PoolHandle::record`]) on a confirmed quiescence, or when the
    /// controller machine finishes. A controller that finishes while
    /// accepted work is still pending does not lose that work: the pool
    /// drives the queue and the live children to completion first. Live
    /// children are detached, never aborted.
    pub async fn run(self, token: CancellationToken) -> Result<HashMap<String, P>, PoolError> {
        let Pool {
            cfg,
            controller_chart,
            controller_ctx,
            worker_chart,
            worker_ctx,
            provider,
            cmd_tx,
            mut cmd_rx,
        } = self;
        // Holding our own sender keeps the command channel open even when
        // every external handle is dropped.
        let _cmds = cmd_tx;

        let (child_tx, mut child_rx) = mpsc::unbounded_channel::<Emitted<P>>();

        let ctrl_token = token.child_token();
        let controller = Machine::new(controller_chart, controller_ctx, provider.clone());
        let ctrl = controller.handle();
        let mut ctrl_join = tokio::spawn(controller.run(None, ctrl_token.clone()));
        let mut ctrl_done = false;

        let mut run = PoolRun {
            scope: EventName::segment(cfg.scope()),
            limit: cfg.concurrency_limit(),
            queue: VecDeque::new(),
            results: HashMap::new(),
            live: JoinSet::new(),
            worker_chart,
            worker_ctx,
            provider,
            child_tx,
            ctrl,
            token: token.clone(),
            quiet_proposed: false,
        };

        tracing::debug!(
            limit = ?run.limit,
            scope = %run.scope,
            "pool starting"
        );
        run.notify_threshold();

        loop {
            tokio::select! {
                joined = &mut ctrl_join, if !ctrl_done => {
                    // Commands issued by controller handlers before the exit
                    // are already in the channel; apply them all before
                    // judging what remains.
                    while let Ok(cmd) = cmd_rx.try_recv() {
                        run.apply(cmd);
                    }
                    match joined {
                        Ok(MachineExit::Completed(_)) => {
                            if run.is_quiescent() {
                                return Ok(run.results);
                            }
                            tracing::warn!(
                                live = run.live.len(),
                                queued = run.queue.len(),
                                "controller finished with work pending; draining"
                            );
                            ctrl_done = true;
                        }
                        Ok(MachineExit::Faulted(err)) => {
                            run.live.detach_all();
                            return Err(PoolError::Controller(err));
                        }
                        Ok(MachineExit::Cancelled) => {
                            run.live.detach_all();
                            return Err(PoolError::Cancelled);
                        }
                        Err(join_err) => {
                            tracing::error!(error = %join_err, "controller machine panicked");
                            run.live.detach_all();
                            return Err(PoolError::ControllerPanicked);
                        }
                    }
                }
                Some(cmd) = cmd_rx.recv() => {
                    if run.apply(cmd) {
                        ctrl_token.cancel();
                        return Ok(run.results);
                    }
                }
                Some(emitted) = child_rx.recv() => run.forward(emitted),
                Some(exited) = run.live.join_next(), if !run.live.is_empty() => {
                    // A finished child's emissions are already in the
                    // channel; forward them before the exit notification so
                    // nothing overtakes a quiet.
                    while let Ok(emitted) = child_rx.try_recv() {
                        run.forward(emitted);
                    }
                    run.on_child_exit(exited);
                    if ctrl_done && run.is_quiescent() {
                        return Ok(run.results);
                    }
                }
                _ = token.cancelled() => {
                    tracing::debug!(live = run.live.len(), "pool cancelled");
                    run.live.detach_all();
                    return Err(PoolError::Cancelled);
                }
            }
        }
    }
}

/// Mutable state of one pool run; touched only from the pool loop.
struct PoolRun<W, P> {
    scope: EventName,
    limit: Option<usize>,
    queue: VecDeque<P>,
    results: HashMap<String, P>,
    live: JoinSet<(MachineId, MachineExit<P>)>,
    worker_chart: Arc<Chart<W, P>>,
    worker_ctx: Box<dyn Fn() -> W + Send + Sync>,
    provider: Arc<dyn OpProvider<P>>,
    child_tx: mpsc::UnboundedSender<Emitted<P>>,
    ctrl: MachineHandle<P>,
    token: CancellationToken,
    quiet_proposed: bool,
}

impl<W, P> PoolRun<W, P>
where
    W: Send + 'static,
    P: Clone + Send + 'static,
{
    fn capacity(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }

    fn has_capacity(&self) -> bool {
        self.live.len() < self.capacity()
    }

    fn is_quiescent(&self) -> bool {
        self.live.is_empty() && self.queue.is_empty()
    }

    /// Applies one command. Returns `true` on a quiet acknowledgment that
    /// still holds, which is the pool's resolve signal.
    fn apply(&mut self, cmd: PoolCmd<P>) -> bool {
        match cmd {
            PoolCmd::Submit(item) => {
                self.queue.push_back(item);
                self.quiet_proposed = false;
                self.spawn_one();
                self.notify_threshold();
            }
            PoolCmd::SetThreshold(threshold) => {
                tracing::debug!(threshold, "pool threshold changed");
                self.limit = PoolConfig::limit(threshold);
                self.fill();
                self.notify_threshold();
            }
            PoolCmd::Record(key, value) => {
                self.results.insert(key, value);
            }
            PoolCmd::ConfirmQuiet => {
                if self.is_quiescent() {
                    return true;
                }
                // Work arrived between the proposal and the acknowledgment;
                // a later child exit proposes quiescence again.
                tracing::debug!(
                    live = self.live.len(),
                    queued = self.queue.len(),
                    "stale quiet acknowledgment ignored"
                );
                self.quiet_proposed = false;
            }
        }
        false
    }

    /// Forwards one child emission to the controller, scoped.
    fn forward(&self, emitted: Emitted<P>) {
        let name = emitted.name.prefixed(self.scope.as_str());
        self.inject(Event::new(name).with_payload(emitted.payload));
    }

    fn on_child_exit(&mut self, exited: Result<(MachineId, MachineExit<P>), JoinError>) {
        match exited {
            Ok((id, MachineExit::Completed(result))) => {
                tracing::debug!(machine = %id, "pool child completed");
                if let Some(value) = result {
                    self.inject(
                        Event::new(self.scope.with_suffix("exited")).with_payload(Some(value)),
                    );
                }
            }
            Ok((id, MachineExit::Faulted(err))) => {
                tracing::warn!(machine = %id, error = %err, label = err.as_label(), "pool child faulted");
                self.inject(
                    Event::new(self.scope.with_suffix("err"))
                        .with_error(OpError::new(err.to_string())),
                );
            }
            Ok((id, MachineExit::Cancelled)) => {
                tracing::debug!(machine = %id, "pool child cancelled");
            }
            Err(join_err) => {
                tracing::warn!(error = %join_err, "pool child panicked");
                self.inject(
                    Event::new(self.scope.with_suffix("err"))
                        .with_error(OpError::new("child machine panicked")),
                );
            }
        }

        // One freed slot, one spawn attempt.
        self.spawn_one();
        self.notify_threshold();
        self.propose_quiet();
    }

    /// Proposes quiescence at most once per idle period.
    fn propose_quiet(&mut self) {
        if self.is_quiescent() && !self.quiet_proposed {
            self.quiet_proposed = true;
            self.inject(Event::new(self.scope.with_suffix("quiet")));
        }
    }

    /// Spawns the next queued item if a slot is free.
    fn spawn_one(&mut self) -> bool {
        if !self.has_capacity() {
            return false;
        }
        let Some(item) = self.queue.pop_front() else {
            return false;
        };
        let machine = Machine::with_emitter(
            self.worker_chart.clone(),
            (self.worker_ctx)(),
            self.provider.clone(),
            self.child_tx.clone(),
        );
        let id = machine.id();
        let child_token = self.token.child_token();
        tracing::debug!(machine = %id, live = self.live.len() + 1, "pool spawning child");
        self.live
            .spawn(async move { (id, machine.run(Some(item), child_token).await) });
        true
    }

    /// Back-fills every free slot from the queue (after a threshold raise).
    fn fill(&mut self) {
        while self.spawn_one() {}
    }

    fn notify_threshold(&self) {
        if self.has_capacity() && self.queue.is_empty() {
            self.inject(Event::new(self.scope.with_suffix("threshold")));
        }
    }

    fn inject(&self, event: Event<P>) {
        if !self.ctrl.inject(event) {
            tracing::debug!("controller gone; pool event dropped");
        }
    }
}
