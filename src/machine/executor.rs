//! # Executor: the per-state execution protocol.
//!
//! One machine is driven by one instance of [`drive`], strictly sequential:
//!
//! ```text
//!  ┌──────────┐   ┌─────────┐   ┌─────────────────────┐   ┌─────────────┐
//!  │ Entering │ → │ Guarded │ → │ Work / Op / Passive │ → │ Dispatching │
//!  └──────────┘   └─────────┘   └─────────────────────┘   └──────┬──────┘
//!        ▲              ▲                                        │
//!        │              └──────────────── stay ──────────────────┤
//!        └──────────────────────────────── next ─────────────────┘
//! ```
//!
//! ## Rules
//! - The entry hook runs on fresh entry only; a `Stay` re-enters at the guard.
//! - A guard redirect skips the state's body entirely; the exit hook still
//!   runs.
//! - The exit hook runs on every departure, with the outgoing arguments.
//! - While an operation is in flight, injected and ticker events are
//!   dispatched immediately. A resulting `Stay` keeps the operation pending
//!   (with updated arguments); any transition abandons it by dropping the
//!   future.
//! - An event with no matching route is a fault, not a silent drop.
//! - Cancellation is observed at suspension points; synchronous callables are
//!   never interrupted.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::chart::{resolve, Body, CompiledState, Fire, HookFn, StateName, Step};
use crate::error::MachineError;
use crate::events::{best_match, Emitter, Event, EventName};
use crate::ops::{OpOutcome, OpProvider};

use super::machine::{Machine, MachineExit};

/// What one body phase resolved to.
enum BodyOutcome<P> {
    Step(Step<P>),
    Fail(MachineError),
    Halt(MachineExit<P>),
}

pub(crate) async fn drive<C, P>(
    machine: Machine<C, P>,
    args: Option<P>,
    token: CancellationToken,
) -> MachineExit<P>
where
    C: Send + 'static,
    P: Clone + Send + 'static,
{
    let Machine {
        id,
        chart,
        mut ctx,
        provider,
        emitter,
        inbox_tx,
        mut inbox_rx,
    } = machine;
    // Holding our own sender keeps the inbox open even when every external
    // handle is dropped.
    let _inbox = inbox_tx;

    let mut current: StateName = chart.start().clone();
    let mut previous: StateName = current.clone();
    let mut carried = args;
    let mut entering = true;

    tracing::debug!(machine = %id, start = %current, "machine starting");

    loop {
        let Some(state) = chart.state(&current) else {
            // Only reachable through a computed step; literal targets are
            // checked at chart build.
            return MachineExit::Faulted(MachineError::UnknownState {
                state: previous.to_string(),
                target: current.to_string(),
            });
        };

        if entering {
            run_hook(&state.entry, &mut ctx, &emitter, carried.as_ref());
        }

        if let Some(guard) = &state.guard {
            let redirect = {
                let mut fire = Fire::new(&mut ctx, &emitter);
                guard(&mut fire, carried.as_ref())
            };
            match redirect {
                Some(crate::chart::Redirect::Goto(next)) => {
                    run_hook(&state.exit, &mut ctx, &emitter, carried.as_ref());
                    previous = std::mem::replace(&mut current, next);
                    entering = true;
                    continue;
                }
                Some(crate::chart::Redirect::Exit) => {
                    run_hook(&state.exit, &mut ctx, &emitter, None);
                    tracing::debug!(machine = %id, state = %current, "machine completed");
                    return MachineExit::Completed(None);
                }
                None => {}
            }
        }

        let outcome = match &state.body {
            Body::Work(work) => {
                let (tag, payload) = {
                    let mut fire = Fire::new(&mut ctx, &emitter);
                    work(&mut fire, carried.as_ref())
                };
                let event = Event::new(tag).with_payload(payload);
                match dispatch(state, carried.as_ref(), &event, &mut ctx, &emitter) {
                    Ok(step) => BodyOutcome::Step(step),
                    Err(err) => BodyOutcome::Fail(err),
                }
            }
            Body::Op { op, args } => {
                let op_args = {
                    let mut fire = Fire::new(&mut ctx, &emitter);
                    args(&mut fire, carried.as_ref())
                };
                await_op(
                    state,
                    op,
                    op_args,
                    &mut carried,
                    &mut ctx,
                    &emitter,
                    &provider,
                    &mut inbox_rx,
                    &token,
                )
                .await
            }
            Body::Passive => {
                await_event(state, &mut carried, &mut ctx, &emitter, &mut inbox_rx, &token).await
            }
        };

        match outcome {
            BodyOutcome::Step(Step::Next(next, args)) => {
                run_hook(&state.exit, &mut ctx, &emitter, args.as_ref());
                carried = args;
                previous = std::mem::replace(&mut current, next);
                entering = true;
            }
            BodyOutcome::Step(Step::Stay(args)) => {
                carried = args;
                entering = false;
            }
            BodyOutcome::Step(Step::Exit(result)) => {
                run_hook(&state.exit, &mut ctx, &emitter, result.as_ref());
                tracing::debug!(machine = %id, state = %current, "machine completed");
                return MachineExit::Completed(result);
            }
            BodyOutcome::Step(Step::Fault(reason)) => {
                let err = MachineError::Faulted {
                    state: current.to_string(),
                    reason,
                };
                tracing::debug!(machine = %id, error = %err, label = err.as_label(), "machine faulted");
                return MachineExit::Faulted(err);
            }
            BodyOutcome::Fail(err) => {
                tracing::debug!(machine = %id, error = %err, label = err.as_label(), "machine faulted");
                return MachineExit::Faulted(err);
            }
            BodyOutcome::Halt(exit) => return exit,
        }
    }
}

fn run_hook<C, P>(hook: &Option<HookFn<C, P>>, ctx: &mut C, emitter: &Emitter<P>, args: Option<&P>) {
    if let Some(hook) = hook {
        let mut fire = Fire::new(ctx, emitter);
        hook(&mut fire, args);
    }
}

/// Routes one event through the state's action table and resolves the match.
fn dispatch<C, P: Clone>(
    state: &CompiledState<C, P>,
    carried: Option<&P>,
    event: &Event<P>,
    ctx: &mut C,
    emitter: &Emitter<P>,
) -> Result<Step<P>, MachineError> {
    let Some((_, action)) = best_match(event.name(), &state.table) else {
        return Err(MachineError::UnhandledEvent {
            state: state.name.to_string(),
            event: event.name().to_string(),
        });
    };
    let mut fire = Fire::new(ctx, emitter);
    Ok(resolve(action, carried, event, &mut fire))
}

/// Runs one asynchronous operation, dispatching injected and ticker events
/// while it is in flight. A `Stay` from a mid-flight dispatch keeps the
/// operation pending; any other step abandons it.
#[allow(clippy::too_many_arguments)]
async fn await_op<C, P: Clone>(
    state: &CompiledState<C, P>,
    op: &EventName,
    op_args: Option<P>,
    carried: &mut Option<P>,
    ctx: &mut C,
    emitter: &Emitter<P>,
    provider: &Arc<dyn OpProvider<P>>,
    inbox: &mut mpsc::UnboundedReceiver<Event<P>>,
    token: &CancellationToken,
) -> BodyOutcome<P> {
    let fut = provider.invoke(op, op_args.clone());
    tokio::pin!(fut);
    let mut ticker = make_ticker(state.ticker);

    loop {
        tokio::select! {
            outcome = &mut fut => {
                // Completion tag carries the result (or error) plus the
                // original arguments echoed back.
                let event = match outcome {
                    OpOutcome::Done(result) => Event::new(op.with_suffix("done"))
                        .with_payload(result)
                        .with_op_args(op_args),
                    OpOutcome::Err(error) => Event::new(op.with_suffix("err"))
                        .with_error(error)
                        .with_op_args(op_args),
                };
                return match dispatch(state, carried.as_ref(), &event, ctx, emitter) {
                    Ok(step) => BodyOutcome::Step(step),
                    Err(err) => BodyOutcome::Fail(err),
                };
            }
            _ = tick_next(&mut ticker), if ticker.is_some() => {
                let event = Event::new(EventName::tick());
                match dispatch(state, carried.as_ref(), &event, ctx, emitter) {
                    Ok(Step::Stay(args)) => *carried = args,
                    Ok(step) => return BodyOutcome::Step(step),
                    Err(err) => return BodyOutcome::Fail(err),
                }
            }
            injected = inbox.recv() => {
                let Some(event) = injected else {
                    return BodyOutcome::Halt(MachineExit::Cancelled);
                };
                match dispatch(state, carried.as_ref(), &event, ctx, emitter) {
                    Ok(Step::Stay(args)) => *carried = args,
                    Ok(step) => return BodyOutcome::Step(step),
                    Err(err) => return BodyOutcome::Fail(err),
                }
            }
            _ = token.cancelled() => return BodyOutcome::Halt(MachineExit::Cancelled),
        }
    }
}

/// Waits for injected or ticker events in a passive state. Stays are absorbed
/// here so the ticker keeps its cadence across them.
async fn await_event<C, P: Clone>(
    state: &CompiledState<C, P>,
    carried: &mut Option<P>,
    ctx: &mut C,
    emitter: &Emitter<P>,
    inbox: &mut mpsc::UnboundedReceiver<Event<P>>,
    token: &CancellationToken,
) -> BodyOutcome<P> {
    let mut ticker = make_ticker(state.ticker);

    loop {
        tokio::select! {
            _ = tick_next(&mut ticker), if ticker.is_some() => {
                let event = Event::new(EventName::tick());
                match dispatch(state, carried.as_ref(), &event, ctx, emitter) {
                    Ok(Step::Stay(args)) => *carried = args,
                    Ok(step) => return BodyOutcome::Step(step),
                    Err(err) => return BodyOutcome::Fail(err),
                }
            }
            injected = inbox.recv() => {
                let Some(event) = injected else {
                    return BodyOutcome::Halt(MachineExit::Cancelled);
                };
                match dispatch(state, carried.as_ref(), &event, ctx, emitter) {
                    Ok(Step::Stay(args)) => *carried = args,
                    Ok(step) => return BodyOutcome::Step(step),
                    Err(err) => return BodyOutcome::Fail(err),
                }
            }
            _ = token.cancelled() => return BodyOutcome::Halt(MachineExit::Cancelled),
        }
    }
}

fn make_ticker(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| {
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    })
}

async fn tick_next(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        // Guarded out by `if ticker.is_some()`.
        None => pending::<()>().await,
    }
}
