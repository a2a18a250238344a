//! # Transition directives and the resolver.
//!
//! The original magic return values (`'@self'`, `'@exit'`, a bare state name)
//! become explicit tagged types here:
//!
//! - [`Step`] is what one dispatch resolves to: go to a named state, re-enter
//!   the current one, exit the machine, or fault.
//! - [`Action`] is what an action table stores: a literal directive or a
//!   computed handler that produces a [`Step`] from the event's carried data.
//! - [`Redirect`] is the reduced directive a guard may return to skip the
//!   state's own work.
//!
//! [`resolve`] is the transition resolver: synchronous, never suspends. A
//! computed handler returning `None` means "remain in the current state and
//! rerun its guard" — the convention used by guard-style handlers that only
//! sometimes redirect.

use crate::events::Event;

use super::state::{Fire, StateName};

/// Next-state directive produced by one dispatch.
#[derive(Debug, Clone)]
pub enum Step<P> {
    /// Transfer control to a named state, carrying arguments forward.
    Next(StateName, Option<P>),
    /// Re-enter the current state at its guard phase with new arguments.
    Stay(Option<P>),
    /// End the machine, optionally yielding a final value to its owner.
    Exit(Option<P>),
    /// Fatal-to-this-machine condition, reported upward.
    Fault(String),
}

impl<P> Step<P> {
    /// Convenience constructor for [`Step::Next`].
    pub fn next(state: impl Into<StateName>, args: impl Into<Option<P>>) -> Self {
        Step::Next(state.into(), args.into())
    }

    /// Convenience constructor for [`Step::Stay`].
    pub fn stay(args: impl Into<Option<P>>) -> Self {
        Step::Stay(args.into())
    }

    /// Convenience constructor for [`Step::Exit`].
    pub fn exit(result: impl Into<Option<P>>) -> Self {
        Step::Exit(result.into())
    }
}

/// Directive a guard may return to bypass the state's work phase.
#[derive(Debug, Clone)]
pub enum Redirect {
    /// Transition immediately to another state, carrying the current args.
    Goto(StateName),
    /// End the machine immediately with no final value.
    Exit,
}

impl Redirect {
    pub fn goto(state: impl Into<StateName>) -> Self {
        Redirect::Goto(state.into())
    }
}

/// Computed action handler: may emit through [`Fire`], must not suspend.
pub type ActionFn<C, P> =
    Box<dyn Fn(&mut Fire<'_, C, P>, &Event<P>) -> Option<Step<P>> + Send + Sync>;

/// A stored action-table value.
pub enum Action<C, P> {
    /// Go to the named state, forwarding the event payload as arguments.
    Goto(StateName),
    /// Re-enter the current state, forwarding the event payload.
    Stay,
    /// End the machine, yielding the event payload.
    Exit,
    /// Explicit error route.
    Fault,
    /// Data-dependent branching, evaluated at dispatch time.
    With(ActionFn<C, P>),
}

impl<C, P> Action<C, P> {
    /// Wraps a closure as a computed action.
    pub fn with(
        f: impl Fn(&mut Fire<'_, C, P>, &Event<P>) -> Option<Step<P>> + Send + Sync + 'static,
    ) -> Self {
        Action::With(Box::new(f))
    }
}

/// Resolves a matched action into a [`Step`].
///
/// `current` is the argument bundle the state is presently holding; it is
/// what a `None` from a computed handler stays with.
pub(crate) fn resolve<C, P: Clone>(
    action: &Action<C, P>,
    current: Option<&P>,
    event: &Event<P>,
    fire: &mut Fire<'_, C, P>,
) -> Step<P> {
    match action {
        Action::Goto(state) => Step::Next(state.clone(), event.payload().cloned()),
        Action::Stay => Step::Stay(event.payload().cloned()),
        Action::Exit => Step::Exit(event.payload().cloned()),
        Action::Fault => Step::Fault(format!("event '{}' routed to the error action", event.name())),
        Action::With(f) => f(fire, event).unwrap_or_else(|| Step::Stay(current.cloned())),
    }
}
