//! # State definitions.
//!
//! A [`StateDef`] declares one state of a chart: optional entry/exit hooks,
//! an optional guard, at most one body (synchronous work *or* an
//! asynchronous-operation descriptor), an optional ticker period, and an
//! ordered action table.
//!
//! Everything callable receives a [`Fire`] — the bound context handed to
//! hooks, guards, work and action handlers. It exposes the machine's private
//! context and the emission point toward the owner. All callables are
//! synchronous; suspension happens only between them, inside the executor.
//!
//! Pattern and operation-name text is kept raw here and validated when the
//! chart is built, so misconfiguration is reported with full state context.

use std::sync::Arc;
use std::time::Duration;

use crate::events::{Emitter, EventName, Pattern};

use super::transition::{Action, Redirect};

/// Unique key of a state inside its chart.
pub type StateName = Arc<str>;

/// Bound context passed to every chart callable.
///
/// Borrowed mutably for the duration of one synchronous call; the executor is
/// the only other party that ever touches the context.
pub struct Fire<'a, C, P> {
    ctx: &'a mut C,
    emitter: &'a Emitter<P>,
}

impl<'a, C, P> Fire<'a, C, P> {
    pub(crate) fn new(ctx: &'a mut C, emitter: &'a Emitter<P>) -> Self {
        Self { ctx, emitter }
    }

    /// The machine's private context.
    pub fn ctx(&mut self) -> &mut C {
        self.ctx
    }

    /// Emits a named event to the owning pool (or top-level sink).
    ///
    /// Invalid names are dropped with a warning rather than faulting the
    /// machine; emission is a side channel, not control flow.
    pub fn emit(&self, name: &str, payload: Option<P>) {
        match EventName::new(name) {
            Ok(name) => self.emitter.emit(name, payload),
            Err(err) => tracing::warn!(%err, name, "invalid emitted event name dropped"),
        }
    }
}

/// Entry/exit hook: side effects only, no control-flow influence.
pub type HookFn<C, P> = Box<dyn Fn(&mut Fire<'_, C, P>, Option<&P>) + Send + Sync>;

/// Guard: may redirect away before the state performs its work.
pub type GuardFn<C, P> =
    Box<dyn Fn(&mut Fire<'_, C, P>, Option<&P>) -> Option<Redirect> + Send + Sync>;

/// Synchronous work: returns a tagged result dispatched through the action
/// table. Must not suspend.
pub type WorkFn<C, P> =
    Box<dyn Fn(&mut Fire<'_, C, P>, Option<&P>) -> (EventName, Option<P>) + Send + Sync>;

/// Lazily evaluated operation-argument producer, run at dispatch time.
pub type ArgsFn<C, P> = Box<dyn Fn(&mut Fire<'_, C, P>, Option<&P>) -> Option<P> + Send + Sync>;

/// What a state does once its guard lets it proceed.
pub(crate) enum Body<C, P> {
    /// Nothing; the state waits for injected or forwarded events.
    Passive,
    Work(WorkFn<C, P>),
    Op { op: EventName, args: ArgsFn<C, P> },
}

/// Raw body configuration, validated at chart build.
enum BodyCfg<C, P> {
    Passive,
    Work(WorkFn<C, P>),
    Op { op: String, args: Option<ArgsFn<C, P>> },
}

/// Declarative definition of one state.
pub struct StateDef<C, P> {
    pub(crate) name: StateName,
    pub(crate) entry: Option<HookFn<C, P>>,
    pub(crate) exit: Option<HookFn<C, P>>,
    pub(crate) guard: Option<GuardFn<C, P>>,
    pub(crate) ticker: Option<Duration>,
    body: BodyCfg<C, P>,
    actions: Vec<(String, Action<C, P>)>,
}

impl<C, P: Clone> StateDef<C, P> {
    pub fn new(name: impl Into<StateName>) -> Self {
        Self {
            name: name.into(),
            entry: None,
            exit: None,
            guard: None,
            ticker: None,
            body: BodyCfg::Passive,
            actions: Vec::new(),
        }
    }

    /// Entry hook, run when the state is entered (not on `Stay` re-entry).
    pub fn entry(mut self, f: impl Fn(&mut Fire<'_, C, P>, Option<&P>) + Send + Sync + 'static) -> Self {
        self.entry = Some(Box::new(f));
        self
    }

    /// Exit hook, run with the outgoing carried arguments whenever control
    /// leaves this state.
    pub fn exit(mut self, f: impl Fn(&mut Fire<'_, C, P>, Option<&P>) + Send + Sync + 'static) -> Self {
        self.exit = Some(Box::new(f));
        self
    }

    /// Guard, run before the body with the carried arguments.
    pub fn guard(
        mut self,
        f: impl Fn(&mut Fire<'_, C, P>, Option<&P>) -> Option<Redirect> + Send + Sync + 'static,
    ) -> Self {
        self.guard = Some(Box::new(f));
        self
    }

    /// Synchronous work descriptor.
    pub fn work(
        mut self,
        f: impl Fn(&mut Fire<'_, C, P>, Option<&P>) -> (EventName, Option<P>) + Send + Sync + 'static,
    ) -> Self {
        self.body = BodyCfg::Work(Box::new(f));
        self
    }

    /// Asynchronous-operation descriptor; the carried arguments are handed to
    /// the provider unchanged.
    pub fn op(mut self, op: impl Into<String>) -> Self {
        self.body = BodyCfg::Op {
            op: op.into(),
            args: None,
        };
        self
    }

    /// Asynchronous-operation descriptor with a lazily evaluated argument
    /// producer (for argument values only known at dispatch time).
    pub fn op_with(
        mut self,
        op: impl Into<String>,
        args: impl Fn(&mut Fire<'_, C, P>, Option<&P>) -> Option<P> + Send + Sync + 'static,
    ) -> Self {
        self.body = BodyCfg::Op {
            op: op.into(),
            args: Some(Box::new(args)),
        };
        self
    }

    /// Periodic trigger: injects a synthetic `tick` event into this state's
    /// action table at the given interval while the state is current.
    pub fn ticker(mut self, period: Duration) -> Self {
        self.ticker = Some(period);
        self
    }

    /// Registers an action-table route. Registration order is the documented
    /// tie-break for equally ranked patterns.
    pub fn route(mut self, pattern: impl Into<String>, action: Action<C, P>) -> Self {
        self.actions.push((pattern.into(), action));
        self
    }

    /// Shorthand: literal transition to a named state.
    pub fn to(self, pattern: impl Into<String>, state: impl Into<StateName>) -> Self {
        self.route(pattern, Action::Goto(state.into()))
    }

    /// Shorthand: computed action handler.
    pub fn on(
        self,
        pattern: impl Into<String>,
        f: impl Fn(&mut Fire<'_, C, P>, &crate::events::Event<P>) -> Option<super::transition::Step<P>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.route(pattern, Action::with(f))
    }

    pub(crate) fn compile(self) -> Result<CompiledState<C, P>, CompileError> {
        let body = match self.body {
            BodyCfg::Passive => Body::Passive,
            BodyCfg::Work(f) => Body::Work(f),
            BodyCfg::Op { op, args } => {
                let op = EventName::new(&op).map_err(CompileError::OpName)?;
                let args = args.unwrap_or_else(|| {
                    // Shorthand form: carried args are the op args.
                    Box::new(|_fire: &mut Fire<'_, C, P>, args: Option<&P>| args.cloned())
                });
                Body::Op { op, args }
            }
        };

        let mut table = Vec::with_capacity(self.actions.len());
        for (text, action) in self.actions {
            let pattern = Pattern::parse(&text)
                .map_err(|source| CompileError::Pattern { text, source })?;
            table.push((pattern, action));
        }

        Ok(CompiledState {
            name: self.name,
            entry: self.entry,
            exit: self.exit,
            guard: self.guard,
            ticker: self.ticker,
            body,
            table,
        })
    }
}

/// State-local compile failure; the chart builder attaches the state name.
pub(crate) enum CompileError {
    OpName(crate::error::NameError),
    Pattern {
        text: String,
        source: crate::error::PatternError,
    },
}

/// A validated state, ready for dispatch.
pub(crate) struct CompiledState<C, P> {
    pub(crate) name: StateName,
    pub(crate) entry: Option<HookFn<C, P>>,
    pub(crate) exit: Option<HookFn<C, P>>,
    pub(crate) guard: Option<GuardFn<C, P>>,
    pub(crate) ticker: Option<Duration>,
    pub(crate) body: Body<C, P>,
    pub(crate) table: Vec<(Pattern, Action<C, P>)>,
}
