//! # statevisor
//!
//! **Statevisor** is a lightweight finite-state-machine actor runtime for
//! Rust.
//!
//! It provides primitives to declare state graphs, run them as concurrent
//! actor instances, and fan work out across a threshold-bounded pool. The
//! crate is designed as a building block for event-driven pipelines and
//! crawlers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐                    ┌──────────────┐
//!     │    Chart     │                    │    Chart     │
//!     │ (controller) │                    │  (children)  │
//!     └──────┬───────┘                    └──────┬───────┘
//!            ▼                                   ▼ shared, one per pool
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Pool (single-writer loop)                                        │
//! │  - FIFO queue + threshold (bounded concurrency)                   │
//! │  - aggregate result map (PoolHandle::record)                      │
//! │  - <scope>.threshold / <scope>.quiet notifications                │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Machine    │   │   Machine    │   │   Machine    │
//!     │ (exec loop)  │   │ (exec loop)  │   │ (exec loop)  │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ emits            │ emits            │ emits
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  forwarded to the controller machine as <scope>.<event>           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Per-state protocol
//! ```text
//! Machine::run(args)
//!
//! loop {
//!   ├─► entry hook (fresh entry only)
//!   ├─► guard: may redirect to another state or exit
//!   ├─► body:
//!   │     ├─ work     ─► synchronous, returns a tagged result
//!   │     ├─ op       ─► provider future; completion is <op>.done/.err
//!   │     │              with the arguments echoed back
//!   │     └─ passive  ─► waits for injected / ticker events
//!   ├─► dispatch through the action table (prefix / suffix / wildcard
//!   │   patterns, most-specific match wins)
//!   └─► step: next(state, args) / stay(args) / exit(value) / fault
//! }
//! ```
//!
//! ## Features
//! | Area           | Description                                               | Key types / traits             |
//! |----------------|-----------------------------------------------------------|--------------------------------|
//! | **Charts**     | Declarative state graphs, validated at build time.        | [`Chart`], [`StateDef`]        |
//! | **Events**     | Hierarchical names with ranked pattern matching.          | [`EventName`], [`Pattern`]     |
//! | **Machines**   | Sequential actor instances over a shared chart.           | [`Machine`], [`MachineHandle`] |
//! | **Operations** | Pluggable async side effects with done/err completions.   | [`OpProvider`]                 |
//! | **Pools**      | Bounded fan-out with FIFO backpressure and quiescence.    | [`Pool`], [`PoolHandle`]       |
//! | **Errors**     | Typed errors per failure layer.                           | [`ChartError`], [`PoolError`]  |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use statevisor::{Action, Chart, EventName, Machine, MachineExit, NullProvider, StateDef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One state: do some work, route the tagged result to an exit.
//!     let chart: Arc<Chart<(), String>> = Arc::new(
//!         Chart::builder("Greet")
//!             .state(
//!                 StateDef::<(), String>::new("Greet")
//!                     .work(|_fire, args| {
//!                         let who = args.cloned().unwrap_or_else(|| "world".into());
//!                         (EventName::new("done").unwrap(), Some(format!("hello {who}")))
//!                     })
//!                     .route("done", Action::Exit),
//!             )
//!             .build()?,
//!     );
//!
//!     let machine = Machine::new(chart, (), Arc::new(NullProvider));
//!     let exit = machine
//!         .run(Some("statevisor".into()), CancellationToken::new())
//!         .await;
//!
//!     match exit {
//!         MachineExit::Completed(Some(greeting)) => println!("{greeting}"),
//!         other => eprintln!("unexpected exit: {other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod chart;
pub mod events;
pub mod machine;
pub mod ops;
pub mod pool;

mod config;
mod error;

// ---- Public re-exports ----

pub use chart::{Action, Chart, ChartBuilder, Fire, Redirect, StateDef, StateName, Step};
pub use config::PoolConfig;
pub use error::{
    ChartError, MachineError, NameError, OpError, PatternError, PoolClosed, PoolError,
};
pub use events::{Emitted, Event, EventName, Pattern};
pub use machine::{Machine, MachineExit, MachineHandle, MachineId};
pub use ops::{NullProvider, OpOutcome, OpProvider};
pub use pool::{Pool, PoolHandle};
