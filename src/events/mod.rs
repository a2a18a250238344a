//! Event names, action-table patterns, the namespace matcher, and the
//! emission channel between an instance and its owner.

mod emit;
mod event;
mod matcher;
mod name;
mod pattern;

pub use emit::{Emitted, Emitter};
pub use event::Event;
pub use matcher::best_match;
pub use name::EventName;
pub use pattern::{Form, MatchRank, Pattern, PatternKind};
