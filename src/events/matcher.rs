//! # Event namespace matcher.
//!
//! Pure precedence selection: given a fired event name and an ordered action
//! table, decide which registered pattern wins. This is the routing core of
//! the whole runtime; it has no side effects and no dependencies beyond
//! [`Pattern`](super::Pattern) ranks.
//!
//! ## Precedence
//! 1. An exact match (pattern segments cover the whole event) wins outright.
//! 2. Otherwise the greatest matched-segment count K wins.
//! 3. At equal K, a suffix pattern outranks a prefix pattern.
//! 4. The wildcard (`""`) only wins when nothing else matches.
//! 5. Equal K and equal form: the first-registered pattern wins. Well-formed
//!    action tables never hit this case; the rule exists so dispatch is
//!    deterministic anyway.
//!
//! No match and no wildcard yields `None`; the executor treats that as an
//! unhandled-event error.

use super::name::EventName;
use super::pattern::{MatchRank, Pattern};

/// Selects the best-matching entry of `table` for `event`.
///
/// The table is ordered by registration; ties on [`MatchRank`] keep the
/// earlier entry because only a strictly greater rank replaces the current
/// best.
pub fn best_match<'t, A>(
    event: &EventName,
    table: &'t [(Pattern, A)],
) -> Option<&'t (Pattern, A)> {
    let segments: Vec<&str> = event.segments().collect();
    let mut best: Option<(MatchRank, &'t (Pattern, A))> = None;
    for entry in table {
        if let Some(rank) = entry.0.rank(&segments) {
            if best.map_or(true, |(current, _)| rank > current) {
                best = Some((rank, entry));
            }
        }
    }
    best.map(|(_, entry)| entry)
}
