//! # Action-table patterns and their match ranks.
//!
//! A [`Pattern`] is a registered matching key on a state's action table,
//! classified **once at registration time** into a tagged variant so that
//! dispatch never re-parses strings:
//!
//! - *Prefix* (`"e1.e2"`): matches an event whose first K segments equal the
//!   pattern's K segments.
//! - *Suffix* (`".e2"`): leading separator; matches an event whose last K
//!   segments equal the pattern's K segments.
//! - *Wildcard* (`""`): matches anything, with the lowest possible rank.
//!
//! Exactness is a property of a *match*, not of the pattern text: any pattern
//! whose segments cover the whole event is classified [`MatchRank::Exact`],
//! regardless of its syntactic form.

use std::fmt;
use std::sync::Arc;

use crate::error::PatternError;

/// Syntactic classification computed at registration time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternKind {
    /// The empty pattern; catch-all.
    Wildcard,
    /// Matches the event's leading segments.
    Prefix(Vec<Box<str>>),
    /// Matches the event's trailing segments.
    Suffix(Vec<Box<str>>),
}

/// A registered matching key in a state's action table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    text: Arc<str>,
    kind: PatternKind,
}

/// Which syntactic rule produced a partial match. Suffix specificity outranks
/// prefix specificity at equal segment count, so `Suffix` sorts above
/// `Prefix`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Form {
    Prefix,
    Suffix,
}

/// Precedence rank of a pattern against one concrete event.
///
/// The derived ordering is the whole precedence algorithm: `Exact` beats any
/// partial match, partial matches compare by matched-segment count `k` and
/// then by [`Form`], and the wildcard loses to everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    Wildcard,
    Partial { k: usize, form: Form },
    Exact,
}

impl Pattern {
    /// Parses pattern text into its tagged form.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let kind = if text.is_empty() {
            PatternKind::Wildcard
        } else if let Some(rest) = text.strip_prefix('.') {
            PatternKind::Suffix(segments(rest)?)
        } else {
            PatternKind::Prefix(segments(text)?)
        };
        Ok(Self {
            text: Arc::from(text),
            kind,
        })
    }

    /// The original registration text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Ranks this pattern against an event's segments, or `None` if it does
    /// not match at all.
    pub fn rank(&self, event: &[&str]) -> Option<MatchRank> {
        match &self.kind {
            PatternKind::Wildcard => Some(MatchRank::Wildcard),
            PatternKind::Prefix(segs) => {
                if segs.len() > event.len() {
                    return None;
                }
                let head = &event[..segs.len()];
                if !eq_segments(segs, head) {
                    return None;
                }
                Some(rank_for(segs.len(), event.len(), Form::Prefix))
            }
            PatternKind::Suffix(segs) => {
                if segs.len() > event.len() {
                    return None;
                }
                let tail = &event[event.len() - segs.len()..];
                if !eq_segments(segs, tail) {
                    return None;
                }
                Some(rank_for(segs.len(), event.len(), Form::Suffix))
            }
        }
    }
}

fn rank_for(k: usize, total: usize, form: Form) -> MatchRank {
    if k == total {
        // Full coverage collapses into the single top-precedence class.
        MatchRank::Exact
    } else {
        MatchRank::Partial { k, form }
    }
}

fn eq_segments(pattern: &[Box<str>], event: &[&str]) -> bool {
    pattern.iter().zip(event).all(|(p, e)| p.as_ref() == *e)
}

fn segments(text: &str) -> Result<Vec<Box<str>>, PatternError> {
    if text.is_empty() || text.split('.').any(str::is_empty) {
        return Err(PatternError::EmptySegment);
    }
    Ok(text.split('.').map(Box::from).collect())
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str(&self.text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(event: &str) -> Vec<&str> {
        event.split('.').collect()
    }

    #[test]
    fn test_classification() {
        assert_eq!(Pattern::parse("").unwrap().kind(), &PatternKind::Wildcard);
        assert!(matches!(
            Pattern::parse("a.b").unwrap().kind(),
            PatternKind::Prefix(s) if s.len() == 2
        ));
        assert!(matches!(
            Pattern::parse(".b").unwrap().kind(),
            PatternKind::Suffix(s) if s.len() == 1
        ));
    }

    #[test]
    fn test_malformed_patterns_rejected() {
        for text in [".", "a..b", ".a.", "..a"] {
            assert_eq!(Pattern::parse(text), Err(PatternError::EmptySegment));
        }
    }

    #[test]
    fn test_prefix_rank() {
        let p = Pattern::parse("e1.e2").unwrap();
        assert_eq!(
            p.rank(&segs("e1.e2.e3")),
            Some(MatchRank::Partial {
                k: 2,
                form: Form::Prefix
            })
        );
        assert_eq!(p.rank(&segs("e1.e2")), Some(MatchRank::Exact));
        assert_eq!(p.rank(&segs("e1")), None);
        assert_eq!(p.rank(&segs("e2.e1")), None);
    }

    #[test]
    fn test_suffix_rank() {
        let p = Pattern::parse(".e2.e3").unwrap();
        assert_eq!(
            p.rank(&segs("e1.e2.e3")),
            Some(MatchRank::Partial {
                k: 2,
                form: Form::Suffix
            })
        );
        // A suffix covering every segment is the same Exact class as a full
        // prefix.
        assert_eq!(p.rank(&segs("e2.e3")), Some(MatchRank::Exact));
        assert_eq!(p.rank(&segs("e3")), None);
    }

    #[test]
    fn test_wildcard_rank() {
        let p = Pattern::parse("").unwrap();
        assert_eq!(p.rank(&segs("anything.at.all")), Some(MatchRank::Wildcard));
    }

    #[test]
    fn test_rank_ordering() {
        let exact = MatchRank::Exact;
        let suffix2 = MatchRank::Partial {
            k: 2,
            form: Form::Suffix,
        };
        let prefix2 = MatchRank::Partial {
            k: 2,
            form: Form::Prefix,
        };
        let suffix1 = MatchRank::Partial {
            k: 1,
            form: Form::Suffix,
        };
        let prefix1 = MatchRank::Partial {
            k: 1,
            form: Form::Prefix,
        };
        let wild = MatchRank::Wildcard;

        assert!(exact > suffix2);
        assert!(suffix2 > prefix2);
        assert!(prefix2 > suffix1);
        assert!(suffix1 > prefix1);
        assert!(prefix1 > wild);
    }
}
