//! Carriageway side vocabulary.
//!
//! Linear phases track the left and right carriageway independently; an
//! interval or inspection marked `Both` spans the full width.

use serde::{Deserialize, Serialize};

/// Which carriageway side an interval or inspection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
    Both,
}

impl Side {
    /// Stable wire/key spelling of this side.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
            Side::Both => "BOTH",
        }
    }

    /// Whether a snapshot recorded on `self` satisfies a query for `query`.
    ///
    /// The rule is asymmetric: a `Both` snapshot matches any query, a
    /// `Both` query is satisfied only by a `Both` snapshot, and a
    /// single-side query accepts the identical side or `Both`.
    pub fn satisfies(self, query: Side) -> bool {
        match (self, query) {
            (Side::Both, _) => true,
            (_, Side::Both) => false,
            (snapshot, query) => snapshot == query,
        }
    }

    /// The complementary single side. `Both` is its own complement.
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Both => Side::Both,
        }
    }

    /// True for `Left` and `Right`, false for `Both`.
    pub fn is_single(self) -> bool {
        !matches!(self, Side::Both)
    }
}
