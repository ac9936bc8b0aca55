//! Inspection status ordering and the shared status-reduction rule.
//!
//! The numeric priority (1-based, ascending) is the single source of
//! truth for every merge/override decision in the engine: timeline
//! overlay, side booking, point statuses and progress reduction all go
//! through [`StatusStamp::beats`].

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Priority id type matching the 1-based status ordering.
pub type StatusPriority = i16;

/// Lifecycle status of one inspection tuple.
///
/// Variant order is the override order: a higher variant always replaces
/// a lower one when both cover the same sub-range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(i16)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    /// Design exists, nothing booked yet.
    Pending = 1,
    /// An inspection appointment has been submitted.
    Scheduled = 2,
    /// Inspection paperwork handed in.
    Submitted = 3,
    /// Inspector on site.
    InProgress = 4,
    /// Inspection signed off.
    Approved = 5,
}

impl InspectionStatus {
    /// Return the 1-based priority id.
    pub fn priority(self) -> StatusPriority {
        self as StatusPriority
    }

    /// Reverse lookup from a priority id.
    pub fn from_priority(id: StatusPriority) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Scheduled),
            3 => Some(Self::Submitted),
            4 => Some(Self::InProgress),
            5 => Some(Self::Approved),
            _ => None,
        }
    }

    /// Whether this status books its side: anything at `Scheduled` or
    /// above counts as committed, a bare `Pending` does not.
    pub fn is_committed(self) -> bool {
        self >= Self::Scheduled
    }

    /// Human-readable name (for log and error messages).
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Submitted => "submitted",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
        }
    }
}

/// A status observation paired with its write time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusStamp {
    pub status: InspectionStatus,
    pub updated_at: Timestamp,
}

impl StatusStamp {
    pub fn new(status: InspectionStatus, updated_at: Timestamp) -> Self {
        Self { status, updated_at }
    }

    /// Whether this observation wins over `other`.
    ///
    /// Higher priority wins; on a priority tie the later `updated_at`
    /// wins, and an exact tie resolves to `self` (`>=`) so that a
    /// later-processed equal observation replaces an earlier one.
    pub fn beats(&self, other: &StatusStamp) -> bool {
        self.status.priority() > other.status.priority()
            || (self.status.priority() == other.status.priority()
                && self.updated_at >= other.updated_at)
    }

    /// Reduce an iterator of observations to the winning one.
    ///
    /// Processes in input order so that equal observations resolve to the
    /// later-processed entry.
    pub fn reduce<I>(observations: I) -> Option<StatusStamp>
    where
        I: IntoIterator<Item = StatusStamp>,
    {
        let mut best: Option<StatusStamp> = None;
        for candidate in observations {
            match best {
                Some(current) if !candidate.beats(&current) => {}
                _ => best = Some(candidate),
            }
        }
        best
    }
}
