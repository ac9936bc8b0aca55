//! Side-booking resolution.
//!
//! Once one side of a `Both` interval has a committed inspection, a
//! second submission must not silently duplicate that side. The resolver
//! reports which sides are committed and which side, if any, new
//! submissions are steered toward. The output is advisory: the engine
//! cannot prevent two concurrent submitters racing on a stale snapshot,
//! it only tells each of them which side is still open.

use serde::Serialize;

use chainage_core::inspection::InspectionRecord;
use chainage_core::range::PkRange;
use chainage_core::side::Side;

use crate::snapshots::{EntityRef, SnapshotIndex};

/// Committed-side summary for one (phase, range) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SideBooking {
    /// A committed snapshot covers the left side.
    pub left: bool,
    /// A committed snapshot covers the right side.
    pub right: bool,
    /// A committed full-width (`Both`) snapshot exists.
    pub both: bool,
    /// The side new submissions are steered toward, when exactly one
    /// side is still open (or the phase forces a side outright).
    pub locked_side: Option<Side>,
}

/// Resolve the booking state over an arbitrary record set.
///
/// A snapshot counts only when committed (priority at `Scheduled` or
/// above). `forced` pins the locked side regardless of bookings; used
/// for point phases whose every location carries an explicit side.
pub fn resolve<'a>(
    records: impl IntoIterator<Item = &'a InspectionRecord>,
    range: PkRange,
    forced: Option<Side>,
) -> SideBooking {
    let mut left = false;
    let mut right = false;
    let mut both = false;
    for record in records {
        if !record.status.is_committed() || !record.range().overlaps(&range) {
            continue;
        }
        left |= record.side.satisfies(Side::Left);
        right |= record.side.satisfies(Side::Right);
        both |= record.side.satisfies(Side::Both);
    }

    let locked_side = match forced {
        Some(side) => Some(side),
        None if both => None,
        None if left && !right => Some(Side::Right),
        None if right && !left => Some(Side::Left),
        None => None,
    };

    SideBooking {
        left,
        right,
        both,
        locked_side,
    }
}

/// Booking state for a whole phase over a candidate range.
pub fn phase_booking(
    index: &SnapshotIndex,
    phase: EntityRef,
    range: PkRange,
    forced: Option<Side>,
) -> SideBooking {
    resolve(index.phase_records(phase), range, forced)
}

/// Booking state for one layer's checks over a candidate range. Feeds
/// the submission batcher's split detection.
pub fn layer_booking(
    index: &SnapshotIndex,
    phase: EntityRef,
    layer: EntityRef,
    range: PkRange,
) -> SideBooking {
    resolve(index.layer_records(phase, layer), range, None)
}
