//! Status overlay: inspections merged onto design segments.
//!
//! The overlay cuts the timeline at every design and inspection boundary,
//! resolves each sub-range through the shared priority/recency rule, and
//! then re-merges adjacent sub-ranges that render identically so segment
//! counts stay proportional to real distinctions, not to breakpoint
//! arithmetic.

use serde::Serialize;

use chainage_core::range::{PkRange, MERGE_EPSILON};
use chainage_core::status::{InspectionStatus, StatusStamp};
use chainage_core::types::Pk;

use crate::snapshots::SnapshotSlice;

/// Rendering state of one derived segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentState {
    /// Road length this phase does not cover. Renders distinctly from
    /// pending work and is never upgraded by inspections.
    NonDesign,
    Status(InspectionStatus),
}

/// A derived, ephemeral progress segment. Never persisted; rebuilt on
/// every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start: Pk,
    pub end: Pk,
    pub state: SegmentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_quantity: Option<f64>,
    pub point_has_sides: bool,
}

impl Segment {
    pub fn range(&self) -> PkRange {
        PkRange::new(self.start, self.end)
    }

    /// Whether two segments render identically (status, spec and
    /// bill quantity all equal).
    fn renders_like(&self, other: &Segment) -> bool {
        self.state == other.state
            && self.spec == other.spec
            && self.bill_quantity == other.bill_quantity
    }
}

/// Overlay inspection slices onto gap-filled design segments.
///
/// Sub-ranges outside any design segment are dropped; `NonDesign`
/// segments pass through untouched; everything else takes the best
/// overlapping slice (priority first, recency second) or keeps the
/// design status when nothing overlaps.
pub fn overlay(design: &[Segment], slices: &[SnapshotSlice]) -> Vec<Segment> {
    if design.is_empty() {
        return Vec::new();
    }

    let mut cuts: Vec<Pk> = Vec::with_capacity(design.len() * 2 + slices.len() * 2);
    for segment in design {
        cuts.push(segment.start);
        cuts.push(segment.end);
    }
    for slice in slices {
        cuts.push(slice.range.start);
        cuts.push(slice.range.end);
    }
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() < MERGE_EPSILON);

    let mut out: Vec<Segment> = Vec::new();
    for pair in cuts.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let owner = match design.iter().find(|d| d.start <= lo && hi <= d.end) {
            Some(owner) => owner,
            None => continue,
        };

        let mut piece = Segment {
            start: lo,
            end: hi,
            ..owner.clone()
        };
        if owner.state != SegmentState::NonDesign {
            let overlapping = slices
                .iter()
                .filter(|s| s.range.start < hi && s.range.end > lo)
                .map(|s| s.stamp);
            if let Some(best) = StatusStamp::reduce(overlapping) {
                piece.state = SegmentState::Status(best.status);
            }
        }
        out.push(piece);
    }

    merge_segments(out)
}

/// Merge adjacent segments that render identically and touch within
/// [`MERGE_EPSILON`]. Idempotent.
pub fn merge_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last)
                if last.renders_like(&segment)
                    && (segment.start - last.end).abs() < MERGE_EPSILON =>
            {
                last.end = segment.end;
            }
            _ => merged.push(segment),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainage_core::types::Timestamp;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn design(start: Pk, end: Pk, state: SegmentState) -> Segment {
        Segment {
            start,
            end,
            state,
            spec: None,
            bill_quantity: None,
            point_has_sides: false,
        }
    }

    fn pending(start: Pk, end: Pk) -> Segment {
        design(start, end, SegmentState::Status(InspectionStatus::Pending))
    }

    fn slice(start: Pk, end: Pk, status: InspectionStatus, secs: i64) -> SnapshotSlice {
        SnapshotSlice {
            range: PkRange::new(start, end),
            stamp: StatusStamp::new(status, at(secs)),
        }
    }

    // -- overlay --------------------------------------------------------------

    #[test]
    fn no_inspections_is_identity() {
        let segments = vec![pending(0.0, 400.0), design(400.0, 1000.0, SegmentState::NonDesign)];
        assert_eq!(overlay(&segments, &[]), segments);
    }

    #[test]
    fn inspection_colors_covered_sub_range() {
        let segments = vec![pending(0.0, 400.0)];
        let out = overlay(&segments, &[slice(0.0, 200.0, InspectionStatus::Approved, 1)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].state, SegmentState::Status(InspectionStatus::Approved));
        assert_eq!((out[0].start, out[0].end), (0.0, 200.0));
        assert_eq!(out[1].state, SegmentState::Status(InspectionStatus::Pending));
        assert_eq!((out[1].start, out[1].end), (200.0, 400.0));
    }

    #[test]
    fn non_design_never_upgraded() {
        let segments = vec![design(400.0, 1000.0, SegmentState::NonDesign)];
        let out = overlay(&segments, &[slice(0.0, 1000.0, InspectionStatus::Approved, 1)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].state, SegmentState::NonDesign);
    }

    #[test]
    fn sub_range_outside_design_is_dropped() {
        let segments = vec![pending(100.0, 200.0)];
        let out = overlay(&segments, &[slice(0.0, 300.0, InspectionStatus::Scheduled, 1)]);
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].start, out[0].end), (100.0, 200.0));
        assert_eq!(out[0].state, SegmentState::Status(InspectionStatus::Scheduled));
    }

    #[test]
    fn higher_priority_wins_regardless_of_input_order() {
        let segments = vec![pending(0.0, 100.0)];
        let a = slice(0.0, 100.0, InspectionStatus::Approved, 1);
        let b = slice(0.0, 100.0, InspectionStatus::Scheduled, 99);
        for slices in [[a, b], [b, a]] {
            let out = overlay(&segments, &slices);
            assert_eq!(out[0].state, SegmentState::Status(InspectionStatus::Approved));
        }
    }

    #[test]
    fn equal_priority_latest_update_wins() {
        let segments = vec![pending(0.0, 100.0)];
        let older = slice(0.0, 100.0, InspectionStatus::Submitted, 10);
        let newer = slice(0.0, 100.0, InspectionStatus::InProgress, 5);
        // Different priorities: InProgress wins despite older timestamp.
        let out = overlay(&segments, &[older, newer]);
        assert_eq!(out[0].state, SegmentState::Status(InspectionStatus::InProgress));

        let first = slice(0.0, 100.0, InspectionStatus::Submitted, 10);
        let second = slice(0.0, 100.0, InspectionStatus::Submitted, 20);
        for slices in [[first, second], [second, first]] {
            let out = overlay(&segments, &slices);
            assert_eq!(out[0].state, SegmentState::Status(InspectionStatus::Submitted));
        }
    }

    #[test]
    fn adjacent_equal_sub_ranges_merge_back() {
        let segments = vec![pending(0.0, 400.0)];
        // Two touching slices with the same status should not fragment
        // the rendered output.
        let out = overlay(
            &segments,
            &[
                slice(0.0, 200.0, InspectionStatus::Approved, 1),
                slice(200.0, 400.0, InspectionStatus::Approved, 2),
            ],
        );
        assert_eq!(out.len(), 1);
        assert_eq!((out[0].start, out[0].end), (0.0, 400.0));
    }

    #[test]
    fn differing_spec_blocks_merge() {
        let mut a = pending(0.0, 200.0);
        a.spec = Some("C30".to_string());
        let b = pending(200.0, 400.0);
        let out = overlay(&[a, b], &[]);
        assert_eq!(out.len(), 2);
    }

    // -- merge_segments -------------------------------------------------------

    #[test]
    fn merge_is_idempotent() {
        let segments = vec![pending(0.0, 100.0), pending(100.0, 250.0), pending(400.0, 500.0)];
        let once = merge_segments(segments);
        let twice = merge_segments(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn merge_respects_gaps() {
        let segments = vec![pending(0.0, 100.0), pending(150.0, 200.0)];
        assert_eq!(merge_segments(segments).len(), 2);
    }
}
