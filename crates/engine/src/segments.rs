//! Design-segment construction: the linear and point phase views.
//!
//! Linear phases render as per-side sub-timelines gap-filled with
//! non-design segments; point phases render as discrete locations with
//! no gap filling. Both feed the shared overlay/reduction rule.

use serde::Serialize;

use chainage_core::phase::{Interval, Phase};
use chainage_core::range::{normalize_range, PkRange, MERGE_EPSILON};
use chainage_core::side::Side;
use chainage_core::status::{InspectionStatus, StatusStamp};
use chainage_core::types::Pk;

use crate::overlay::{overlay, Segment, SegmentState};
use crate::snapshots::{EntityRef, SnapshotIndex};

// ---------------------------------------------------------------------------
// Linear view
// ---------------------------------------------------------------------------

/// Display labels for the two carriageway sub-timelines.
#[derive(Debug, Clone)]
pub struct SideLabels {
    pub left: String,
    pub right: String,
}

impl Default for SideLabels {
    fn default() -> Self {
        Self {
            left: "Left carriageway".to_string(),
            right: "Right carriageway".to_string(),
        }
    }
}

/// One carriageway sub-timeline.
#[derive(Debug, Clone, Serialize)]
pub struct SideTimeline {
    pub label: String,
    pub segments: Vec<Segment>,
}

/// The rendered linear view of one phase.
#[derive(Debug, Clone, Serialize)]
pub struct LinearTimelines {
    pub left: SideTimeline,
    pub right: SideTimeline,
    /// Side-neutral combined timeline (every interval, every inspection).
    pub total: Vec<Segment>,
}

/// Build the linear view of a phase.
///
/// The usable range is `max(road_length, max interval endpoint, 0)`, at
/// least 1. A `Both` interval contributes an identical pending segment to
/// both sub-timelines; inspections are overlaid per side, a `Both`
/// inspection counting toward both.
pub fn linear_view(
    phase: &Phase,
    road_length: Pk,
    labels: &SideLabels,
    index: &SnapshotIndex,
) -> LinearTimelines {
    let usable = usable_length(phase, road_length);
    let full = PkRange::new(0.0, usable);
    let phase_ref = EntityRef::full(phase.id, &phase.name);

    let left_design = design_segments(phase, usable, Some(Side::Left));
    let right_design = design_segments(phase, usable, Some(Side::Right));
    let total_design = design_segments(phase, usable, None);

    LinearTimelines {
        left: SideTimeline {
            label: labels.left.clone(),
            segments: overlay(&left_design, &index.slices(phase_ref, Side::Left, full)),
        },
        right: SideTimeline {
            label: labels.right.clone(),
            segments: overlay(&right_design, &index.slices(phase_ref, Side::Right, full)),
        },
        total: overlay(&total_design, &index.slices(phase_ref, Side::Both, full)),
    }
}

/// Usable timeline length: the road length, stretched to cover any
/// interval running past it, floored at 1 so an empty phase still
/// renders a timeline.
fn usable_length(phase: &Phase, road_length: Pk) -> Pk {
    let road_length = if road_length.is_finite() { road_length } else { 0.0 };
    let max_end = phase
        .intervals
        .iter()
        .map(|i| i.range().end)
        .fold(0.0, f64::max);
    let length = road_length.max(max_end).max(0.0);
    if length < 1.0 {
        1.0
    } else {
        length
    }
}

/// Per-side design segments, gap-filled with non-design segments across
/// `[0, usable]`. `side: None` builds the side-neutral total timeline.
fn design_segments(phase: &Phase, usable: Pk, side: Option<Side>) -> Vec<Segment> {
    let mut spans: Vec<&Interval> = phase
        .intervals
        .iter()
        .filter(|i| match side {
            Some(side) => i.side == Side::Both || i.side == side,
            None => true,
        })
        .collect();
    spans.sort_by(|a, b| a.range().start.total_cmp(&b.range().start));

    let mut out: Vec<Segment> = Vec::new();
    let mut cursor: Pk = 0.0;
    for span in spans {
        let range = span.range();
        // Overlapping design intervals are clipped to keep the output
        // non-overlapping.
        let start = range.start.max(cursor);
        if range.end <= cursor {
            continue;
        }
        if start > cursor + MERGE_EPSILON {
            out.push(non_design(cursor, start, phase));
        }
        out.push(Segment {
            start,
            end: range.end,
            state: SegmentState::Status(InspectionStatus::Pending),
            spec: span.spec.clone(),
            bill_quantity: span.bill_quantity,
            point_has_sides: phase.point_has_sides,
        });
        cursor = range.end;
    }
    if cursor < usable - MERGE_EPSILON {
        out.push(non_design(cursor, usable, phase));
    }
    out
}

fn non_design(start: Pk, end: Pk, phase: &Phase) -> Segment {
    Segment {
        start,
        end,
        state: SegmentState::NonDesign,
        spec: None,
        bill_quantity: None,
        point_has_sides: phase.point_has_sides,
    }
}

// ---------------------------------------------------------------------------
// Point view
// ---------------------------------------------------------------------------

/// One discrete inspection location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointEntry {
    pub start: Pk,
    pub end: Pk,
    pub side: Side,
    pub spec: Option<String>,
    pub bill_quantity: Option<f64>,
    /// Reduced status across matching snapshots, `Pending` when none.
    pub status: InspectionStatus,
}

/// The rendered point view of one phase. `min`/`max` bound the rendering
/// range only; points are discrete, so no gap filling happens.
#[derive(Debug, Clone, Serialize)]
pub struct PointView {
    pub min: Pk,
    pub max: Pk,
    pub points: Vec<PointEntry>,
}

/// Build the point view of a phase. Falls back to the road section's
/// start/end bounds when the phase has no intervals yet.
pub fn point_view(
    phase: &Phase,
    fallback_start: Pk,
    fallback_end: Pk,
    index: &SnapshotIndex,
) -> PointView {
    let phase_ref = EntityRef::full(phase.id, &phase.name);

    let points: Vec<PointEntry> = phase
        .intervals
        .iter()
        .map(|interval| {
            let range = interval.range();
            let matching = index
                .phase_records(phase_ref)
                .filter(|r| r.range().overlaps(&range))
                .filter(|r| {
                    if phase.point_has_sides {
                        r.side.satisfies(interval.side)
                    } else {
                        true
                    }
                })
                .map(|r| r.stamp());
            let status = StatusStamp::reduce(matching)
                .map(|s| s.status)
                .unwrap_or(InspectionStatus::Pending);
            PointEntry {
                start: range.start,
                end: range.end,
                side: interval.side,
                spec: interval.spec.clone(),
                bill_quantity: interval.bill_quantity,
                status,
            }
        })
        .collect();

    let (min, max) = if points.is_empty() {
        normalize_range(fallback_start, fallback_end)
    } else {
        let min = points.iter().map(|p| p.start).fold(f64::INFINITY, f64::min);
        let max = points.iter().map(|p| p.end).fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    };

    PointView { min, max, points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainage_core::inspection::InspectionRecord;
    use chainage_core::phase::MeasureKind;
    use chrono::{TimeZone, Utc};

    fn linear_phase(intervals: Vec<Interval>) -> Phase {
        Phase {
            id: 10,
            definition_id: 1,
            name: "Earthworks".to_string(),
            road_id: 1,
            measure: MeasureKind::Linear,
            intervals,
            layers: vec![],
            checks: vec![],
            point_has_sides: false,
        }
    }

    fn point_phase(intervals: Vec<Interval>, point_has_sides: bool) -> Phase {
        Phase {
            id: 11,
            definition_id: 3,
            name: "Culverts".to_string(),
            road_id: 1,
            measure: MeasureKind::Point,
            intervals,
            layers: vec![],
            checks: vec![],
            point_has_sides,
        }
    }

    fn inspection(
        phase: &Phase,
        start: Pk,
        end: Pk,
        side: Side,
        status: InspectionStatus,
    ) -> InspectionRecord {
        InspectionRecord {
            phase_id: Some(phase.id),
            phase_name: Some(phase.name.clone()),
            start_pk: start,
            end_pk: end,
            side,
            status,
            layer_id: None,
            layer_name: Some("Embankment Fill".to_string()),
            check_id: None,
            check_name: Some("Fill Compaction Test".to_string()),
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            synthetic: false,
        }
    }

    // -- linear view ----------------------------------------------------------

    #[test]
    fn both_interval_renders_on_both_sides_with_gap_fill() {
        let phase = linear_phase(vec![Interval::new(0.0, 400.0, Side::Both)]);
        let records = vec![];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 1000.0, &SideLabels::default(), &index);

        for timeline in [&view.left.segments, &view.right.segments] {
            assert_eq!(timeline.len(), 2);
            assert_eq!(
                timeline[0].state,
                SegmentState::Status(InspectionStatus::Pending)
            );
            assert_eq!((timeline[0].start, timeline[0].end), (0.0, 400.0));
            assert_eq!(timeline[1].state, SegmentState::NonDesign);
            assert_eq!((timeline[1].start, timeline[1].end), (400.0, 1000.0));
        }
    }

    #[test]
    fn left_inspection_colors_left_only() {
        let phase = linear_phase(vec![Interval::new(0.0, 400.0, Side::Both)]);
        let records = vec![inspection(&phase, 0.0, 400.0, Side::Left, InspectionStatus::Approved)];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 1000.0, &SideLabels::default(), &index);

        assert_eq!(
            view.left.segments[0].state,
            SegmentState::Status(InspectionStatus::Approved)
        );
        assert_eq!(
            view.right.segments[0].state,
            SegmentState::Status(InspectionStatus::Pending)
        );
    }

    #[test]
    fn single_side_interval_leaves_other_side_non_design() {
        let phase = linear_phase(vec![Interval::new(100.0, 300.0, Side::Right)]);
        let records = vec![];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 500.0, &SideLabels::default(), &index);

        assert_eq!(view.left.segments.len(), 1);
        assert_eq!(view.left.segments[0].state, SegmentState::NonDesign);
        assert_eq!(view.right.segments.len(), 3);
        assert_eq!(view.right.segments[0].state, SegmentState::NonDesign);
        assert_eq!(
            view.right.segments[1].state,
            SegmentState::Status(InspectionStatus::Pending)
        );
        assert_eq!(view.right.segments[2].state, SegmentState::NonDesign);
    }

    #[test]
    fn usable_length_stretches_to_interval_end() {
        let phase = linear_phase(vec![Interval::new(0.0, 1200.0, Side::Both)]);
        let records = vec![];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 1000.0, &SideLabels::default(), &index);
        let last = view.left.segments.last().unwrap();
        assert_eq!(last.end, 1200.0);
    }

    #[test]
    fn empty_phase_renders_minimum_timeline() {
        let phase = linear_phase(vec![]);
        let records = vec![];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 0.0, &SideLabels::default(), &index);
        assert_eq!(view.left.segments.len(), 1);
        assert_eq!(view.left.segments[0].state, SegmentState::NonDesign);
        assert_eq!(view.left.segments[0].end, 1.0);
    }

    #[test]
    fn both_inspection_counts_toward_both_sides() {
        let phase = linear_phase(vec![Interval::new(0.0, 400.0, Side::Both)]);
        let records = vec![inspection(&phase, 0.0, 400.0, Side::Both, InspectionStatus::Scheduled)];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 1000.0, &SideLabels::default(), &index);
        assert_eq!(
            view.left.segments[0].state,
            SegmentState::Status(InspectionStatus::Scheduled)
        );
        assert_eq!(
            view.right.segments[0].state,
            SegmentState::Status(InspectionStatus::Scheduled)
        );
    }

    #[test]
    fn total_timeline_collects_both_sides() {
        let phase = linear_phase(vec![
            Interval::new(0.0, 200.0, Side::Left),
            Interval::new(200.0, 400.0, Side::Right),
        ]);
        let records = vec![inspection(&phase, 0.0, 200.0, Side::Left, InspectionStatus::Approved)];
        let index = SnapshotIndex::new(&records);
        let view = linear_view(&phase, 400.0, &SideLabels::default(), &index);
        assert_eq!(view.total.len(), 2);
        assert_eq!(
            view.total[0].state,
            SegmentState::Status(InspectionStatus::Approved)
        );
        assert_eq!(
            view.total[1].state,
            SegmentState::Status(InspectionStatus::Pending)
        );
    }

    // -- point view -----------------------------------------------------------

    #[test]
    fn point_view_collects_interval_boundaries() {
        let phase = point_phase(
            vec![
                Interval::new(100.0, 120.0, Side::Left),
                Interval::new(500.0, 510.0, Side::Right),
            ],
            true,
        );
        let records = vec![];
        let index = SnapshotIndex::new(&records);
        let view = point_view(&phase, 0.0, 2000.0, &index);
        assert_eq!(view.points.len(), 2);
        assert_eq!(view.min, 100.0);
        assert_eq!(view.max, 510.0);
        assert_eq!(view.points[0].status, InspectionStatus::Pending);
    }

    #[test]
    fn point_view_falls_back_to_section_bounds() {
        let phase = point_phase(vec![], false);
        let records = vec![];
        let index = SnapshotIndex::new(&records);
        let view = point_view(&phase, 2000.0, 0.0, &index);
        assert!(view.points.is_empty());
        assert_eq!((view.min, view.max), (0.0, 2000.0));
    }

    #[test]
    fn side_aware_point_ignores_other_side_records() {
        let phase = point_phase(vec![Interval::new(100.0, 120.0, Side::Left)], true);
        let records = vec![
            inspection(&phase, 100.0, 120.0, Side::Right, InspectionStatus::Approved),
            inspection(&phase, 100.0, 120.0, Side::Left, InspectionStatus::Scheduled),
        ];
        let index = SnapshotIndex::new(&records);
        let view = point_view(&phase, 0.0, 2000.0, &index);
        assert_eq!(view.points[0].status, InspectionStatus::Scheduled);
    }

    #[test]
    fn side_neutral_point_takes_any_side() {
        let phase = point_phase(vec![Interval::new(100.0, 120.0, Side::Both)], false);
        let records = vec![inspection(&phase, 100.0, 120.0, Side::Left, InspectionStatus::Approved)];
        let index = SnapshotIndex::new(&records);
        let view = point_view(&phase, 0.0, 2000.0, &index);
        assert_eq!(view.points[0].status, InspectionStatus::Approved);
    }
}
