//! Progress calculation.
//!
//! A check is complete only when some candidate-side snapshot is exactly
//! `Approved`; anything earlier in the lifecycle contributes nothing.

use std::collections::HashSet;

use serde::Serialize;

use chainage_core::identity::normalize_name;
use chainage_core::range::PkRange;
use chainage_core::side::Side;
use chainage_core::status::InspectionStatus;

use crate::snapshots::{EntityRef, SnapshotIndex};
use crate::workflow::WorkflowTemplate;

/// Completion summary across a workflow's checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub percent: f64,
    pub completed_checks: usize,
    pub total_checks: usize,
}

/// Percent of approved checks for one phase over a range.
///
/// Querying `Both` accepts evidence from either single side; querying a
/// specific side also accepts a `Both` snapshot. `allowed_layers` narrows
/// the workflow to the named layers.
pub fn percent_complete(
    template: &WorkflowTemplate,
    index: &SnapshotIndex,
    phase: EntityRef,
    side: Side,
    range: PkRange,
    allowed_layers: Option<&[String]>,
) -> ProgressSummary {
    let filter: Option<HashSet<String>> =
        allowed_layers.map(|names| names.iter().map(|n| normalize_name(n)).collect());

    let mut total_checks = 0;
    let mut completed_checks = 0;
    for layer in &template.layers {
        if let Some(filter) = &filter {
            if !filter.contains(&normalize_name(&layer.name)) {
                continue;
            }
        }
        for check in &layer.checks {
            total_checks += 1;
            let approved = index
                .check_records(
                    phase,
                    EntityRef::full(layer.id, &layer.name),
                    EntityRef::full(check.id, &check.name),
                )
                .any(|r| {
                    r.status == InspectionStatus::Approved
                        && r.range().overlaps(&range)
                        && side_accepts(side, r.side)
                });
            if approved {
                completed_checks += 1;
            }
        }
    }

    let percent = if total_checks == 0 {
        0.0
    } else {
        completed_checks as f64 / total_checks as f64 * 100.0
    };
    ProgressSummary {
        percent,
        completed_checks,
        total_checks,
    }
}

/// Progress evidence matching: a `Both` query takes any side, a single
/// side query takes that side or `Both`.
fn side_accepts(query: Side, snapshot: Side) -> bool {
    query == Side::Both || snapshot.satisfies(query)
}
