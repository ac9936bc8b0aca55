//! Submission batching.
//!
//! A multi-layer selection cannot always go out as one write: when the
//! user targets both sides but a layer already has one side committed,
//! that layer must be split onto its still-open side. The batcher
//! validates the request (fail fast, before any write), partitions the
//! selection into side-correct batches, and expands every batch into the
//! atomic entries the write collaborator accepts as one logical request.

use std::collections::HashMap;

use chrono::NaiveDate;

use chainage_core::error::EngineError;
use chainage_core::identity::normalize_name;
use chainage_core::inspection::{InspectionEntry, InspectionWriteRequest};
use chainage_core::range::PkRange;
use chainage_core::side::Side;
use chainage_core::status::InspectionStatus;
use chainage_core::types::{DbId, Pk};

use crate::booking::layer_booking;
use crate::snapshots::{EntityRef, SnapshotIndex};
use crate::workflow::{TemplateRegistry, WorkflowTemplate};

/// Input to one submission attempt.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub road_id: DbId,
    pub phase_id: DbId,
    pub phase_name: String,
    pub start_pk: Option<Pk>,
    pub end_pk: Option<Pk>,
    /// Target side: explicit for side-aware points, user-chosen otherwise.
    pub side: Side,
    pub layers: Vec<String>,
    pub checks: Vec<String>,
    /// Inspection types the user picked.
    pub types: Vec<String>,
    /// Types currently offered by the selection engine; picks outside
    /// this list are dropped.
    pub allowed_types: Vec<String>,
    pub remark: Option<String>,
    pub appointment_date: Option<NaiveDate>,
    /// Free-form from the caller; validated numeric.
    pub submission_number: Option<String>,
}

/// One side-correct batch of the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SideBatch {
    pub side: Side,
    pub layers: Vec<String>,
    pub checks: Vec<String>,
}

/// The validated, fully expanded result of one submission attempt.
#[derive(Debug, Clone)]
pub struct SubmissionPlan {
    pub batches: Vec<SideBatch>,
    /// Everything the batches expand to, as one logical write.
    pub write_request: InspectionWriteRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Bucket {
    SingleLeft,
    SingleRight,
    BothGroup,
}

impl Bucket {
    fn side(self, requested: Side) -> Side {
        match self {
            Bucket::SingleLeft => Side::Left,
            Bucket::SingleRight => Side::Right,
            Bucket::BothGroup => requested,
        }
    }
}

/// Validate a request and expand it into side-correct batches.
pub fn build_submission(
    template: &WorkflowTemplate,
    registry: &TemplateRegistry,
    index: &SnapshotIndex,
    request: &SubmissionRequest,
) -> Result<SubmissionPlan, EngineError> {
    let range = validate_range(request.start_pk, request.end_pk)?;
    if request.layers.is_empty() {
        return Err(EngineError::LayerMissing);
    }
    if request.checks.is_empty() {
        return Err(EngineError::CheckMissing);
    }
    let types: Vec<String> = request
        .types
        .iter()
        .filter(|t| request.allowed_types.contains(*t))
        .cloned()
        .collect();
    if types.is_empty() {
        return Err(EngineError::TypeMissing);
    }
    if request.appointment_date.is_none() {
        return Err(EngineError::AppointmentMissing);
    }
    let submission_number = validate_submission_number(request.submission_number.as_deref())?;

    let phase = EntityRef {
        id: Some(request.phase_id),
        name: Some(&request.phase_name),
    };

    // Partition layers: a layer splits only when the user targets both
    // sides but its checks show an asymmetric existing commitment; the
    // uncommitted side becomes that layer's target.
    let mut layer_bucket: HashMap<String, Bucket> = HashMap::new();
    let mut buckets: HashMap<Bucket, SideBatch> = HashMap::new();
    for name in &request.layers {
        let bucket = match template.layer_by_name(name) {
            Some(layer) if request.side == Side::Both => {
                let booking = layer_booking(
                    index,
                    phase,
                    EntityRef::full(layer.id, &layer.name),
                    range,
                );
                match (booking.left, booking.right) {
                    (true, false) => Bucket::SingleRight,
                    (false, true) => Bucket::SingleLeft,
                    _ => Bucket::BothGroup,
                }
            }
            _ => Bucket::BothGroup,
        };
        layer_bucket.insert(normalize_name(name), bucket);
        buckets
            .entry(bucket)
            .or_insert_with(|| SideBatch {
                side: bucket.side(request.side),
                layers: Vec::new(),
                checks: Vec::new(),
            })
            .layers
            .push(name.clone());
    }

    // File each check under its owning layer's bucket: precomputed
    // metadata first, then a scan of the selected layers' check sets.
    let mut has_missing_meta = false;
    for check in &request.checks {
        let owner = registry
            .check_owner(template.id, check)
            .and_then(|layer_id| template.layer_by_id(layer_id))
            .filter(|layer| layer_bucket.contains_key(&normalize_name(&layer.name)))
            .or_else(|| {
                let wanted = normalize_name(check);
                request.layers.iter().find_map(|name| {
                    let layer = template.layer_by_name(name)?;
                    layer
                        .checks
                        .iter()
                        .any(|c| normalize_name(&c.name) == wanted)
                        .then_some(layer)
                })
            });
        match owner.and_then(|l| layer_bucket.get(&normalize_name(&l.name))) {
            Some(bucket) => {
                if let Some(batch) = buckets.get_mut(bucket) {
                    batch.checks.push(check.clone());
                }
            }
            None => {
                has_missing_meta = true;
                break;
            }
        }
    }

    let batches: Vec<SideBatch> = if has_missing_meta {
        // Safety net: better to over-submit on one side than to silently
        // drop a check whose layer metadata cannot be resolved.
        tracing::warn!(
            phase = %request.phase_name,
            "check metadata unresolved; falling back to a single batch"
        );
        vec![SideBatch {
            side: request.side,
            layers: request.layers.clone(),
            checks: request.checks.clone(),
        }]
    } else {
        [Bucket::SingleLeft, Bucket::SingleRight, Bucket::BothGroup]
            .into_iter()
            .filter_map(|b| buckets.remove(&b))
            .filter(|b| !b.layers.is_empty() && !b.checks.is_empty())
            .collect()
    };

    let remark = request
        .remark
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let mut entries = Vec::new();
    for batch in &batches {
        for layer_name in dedup(&batch.layers) {
            for check_name in dedup(&batch.checks) {
                entries.push(InspectionEntry {
                    road_id: request.road_id,
                    phase_id: request.phase_id,
                    side: batch.side,
                    start_pk: range.start,
                    end_pk: range.end,
                    layer_name: layer_name.clone(),
                    check_name: check_name.clone(),
                    types: types.clone(),
                    remark: remark.clone(),
                    appointment_date: request.appointment_date,
                    status: InspectionStatus::Scheduled,
                    submission_number,
                });
            }
        }
    }

    Ok(SubmissionPlan {
        batches,
        write_request: InspectionWriteRequest { entries },
    })
}

fn validate_range(start: Option<Pk>, end: Option<Pk>) -> Result<PkRange, EngineError> {
    match (start, end) {
        (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Ok(PkRange::new(a, b)),
        _ => Err(EngineError::RangeInvalid),
    }
}

fn validate_submission_number(raw: Option<&str>) -> Result<Option<i64>, EngineError> {
    match raw.map(str::trim) {
        None => Ok(None),
        Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| EngineError::SubmissionNumberInvalid(value.to_string())),
    }
}

/// Order-preserving de-duplication by normalized name.
fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .filter(|n| seen.insert(normalize_name(n)))
        .cloned()
        .collect()
}
