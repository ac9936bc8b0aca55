//! Inspection collaborator contracts.
//!
//! Read side: [`InspectionRecord`] snapshots supplied as an immutable
//! list for one computation pass. Write side: [`InspectionWriteRequest`]
//! batches of atomic entries, accepted or rejected as a whole.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::identity::Identity;
use crate::range::PkRange;
use crate::side::Side;
use crate::status::{InspectionStatus, StatusStamp};
use crate::types::{DbId, Pk, Timestamp};

/// The latest known record for one (phase, layer, check, side, range)
/// tuple. The engine never mutates source records, only derives views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_name: Option<String>,
    pub start_pk: Pk,
    pub end_pk: Pk,
    pub side: Side,
    pub status: InspectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_name: Option<String>,
    pub updated_at: Timestamp,
    /// Set on records synthesized by cross-phase propagation. Synthetic
    /// records join every merge/progress computation but are never sent
    /// back to the write collaborator.
    #[serde(default, skip_serializing)]
    pub synthetic: bool,
}

impl InspectionRecord {
    /// The record's range, re-normalized rather than trusted.
    pub fn range(&self) -> PkRange {
        PkRange::new(self.start_pk, self.end_pk)
    }

    pub fn stamp(&self) -> StatusStamp {
        StatusStamp::new(self.status, self.updated_at)
    }

    pub fn phase_identity(&self) -> Identity {
        Identity::resolve(self.phase_id, self.phase_name.as_deref())
    }

    pub fn layer_identity(&self) -> Identity {
        Identity::resolve(self.layer_id, self.layer_name.as_deref())
    }

    pub fn check_identity(&self) -> Identity {
        Identity::resolve(self.check_id, self.check_name.as_deref())
    }
}

/// One atomic inspection entry accepted by the write collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionEntry {
    pub road_id: DbId,
    pub phase_id: DbId,
    pub side: Side,
    pub start_pk: Pk,
    pub end_pk: Pk,
    pub layer_name: String,
    pub check_name: String,
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<NaiveDate>,
    pub status: InspectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_number: Option<i64>,
}

/// A single logical write. The collaborator must accept or reject the
/// whole request so a batch is never partially applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionWriteRequest {
    pub entries: Vec<InspectionEntry>,
}

/// Write collaborator response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub success: bool,
    /// Human-readable failure detail strings, surfaced verbatim.
    #[serde(default)]
    pub details: Vec<String>,
}

impl WriteOutcome {
    /// Classify a non-success response as [`EngineError::SubmitRejected`].
    pub fn into_result(self) -> Result<(), EngineError> {
        if self.success {
            Ok(())
        } else {
            Err(EngineError::SubmitRejected {
                details: self.details,
            })
        }
    }
}
