//! Phase definitions, phase instances and design intervals.

use serde::{Deserialize, Serialize};

use crate::range::PkRange;
use crate::side::Side;
use crate::types::{DbId, Pk};

/// How a phase's progress is measured along the alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasureKind {
    /// A continuous distance split into left/right carriageway sides.
    Linear,
    /// Discrete fixed locations, optionally side-aware.
    Point,
}

/// A reusable phase template identity (one per building-element kind).
///
/// One definition backs many [`Phase`] instances, one per road section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDefinition {
    pub id: DbId,
    pub name: String,
    pub measure: MeasureKind,
    /// Layer names assigned to new instances when none are resolved.
    pub default_layers: Vec<String>,
    /// Check names assigned to new instances when none are resolved.
    pub default_checks: Vec<String>,
}

/// One instance of a definition on a road section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: DbId,
    pub definition_id: DbId,
    pub name: String,
    pub road_id: DbId,
    pub measure: MeasureKind,
    pub intervals: Vec<Interval>,
    /// Resolved layer names for this instance.
    pub layers: Vec<String>,
    /// Resolved check names for this instance.
    pub checks: Vec<String>,
    /// For `Point` phases: every point carries an explicit side instead
    /// of being side-neutral.
    #[serde(default)]
    pub point_has_sides: bool,
}

/// A design interval owned by a phase.
///
/// For `Point` phases an interval represents a single location (a
/// degenerate or short range) with an explicit side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interval {
    pub start_pk: Pk,
    pub end_pk: Pk,
    pub side: Side,
    /// Design specification label shown on the rendered segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Bill-of-quantities figure carried through for the valuation
    /// subsystem; never computed here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_quantity: Option<f64>,
    /// Layer names this interval participates in.
    #[serde(default)]
    pub layers: Vec<String>,
}

impl Interval {
    /// Build an interval with its range stored ordered.
    pub fn new(start_pk: Pk, end_pk: Pk, side: Side) -> Self {
        let range = PkRange::new(start_pk, end_pk);
        Self {
            start_pk: range.start,
            end_pk: range.end,
            side,
            spec: None,
            bill_quantity: None,
            layers: Vec::new(),
        }
    }

    /// The interval's range, re-normalized rather than trusted.
    pub fn range(&self) -> PkRange {
        PkRange::new(self.start_pk, self.end_pk)
    }
}
