//! Snapshot indexing with id-or-name key fallback.
//!
//! The read collaborator supplies one immutable list of inspection
//! records per computation pass. Some records carry numeric ids, others
//! reference their layer/check by display name only, so every record is
//! indexed under both its id-based and its name-based composite key and
//! lookups try the id key first. Reduction per key uses the shared
//! priority/recency rule.

use std::collections::HashMap;

use chainage_core::identity::{base_snapshot_key, normalize_name, snapshot_key, Identity};
use chainage_core::inspection::InspectionRecord;
use chainage_core::range::PkRange;
use chainage_core::side::Side;
use chainage_core::status::StatusStamp;
use chainage_core::types::DbId;

/// An id/name pair addressing one phase, layer or check.
///
/// Engine callers usually hold both (taken from the template); records
/// may hold either.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef<'a> {
    pub id: Option<DbId>,
    pub name: Option<&'a str>,
}

impl<'a> EntityRef<'a> {
    pub fn full(id: DbId, name: &'a str) -> Self {
        Self {
            id: Some(id),
            name: Some(name),
        }
    }

    pub fn named(name: &'a str) -> Self {
        Self {
            id: None,
            name: Some(name),
        }
    }

    /// Identity preferring the id.
    fn primary(&self) -> Identity {
        Identity::resolve(self.id, self.name)
    }

    /// Name-based identity, when a usable name exists.
    fn named_identity(&self) -> Option<Identity> {
        match self.name.map(Identity::by_name) {
            Some(Identity::ByName(n)) => Some(Identity::ByName(n)),
            _ => None,
        }
    }

    /// Whether a record's id/name pair refers to this entity. A present
    /// id is authoritative; the name comparison is the fallback for
    /// name-only records.
    pub fn matches(&self, record_id: Option<DbId>, record_name: Option<&str>) -> bool {
        match (self.id, record_id) {
            (Some(a), Some(b)) => a == b,
            _ => match (self.name, record_name) {
                (Some(a), Some(b)) => normalize_name(a) == normalize_name(b),
                _ => false,
            },
        }
    }
}

/// One inspection observation cut down to what the overlay consumes.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSlice {
    pub range: PkRange,
    pub stamp: StatusStamp,
}

/// Immutable index over one snapshot list.
pub struct SnapshotIndex<'a> {
    records: &'a [InspectionRecord],
    /// Exact (phase, layer, check, range, side) tuples, reduced per key.
    by_key: HashMap<String, StatusStamp>,
    /// Side-less tuples, collecting every side seen for the tuple.
    by_base: HashMap<String, Vec<(Side, StatusStamp)>>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn new(records: &'a [InspectionRecord]) -> Self {
        let mut by_key: HashMap<String, StatusStamp> = HashMap::new();
        let mut by_base: HashMap<String, Vec<(Side, StatusStamp)>> = HashMap::new();

        for record in records {
            let range = record.range();
            let stamp = record.stamp();
            let primary = (
                record.phase_identity(),
                record.layer_identity(),
                record.check_identity(),
            );
            let named = (
                named_or(&primary.0, record.phase_name.as_deref()),
                named_or(&primary.1, record.layer_name.as_deref()),
                named_or(&primary.2, record.check_name.as_deref()),
            );

            let fallback = (named != primary).then_some(&named);
            for (phase, layer, check) in std::iter::once(&primary).chain(fallback) {
                let full = snapshot_key(phase, layer, check, &range, record.side);
                by_key
                    .entry(full)
                    .and_modify(|current| {
                        if stamp.beats(current) {
                            *current = stamp;
                        }
                    })
                    .or_insert(stamp);

                let base = base_snapshot_key(phase, layer, check, &range);
                by_base.entry(base).or_default().push((record.side, stamp));
            }
        }

        Self {
            records,
            by_key,
            by_base,
        }
    }

    /// Latest status for one exact tuple. Tries the id-based key, then
    /// the name-based key.
    pub fn status_for(
        &self,
        phase: EntityRef,
        layer: EntityRef,
        check: EntityRef,
        range: PkRange,
        side: Side,
    ) -> Option<StatusStamp> {
        self.key_lookup(phase, layer, check, |p, l, c| {
            self.by_key
                .get(&snapshot_key(p, l, c, &range, side))
                .copied()
        })
    }

    /// Every (side, status) observation for one side-less tuple.
    pub fn statuses_by_side(
        &self,
        phase: EntityRef,
        layer: EntityRef,
        check: EntityRef,
        range: PkRange,
    ) -> Vec<(Side, StatusStamp)> {
        self.key_lookup(phase, layer, check, |p, l, c| {
            let observations = self.by_base.get(&base_snapshot_key(p, l, c, &range))?;
            Some(observations.clone())
        })
        .unwrap_or_default()
    }

    fn key_lookup<T>(
        &self,
        phase: EntityRef,
        layer: EntityRef,
        check: EntityRef,
        get: impl Fn(&Identity, &Identity, &Identity) -> Option<T>,
    ) -> Option<T> {
        let hit = get(&phase.primary(), &layer.primary(), &check.primary());
        if hit.is_some() {
            return hit;
        }
        match (
            phase.named_identity(),
            layer.named_identity(),
            check.named_identity(),
        ) {
            (Some(p), Some(l), Some(c)) => get(&p, &l, &c),
            _ => None,
        }
    }

    /// Every record for one phase.
    pub fn phase_records<'q>(
        &'q self,
        phase: EntityRef<'q>,
    ) -> impl Iterator<Item = &'a InspectionRecord> + 'q {
        self.records
            .iter()
            .filter(move |r| phase.matches(r.phase_id, r.phase_name.as_deref()))
    }

    /// Every record for one (phase, layer) pair.
    pub fn layer_records<'q>(
        &'q self,
        phase: EntityRef<'q>,
        layer: EntityRef<'q>,
    ) -> impl Iterator<Item = &'a InspectionRecord> + 'q {
        self.phase_records(phase)
            .filter(move |r| layer.matches(r.layer_id, r.layer_name.as_deref()))
    }

    /// Every record for one (phase, layer, check) tuple.
    pub fn check_records<'q>(
        &'q self,
        phase: EntityRef<'q>,
        layer: EntityRef<'q>,
        check: EntityRef<'q>,
    ) -> impl Iterator<Item = &'a InspectionRecord> + 'q {
        self.layer_records(phase, layer)
            .filter(move |r| check.matches(r.check_id, r.check_name.as_deref()))
    }

    /// Inspection slices for one phase and query side, clipped to records
    /// overlapping `range`. A `Both` record counts toward either side.
    pub fn slices(&self, phase: EntityRef, query_side: Side, range: PkRange) -> Vec<SnapshotSlice> {
        self.phase_records(phase)
            .filter(|r| r.side.satisfies(query_side) || query_side == Side::Both)
            .filter(|r| r.range().overlaps(&range))
            .map(|r| SnapshotSlice {
                range: r.range(),
                stamp: r.stamp(),
            })
            .collect()
    }
}

/// The name-based identity for the fallback key, reusing the primary
/// identity when it is already name-based.
fn named_or(primary: &Identity, name: Option<&str>) -> Identity {
    match name.map(Identity::by_name) {
        Some(Identity::ByName(n)) => Identity::ByName(n),
        _ => primary.clone(),
    }
}
