//! Cross-phase propagation.
//!
//! Finishing the sub-base course over a range implies the final
//! earthwork layer underneath is inherently satisfied, so a committed
//! sub-base snapshot synthesizes derived `Approved` snapshots for the
//! earthworks phase's top layer at the same range and side. The pairing
//! is a declared table, not an inference; extending it to other phase
//! pairs is a product decision. Derived records are flagged `synthetic`
//! and must never reach the write collaborator.

use chainage_core::identity::normalize_name;
use chainage_core::inspection::InspectionRecord;
use chainage_core::phase::Phase;
use chainage_core::status::InspectionStatus;

use crate::workflow::TemplateRegistry;

/// One declared source → target phase pairing.
#[derive(Debug, Clone)]
pub struct PropagationRule {
    pub source_phase: String,
    pub target_phase: String,
}

/// The standard pairing: sub-base course completion approves the top
/// earthworks layer.
pub fn default_rules() -> Vec<PropagationRule> {
    vec![PropagationRule {
        source_phase: "Sub-base Course".to_string(),
        target_phase: "Earthworks".to_string(),
    }]
}

/// Synthesize derived records for every committed source-phase record.
///
/// `phases` supplies the phase instances in scope (one road section);
/// the target instance is matched on the same road as the source. The
/// returned records carry `synthetic = true` and participate in merge
/// and progress computations exactly like real ones.
pub fn synthesize(
    registry: &TemplateRegistry,
    rules: &[PropagationRule],
    phases: &[Phase],
    records: &[InspectionRecord],
) -> Vec<InspectionRecord> {
    let mut derived = Vec::new();
    for rule in rules {
        let sources: Vec<&Phase> = phases
            .iter()
            .filter(|p| normalize_name(&p.name) == normalize_name(&rule.source_phase))
            .collect();
        for source in sources {
            let target = match phases.iter().find(|p| {
                p.road_id == source.road_id
                    && normalize_name(&p.name) == normalize_name(&rule.target_phase)
            }) {
                Some(target) => target,
                None => continue,
            };
            let template = match registry.for_phase(target.definition_id, &target.name) {
                Some(template) => template,
                None => continue,
            };
            let top = match template.top_layer() {
                Some(top) => top,
                None => continue,
            };

            for record in records {
                let matches_source = match record.phase_id {
                    Some(id) => id == source.id,
                    None => record
                        .phase_name
                        .as_deref()
                        .map(|n| normalize_name(n) == normalize_name(&source.name))
                        .unwrap_or(false),
                };
                if !matches_source || !record.status.is_committed() {
                    continue;
                }
                for check in &top.checks {
                    derived.push(InspectionRecord {
                        phase_id: Some(target.id),
                        phase_name: Some(target.name.clone()),
                        start_pk: record.start_pk,
                        end_pk: record.end_pk,
                        side: record.side,
                        status: InspectionStatus::Approved,
                        layer_id: Some(top.id),
                        layer_name: Some(top.name.clone()),
                        check_id: Some(check.id),
                        check_name: Some(check.name.clone()),
                        updated_at: record.updated_at,
                        synthetic: true,
                    });
                }
            }
        }
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{builtin_templates, TemplateRegistry};
    use chainage_core::phase::MeasureKind;
    use chainage_core::side::Side;
    use chrono::{TimeZone, Utc};

    fn phases() -> Vec<Phase> {
        let blank = |id, definition_id, name: &str| Phase {
            id,
            definition_id,
            name: name.to_string(),
            road_id: 1,
            measure: MeasureKind::Linear,
            intervals: vec![],
            layers: vec![],
            checks: vec![],
            point_has_sides: false,
        };
        vec![blank(10, 1, "Earthworks"), blank(20, 2, "Sub-base Course")]
    }

    fn sub_base_record(status: InspectionStatus) -> InspectionRecord {
        InspectionRecord {
            phase_id: Some(20),
            phase_name: Some("Sub-base Course".to_string()),
            start_pk: 0.0,
            end_pk: 400.0,
            side: Side::Left,
            status,
            layer_id: None,
            layer_name: Some("Granular Sub-base".to_string()),
            check_id: None,
            check_name: Some("Gradation Test".to_string()),
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            synthetic: false,
        }
    }

    #[test]
    fn committed_sub_base_approves_top_earthworks_layer() {
        let registry = TemplateRegistry::new(builtin_templates()).unwrap();
        let records = vec![sub_base_record(InspectionStatus::Scheduled)];
        let derived = synthesize(&registry, &default_rules(), &phases(), &records);

        // Capping Layer has two checks.
        assert_eq!(derived.len(), 2);
        for record in &derived {
            assert_eq!(record.phase_id, Some(10));
            assert_eq!(record.layer_name.as_deref(), Some("Capping Layer"));
            assert_eq!(record.status, InspectionStatus::Approved);
            assert_eq!(record.side, Side::Left);
            assert_eq!((record.start_pk, record.end_pk), (0.0, 400.0));
            assert!(record.synthetic);
        }
    }

    #[test]
    fn pending_sub_base_propagates_nothing() {
        let registry = TemplateRegistry::new(builtin_templates()).unwrap();
        let records = vec![sub_base_record(InspectionStatus::Pending)];
        let derived = synthesize(&registry, &default_rules(), &phases(), &records);
        assert!(derived.is_empty());
    }

    #[test]
    fn missing_target_phase_propagates_nothing() {
        let registry = TemplateRegistry::new(builtin_templates()).unwrap();
        let only_sub_base: Vec<Phase> = phases()
            .into_iter()
            .filter(|p| p.name == "Sub-base Course")
            .collect();
        let records = vec![sub_base_record(InspectionStatus::Approved)];
        let derived = synthesize(&registry, &default_rules(), &only_sub_base, &records);
        assert!(derived.is_empty());
    }

    #[test]
    fn unrelated_phase_records_ignored() {
        let registry = TemplateRegistry::new(builtin_templates()).unwrap();
        let mut record = sub_base_record(InspectionStatus::Approved);
        record.phase_id = Some(999);
        record.phase_name = Some("Culverts".to_string());
        let records = vec![record];
        let derived = synthesize(&registry, &default_rules(), &phases(), &records);
        assert!(derived.is_empty());
    }
}
