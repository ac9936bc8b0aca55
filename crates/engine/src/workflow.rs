//! Workflow template catalog and load-time validation.
//!
//! Templates are static configuration, not per-instance data: one
//! template describes the construction layers of a phase kind, the
//! checks each layer carries, and the dependency/lock/parallel rules
//! between layers. The catalog is validated once when loaded and is
//! read-only afterwards; violations are configuration errors, never
//! request-time errors.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use chainage_core::error::EngineError;
use chainage_core::identity::normalize_name;
use chainage_core::phase::MeasureKind;
use chainage_core::side::Side;
use chainage_core::types::DbId;

// ---------------------------------------------------------------------------
// Template data model
// ---------------------------------------------------------------------------

/// One inspection item belonging to a layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowCheck {
    pub id: DbId,
    pub name: String,
    /// Inspection kinds this check accepts (e.g. site/survey/lab).
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One construction sub-step within a phase's workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowLayer {
    pub id: DbId,
    pub name: String,
    /// Construction stage, 1-based. Dependencies always point at a
    /// strictly earlier stage.
    pub stage: u32,
    /// Layer ids that must have started before this one.
    #[serde(default)]
    pub dependencies: Vec<DbId>,
    /// Layer ids selected and deselected as a unit with this one.
    #[serde(default)]
    pub lock_step_with: Vec<DbId>,
    /// Layer ids that may proceed independently but are compatible
    /// within one submission.
    #[serde(default)]
    pub parallel_with: Vec<DbId>,
    pub checks: Vec<WorkflowCheck>,
}

impl WorkflowLayer {
    /// Whether this layer participates in any lock-step or parallel group.
    pub fn is_grouped(&self) -> bool {
        !self.lock_step_with.is_empty() || !self.parallel_with.is_empty()
    }

    /// Directed link test: `other` appears in this layer's own group lists.
    pub fn links_to(&self, other: DbId) -> bool {
        self.lock_step_with.contains(&other) || self.parallel_with.contains(&other)
    }
}

/// Static workflow for one phase definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: DbId,
    pub phase_name: String,
    pub measure: MeasureKind,
    /// Side every submission is forced to, when the phase kind fixes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_rule: Option<Side>,
    /// Inspection kinds offered when no check narrows them down.
    pub default_types: Vec<String>,
    pub layers: Vec<WorkflowLayer>,
}

impl WorkflowTemplate {
    pub fn layer_by_id(&self, id: DbId) -> Option<&WorkflowLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layer lookup by display name, whitespace/case tolerant.
    pub fn layer_by_name(&self, name: &str) -> Option<&WorkflowLayer> {
        let wanted = normalize_name(name);
        self.layers
            .iter()
            .find(|l| normalize_name(&l.name) == wanted)
    }

    /// The highest-stage layer, target of cross-phase propagation.
    pub fn top_layer(&self) -> Option<&WorkflowLayer> {
        self.layers.iter().max_by_key(|l| l.stage)
    }

    /// Symmetric compatibility link between two layers: same id, or a
    /// `lock_step_with`/`parallel_with` edge in either direction.
    pub fn layers_linked(&self, a: &WorkflowLayer, b: &WorkflowLayer) -> bool {
        a.id == b.id || a.links_to(b.id) || b.links_to(a.id)
    }

    /// Scan for the layer owning a check with this name.
    pub fn layer_for_check(&self, check_name: &str) -> Option<&WorkflowLayer> {
        let wanted = normalize_name(check_name);
        self.layers
            .iter()
            .find(|l| l.checks.iter().any(|c| normalize_name(&c.name) == wanted))
    }

    fn validate(&self) -> Result<(), EngineError> {
        let ids: HashSet<DbId> = self.layers.iter().map(|l| l.id).collect();
        if ids.len() != self.layers.len() {
            return Err(EngineError::Config(format!(
                "Template '{}': duplicate layer ids",
                self.phase_name
            )));
        }

        for layer in &self.layers {
            if layer.stage == 0 {
                return Err(EngineError::Config(format!(
                    "Template '{}': layer '{}' has stage 0; stages are 1-based",
                    self.phase_name, layer.name
                )));
            }

            let referenced = layer
                .dependencies
                .iter()
                .chain(&layer.lock_step_with)
                .chain(&layer.parallel_with);
            for &id in referenced {
                if id == layer.id {
                    return Err(EngineError::Config(format!(
                        "Template '{}': layer '{}' references itself",
                        self.phase_name, layer.name
                    )));
                }
                if !ids.contains(&id) {
                    return Err(EngineError::Config(format!(
                        "Template '{}': layer '{}' references unknown layer id {id}",
                        self.phase_name, layer.name
                    )));
                }
            }

            for &dep in &layer.dependencies {
                if let Some(dep_layer) = self.layer_by_id(dep) {
                    if dep_layer.stage >= layer.stage {
                        return Err(EngineError::Config(format!(
                            "Template '{}': layer '{}' (stage {}) depends on '{}' (stage {}); \
                             dependencies must point at an earlier stage",
                            self.phase_name,
                            layer.name,
                            layer.stage,
                            dep_layer.name,
                            dep_layer.stage
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable catalog mapping phase-definition identities to templates.
///
/// Constructed once at process start and passed explicitly into every
/// engine call; never ambient/global state.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<WorkflowTemplate>,
    by_id: HashMap<DbId, usize>,
    by_name: HashMap<String, usize>,
    /// (template id, normalized check name) -> owning layer id. First
    /// declaration wins when a name repeats; the submission batcher falls
    /// back to scanning selected layers for such names.
    check_owner: HashMap<(DbId, String), DbId>,
}

impl TemplateRegistry {
    /// Validate and index a template catalog. Any violation is fatal.
    pub fn new(templates: Vec<WorkflowTemplate>) -> Result<Self, EngineError> {
        for template in &templates {
            if let Err(err) = template.validate() {
                tracing::error!(template = %template.phase_name, %err, "workflow catalog rejected");
                return Err(err);
            }
        }

        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        let mut check_owner = HashMap::new();
        for (idx, template) in templates.iter().enumerate() {
            by_id.insert(template.id, idx);
            by_name.insert(normalize_name(&template.phase_name), idx);
            for layer in &template.layers {
                for check in &layer.checks {
                    check_owner
                        .entry((template.id, normalize_name(&check.name)))
                        .or_insert(layer.id);
                }
            }
        }

        tracing::info!(count = templates.len(), "workflow template catalog loaded");
        Ok(Self {
            templates,
            by_id,
            by_name,
            check_owner,
        })
    }

    /// Load a catalog serialized as JSON, then validate it.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let templates: Vec<WorkflowTemplate> = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("Template catalog JSON invalid: {e}")))?;
        Self::new(templates)
    }

    pub fn get(&self, template_id: DbId) -> Option<&WorkflowTemplate> {
        self.by_id.get(&template_id).map(|&i| &self.templates[i])
    }

    /// Lookup by phase name, whitespace/case tolerant.
    pub fn get_by_name(&self, phase_name: &str) -> Option<&WorkflowTemplate> {
        self.by_name
            .get(&normalize_name(phase_name))
            .map(|&i| &self.templates[i])
    }

    /// Template for a phase instance: the definition id wins, the phase
    /// name is the fallback.
    pub fn for_phase(&self, definition_id: DbId, phase_name: &str) -> Option<&WorkflowTemplate> {
        self.get(definition_id).or_else(|| self.get_by_name(phase_name))
    }

    /// Precomputed check-name -> owning-layer-id metadata.
    pub fn check_owner(&self, template_id: DbId, check_name: &str) -> Option<DbId> {
        self.check_owner
            .get(&(template_id, normalize_name(check_name)))
            .copied()
    }

    pub fn templates(&self) -> &[WorkflowTemplate] {
        &self.templates
    }
}

// ---------------------------------------------------------------------------
// Builtin catalog
// ---------------------------------------------------------------------------

/// Default inspection kinds offered across the builtin catalog.
pub const DEFAULT_INSPECTION_TYPES: &[&str] = &["site", "survey", "lab"];

fn types(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn check(id: DbId, name: &str, kind: &[&str]) -> WorkflowCheck {
    WorkflowCheck {
        id,
        name: name.to_string(),
        types: types(kind),
        notes: None,
    }
}

/// The standard road-works catalog: earthworks, sub-base course,
/// culverts and drainage outfalls. Serves as seed data and as the
/// fixture catalog in tests.
pub fn builtin_templates() -> Vec<WorkflowTemplate> {
    vec![
        WorkflowTemplate {
            id: 1,
            phase_name: "Earthworks".to_string(),
            measure: MeasureKind::Linear,
            side_rule: None,
            default_types: types(DEFAULT_INSPECTION_TYPES),
            layers: vec![
                WorkflowLayer {
                    id: 101,
                    name: "Subgrade Preparation".to_string(),
                    stage: 1,
                    dependencies: vec![],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![
                        check(1011, "Subgrade Compaction Test", &["lab"]),
                        check(1012, "Subgrade Level Survey", &["survey"]),
                    ],
                },
                WorkflowLayer {
                    id: 102,
                    name: "Embankment Fill".to_string(),
                    stage: 2,
                    dependencies: vec![101],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![
                        check(1021, "Fill Compaction Test", &["lab"]),
                        check(1022, "Fill Material Approval", &["site", "lab"]),
                    ],
                },
                WorkflowLayer {
                    id: 103,
                    name: "Capping Layer".to_string(),
                    stage: 3,
                    dependencies: vec![102],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![
                        check(1031, "Capping Level Survey", &["survey"]),
                        check(1032, "Proof Rolling", &["site"]),
                    ],
                },
            ],
        },
        WorkflowTemplate {
            id: 2,
            phase_name: "Sub-base Course".to_string(),
            measure: MeasureKind::Linear,
            side_rule: None,
            default_types: types(DEFAULT_INSPECTION_TYPES),
            layers: vec![WorkflowLayer {
                id: 201,
                name: "Granular Sub-base".to_string(),
                stage: 1,
                dependencies: vec![],
                lock_step_with: vec![],
                parallel_with: vec![],
                checks: vec![
                    check(2011, "Gradation Test", &["lab"]),
                    check(2012, "Thickness Survey", &["survey"]),
                    check(2013, "Sub-base Compaction Test", &["lab"]),
                ],
            }],
        },
        WorkflowTemplate {
            id: 3,
            phase_name: "Culverts".to_string(),
            measure: MeasureKind::Point,
            side_rule: None,
            default_types: types(DEFAULT_INSPECTION_TYPES),
            layers: vec![
                WorkflowLayer {
                    id: 301,
                    name: "Excavation".to_string(),
                    stage: 1,
                    dependencies: vec![],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![check(3011, "Formation Approval", &["site"])],
                },
                WorkflowLayer {
                    id: 302,
                    name: "Blinding".to_string(),
                    stage: 2,
                    dependencies: vec![301],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![check(3021, "Blinding Level Survey", &["survey"])],
                },
                WorkflowLayer {
                    id: 303,
                    name: "Base Slab".to_string(),
                    stage: 3,
                    dependencies: vec![302],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![
                        check(3031, "Base Rebar Inspection", &["site"]),
                        check(3032, "Base Concrete Pour", &["site", "lab"]),
                    ],
                },
                WorkflowLayer {
                    id: 304,
                    name: "Wall".to_string(),
                    stage: 4,
                    dependencies: vec![303],
                    lock_step_with: vec![305, 306, 307],
                    parallel_with: vec![],
                    checks: vec![
                        check(3041, "Wall Rebar Inspection", &["site"]),
                        check(3042, "Wall Formwork Check", &["site"]),
                    ],
                },
                WorkflowLayer {
                    id: 305,
                    name: "Wing Wall".to_string(),
                    stage: 4,
                    dependencies: vec![303],
                    lock_step_with: vec![304, 306, 307],
                    parallel_with: vec![],
                    checks: vec![check(3051, "Wing Wall Rebar Inspection", &["site"])],
                },
                WorkflowLayer {
                    id: 306,
                    name: "Roof Slab".to_string(),
                    stage: 4,
                    dependencies: vec![303],
                    lock_step_with: vec![304, 305, 307],
                    parallel_with: vec![],
                    checks: vec![
                        check(3061, "Roof Rebar Inspection", &["site"]),
                        check(3062, "Roof Concrete Pour", &["site", "lab"]),
                    ],
                },
                WorkflowLayer {
                    id: 307,
                    name: "Cap Beam".to_string(),
                    stage: 4,
                    dependencies: vec![303],
                    lock_step_with: vec![304, 305, 306],
                    parallel_with: vec![],
                    checks: vec![check(3071, "Cap Formwork Check", &["site"])],
                },
                WorkflowLayer {
                    id: 308,
                    name: "Apron".to_string(),
                    stage: 5,
                    dependencies: vec![306],
                    lock_step_with: vec![],
                    parallel_with: vec![309],
                    checks: vec![check(3081, "Apron Concrete Pour", &["site", "lab"])],
                },
                WorkflowLayer {
                    id: 309,
                    name: "Headwall".to_string(),
                    stage: 5,
                    dependencies: vec![306],
                    lock_step_with: vec![],
                    parallel_with: vec![308],
                    checks: vec![check(3091, "Headwall Finish Inspection", &["site"])],
                },
            ],
        },
        WorkflowTemplate {
            id: 4,
            phase_name: "Drainage Outfalls".to_string(),
            measure: MeasureKind::Point,
            side_rule: None,
            default_types: types(&["site", "survey"]),
            layers: vec![
                WorkflowLayer {
                    id: 401,
                    name: "Outfall Excavation".to_string(),
                    stage: 1,
                    dependencies: vec![],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![check(4011, "Outfall Formation Approval", &["site"])],
                },
                WorkflowLayer {
                    id: 402,
                    name: "Pipe Bedding".to_string(),
                    stage: 2,
                    dependencies: vec![401],
                    lock_step_with: vec![],
                    parallel_with: vec![],
                    checks: vec![
                        check(4021, "Bedding Level Survey", &["survey"]),
                        check(4022, "Pipe Jointing Inspection", &["site"]),
                    ],
                },
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
