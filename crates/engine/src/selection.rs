//! Layer/check selection rules for the submission form.
//!
//! Selection is stage-gated and group-aware: candidates outside the
//! `{min, min+1}` stage window need an explicit lock-step/parallel link
//! to an already-selected layer, and grouped layers never mix with
//! unrelated layers inside the window. Lock-step groups toggle as a
//! unit. Checks scope to the selected layers, with explicit user
//! exclusions remembered so a re-selected layer does not resurrect a
//! check the user removed.

use std::collections::HashSet;

use chainage_core::identity::normalize_name;
use chainage_core::range::PkRange;
use chainage_core::side::Side;

use crate::snapshots::{EntityRef, SnapshotIndex};
use crate::workflow::{WorkflowCheck, WorkflowLayer, WorkflowTemplate};

/// Mutable selection state for one submission form.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Selected layer names, in selection order.
    layers: Vec<String>,
    /// Selected check names, in selection order.
    checks: Vec<String>,
    /// Normalized names of checks the user explicitly removed.
    excluded_checks: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    pub fn checks(&self) -> &[String] {
        &self.checks
    }

    pub fn is_layer_selected(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.layers.iter().any(|l| normalize_name(l) == wanted)
    }

    pub fn is_check_selected(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.checks.iter().any(|c| normalize_name(c) == wanted)
    }

    /// Whether `candidate` may be toggled on given the current selection.
    ///
    /// An empty selection enables everything. Otherwise the candidate
    /// must sit in the `{min, min+1}` stage window (where group-free
    /// layers mix freely but grouped layers only join layers they are
    /// linked to) or carry an explicit link to an already-selected
    /// layer.
    pub fn layer_selectable(&self, template: &WorkflowTemplate, candidate: &str) -> bool {
        let candidate = match template.layer_by_name(candidate) {
            Some(layer) => layer,
            None => return false,
        };
        let selected = self.selected_layers(template);
        if selected.is_empty() {
            return true;
        }
        if selected.iter().any(|s| s.id == candidate.id) {
            return true;
        }

        let min_stage = selected.iter().map(|s| s.stage).min().unwrap_or(1);
        let linked_any = selected
            .iter()
            .any(|s| template.layers_linked(candidate, s));
        let in_window = candidate.stage == min_stage || candidate.stage == min_stage + 1;
        if !in_window {
            return linked_any;
        }
        selected.iter().any(|s| {
            template.layers_linked(candidate, s)
                || (!candidate.is_grouped() && !s.is_grouped())
        })
    }

    /// Toggle a layer, carrying its whole lock-step group with it.
    ///
    /// The group follows the toggled layer's own `lock_step_with` list;
    /// links are not closed over, so deselecting a layer only drags the
    /// members it lists itself.
    pub fn toggle_layer(&mut self, template: &WorkflowTemplate, name: &str) {
        let layer = match template.layer_by_name(name) {
            Some(layer) => layer,
            None => return,
        };
        let group: Vec<&WorkflowLayer> = std::iter::once(layer)
            .chain(
                layer
                    .lock_step_with
                    .iter()
                    .filter_map(|&id| template.layer_by_id(id)),
            )
            .collect();

        if self.is_layer_selected(&layer.name) {
            for member in &group {
                let wanted = normalize_name(&member.name);
                self.layers.retain(|l| normalize_name(l) != wanted);
            }
            self.prune_disallowed_checks(template);
        } else {
            for member in &group {
                if !self.is_layer_selected(&member.name) {
                    self.layers.push(member.name.clone());
                }
            }
            for member in &group {
                for check in &member.checks {
                    let key = normalize_name(&check.name);
                    if !self.excluded_checks.contains(&key) && !self.is_check_selected(&check.name)
                    {
                        self.checks.push(check.name.clone());
                    }
                }
            }
        }
    }

    /// Toggle a check. Turning one off records an explicit exclusion;
    /// turning one on is only honored while the check is in scope.
    pub fn toggle_check(&mut self, template: &WorkflowTemplate, name: &str) {
        let key = normalize_name(name);
        if let Some(pos) = self.checks.iter().position(|c| normalize_name(c) == key) {
            self.checks.remove(pos);
            self.excluded_checks.insert(key);
        } else if let Some(check) = self
            .allowed_checks(template)
            .into_iter()
            .find(|c| normalize_name(&c.name) == key)
        {
            self.checks.push(check.name.clone());
            self.excluded_checks.remove(&key);
        }
    }

    /// The union of checks belonging to the selected layers.
    pub fn allowed_checks<'t>(&self, template: &'t WorkflowTemplate) -> Vec<&'t WorkflowCheck> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for layer in self.selected_layers(template) {
            for check in &layer.checks {
                if seen.insert(normalize_name(&check.name)) {
                    out.push(check);
                }
            }
        }
        out
    }

    /// Inspection types offered: the workflow's defaults narrowed to the
    /// types declared on the selected checks. Never empty: an empty
    /// intersection falls back to the full default list.
    pub fn available_types(&self, template: &WorkflowTemplate) -> Vec<String> {
        let selected: HashSet<String> = self.checks.iter().map(|c| normalize_name(c)).collect();
        let mut declared = HashSet::new();
        for layer in self.selected_layers(template) {
            for check in &layer.checks {
                if selected.contains(&normalize_name(&check.name)) {
                    for ty in &check.types {
                        declared.insert(ty.clone());
                    }
                }
            }
        }
        let narrowed: Vec<String> = template
            .default_types
            .iter()
            .filter(|t| declared.contains(*t))
            .cloned()
            .collect();
        if narrowed.is_empty() {
            template.default_types.clone()
        } else {
            narrowed
        }
    }

    fn selected_layers<'t>(&self, template: &'t WorkflowTemplate) -> Vec<&'t WorkflowLayer> {
        self.layers
            .iter()
            .filter_map(|name| template.layer_by_name(name))
            .collect()
    }

    fn prune_disallowed_checks(&mut self, template: &WorkflowTemplate) {
        let allowed: HashSet<String> = self
            .allowed_checks(template)
            .iter()
            .map(|c| normalize_name(&c.name))
            .collect();
        self.checks.retain(|c| allowed.contains(&normalize_name(c)));
    }
}

/// Whether a layer is read-only for the side in view: every one of its
/// checks already carries a committed snapshot overlapping the booking
/// range.
pub fn layer_locked(
    index: &SnapshotIndex,
    phase: EntityRef,
    layer: &WorkflowLayer,
    range: PkRange,
    side: Side,
) -> bool {
    if layer.checks.is_empty() {
        return false;
    }
    layer.checks.iter().all(|check| {
        index
            .check_records(
                phase,
                EntityRef::full(layer.id, &layer.name),
                EntityRef::full(check.id, &check.name),
            )
            .any(|r| {
                r.status.is_committed() && r.range().overlaps(&range) && r.side.satisfies(side)
            })
    })
}
