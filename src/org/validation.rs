//! Structural validation of the reports-to graph

use super::resolve::{EmployeeIndex, ManagerResolution};
use crate::employee::{Employee, EmployeeId};
use serde::{Deserialize, Serialize};
use talentgraph_algorithms::{find_parent_cycles, HierarchyView};

/// Consolidated outcome of a structural check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Ids on a reporting cycle of length two or more
    pub circular_references: Vec<EmployeeId>,
    /// Ids whose manager reference resolves to no known employee
    pub orphaned: Vec<EmployeeId>,
    /// Ids listed as their own manager
    pub self_managed: Vec<EmployeeId>,
    /// Ids whose manager name matches more than one employee
    pub ambiguous_references: Vec<EmployeeId>,
    /// Ids carried by more than one record
    pub duplicate_ids: Vec<EmployeeId>,
    /// Human-readable messages, one per finding
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Every id named by any finding, sorted and deduplicated
    pub fn offending_ids(&self) -> Vec<EmployeeId> {
        let mut ids: Vec<EmployeeId> = self
            .circular_references
            .iter()
            .chain(&self.orphaned)
            .chain(&self.self_managed)
            .chain(&self.ambiguous_references)
            .chain(&self.duplicate_ids)
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Validate a snapshot without building a graph service
pub fn validate_structure(employees: &[Employee]) -> ValidationResult {
    let index = EmployeeIndex::build(employees);
    let resolutions: Vec<ManagerResolution> = employees.iter().map(|e| index.resolve(e)).collect();
    let view = hierarchy_view(employees, &index, &resolutions);
    check(employees, &index, &resolutions, &view)
}

/// Dense view over canonical records, edges only for unambiguous resolutions
pub(crate) fn hierarchy_view(
    employees: &[Employee],
    index: &EmployeeIndex<'_>,
    resolutions: &[ManagerResolution],
) -> HierarchyView {
    let links: Vec<(u64, Option<u64>)> = employees
        .iter()
        .enumerate()
        .filter(|(pos, e)| index.is_canonical(*pos, e.id))
        .map(|(pos, e)| (e.id.as_u64(), resolutions[pos].manager_id().map(|m| m.as_u64())))
        .collect();
    HierarchyView::from_parent_links(&links)
}

/// One pass over resolutions for orphans, self-management and ambiguity,
/// plus the three-color cycle walk over the view.
pub(crate) fn check(
    employees: &[Employee],
    index: &EmployeeIndex<'_>,
    resolutions: &[ManagerResolution],
    view: &HierarchyView,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    let mut duplicates = index.duplicate_ids.clone();
    duplicates.sort_unstable();
    duplicates.dedup();
    for id in duplicates {
        result.errors.push(format!("Employee id {} appears more than once", id));
        result.duplicate_ids.push(id);
    }

    for (pos, (employee, resolution)) in employees.iter().zip(resolutions).enumerate() {
        if !index.is_canonical(pos, employee.id) {
            continue;
        }
        match resolution {
            ManagerResolution::Unresolved { reference } => {
                result.orphaned.push(employee.id);
                result.errors.push(format!(
                    "Employee {} ({}) reports to unknown manager {}",
                    employee.id, employee.name, reference
                ));
            }
            ManagerResolution::SelfReference => {
                result.self_managed.push(employee.id);
                result.errors.push(format!(
                    "Employee {} ({}) is listed as their own manager",
                    employee.id, employee.name
                ));
            }
            ManagerResolution::Ambiguous { candidates } => {
                result.ambiguous_references.push(employee.id);
                let ids: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                result.errors.push(format!(
                    "Employee {} ({}) has a manager name matching {} employees: [{}]",
                    employee.id,
                    employee.name,
                    candidates.len(),
                    ids.join(", ")
                ));
            }
            ManagerResolution::Root
            | ManagerResolution::ById { .. }
            | ManagerResolution::ByName { .. } => {}
        }
    }

    for cycle in find_parent_cycles(view) {
        // Self-edges never enter the view, so every cycle has length >= 2
        let ids: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
        result.errors.push(format!(
            "Circular reporting chain among {} employees: [{}]",
            cycle.len(),
            ids.join(", ")
        ));
        result.circular_references.extend(cycle.into_iter().map(EmployeeId));
    }

    result.circular_references.sort_unstable();
    result.orphaned.sort_unstable();
    result.self_managed.sort_unstable();
    result.ambiguous_references.sort_unstable();
    result.is_valid = result.errors.is_empty();
    result
}
