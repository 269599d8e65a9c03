//! Organizational hierarchy graph service
//!
//! Builds a directed reports-to graph from an employee snapshot and answers
//! hierarchy queries against it:
//! - direct and transitive reports (cached, O(1) per lookup)
//! - reporting chains, with a cycle guard on every walk
//! - manager discovery by team size
//! - structural validation (cycles, orphans, self-management)
//!
//! An `OrgGraph` borrows its snapshot and is never mutated after
//! construction. There is no add / update / remove: a changed population
//! needs a new instance, so cached closures can never go stale.

pub mod resolve;
pub mod validation;

pub use resolve::ManagerResolution;
pub use validation::{validate_structure, ValidationResult};

use crate::employee::{Employee, EmployeeId};
use resolve::EmployeeIndex;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::OnceLock;
use talentgraph_algorithms::{ancestor_path, transitive_closure, HierarchyView};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised by the org graph service
#[derive(Error, Debug, PartialEq)]
pub enum OrgError {
    #[error("Invalid org structure: {}", .0.errors.join("; "))]
    InvalidStructure(Box<ValidationResult>),

    #[error("Reporting chain of employee {start} runs into a cycle among {cycle:?}")]
    CycleDetected {
        start: EmployeeId,
        cycle: Vec<EmployeeId>,
    },

    #[error("Validation bypass requires a justification")]
    MissingJustification,
}

pub type OrgResult<T> = Result<T, OrgError>;

/// Structural validation mode for graph construction.
///
/// `Enforce` is the only mode available to production builds. `Bypass`
/// exists for tests and for tooling built with the `partial-data` feature,
/// and must name why the input is known to be partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Enforce,
    #[cfg(any(test, feature = "partial-data"))]
    Bypass { justification: &'static str },
}

/// Manager id -> every transitive report
#[derive(Debug, Clone, Default)]
pub struct OrgTree {
    reports: FxHashMap<EmployeeId, Vec<EmployeeId>>,
    cyclic: Vec<EmployeeId>,
}

impl OrgTree {
    /// Transitive reports of `id`, sorted; empty for unknown ids
    pub fn get(&self, id: EmployeeId) -> &[EmployeeId] {
        self.reports.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of keys. Every employee is a key, childless ones map to empty.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EmployeeId, &Vec<EmployeeId>)> {
        self.reports.iter()
    }

    /// Ids whose transitive report count is at least `min_team_size`, sorted
    pub fn managers(&self, min_team_size: usize) -> Vec<EmployeeId> {
        let mut ids: Vec<EmployeeId> = self
            .reports
            .iter()
            .filter(|(_, reports)| reports.len() >= min_team_size)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids whose downward walk came back to themselves
    pub fn cyclic_ids(&self) -> &[EmployeeId] {
        &self.cyclic
    }
}

/// Read-only reports-to graph over a borrowed snapshot
pub struct OrgGraph<'a> {
    employees: &'a [Employee],
    index: EmployeeIndex<'a>,
    resolutions: Vec<ManagerResolution>,
    direct: FxHashMap<EmployeeId, Vec<EmployeeId>>,
    view: HierarchyView,
    validation: ValidationResult,
    org_tree: OnceLock<OrgTree>,
}

impl<'a> OrgGraph<'a> {
    /// Build the graph and, unless bypassed, fail on any structural defect.
    pub fn new(employees: &'a [Employee], validation: Validation) -> OrgResult<Self> {
        let index = EmployeeIndex::build(employees);
        let resolutions: Vec<ManagerResolution> =
            employees.iter().map(|e| index.resolve(e)).collect();
        let direct = build_direct_reports(employees, &index, &resolutions);
        let view = validation::hierarchy_view(employees, &index, &resolutions);
        let result = validation::check(employees, &index, &resolutions, &view);

        match validation {
            Validation::Enforce => {
                if !result.is_valid {
                    warn!(
                        errors = result.errors.len(),
                        "Rejecting org graph with structural defects"
                    );
                    return Err(OrgError::InvalidStructure(Box::new(result)));
                }
            }
            #[cfg(any(test, feature = "partial-data"))]
            Validation::Bypass { justification } => {
                if justification.trim().is_empty() {
                    return Err(OrgError::MissingJustification);
                }
                warn!(
                    justification,
                    defects = result.errors.len(),
                    "Structural validation bypassed"
                );
            }
        }

        info!(
            "Built org graph: {} employees, {} managers",
            index.by_id.len(),
            direct.len()
        );

        Ok(Self {
            employees,
            index,
            resolutions,
            direct,
            view,
            validation: result,
            org_tree: OnceLock::new(),
        })
    }

    /// Build with validation enforced
    pub fn validated(employees: &'a [Employee]) -> OrgResult<Self> {
        Self::new(employees, Validation::Enforce)
    }

    /// The snapshot this graph was built from
    pub fn employees(&self) -> &'a [Employee] {
        self.employees
    }

    /// Number of distinct employee ids
    pub fn len(&self) -> usize {
        self.index.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.by_id.is_empty()
    }

    /// Direct reports of `manager`; empty for unknown or childless ids
    pub fn direct_reports(&self, manager: EmployeeId) -> &[EmployeeId] {
        self.direct.get(&manager).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every transitive report of `manager`; empty for unknown or childless ids
    pub fn all_reports(&self, manager: EmployeeId) -> &[EmployeeId] {
        self.org_tree().get(manager)
    }

    /// Transitive closure for every employee, computed on first use.
    ///
    /// Each walk carries its own visited set. When validation was bypassed
    /// and a cycle exists, the walk stops at the repeat and the id is
    /// recorded in `cyclic_ids`.
    pub fn org_tree(&self) -> &OrgTree {
        self.org_tree.get_or_init(|| {
            let closures = transitive_closure(&self.view);
            let mut reports = FxHashMap::default();
            let mut cyclic = Vec::new();

            for (idx, closure) in closures.into_iter().enumerate() {
                let id = EmployeeId(self.view.index_to_node[idx]);
                if closure.cycle_hit {
                    cyclic.push(id);
                }
                reports.insert(id, closure.members.into_iter().map(EmployeeId).collect());
            }

            cyclic.sort_unstable();
            if !cyclic.is_empty() {
                warn!(ids = ?cyclic, "Org tree traversal stopped at reporting cycles");
            }
            OrgTree { reports, cyclic }
        })
    }

    /// Managers from the immediate one up to the root.
    ///
    /// Unknown ids yield an empty chain. A walk that runs into a cycle is a
    /// structural failure and is reported as `CycleDetected`.
    pub fn reporting_chain(&self, employee: EmployeeId) -> OrgResult<Vec<EmployeeId>> {
        let Some(path) = ancestor_path(&self.view, employee.as_u64()) else {
            return Ok(Vec::new());
        };

        if let Some(cycle) = path.cycle {
            warn!(start = %employee, "Reporting chain runs into a cycle");
            return Err(OrgError::CycleDetected {
                start: employee,
                cycle: cycle.into_iter().map(EmployeeId).collect(),
            });
        }

        Ok(path.path.into_iter().map(EmployeeId).collect())
    }

    /// Ids with at least `min_team_size` transitive reports, sorted
    pub fn find_managers(&self, min_team_size: usize) -> Vec<EmployeeId> {
        self.org_tree().managers(min_team_size)
    }

    /// Ids with at least `min_team_size` direct reports, sorted
    pub fn find_direct_managers(&self, min_team_size: usize) -> Vec<EmployeeId> {
        let mut ids: Vec<EmployeeId> = self
            .direct
            .iter()
            .filter(|(_, reports)| reports.len() >= min_team_size)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The structural check computed at construction
    pub fn validate_structure(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn employee_by_id(&self, id: EmployeeId) -> Option<&'a Employee> {
        let employees = self.employees;
        self.index.by_id.get(&id).map(|&pos| &employees[pos])
    }

    /// First employee carrying `name`.
    ///
    /// Names are not unique. With duplicates this returns an arbitrary one of
    /// them, so use it for display or a one-time name -> id conversion only,
    /// never to drive traversal.
    pub fn employee_by_name(&self, name: &str) -> Option<&'a Employee> {
        let id = self.index.by_name.get(name.trim())?.first()?;
        self.employee_by_id(*id)
    }

    /// Every employee carrying `name`
    pub fn employees_by_name(&self, name: &str) -> Vec<&'a Employee> {
        self.index
            .by_name
            .get(name.trim())
            .map(|ids| ids.iter().filter_map(|id| self.employee_by_id(*id)).collect())
            .unwrap_or_default()
    }

    /// How `employee`'s manager reference was resolved
    pub fn resolution(&self, employee: EmployeeId) -> Option<&ManagerResolution> {
        self.index.by_id.get(&employee).map(|&pos| &self.resolutions[pos])
    }

    /// Resolved manager id of `employee`
    pub fn manager_of(&self, employee: EmployeeId) -> Option<EmployeeId> {
        self.resolution(employee).and_then(ManagerResolution::manager_id)
    }

    /// Employees without a manager reference, sorted
    pub fn roots(&self) -> Vec<EmployeeId> {
        let mut roots: Vec<EmployeeId> = self
            .index
            .by_id
            .iter()
            .filter(|(_, &pos)| self.resolutions[pos].is_root())
            .map(|(id, _)| *id)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Number of managers between `employee` and its root.
    /// `None` for unknown ids and for ids whose chain is cyclic.
    pub fn depth(&self, employee: EmployeeId) -> Option<usize> {
        self.employee_by_id(employee)?;
        self.reporting_chain(employee).ok().map(|chain| chain.len())
    }

    /// Deepest level below any root, counted in reporting hops
    pub fn max_depth(&self) -> usize {
        let mut visited = vec![false; self.view.node_count];
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        for root in self.roots() {
            if let Some(idx) = self.view.index_of(root.as_u64()) {
                visited[idx] = true;
                queue.push_back((idx, 0));
            }
        }

        let mut deepest = 0;
        while let Some((idx, depth)) = queue.pop_front() {
            deepest = deepest.max(depth);
            for &child in self.view.children(idx) {
                if !visited[child] {
                    visited[child] = true;
                    queue.push_back((child, depth + 1));
                }
            }
        }
        deepest
    }
}

/// Group canonical employees by resolved manager id, in snapshot order. O(n).
fn build_direct_reports(
    employees: &[Employee],
    index: &EmployeeIndex<'_>,
    resolutions: &[ManagerResolution],
) -> FxHashMap<EmployeeId, Vec<EmployeeId>> {
    let mut direct: FxHashMap<EmployeeId, Vec<EmployeeId>> = FxHashMap::default();
    for (pos, employee) in employees.iter().enumerate() {
        if !index.is_canonical(pos, employee.id) {
            continue;
        }
        if let Some(manager) = resolutions[pos].manager_id() {
            direct.entry(manager).or_default().push(employee.id);
        }
    }
    direct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::JobLevel;

    fn small_org() -> Vec<Employee> {
        //        1
        //      2   3
        //     4 5   6
        //     7
        vec![
            Employee::new(1, "Root", JobLevel::Executive),
            Employee::new(2, "Ana", JobLevel::Director).reports_to(1),
            Employee::new(3, "Ben", JobLevel::Director).reports_to(1),
            Employee::new(4, "Cy", JobLevel::Manager).reports_to(2),
            Employee::new(5, "Ana", JobLevel::Manager).reports_to(2),
            Employee::new(6, "Dee", JobLevel::Manager).reports_to_name("Ben"),
            Employee::new(7, "Eli", JobLevel::Senior).reports_to(4),
        ]
    }

    fn ids(xs: &[u64]) -> Vec<EmployeeId> {
        xs.iter().copied().map(EmployeeId).collect()
    }

    #[test]
    fn test_reports_queries() {
        let employees = small_org();
        let graph = OrgGraph::validated(&employees).unwrap();

        assert_eq!(graph.direct_reports(EmployeeId(2)), ids(&[4, 5]).as_slice());
        assert_eq!(graph.direct_reports(EmployeeId(3)), ids(&[6]).as_slice());
        assert_eq!(graph.all_reports(EmployeeId(1)), ids(&[2, 3, 4, 5, 6, 7]).as_slice());
        assert_eq!(graph.all_reports(EmployeeId(2)), ids(&[4, 5, 7]).as_slice());
        assert!(graph.all_reports(EmployeeId(7)).is_empty());
        assert!(graph.direct_reports(EmployeeId(999)).is_empty());
        assert!(graph.all_reports(EmployeeId(999)).is_empty());
        assert_eq!(graph.org_tree().len(), 7);
    }

    #[test]
    fn test_reporting_chain_and_depth() {
        let employees = small_org();
        let graph = OrgGraph::validated(&employees).unwrap();

        assert_eq!(graph.reporting_chain(EmployeeId(7)).unwrap(), ids(&[4, 2, 1]));
        assert!(graph.reporting_chain(EmployeeId(1)).unwrap().is_empty());
        assert!(graph.reporting_chain(EmployeeId(42)).unwrap().is_empty());
        assert_eq!(graph.depth(EmployeeId(7)), Some(3));
        assert_eq!(graph.depth(EmployeeId(42)), None);
        assert_eq!(graph.max_depth(), 3);
        assert_eq!(graph.roots(), ids(&[1]));
    }

    #[test]
    fn test_find_managers() {
        let employees = small_org();
        let graph = OrgGraph::validated(&employees).unwrap();

        assert_eq!(graph.find_managers(2), ids(&[1, 2]));
        assert_eq!(graph.find_managers(1), ids(&[1, 2, 3, 4]));
        assert_eq!(graph.find_managers(0).len(), 7);
        assert_eq!(graph.find_direct_managers(2), ids(&[1, 2]));
    }

    #[test]
    fn test_name_lookup_is_ambiguous() {
        let employees = small_org();
        let graph = OrgGraph::validated(&employees).unwrap();

        let anas = graph.employees_by_name("Ana");
        assert_eq!(anas.len(), 2);
        let first = graph.employee_by_name("Ana").unwrap();
        assert!(anas.iter().any(|e| e.id == first.id));
        assert!(graph.employee_by_name("Nobody").is_none());
        assert_eq!(
            graph.resolution(EmployeeId(6)),
            Some(&ManagerResolution::ByName { manager: EmployeeId(3) })
        );
        assert_eq!(graph.manager_of(EmployeeId(6)), Some(EmployeeId(3)));
    }

    #[test]
    fn test_enforced_validation_rejects_orphan() {
        let mut employees = small_org();
        employees.push(Employee::new(8, "Lost", JobLevel::Senior).reports_to_name("Ghost"));

        match OrgGraph::validated(&employees) {
            Err(OrgError::InvalidStructure(result)) => {
                assert_eq!(result.orphaned, ids(&[8]));
                assert!(!result.is_valid);
            }
            other => panic!("expected structural error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_bypass_requires_justification() {
        let employees = small_org();
        let result = OrgGraph::new(&employees, Validation::Bypass { justification: "  " });
        assert_eq!(result.err(), Some(OrgError::MissingJustification));
    }

    #[test]
    fn test_cycle_guard_when_bypassed() {
        let employees = vec![
            Employee::new(1, "Root", JobLevel::Executive),
            Employee::new(2, "A", JobLevel::Director).reports_to(4),
            Employee::new(3, "B", JobLevel::Director).reports_to(2),
            Employee::new(4, "C", JobLevel::Director).reports_to(3),
            Employee::new(5, "D", JobLevel::Manager).reports_to(2),
        ];
        let graph = OrgGraph::new(
            &employees,
            Validation::Bypass {
                justification: "fixture exercises the cycle guard",
            },
        )
        .unwrap();

        assert_eq!(graph.validate_structure().circular_references, ids(&[2, 3, 4]));

        for id in [2, 3, 4, 5] {
            match graph.reporting_chain(EmployeeId(id)) {
                Err(OrgError::CycleDetected { cycle, .. }) => assert_eq!(cycle, ids(&[2, 3, 4])),
                other => panic!("expected cycle for {}, got {:?}", id, other),
            }
        }

        assert_eq!(graph.org_tree().cyclic_ids(), ids(&[2, 3, 4]).as_slice());
        assert_eq!(graph.all_reports(EmployeeId(2)), ids(&[3, 4, 5]).as_slice());
        assert!(graph.reporting_chain(EmployeeId(1)).unwrap().is_empty());
    }
}
