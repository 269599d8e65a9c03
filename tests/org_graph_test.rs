use std::collections::HashSet;
use talentgraph::{
    validate_structure, Employee, EmployeeId, JobLevel, ManagerRef, OrgError, OrgGraph,
    PopulationGenerator,
};

fn population() -> Vec<Employee> {
    PopulationGenerator::new(42).generate(200)
}

#[test]
fn test_generated_population_is_one_tree() {
    let employees = population();
    let graph = OrgGraph::validated(&employees).expect("generated population is valid");

    assert!(graph.validate_structure().is_valid);
    assert_eq!(graph.roots(), vec![EmployeeId(1)]);
    assert_eq!(graph.all_reports(EmployeeId(1)).len(), 199);

    // Six levels, each manager exactly one level up
    assert_eq!(graph.max_depth(), 5);
}

#[test]
fn test_closure_matches_chains() {
    let employees = population();
    let graph = OrgGraph::validated(&employees).unwrap();

    // m is in chain(e) exactly when e is in all_reports(m)
    for employee in &employees {
        let chain = graph.reporting_chain(employee.id).unwrap();
        for manager in &chain {
            assert!(graph.all_reports(*manager).contains(&employee.id));
        }
        assert_eq!(chain.len(), graph.depth(employee.id).unwrap());
    }

    for (manager, reports) in graph.org_tree().iter() {
        assert!(!reports.contains(manager), "{} is its own report", manager);
        let unique: HashSet<EmployeeId> = reports.iter().copied().collect();
        assert_eq!(unique.len(), reports.len());

        // all(m) = direct(m) + all(d) for each direct report d
        let mut expected: HashSet<EmployeeId> = HashSet::new();
        for direct in graph.direct_reports(*manager) {
            expected.insert(*direct);
            expected.extend(graph.all_reports(*direct).iter().copied());
        }
        assert_eq!(unique, expected);
    }
}

#[test]
fn test_find_managers_is_monotonic() {
    let employees = population();
    let graph = OrgGraph::validated(&employees).unwrap();

    assert_eq!(graph.find_managers(0).len(), 200);

    let mut previous = usize::MAX;
    for k in 0..=200 {
        let managers = graph.find_managers(k);
        assert!(managers.len() <= previous);

        let mut expected: Vec<EmployeeId> = employees
            .iter()
            .map(|e| e.id)
            .filter(|id| graph.all_reports(*id).len() >= k)
            .collect();
        expected.sort();
        assert_eq!(managers, expected);
        previous = managers.len();
    }
    assert_eq!(graph.find_managers(199), vec![EmployeeId(1)]);
    assert!(graph.find_managers(200).is_empty());
}

#[test]
fn test_name_refs_resolve_to_same_tree() {
    let by_id = PopulationGenerator::new(9).generate(150);
    let by_name = PopulationGenerator::new(9).with_name_refs().generate(150);

    assert!(by_name
        .iter()
        .any(|e| matches!(e.manager, Some(ManagerRef::Name(_)))));

    let a = OrgGraph::validated(&by_id).unwrap();
    let b = OrgGraph::validated(&by_name).unwrap();
    for employee in &by_id {
        assert_eq!(a.manager_of(employee.id), b.manager_of(employee.id));
        assert_eq!(
            a.reporting_chain(employee.id).unwrap(),
            b.reporting_chain(employee.id).unwrap()
        );
    }
}

#[test]
fn test_single_orphan_is_reported() {
    let mut employees = population();
    employees[57].manager = Some(ManagerRef::Id(EmployeeId(9999)));
    let orphan = employees[57].id;

    let result = validate_structure(&employees);
    assert!(!result.is_valid);
    assert_eq!(result.orphaned, vec![orphan]);
    assert!(result.circular_references.is_empty());

    match OrgGraph::validated(&employees) {
        Err(OrgError::InvalidStructure(found)) => assert_eq!(found.orphaned, vec![orphan]),
        other => panic!("expected InvalidStructure, got {:?}", other.map(|g| g.len())),
    }
}

#[test]
fn test_ambiguous_name_reference_is_invalid() {
    let employees = vec![
        Employee::new(1, "Pat Lee", JobLevel::Executive),
        Employee::new(2, "Robin Cho", JobLevel::Director).reports_to(1),
        Employee::new(3, "Robin Cho", JobLevel::Director).reports_to(1),
        Employee::new(4, "Ari Das", JobLevel::Manager).reports_to_name("Robin Cho"),
    ];

    let result = validate_structure(&employees);
    assert!(!result.is_valid);
    assert_eq!(result.ambiguous_references, vec![EmployeeId(4)]);
}

#[test]
fn test_cycle_is_reported_once_per_member() {
    let employees = vec![
        Employee::new(1, "Pat Lee", JobLevel::Executive),
        Employee::new(2, "Robin Cho", JobLevel::Director).reports_to(3),
        Employee::new(3, "Ari Das", JobLevel::Director).reports_to(2),
        Employee::new(4, "Kai Moss", JobLevel::Manager).reports_to(2),
    ];

    let result = validate_structure(&employees);
    assert!(!result.is_valid);
    let mut cyclic = result.circular_references.clone();
    cyclic.sort();
    assert_eq!(cyclic, vec![EmployeeId(2), EmployeeId(3)]);
    // Hangs off the cycle but is not on it
    assert!(!result.circular_references.contains(&EmployeeId(4)));
}
