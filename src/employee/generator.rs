//! Seeded synthetic populations
//!
//! Produces realistic calibration snapshots for tests, benchmarks and the
//! CLI. The same seed always yields the same population.

use super::{Employee, EmployeeFlag, EmployeeId, JobLevel, ManagerRef, Rating};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const FIRST_NAMES: [&str; 12] = [
    "Alex", "Jordan", "Sam", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Avery", "Quinn",
    "Drew", "Robin",
];

const LAST_NAMES: [&str; 8] = [
    "Chen", "Patel", "Garcia", "Smith", "Okafor", "Kim", "Novak", "Silva",
];

const LOCATIONS: [&str; 5] = ["Austin", "Berlin", "Toronto", "Singapore", "London"];

const FUNCTIONS: [&str; 6] = [
    "Engineering",
    "Sales",
    "Marketing",
    "Finance",
    "Operations",
    "Product",
];

const ROLES: [&str; 6] = ["Analyst", "Specialist", "Engineer", "Lead", "Partner", "Head"];

/// Share of the non-root population at each level below Executive,
/// from Director downward. Associates take the remainder.
const LEVEL_SHARES: [(JobLevel, f64); 4] = [
    (JobLevel::Director, 0.04),
    (JobLevel::Manager, 0.12),
    (JobLevel::Senior, 0.22),
    (JobLevel::Professional, 0.28),
];

/// Seeded generator of employee snapshots
pub struct PopulationGenerator {
    rng: StdRng,
    name_refs: bool,
    as_of: NaiveDate,
}

impl PopulationGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            name_refs: false,
            as_of: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
        }
    }

    /// Emit name-form manager references wherever the manager's name is
    /// unique in the generated population. Duplicate names keep id form.
    pub fn with_name_refs(mut self) -> Self {
        self.name_refs = true;
        self
    }

    /// Reference date for hire dates
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    /// Generate `count` employees with exactly one Executive root.
    ///
    /// Ids run 1..=count from the top of the hierarchy down, and every
    /// non-root employee reports to someone at the nearest populated level
    /// above (exactly one level up once the population has six levels).
    pub fn generate(&mut self, count: usize) -> Vec<Employee> {
        let levels = plan_levels(count);
        let mut employees: Vec<Employee> = Vec::with_capacity(count);
        let mut by_level: HashMap<JobLevel, Vec<EmployeeId>> = HashMap::new();

        for (i, &level) in levels.iter().enumerate() {
            let id = EmployeeId((i + 1) as u64);
            let manager = self.pick_manager(level, &by_level);
            let employee = self.employee(id, level, manager);
            by_level.entry(level).or_default().push(id);
            employees.push(employee);
        }

        if self.name_refs {
            convert_to_name_refs(&mut employees);
        }
        employees
    }

    fn pick_manager(
        &mut self,
        level: JobLevel,
        by_level: &HashMap<JobLevel, Vec<EmployeeId>>,
    ) -> Option<EmployeeId> {
        // Nearest populated level above; tiny populations can skip levels
        let mut above = level.next_up();
        while let Some(candidate_level) = above {
            if let Some(candidates) = by_level.get(&candidate_level).filter(|c| !c.is_empty()) {
                let idx = self.rng.gen_range(0..candidates.len());
                return Some(candidates[idx]);
            }
            above = candidate_level.next_up();
        }
        None
    }

    fn employee(&mut self, id: EmployeeId, level: JobLevel, manager: Option<EmployeeId>) -> Employee {
        let first = FIRST_NAMES[self.rng.gen_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[self.rng.gen_range(0..LAST_NAMES.len())];
        let location = LOCATIONS[self.rng.gen_range(0..LOCATIONS.len())];
        let function = FUNCTIONS[self.rng.gen_range(0..FUNCTIONS.len())];
        let role = ROLES[self.rng.gen_range(0..ROLES.len())];

        let performance = self.rating(0.20, 0.65);
        let potential = self.rating(0.25, 0.55);
        let tenure_days = self.rng.gen_range(30..15 * 365);

        let mut employee = Employee::new(id, format!("{} {}", first, last), level)
            .with_title(format!("{} {}", function, role))
            .with_email(format!(
                "{}.{}{}@example.com",
                first.to_lowercase(),
                last.to_lowercase(),
                id
            ))
            .with_location(location)
            .with_function(function)
            .with_performance(performance)
            .with_potential(potential)
            .with_hire_date(self.as_of - Duration::days(tenure_days));
        employee.manager = manager.map(ManagerRef::Id);

        if tenure_days < 365 {
            employee.flags.insert(EmployeeFlag::NewHire);
        }
        if performance == Rating::High && potential == Rating::High {
            employee.flags.insert(EmployeeFlag::KeyTalent);
        }
        if performance == Rating::Low {
            if self.rng.gen_bool(0.5) {
                employee.flags.insert(EmployeeFlag::PerformanceConcern);
            }
        } else if self.rng.gen_bool(0.08) {
            employee.flags.insert(EmployeeFlag::FlightRisk);
        }
        if potential == Rating::High && self.rng.gen_bool(0.3) {
            employee.flags.insert(EmployeeFlag::PromotionReady);
        }
        if level >= JobLevel::Manager && self.rng.gen_bool(0.15) {
            employee.flags.insert(EmployeeFlag::SuccessionCandidate);
        }
        employee
    }

    fn rating(&mut self, high: f64, medium: f64) -> Rating {
        let roll: f64 = self.rng.gen();
        if roll < high {
            Rating::High
        } else if roll < high + medium {
            Rating::Medium
        } else {
            Rating::Low
        }
    }
}

/// Level of each employee, top-down. One Executive, then at least one
/// employee per level while the population allows it.
fn plan_levels(count: usize) -> Vec<JobLevel> {
    if count == 0 {
        return Vec::new();
    }

    let rest = count - 1;
    let mut plan = vec![JobLevel::Executive];
    let mut remaining = rest;

    for (level, share) in LEVEL_SHARES {
        if remaining == 0 {
            break;
        }
        let n = ((rest as f64 * share).round() as usize).max(1).min(remaining);
        // Leave room for at least one Associate
        let n = if n == remaining && remaining > 1 { n - 1 } else { n };
        plan.extend(std::iter::repeat(level).take(n));
        remaining -= n;
    }
    plan.extend(std::iter::repeat(JobLevel::Associate).take(remaining));
    plan
}

fn convert_to_name_refs(employees: &mut [Employee]) {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for e in employees.iter() {
        *name_counts.entry(e.name.clone()).or_default() += 1;
    }
    let names: HashMap<EmployeeId, String> =
        employees.iter().map(|e| (e.id, e.name.clone())).collect();

    for e in employees.iter_mut() {
        if let Some(ManagerRef::Id(manager_id)) = e.manager {
            if let Some(name) = names.get(&manager_id) {
                if name_counts.get(name) == Some(&1) {
                    e.manager = Some(ManagerRef::Name(name.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_population() {
        let a = PopulationGenerator::new(7).generate(150);
        let b = PopulationGenerator::new(7).generate(150);
        assert_eq!(a, b);

        let c = PopulationGenerator::new(8).generate(150);
        assert_ne!(a, c);
    }

    #[test]
    fn test_six_levels_one_root() {
        let employees = PopulationGenerator::new(1).generate(200);
        assert_eq!(employees.len(), 200);

        let roots: Vec<_> = employees.iter().filter(|e| e.manager.is_none()).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].level, JobLevel::Executive);

        for level in JobLevel::ALL {
            assert!(employees.iter().any(|e| e.level == level), "missing {}", level);
        }
    }

    #[test]
    fn test_managers_sit_one_level_up() {
        let employees = PopulationGenerator::new(3).generate(120);
        let levels: HashMap<EmployeeId, JobLevel> =
            employees.iter().map(|e| (e.id, e.level)).collect();
        for e in &employees {
            if let Some(ManagerRef::Id(m)) = &e.manager {
                assert_eq!(e.level.next_up(), Some(levels[m]));
            }
        }
    }

    #[test]
    fn test_duplicate_names_occur() {
        let employees = PopulationGenerator::new(11).generate(200);
        let mut names: Vec<&str> = employees.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert!(names.len() < employees.len());
    }

    #[test]
    fn test_plan_levels_small() {
        assert!(plan_levels(0).is_empty());
        assert_eq!(plan_levels(1), vec![JobLevel::Executive]);
        let six = plan_levels(6);
        assert_eq!(six.len(), 6);
        for level in JobLevel::ALL {
            assert!(six.contains(&level));
        }
    }
}
