//! Employee snapshot model
//!
//! Records are supplied by an upstream store already validated and typed.
//! The core never mutates them; every service borrows the snapshot.

pub mod generator;

pub use generator::PopulationGenerator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for an employee. The only safe join key for traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EmployeeId(pub u64);

impl EmployeeId {
    pub fn new(id: u64) -> Self {
        EmployeeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EmployeeId {
    fn from(id: u64) -> Self {
        EmployeeId(id)
    }
}

/// Job level, ordered from most junior to most senior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum JobLevel {
    Associate,
    Professional,
    Senior,
    Manager,
    Director,
    Executive,
}

impl JobLevel {
    pub const ALL: [JobLevel; 6] = [
        JobLevel::Associate,
        JobLevel::Professional,
        JobLevel::Senior,
        JobLevel::Manager,
        JobLevel::Director,
        JobLevel::Executive,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            JobLevel::Associate => "Associate",
            JobLevel::Professional => "Professional",
            JobLevel::Senior => "Senior",
            JobLevel::Manager => "Manager",
            JobLevel::Director => "Director",
            JobLevel::Executive => "Executive",
        }
    }

    /// The level directly above, `None` for Executive
    pub fn next_up(&self) -> Option<JobLevel> {
        let idx = Self::ALL.iter().position(|l| l == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for JobLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Three-point calibration rating, used for both performance and potential.
///
/// The performance rating is the employee's performance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Low,
    Medium,
    High,
}

impl Rating {
    /// Column order used by every contingency table
    pub const ALL: [Rating; 3] = [Rating::Low, Rating::Medium, Rating::High];

    pub fn index(&self) -> usize {
        match self {
            Rating::Low => 0,
            Rating::Medium => 1,
            Rating::High => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Low => "Low",
            Rating::Medium => "Medium",
            Rating::High => "High",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Calibration flags attached to an employee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeFlag {
    PromotionReady,
    FlightRisk,
    SuccessionCandidate,
    PerformanceConcern,
    NewHire,
    KeyTalent,
}

impl EmployeeFlag {
    pub const ALL: [EmployeeFlag; 6] = [
        EmployeeFlag::PromotionReady,
        EmployeeFlag::FlightRisk,
        EmployeeFlag::SuccessionCandidate,
        EmployeeFlag::PerformanceConcern,
        EmployeeFlag::NewHire,
        EmployeeFlag::KeyTalent,
    ];
}

/// Manager reference as supplied upstream.
///
/// In JSON a number deserializes as `Id` and a string as `Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManagerRef {
    Id(EmployeeId),
    Name(String),
}

impl fmt::Display for ManagerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerRef::Id(id) => write!(f, "#{}", id),
            ManagerRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// An immutable employee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    /// Display name. Not unique.
    pub name: String,
    pub job_title: String,
    #[serde(default)]
    pub email: Option<String>,
    /// `None` for a root of the hierarchy
    #[serde(default)]
    pub manager: Option<ManagerRef>,
    pub level: JobLevel,
    pub performance: Rating,
    pub potential: Rating,
    pub location: String,
    pub function: String,
    #[serde(default)]
    pub flags: BTreeSet<EmployeeFlag>,
    pub hire_date: NaiveDate,
}

impl Employee {
    /// Create a root employee with neutral ratings
    pub fn new(id: impl Into<EmployeeId>, name: impl Into<String>, level: JobLevel) -> Self {
        Employee {
            id: id.into(),
            name: name.into(),
            job_title: format!("{} Staff", level.label()),
            email: None,
            manager: None,
            level,
            performance: Rating::Medium,
            potential: Rating::Medium,
            location: "Unassigned".to_string(),
            function: "General".to_string(),
            flags: BTreeSet::new(),
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
        }
    }

    pub fn reports_to(mut self, manager: impl Into<EmployeeId>) -> Self {
        self.manager = Some(ManagerRef::Id(manager.into()));
        self
    }

    pub fn reports_to_name(mut self, manager: impl Into<String>) -> Self {
        self.manager = Some(ManagerRef::Name(manager.into()));
        self
    }

    pub fn with_performance(mut self, rating: Rating) -> Self {
        self.performance = rating;
        self
    }

    pub fn with_potential(mut self, rating: Rating) -> Self {
        self.potential = rating;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.job_title = title.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_flag(mut self, flag: EmployeeFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_hire_date(mut self, date: NaiveDate) -> Self {
        self.hire_date = date;
        self
    }

    /// Performance tier used by every bias analysis
    pub fn tier(&self) -> Rating {
        self.performance
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    pub fn has_flag(&self, flag: EmployeeFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Trimmed location, `None` when blank. Every grouping by location
    /// uses this key.
    pub fn location_key(&self) -> Option<&str> {
        Some(self.location.trim()).filter(|l| !l.is_empty())
    }

    /// Trimmed function, `None` when blank
    pub fn function_key(&self) -> Option<&str> {
        Some(self.function.trim()).filter(|f| !f.is_empty())
    }

    /// Years of service at `as_of`, never negative
    pub fn tenure_years(&self, as_of: NaiveDate) -> f64 {
        let days = (as_of - self.hire_date).num_days().max(0);
        days as f64 / 365.25
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_id() {
        let id = EmployeeId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{}", id), "42");

        let id2: EmployeeId = 100.into();
        assert_eq!(id2.as_u64(), 100);
    }

    #[test]
    fn test_level_ordering() {
        assert!(JobLevel::Associate < JobLevel::Executive);
        assert_eq!(JobLevel::Manager.next_up(), Some(JobLevel::Director));
        assert_eq!(JobLevel::Executive.next_up(), None);
    }

    #[test]
    fn test_manager_ref_json_forms() {
        let by_id: Option<ManagerRef> = serde_json::from_str("7").unwrap();
        assert_eq!(by_id, Some(ManagerRef::Id(EmployeeId(7))));

        let by_name: Option<ManagerRef> = serde_json::from_str("\"Dana Reyes\"").unwrap();
        assert_eq!(by_name, Some(ManagerRef::Name("Dana Reyes".to_string())));
    }

    #[test]
    fn test_employee_roundtrip_defaults() {
        let json = r#"{
            "id": 3, "name": "Kai Moreno", "job_title": "Sales Lead",
            "manager": 1, "level": "senior", "performance": "high",
            "potential": "medium", "location": "Austin", "function": "Sales",
            "hire_date": "2019-05-01"
        }"#;
        let e: Employee = serde_json::from_str(json).unwrap();
        assert_eq!(e.id, EmployeeId(3));
        assert_eq!(e.tier(), Rating::High);
        assert!(e.flags.is_empty());
        assert!(e.email.is_none());
    }

    #[test]
    fn test_tenure_years() {
        let e = Employee::new(1, "A", JobLevel::Senior)
            .with_hire_date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!((e.tenure_years(as_of) - 4.0).abs() < 0.01);

        let before = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        assert_eq!(e.tenure_years(before), 0.0);
    }
}
