//! Data packaging and the anonymization boundary
//!
//! Two payloads are built from the same employees, analysis results and
//! org summary:
//! - `AnonymizedPayload`: aggregates, flagged-only entries under synthetic
//!   ids, analyses with manager identities relabelled. The only payload
//!   that may leave the process.
//! - `CompletePayload`: every identifying field, for internal display.
//!
//! The anonymized payload is audited against the deny list before it is
//! returned, so a leak fails the build of the payload rather than relying
//! on convention.

pub mod audit;

pub use audit::audit_payload;

use crate::analysis::detector::interpretation;
use crate::analysis::{AnalysisResult, Dimension};
use crate::config::PrivacyConfig;
use crate::employee::{Employee, EmployeeFlag, EmployeeId, JobLevel, ManagerRef, Rating};
use crate::org::OrgGraph;
use chrono::NaiveDate;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("Identifying field '{key}' found at {path}")]
    IdentifyingField { path: String, key: String },

    #[error("Identifying value found at {path}")]
    IdentifyingValue { path: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PackagingResult<T> = Result<T, PackagingError>;

/// Coarse counts describing the organization at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgSummary {
    pub as_of: NaiveDate,
    pub headcount: usize,
    pub root_count: usize,
    /// Employees with at least one direct report
    pub manager_count: usize,
    pub max_depth: usize,
    pub flagged_count: usize,
    /// Headcount per level, most junior first
    pub by_level: Vec<LevelCount>,
    pub by_location: IndexMap<String, usize>,
    pub by_function: IndexMap<String, usize>,
}

impl OrgSummary {
    pub fn from_graph(graph: &OrgGraph<'_>, as_of: NaiveDate) -> Self {
        let employees = graph.employees();

        let mut by_level: Vec<LevelCount> = JobLevel::ALL
            .iter()
            .map(|&level| LevelCount { level, headcount: 0 })
            .collect();
        let mut locations: BTreeMap<String, usize> = BTreeMap::new();
        let mut functions: BTreeMap<String, usize> = BTreeMap::new();
        for employee in employees {
            if let Some(count) = by_level.iter_mut().find(|c| c.level == employee.level) {
                count.headcount += 1;
            }
            if let Some(location) = employee.location_key() {
                *locations.entry(location.to_string()).or_default() += 1;
            }
            if let Some(function) = employee.function_key() {
                *functions.entry(function.to_string()).or_default() += 1;
            }
        }

        Self {
            as_of,
            headcount: graph.len(),
            root_count: graph.roots().len(),
            manager_count: graph.find_direct_managers(1).len(),
            max_depth: graph.max_depth(),
            flagged_count: employees.iter().filter(|e| e.is_flagged()).count(),
            by_level,
            by_location: locations.into_iter().collect(),
            by_function: functions.into_iter().collect(),
        }
    }
}

/// Level values appear as fields rather than map keys, since `manager` is
/// both a level and a denied key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: JobLevel,
    pub headcount: usize,
}

/// Tier counts for one rating scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl TierCounts {
    fn add(&mut self, rating: Rating) {
        match rating {
            Rating::Low => self.low += 1,
            Rating::Medium => self.medium += 1,
            Rating::High => self.high += 1,
        }
    }
}

/// Identity-free aggregate for one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelAggregate {
    pub level: JobLevel,
    pub headcount: usize,
    pub performance: TierCounts,
    pub potential: TierCounts,
    pub flagged: usize,
}

/// A flagged employee under a synthetic id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedEntry {
    /// Sequential `EMP-0001` style id, meaningful only within one payload
    pub ref_id: String,
    pub level: JobLevel,
    pub performance: Rating,
    pub potential: Rating,
    pub location: String,
    pub function: String,
    pub tenure_years: f64,
    pub flags: Vec<EmployeeFlag>,
}

/// The only payload allowed to cross to an external reasoning collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizedPayload {
    pub organization: OrgSummary,
    pub levels: Vec<LevelAggregate>,
    pub flagged_employees: Vec<FlaggedEntry>,
    pub analyses: Vec<AnalysisResult>,
}

impl AnonymizedPayload {
    pub fn to_json(&self) -> PackagingResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Flagged entries carrying `flag`
    pub fn count_flag(&self, flag: EmployeeFlag) -> usize {
        self.flagged_employees.iter().filter(|e| e.flags.contains(&flag)).count()
    }
}

/// Employee record with its manager's display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeView {
    #[serde(flatten)]
    pub employee: Employee,
    pub manager_name: Option<String>,
}

/// Internal-only payload. Never transmitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    pub organization: OrgSummary,
    pub employees: Vec<EmployeeView>,
    pub analyses: Vec<AnalysisResult>,
}

/// Build the anonymized payload and audit it before returning.
pub fn build_anonymized_payload(
    employees: &[Employee],
    results: &[AnalysisResult],
    summary: &OrgSummary,
    privacy: &PrivacyConfig,
) -> PackagingResult<AnonymizedPayload> {
    let payload = AnonymizedPayload {
        organization: summary.clone(),
        levels: level_aggregates(employees),
        flagged_employees: flagged_entries(employees, summary.as_of),
        analyses: results.iter().map(relabel_managers).collect(),
    };

    if let Err(e) = audit_payload(&payload.to_json()?, employees, privacy) {
        warn!(error = %e, "Anonymized payload failed the privacy audit");
        return Err(e);
    }

    info!(
        "Packaged anonymized payload: {} levels, {} flagged entries, {} analyses",
        payload.levels.len(),
        payload.flagged_employees.len(),
        payload.analyses.len()
    );
    Ok(payload)
}

/// Build the internal payload with identities and manager names resolved
pub fn build_complete_payload(
    employees: &[Employee],
    results: &[AnalysisResult],
    summary: &OrgSummary,
) -> CompletePayload {
    let names: FxHashMap<EmployeeId, &str> =
        employees.iter().map(|e| (e.id, e.name.as_str())).collect();

    let views = employees
        .iter()
        .map(|employee| {
            let manager_name = match &employee.manager {
                Some(ManagerRef::Id(id)) => names.get(id).map(|n| n.to_string()),
                Some(ManagerRef::Name(name)) => Some(name.clone()),
                None => None,
            };
            EmployeeView {
                employee: employee.clone(),
                manager_name,
            }
        })
        .collect();

    let analyses = results
        .iter()
        .map(|result| {
            let mut result = result.clone();
            for deviation in &mut result.deviations {
                if let Some(name) = deviation.subject.and_then(|id| names.get(&id)) {
                    deviation.category = format!("{} ({})", name, deviation.category);
                }
            }
            result
        })
        .collect();

    CompletePayload {
        organization: summary.clone(),
        employees: views,
        analyses,
    }
}

fn level_aggregates(employees: &[Employee]) -> Vec<LevelAggregate> {
    JobLevel::ALL
        .iter()
        .filter_map(|&level| {
            let at_level: Vec<&Employee> = employees.iter().filter(|e| e.level == level).collect();
            if at_level.is_empty() {
                return None;
            }
            let mut performance = TierCounts::default();
            let mut potential = TierCounts::default();
            for e in &at_level {
                performance.add(e.performance);
                potential.add(e.potential);
            }
            Some(LevelAggregate {
                level,
                headcount: at_level.len(),
                performance,
                potential,
                flagged: at_level.iter().filter(|e| e.is_flagged()).count(),
            })
        })
        .collect()
}

/// Flagged employees only, ordered by attributes rather than by id so the
/// synthetic sequence carries no hint of the source ordering
fn flagged_entries(employees: &[Employee], as_of: NaiveDate) -> Vec<FlaggedEntry> {
    let mut flagged: Vec<&Employee> = employees.iter().filter(|e| e.is_flagged()).collect();
    flagged.sort_by(|a, b| {
        b.level
            .cmp(&a.level)
            .then_with(|| a.function.cmp(&b.function))
            .then_with(|| a.location.cmp(&b.location))
            .then_with(|| b.performance.cmp(&a.performance))
            .then_with(|| a.id.cmp(&b.id))
    });

    flagged
        .into_iter()
        .enumerate()
        .map(|(i, e)| FlaggedEntry {
            ref_id: format!("EMP-{:04}", i + 1),
            level: e.level,
            performance: e.performance,
            potential: e.potential,
            location: e.location.trim().to_string(),
            function: e.function.trim().to_string(),
            tenure_years: (e.tenure_years(as_of) * 10.0).round() / 10.0,
            flags: e.flags.iter().copied().collect(),
        })
        .collect()
}

/// Replace manager identities with `Team NN` labels and drop subjects
fn relabel_managers(result: &AnalysisResult) -> AnalysisResult {
    let mut result = result.clone();
    if result.dimension != Dimension::Manager {
        return result;
    }

    for (i, deviation) in result.deviations.iter_mut().enumerate() {
        deviation.category = format!("Team {:02}", i + 1);
        deviation.subject = None;
    }
    if !result.is_insufficient() {
        result.interpretation = interpretation(
            result.dimension,
            result.status,
            result.p_value,
            result.effect_size,
            &result.deviations,
        );
    }
    result
}
