//! The standard analyses, one per dimension

use super::detector::{evaluate, evaluate_against_target, Category, CategoryCounts};
use super::{AnalysisContext, AnalysisResult, Dimension};
use crate::employee::{EmployeeId, JobLevel};
use crate::org::OrgGraph;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

pub fn location_bias(ctx: &AnalysisContext<'_>) -> AnalysisResult {
    let counts = CategoryCounts::tally(
        ctx.employees,
        |e| e.location_key().map(str::to_string),
        |k| Category::labelled(k.clone()),
    );
    evaluate("location", Dimension::Location, &counts, ctx.thresholds)
}

pub fn function_bias(ctx: &AnalysisContext<'_>) -> AnalysisResult {
    let counts = CategoryCounts::tally(
        ctx.employees,
        |e| e.function_key().map(str::to_string),
        |k| Category::labelled(k.clone()),
    );
    evaluate("function", Dimension::Function, &counts, ctx.thresholds)
}

pub fn level_bias(ctx: &AnalysisContext<'_>) -> AnalysisResult {
    let counts = CategoryCounts::tally(ctx.employees, |e| Some(e.level), level_category);
    evaluate("level", Dimension::Level, &counts, ctx.thresholds)
}

/// Service length band, relative to the context's `as_of` date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenureBucket {
    UnderOneYear,
    OneToThreeYears,
    ThreeToFiveYears,
    FiveToTenYears,
    TenYearsPlus,
}

impl TenureBucket {
    pub const ALL: [TenureBucket; 5] = [
        TenureBucket::UnderOneYear,
        TenureBucket::OneToThreeYears,
        TenureBucket::ThreeToFiveYears,
        TenureBucket::FiveToTenYears,
        TenureBucket::TenYearsPlus,
    ];

    pub fn from_years(years: f64) -> Self {
        if years < 1.0 {
            TenureBucket::UnderOneYear
        } else if years < 3.0 {
            TenureBucket::OneToThreeYears
        } else if years < 5.0 {
            TenureBucket::ThreeToFiveYears
        } else if years < 10.0 {
            TenureBucket::FiveToTenYears
        } else {
            TenureBucket::TenYearsPlus
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TenureBucket::UnderOneYear => "<1y",
            TenureBucket::OneToThreeYears => "1-3y",
            TenureBucket::ThreeToFiveYears => "3-5y",
            TenureBucket::FiveToTenYears => "5-10y",
            TenureBucket::TenYearsPlus => "10y+",
        }
    }
}

impl fmt::Display for TenureBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub fn tenure_bias(ctx: &AnalysisContext<'_>) -> AnalysisResult {
    let as_of = ctx.as_of;
    let counts = CategoryCounts::tally(
        ctx.employees,
        |e| Some(TenureBucket::from_years(e.tenure_years(as_of))),
        |b| Category::labelled(b.label()),
    );
    evaluate("tenure", Dimension::Tenure, &counts, ctx.thresholds)
}

/// Which reports are attributed to a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerView {
    /// Direct reports only. Each employee counts once, under their own manager.
    Direct,
    /// Every transitive report. Employees count once per ancestor, so the
    /// rows overlap and a team-level effect is diluted by everyone below.
    AllReports,
}

/// Manager bias over direct reports. This is what the registry runs.
pub fn manager_bias(ctx: &AnalysisContext<'_>) -> AnalysisResult {
    manager_bias_with_view(ctx, ManagerView::Direct)
}

/// Manager bias with an explicit view.
///
/// Managers qualify with at least `min_team_size` reports in the chosen view.
/// Uses the context's graph when present and builds a validated one
/// otherwise; an invalid structure yields a neutral result.
pub fn manager_bias_with_view(ctx: &AnalysisContext<'_>, view: ManagerView) -> AnalysisResult {
    let name = match view {
        ManagerView::Direct => "manager",
        ManagerView::AllReports => "manager_all_reports",
    };

    let owned;
    let graph = match ctx.graph {
        Some(graph) => graph,
        None => match OrgGraph::validated(ctx.employees) {
            Ok(graph) => {
                owned = graph;
                &owned
            }
            Err(e) => {
                warn!(error = %e, "Manager analysis skipped");
                return AnalysisResult::insufficient(
                    name,
                    Dimension::Manager,
                    0,
                    "org structure failed validation",
                );
            }
        },
    };

    let min_team_size = ctx.thresholds.min_team_size;
    let managers = match view {
        ManagerView::Direct => graph.find_direct_managers(min_team_size),
        ManagerView::AllReports => graph.find_managers(min_team_size),
    };

    let groups = managers.into_iter().map(|manager| {
        let reports = match view {
            ManagerView::Direct => graph.direct_reports(manager),
            ManagerView::AllReports => graph.all_reports(manager),
        };
        let mut tiers = [0usize; 3];
        for report in reports {
            if let Some(employee) = graph.employee_by_id(*report) {
                tiers[employee.tier().index()] += 1;
            }
        }
        (manager_category(manager), tiers)
    });

    let counts = CategoryCounts::from_groups(groups);
    evaluate(name, Dimension::Manager, &counts, ctx.thresholds)
}

/// Per-level tier mix against the configured calibration curve
pub fn level_distribution(ctx: &AnalysisContext<'_>) -> AnalysisResult {
    let counts = CategoryCounts::tally(ctx.employees, |e| Some(e.level), level_category);
    evaluate_against_target(
        "level_distribution",
        Dimension::LevelDistribution,
        &counts,
        &ctx.thresholds.target_distribution,
        ctx.thresholds,
    )
}

fn level_category(level: &JobLevel) -> Category {
    Category::labelled(level.label())
}

fn manager_category(manager: EmployeeId) -> Category {
    Category {
        label: format!("Manager #{}", manager),
        subject: Some(manager),
    }
}
