//! Statistical bias analysis
//!
//! Each analysis partitions the snapshot along one dimension, builds a
//! category x performance-tier contingency table and tests it with the
//! machinery in `talentgraph-algorithms`. This module provides the
//! result types and the adapter layer; `registry` holds the ordered set of
//! analyses that every consumer runs.

pub mod detector;
pub mod dimensions;
pub mod registry;

pub use detector::{classify, CategoryCounts};
pub use dimensions::{
    function_bias, level_bias, level_distribution, location_bias, manager_bias,
    manager_bias_with_view, tenure_bias, ManagerView, TenureBucket,
};
pub use registry::{AnalysisFn, AnalysisRegistry, RegisteredAnalysis};

use crate::config::AnalysisThresholds;
use crate::employee::{Employee, EmployeeId};
use crate::org::OrgGraph;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimension an analysis partitions employees by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Location,
    Function,
    Level,
    Tenure,
    Manager,
    LevelDistribution,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Location,
        Dimension::Function,
        Dimension::Level,
        Dimension::Tenure,
        Dimension::Manager,
        Dimension::LevelDistribution,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Location => "location",
            Dimension::Function => "function",
            Dimension::Level => "level",
            Dimension::Tenure => "tenure",
            Dimension::Manager => "manager",
            Dimension::LevelDistribution => "level distribution",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tri-state outcome of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pass,
    Watch,
    Alert,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStatus::Pass => "pass",
            AnalysisStatus::Watch => "watch",
            AnalysisStatus::Alert => "alert",
        };
        write!(f, "{}", s)
    }
}

/// How far one category's tier mix sits from the population baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDeviation {
    pub category: String,
    /// Manager the category stands for, manager analyses only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<EmployeeId>,
    pub count: usize,
    pub high_count: usize,
    pub low_count: usize,
    pub high_rate: f64,
    pub low_rate: f64,
    pub baseline_high_rate: f64,
    pub baseline_low_rate: f64,
    /// High-tier rate minus baseline, in percentage points
    pub high_deviation: f64,
    /// Low-tier rate minus baseline, in percentage points
    pub low_deviation: f64,
    pub flagged: bool,
}

impl CategoryDeviation {
    /// Larger of the two absolute deviations, in percentage points
    pub fn magnitude(&self) -> f64 {
        self.high_deviation.abs().max(self.low_deviation.abs())
    }
}

/// Outcome of one registered analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Registered analysis name. Serialized as `analysis` so payloads never
    /// carry a `name` key.
    #[serde(rename = "analysis")]
    pub name: String,
    pub dimension: Dimension,
    pub chi_square: f64,
    pub p_value: f64,
    /// Cramér's V
    pub effect_size: f64,
    pub degrees_of_freedom: usize,
    pub sample_size: usize,
    pub status: AnalysisStatus,
    pub deviations: Vec<CategoryDeviation>,
    pub interpretation: String,
    /// Why the dimension could not be tested, if it could not
    #[serde(default)]
    pub insufficient_data: Option<String>,
}

impl AnalysisResult {
    /// Neutral result for a dimension that cannot be tested
    pub fn insufficient(
        name: impl Into<String>,
        dimension: Dimension,
        sample_size: usize,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            name: name.into(),
            dimension,
            chi_square: 0.0,
            p_value: 1.0,
            effect_size: 0.0,
            degrees_of_freedom: 0,
            sample_size,
            status: AnalysisStatus::Pass,
            deviations: Vec::new(),
            interpretation: format!("Not significant: insufficient data ({})", reason),
            insufficient_data: Some(reason),
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.insufficient_data.is_some()
    }

    pub fn flagged_deviations(&self) -> impl Iterator<Item = &CategoryDeviation> {
        self.deviations.iter().filter(|d| d.flagged)
    }
}

/// Everything an analysis may read. Shared read-only across workers.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub employees: &'a [Employee],
    pub graph: Option<&'a OrgGraph<'a>>,
    /// Reference date for tenure
    pub as_of: NaiveDate,
    pub thresholds: &'a AnalysisThresholds,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(employees: &'a [Employee], thresholds: &'a AnalysisThresholds, as_of: NaiveDate) -> Self {
        Self {
            employees,
            graph: None,
            as_of,
            thresholds,
        }
    }

    pub fn with_graph(mut self, graph: &'a OrgGraph<'a>) -> Self {
        self.graph = Some(graph);
        self
    }
}
