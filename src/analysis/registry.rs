//! Ordered set of named analyses
//!
//! Built once and passed by reference. The same registry drives the
//! internal display path and the anonymized packaging path, so the two
//! always see the same analyses in the same order.

use super::dimensions::{
    function_bias, level_bias, level_distribution, location_bias, manager_bias, tenure_bias,
};
use super::{AnalysisContext, AnalysisResult, Dimension};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// A pure analysis over a read-only context
pub type AnalysisFn = fn(&AnalysisContext<'_>) -> AnalysisResult;

#[derive(Clone)]
pub struct RegisteredAnalysis {
    pub name: &'static str,
    pub dimension: Dimension,
    pub run: AnalysisFn,
}

/// Immutable once built; extending it is one call to `with`
#[derive(Clone, Default)]
pub struct AnalysisRegistry {
    analyses: Vec<RegisteredAnalysis>,
}

impl AnalysisRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location, function, level, tenure, manager (direct reports) and
    /// per-level calibration curve, in that order
    pub fn standard() -> Self {
        Self::new()
            .with("location", Dimension::Location, location_bias)
            .with("function", Dimension::Function, function_bias)
            .with("level", Dimension::Level, level_bias)
            .with("tenure", Dimension::Tenure, tenure_bias)
            .with("manager", Dimension::Manager, manager_bias)
            .with("level_distribution", Dimension::LevelDistribution, level_distribution)
    }

    pub fn with(mut self, name: &'static str, dimension: Dimension, run: AnalysisFn) -> Self {
        self.analyses.push(RegisteredAnalysis {
            name,
            dimension,
            run,
        });
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.analyses.iter().map(|a| a.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAnalysis> {
        self.analyses.iter()
    }

    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }

    /// Run every analysis in parallel and return results in registration order.
    ///
    /// Analyses share nothing mutable, so the output does not depend on
    /// scheduling.
    pub fn run_all(&self, ctx: &AnalysisContext<'_>) -> Vec<AnalysisResult> {
        let start = Instant::now();
        let results: Vec<AnalysisResult> = self
            .analyses
            .par_iter()
            .map(|analysis| {
                let mut result = (analysis.run)(ctx);
                result.name = analysis.name.to_string();
                debug!(analysis = analysis.name, status = %result.status, "Ran analysis");
                result
            })
            .collect();

        info!(
            "Ran {} analyses over {} employees in {:?}",
            results.len(),
            ctx.employees.len(),
            start.elapsed()
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisStatus;
    use crate::config::AnalysisThresholds;
    use chrono::NaiveDate;

    fn always_alert(ctx: &AnalysisContext<'_>) -> AnalysisResult {
        let mut result = AnalysisResult::insufficient("custom", Dimension::Level, ctx.employees.len(), "stub");
        result.status = AnalysisStatus::Alert;
        result
    }

    #[test]
    fn test_standard_order() {
        let registry = AnalysisRegistry::standard();
        assert_eq!(
            registry.names(),
            vec!["location", "function", "level", "tenure", "manager", "level_distribution"]
        );
    }

    #[test]
    fn test_empty_input_never_fails() {
        let registry = AnalysisRegistry::standard().with("custom", Dimension::Level, always_alert);
        let thresholds = AnalysisThresholds::default();
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let ctx = AnalysisContext::new(&[], &thresholds, as_of);

        let results = registry.run_all(&ctx);
        assert_eq!(results.len(), 7);
        for result in &results[..6] {
            assert_eq!(result.status, AnalysisStatus::Pass);
            assert_eq!(result.p_value, 1.0);
            assert!(result.insufficient_data.is_some());
        }
        assert_eq!(results[6].name, "custom");
        assert_eq!(results[6].status, AnalysisStatus::Alert);
    }
}
