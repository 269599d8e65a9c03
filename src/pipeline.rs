//! End-to-end calibration run
//!
//! validated graph -> analyses (rayon fan-out) -> payloads -> insights.
//! Structural and packaging errors are returned. A reasoning provider
//! failure never is; it only removes the narrative.

use crate::analysis::{AnalysisContext, AnalysisRegistry, AnalysisResult};
use crate::config::Config;
use crate::employee::Employee;
use crate::insight::{Insight, InsightEngine, Narrative, ReasoningProvider};
use crate::org::{OrgError, OrgGraph, ValidationResult};
use crate::packaging::{
    build_anonymized_payload, build_complete_payload, AnonymizedPayload, CompletePayload,
    OrgSummary, PackagingError,
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Org structure error: {0}")]
    Org(#[from] OrgError),

    #[error("Packaging error: {0}")]
    Packaging(#[from] PackagingError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything one calibration run produces
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    pub summary: OrgSummary,
    pub validation: ValidationResult,
    pub analyses: Vec<AnalysisResult>,
    pub anonymized: AnonymizedPayload,
    pub complete: CompletePayload,
    pub insights: Vec<Insight>,
    pub narrative: Narrative,
}

pub struct CalibrationPipeline {
    config: Config,
    registry: AnalysisRegistry,
    engine: InsightEngine,
}

impl CalibrationPipeline {
    pub fn new(config: Config, registry: AnalysisRegistry) -> Self {
        let engine = InsightEngine::from_config(&config.reasoning);
        Self {
            config,
            registry,
            engine,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &AnalysisRegistry {
        &self.registry
    }

    /// Run every stage against one snapshot. Validation is always enforced.
    pub async fn run(
        &self,
        employees: &[Employee],
        as_of: NaiveDate,
        provider: Option<&dyn ReasoningProvider>,
    ) -> PipelineResult<CalibrationReport> {
        let graph = OrgGraph::validated(employees)?;
        let summary = OrgSummary::from_graph(&graph, as_of);

        let ctx = AnalysisContext::new(employees, &self.config.analysis, as_of).with_graph(&graph);
        let analyses = self.registry.run_all(&ctx);

        let anonymized = build_anonymized_payload(employees, &analyses, &summary, &self.config.privacy)?;
        let complete = build_complete_payload(employees, &analyses, &summary);

        let report = self.engine.synthesize(&analyses, &anonymized, provider).await;
        info!(
            "Calibration run complete: {} employees, {} analyses, {} insights",
            summary.headcount,
            analyses.len(),
            report.insights.len()
        );

        Ok(CalibrationReport {
            validation: graph.validate_structure().clone(),
            summary,
            analyses,
            anonymized,
            complete,
            insights: report.insights,
            narrative: report.narrative,
        })
    }
}
