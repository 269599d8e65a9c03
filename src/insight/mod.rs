//! Insight synthesis
//!
//! Merges analysis results and the anonymized payload into a ranked list of
//! insights. Rule-derived insights are always produced locally. A narrative
//! summary is delegated to an optional external reasoning provider, and any
//! failure there only costs the narrative.

pub mod client;
pub mod rules;

pub use client::LlmReasoningClient;

use crate::analysis::AnalysisResult;
use crate::config::ReasoningConfig;
use crate::packaging::AnonymizedPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type InsightResult<T> = Result<T, InsightError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    BiasAlert,
    BiasWatch,
    CategoryDeviation,
    TalentRisk,
    ExternalObservation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
}

/// Statistics an insight was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatistics {
    pub analysis: String,
    pub chi_square: f64,
    pub p_value: f64,
    pub effect_size: f64,
    pub sample_size: usize,
}

impl From<&AnalysisResult> for SourceStatistics {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            analysis: result.name.clone(),
            chi_square: result.chi_square,
            p_value: result.p_value,
            effect_size: result.effect_size,
            sample_size: result.sample_size,
        }
    }
}

/// A discrete, ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// `INS-001` style, assigned after ranking
    pub id: String,
    pub insight_type: InsightType,
    pub category: String,
    pub priority: InsightPriority,
    pub title: String,
    pub description: String,
    pub affected_count: usize,
    pub source: Option<SourceStatistics>,
    pub cluster: Option<String>,
}

impl Insight {
    pub fn new(
        insight_type: InsightType,
        category: impl Into<String>,
        priority: InsightPriority,
        title: impl Into<String>,
        description: impl Into<String>,
        affected_count: usize,
    ) -> Self {
        Self {
            id: String::new(),
            insight_type,
            category: category.into(),
            priority,
            title: title.into(),
            description: description.into(),
            affected_count,
            source: None,
            cluster: None,
        }
    }

    pub fn with_source(mut self, source: SourceStatistics) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    fn effect_size(&self) -> f64 {
        self.source.as_ref().map(|s| s.effect_size).unwrap_or(0.0)
    }
}

/// Issue reported by an external reasoning provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalIssue {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<InsightPriority>,
    #[serde(default)]
    pub affected_count: Option<usize>,
}

/// Rich output of a reasoning provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningOutput {
    pub summary: String,
    #[serde(default)]
    pub issues: Vec<ExternalIssue>,
}

/// External reasoning collaborator. Receives only the anonymized payload.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    fn name(&self) -> &str;
    /// Cheap availability check, called before every `analyze`
    async fn is_available(&self) -> bool;
    async fn analyze(&self, payload: &AnonymizedPayload) -> InsightResult<ReasoningOutput>;
}

/// Narrative summary, or why there is none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Narrative {
    Generated { provider: String, summary: String },
    Unavailable { reason: String },
}

impl Narrative {
    pub fn summary(&self) -> Option<&str> {
        match self {
            Narrative::Generated { summary, .. } => Some(summary),
            Narrative::Unavailable { .. } => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Narrative::Generated { .. })
    }
}

/// Ranked insights plus the narrative outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub insights: Vec<Insight>,
    pub narrative: Narrative,
}

/// Bounds and retries for the external call
#[derive(Debug, Clone)]
pub struct InsightEngine {
    timeout: Duration,
    max_retries: u32,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 1)
    }
}

impl InsightEngine {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self { timeout, max_retries }
    }

    pub fn from_config(config: &ReasoningConfig) -> Self {
        Self::new(Duration::from_secs(config.timeout_secs.max(1)), config.max_retries)
    }

    /// Rule-derived insights only, ranked
    pub fn local_insights(&self, results: &[AnalysisResult], payload: &AnonymizedPayload) -> Vec<Insight> {
        let mut insights = rules::derive(results, payload);
        rank(&mut insights);
        insights
    }

    /// Rule-derived insights plus, when the provider cooperates, its
    /// narrative and issues. Never fails.
    pub async fn synthesize(
        &self,
        results: &[AnalysisResult],
        payload: &AnonymizedPayload,
        provider: Option<&dyn ReasoningProvider>,
    ) -> InsightReport {
        let mut insights = rules::derive(results, payload);

        let narrative = match provider {
            None => Narrative::Unavailable {
                reason: "no reasoning provider configured".to_string(),
            },
            Some(provider) => match self.consult(provider, payload).await {
                Ok(output) => {
                    insights.extend(output.issues.into_iter().map(external_insight));
                    Narrative::Generated {
                        provider: provider.name().to_string(),
                        summary: output.summary,
                    }
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Narrative unavailable, using local insights only");
                    Narrative::Unavailable { reason: e.to_string() }
                }
            },
        };

        rank(&mut insights);
        info!(
            "Synthesized {} insights (narrative {})",
            insights.len(),
            if narrative.is_generated() { "generated" } else { "unavailable" }
        );
        InsightReport { insights, narrative }
    }

    async fn consult(
        &self,
        provider: &dyn ReasoningProvider,
        payload: &AnonymizedPayload,
    ) -> InsightResult<ReasoningOutput> {
        match timeout(self.timeout, provider.is_available()).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(InsightError::Unavailable(format!(
                    "{} did not pass its availability check",
                    provider.name()
                )))
            }
            Err(_) => return Err(InsightError::Timeout(self.timeout)),
        }

        let mut last_error = InsightError::Unavailable(provider.name().to_string());
        for attempt in 0..=self.max_retries {
            match timeout(self.timeout, provider.analyze(payload)).await {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = InsightError::Timeout(self.timeout),
            }
            warn!(provider = provider.name(), attempt, error = %last_error, "Reasoning attempt failed");
        }
        Err(last_error)
    }
}

fn external_insight(issue: ExternalIssue) -> Insight {
    Insight::new(
        InsightType::ExternalObservation,
        "external",
        issue.priority.unwrap_or(InsightPriority::Medium),
        issue.title,
        issue.description,
        issue.affected_count.unwrap_or(0),
    )
}

/// Sort by priority, effect size, affected count, then title, and assign ids
pub fn rank(insights: &mut [Insight]) {
    insights.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.effect_size().partial_cmp(&a.effect_size()).unwrap_or(Ordering::Equal))
            .then_with(|| b.affected_count.cmp(&a.affected_count))
            .then_with(|| a.title.cmp(&b.title))
    });
    for (i, insight) in insights.iter_mut().enumerate() {
        insight.id = format!("INS-{:03}", i + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_order_and_ids() {
        let mut insights = vec![
            Insight::new(InsightType::TalentRisk, "risk", InsightPriority::Medium, "B", "", 3),
            Insight::new(InsightType::BiasAlert, "level", InsightPriority::High, "Z", "", 10),
            Insight::new(InsightType::TalentRisk, "risk", InsightPriority::Medium, "A", "", 3),
            Insight::new(InsightType::BiasWatch, "tenure", InsightPriority::Medium, "C", "", 1).with_source(
                SourceStatistics {
                    analysis: "tenure".to_string(),
                    chi_square: 9.0,
                    p_value: 0.07,
                    effect_size: 0.2,
                    sample_size: 100,
                },
            ),
        ];
        rank(&mut insights);

        let titles: Vec<&str> = insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Z", "C", "A", "B"]);
        assert_eq!(insights[0].id, "INS-001");
        assert_eq!(insights[3].id, "INS-004");
    }

    #[test]
    fn test_output_parses_without_issues() {
        let output: ReasoningOutput = serde_json::from_str(r#"{"summary": "ok"}"#).unwrap();
        assert!(output.issues.is_empty());
    }
}
