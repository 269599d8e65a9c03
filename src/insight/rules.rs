//! Deterministic rule-based insights

use super::{Insight, InsightPriority, InsightType, SourceStatistics};
use crate::analysis::{AnalysisResult, AnalysisStatus};
use crate::employee::{EmployeeFlag, Rating};
use crate::packaging::AnonymizedPayload;

/// Share of a level that must be promotion-ready before it is called a backlog
const PROMOTION_BACKLOG_SHARE: f64 = 0.25;
const PROMOTION_BACKLOG_MIN: usize = 3;
/// High performers at flight risk that make the risk a high priority
const FLIGHT_RISK_HIGH_PRIORITY: usize = 3;

/// Every rule-derived insight, unranked
pub fn derive(results: &[AnalysisResult], payload: &AnonymizedPayload) -> Vec<Insight> {
    let mut insights = Vec::new();
    for result in results {
        insights.extend(analysis_insights(result));
    }
    insights.extend(talent_risks(payload));
    insights
}

/// One insight per alert or watch, plus one per flagged category clustered
/// under the analysis dimension
pub fn analysis_insights(result: &AnalysisResult) -> Vec<Insight> {
    let (insight_type, priority, title) = match result.status {
        AnalysisStatus::Alert => (
            InsightType::BiasAlert,
            InsightPriority::High,
            format!("Rating bias by {}", result.dimension),
        ),
        AnalysisStatus::Watch => (
            InsightType::BiasWatch,
            InsightPriority::Medium,
            format!("Possible rating pattern by {}", result.dimension),
        ),
        AnalysisStatus::Pass => return Vec::new(),
    };

    let category = result.dimension.label();
    let mut insights = vec![Insight::new(
        insight_type,
        category,
        priority,
        title,
        result.interpretation.clone(),
        result.sample_size,
    )
    .with_source(SourceStatistics::from(result))];

    let deviation_priority = match result.status {
        AnalysisStatus::Alert => InsightPriority::Medium,
        _ => InsightPriority::Low,
    };

    for deviation in result.flagged_deviations() {
        let (tier, delta) = if deviation.high_deviation.abs() >= deviation.low_deviation.abs() {
            ("high", deviation.high_deviation)
        } else {
            ("low", deviation.low_deviation)
        };
        let description = format!(
            "{} of {} rated high ({:.0}%) and {} rated low ({:.0}%), against baselines of {:.0}% and {:.0}%.",
            deviation.high_count,
            deviation.count,
            deviation.high_rate * 100.0,
            deviation.low_count,
            deviation.low_rate * 100.0,
            deviation.baseline_high_rate * 100.0,
            deviation.baseline_low_rate * 100.0,
        );
        insights.push(
            Insight::new(
                InsightType::CategoryDeviation,
                category,
                deviation_priority,
                format!("{}: {:+.1}pp {}-tier rate", deviation.category, delta, tier),
                description,
                deviation.count,
            )
            .with_source(SourceStatistics::from(result))
            .with_cluster(category),
        );
    }
    insights
}

/// Talent risks visible in the anonymized payload
pub fn talent_risks(payload: &AnonymizedPayload) -> Vec<Insight> {
    let mut insights = Vec::new();

    let at_risk = payload
        .flagged_employees
        .iter()
        .filter(|e| e.performance == Rating::High && e.flags.contains(&EmployeeFlag::FlightRisk))
        .count();
    if at_risk > 0 {
        let priority = if at_risk >= FLIGHT_RISK_HIGH_PRIORITY {
            InsightPriority::High
        } else {
            InsightPriority::Medium
        };
        insights.push(
            Insight::new(
                InsightType::TalentRisk,
                "retention",
                priority,
                "Flight risk among high performers",
                format!("{} high-performing employees are flagged as flight risks.", at_risk),
                at_risk,
            )
            .with_cluster("talent risk"),
        );
    }

    for level in &payload.levels {
        let ready = payload
            .flagged_employees
            .iter()
            .filter(|e| e.level == level.level && e.flags.contains(&EmployeeFlag::PromotionReady))
            .count();
        if ready >= PROMOTION_BACKLOG_MIN && ready as f64 >= level.headcount as f64 * PROMOTION_BACKLOG_SHARE {
            insights.push(
                Insight::new(
                    InsightType::TalentRisk,
                    "promotion",
                    InsightPriority::Medium,
                    format!("Promotion-ready backlog at {} level", level.level),
                    format!(
                        "{} of {} employees at {} level are promotion-ready.",
                        ready, level.headcount, level.level
                    ),
                    ready,
                )
                .with_cluster("talent risk"),
            );
        }
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CategoryDeviation, Dimension};

    fn deviation(category: &str, high_deviation: f64, flagged: bool) -> CategoryDeviation {
        CategoryDeviation {
            category: category.to_string(),
            subject: None,
            count: 20,
            high_count: 10,
            low_count: 2,
            high_rate: 0.5,
            low_rate: 0.1,
            baseline_high_rate: 0.2,
            baseline_low_rate: 0.1,
            high_deviation,
            low_deviation: 0.0,
            flagged,
        }
    }

    fn result(status: AnalysisStatus) -> AnalysisResult {
        AnalysisResult {
            name: "location".to_string(),
            dimension: Dimension::Location,
            chi_square: 12.0,
            p_value: 0.01,
            effect_size: 0.25,
            degrees_of_freedom: 4,
            sample_size: 120,
            status,
            deviations: vec![deviation("Austin", 30.0, true), deviation("Berlin", -2.0, false)],
            interpretation: "skewed".to_string(),
            insufficient_data: None,
        }
    }

    #[test]
    fn test_alert_yields_bias_and_deviation_insights() {
        let insights = analysis_insights(&result(AnalysisStatus::Alert));
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].insight_type, InsightType::BiasAlert);
        assert_eq!(insights[0].priority, InsightPriority::High);
        assert_eq!(insights[1].insight_type, InsightType::CategoryDeviation);
        assert_eq!(insights[1].title, "Austin: +30.0pp high-tier rate");
        assert_eq!(insights[1].cluster.as_deref(), Some("location"));
    }

    #[test]
    fn test_pass_yields_nothing() {
        assert!(analysis_insights(&result(AnalysisStatus::Pass)).is_empty());
        let watch = analysis_insights(&result(AnalysisStatus::Watch));
        assert_eq!(watch[0].priority, InsightPriority::Medium);
        assert_eq!(watch[1].priority, InsightPriority::Low);
    }
}
