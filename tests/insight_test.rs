use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use talentgraph::insight::ExternalIssue;
use talentgraph::{
    AnalysisRegistry, AnonymizedPayload, CalibrationPipeline, CalibrationReport, Config, Employee,
    InsightEngine, InsightError, InsightPriority, InsightResult, InsightType, JobLevel, Narrative,
    Rating, ReasoningOutput, ReasoningProvider,
};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// One director, four managers of forty; Manager #10 rates generously
fn org() -> Vec<Employee> {
    let mut employees = vec![
        Employee::new(1, "Pat Lee", JobLevel::Executive).with_email("pat@example.com"),
        Employee::new(2, "Robin Cho", JobLevel::Director).reports_to(1),
    ];
    let mut next_id = 100u64;
    for manager in 10..14u64 {
        employees.push(Employee::new(manager, format!("Manager {}", manager), JobLevel::Manager).reports_to(2));
        let (high, medium, low) = if manager == 10 { (20, 16, 4) } else { (8, 24, 8) };
        let tiers = std::iter::repeat(Rating::High)
            .take(high)
            .chain(std::iter::repeat(Rating::Medium).take(medium))
            .chain(std::iter::repeat(Rating::Low).take(low));
        for tier in tiers {
            employees.push(
                Employee::new(next_id, format!("Report {}", next_id), JobLevel::Associate)
                    .reports_to(manager)
                    .with_performance(tier),
            );
            next_id += 1;
        }
    }
    employees
}

async fn local_report() -> CalibrationReport {
    let pipeline = CalibrationPipeline::new(Config::default(), AnalysisRegistry::standard());
    pipeline.run(&org(), as_of(), None).await.unwrap()
}

/// Answers every request and remembers what it was sent
#[derive(Default)]
struct RecordingProvider {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl ReasoningProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, payload: &AnonymizedPayload) -> InsightResult<ReasoningOutput> {
        let body = serde_json::to_string(payload).map_err(|e| InsightError::Serialization(e.to_string()))?;
        self.seen.lock().unwrap().push(body);
        Ok(ReasoningOutput {
            summary: "One team is rated well above its peers.".to_string(),
            issues: vec![ExternalIssue {
                title: "Review Team 01 ratings".to_string(),
                description: "Half the team is rated high.".to_string(),
                priority: Some(InsightPriority::High),
                affected_count: Some(40),
            }],
        })
    }
}

struct FailingProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl ReasoningProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, _payload: &AnonymizedPayload) -> InsightResult<ReasoningOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(InsightError::Api("503 Service Unavailable".to_string()))
    }
}

struct SlowProvider;

#[async_trait]
impl ReasoningProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, _payload: &AnonymizedPayload) -> InsightResult<ReasoningOutput> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ReasoningOutput {
            summary: "too late".to_string(),
            issues: Vec::new(),
        })
    }
}

struct OfflineProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl ReasoningProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn analyze(&self, _payload: &AnonymizedPayload) -> InsightResult<ReasoningOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(InsightError::Unavailable("offline".to_string()))
    }
}

#[tokio::test]
async fn test_pipeline_without_provider() {
    let report = local_report().await;

    assert_eq!(report.summary.headcount, 166);
    assert!(report.validation.is_valid);
    assert!(matches!(report.narrative, Narrative::Unavailable { .. }));

    let manager_alert = report
        .insights
        .iter()
        .find(|i| i.insight_type == InsightType::BiasAlert && i.category == "manager")
        .expect("manager bias is detected");
    assert_eq!(manager_alert.priority, InsightPriority::High);
    assert!(report
        .insights
        .iter()
        .any(|i| i.insight_type == InsightType::CategoryDeviation && i.title.starts_with("Manager #10")));

    for (i, insight) in report.insights.iter().enumerate() {
        assert_eq!(insight.id, format!("INS-{:03}", i + 1));
    }
    for pair in report.insights.windows(2) {
        assert!(pair[0].priority >= pair[1].priority);
    }
}

#[tokio::test]
async fn test_provider_sees_only_anonymized_data() {
    let local = local_report().await;
    let provider = RecordingProvider::default();
    let engine = InsightEngine::new(Duration::from_secs(5), 0);

    let report = engine
        .synthesize(&local.analyses, &local.anonymized, Some(&provider))
        .await;

    assert_eq!(
        report.narrative,
        Narrative::Generated {
            provider: "recording".to_string(),
            summary: "One team is rated well above its peers.".to_string(),
        }
    );
    assert_eq!(report.insights.len(), local.insights.len() + 1);
    assert!(report
        .insights
        .iter()
        .any(|i| i.insight_type == InsightType::ExternalObservation && i.affected_count == 40));

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    for employee in org() {
        assert!(!seen[0].contains(&format!("\"{}\"", employee.name)));
    }
    assert!(!seen[0].contains("pat@example.com"));
    assert!(!seen[0].contains("Manager #"));
}

#[tokio::test]
async fn test_failing_provider_is_retried_then_dropped() {
    let local = local_report().await;
    let provider = FailingProvider {
        calls: AtomicUsize::new(0),
    };
    let engine = InsightEngine::new(Duration::from_secs(5), 2);

    let report = engine
        .synthesize(&local.analyses, &local.anonymized, Some(&provider))
        .await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    match &report.narrative {
        Narrative::Unavailable { reason } => assert!(reason.contains("503")),
        other => panic!("unexpected narrative {:?}", other),
    }
    assert_eq!(report.insights, local.insights);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let local = local_report().await;
    let engine = InsightEngine::new(Duration::from_millis(50), 0);

    let report = engine
        .synthesize(&local.analyses, &local.anonymized, Some(&SlowProvider))
        .await;

    match &report.narrative {
        Narrative::Unavailable { reason } => assert!(reason.contains("timed out"), "{}", reason),
        other => panic!("unexpected narrative {:?}", other),
    }
    assert_eq!(report.insights, local.insights);
}

#[tokio::test]
async fn test_unavailable_provider_is_never_called() {
    let local = local_report().await;
    let provider = OfflineProvider {
        calls: AtomicUsize::new(0),
    };
    let engine = InsightEngine::default();

    let report = engine
        .synthesize(&local.analyses, &local.anonymized, Some(&provider))
        .await;

    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(!report.narrative.is_generated());
    assert_eq!(report.insights, local.insights);
}

#[tokio::test]
async fn test_pipeline_rejects_invalid_structure() {
    let mut employees = org();
    employees.push(Employee::new(999, "Lone Wolf", JobLevel::Senior).reports_to(4242));

    let pipeline = CalibrationPipeline::new(Config::default(), AnalysisRegistry::standard());
    let err = pipeline.run(&employees, as_of(), None).await.unwrap_err();
    assert!(err.to_string().contains("4242"));
}

#[tokio::test]
async fn test_pipeline_accepts_titles_shared_with_level_labels() {
    let mut employees = vec![Employee::new(1, "Pat Lee", JobLevel::Executive).with_title("Executive")];
    let mut next_id = 100u64;
    for director in 10..13u64 {
        employees.push(
            Employee::new(director, format!("Lead {}", director), JobLevel::Director)
                .reports_to(1)
                .with_title("Director"),
        );
        for k in 0..12 {
            employees.push(
                Employee::new(next_id, format!("Report {}", next_id), JobLevel::Senior)
                    .reports_to(director)
                    .with_title("Senior")
                    .with_performance([Rating::High, Rating::Medium, Rating::Low][k % 3]),
            );
            next_id += 1;
        }
    }

    let pipeline = CalibrationPipeline::new(Config::default(), AnalysisRegistry::standard());
    let report = pipeline.run(&employees, as_of(), None).await.unwrap();

    assert_eq!(report.summary.headcount, 40);
    let json = serde_json::to_string(&report.anonymized).unwrap();
    for employee in &employees {
        assert!(!json.contains(&format!("\"{}\"", employee.name)));
    }
}
