//! Talentgraph
//!
//! Org-hierarchy graph service and statistical bias detection for talent
//! calibration.
//!
//! # Architecture
//!
//! - `employee`: immutable employee snapshot model and a seeded population generator
//! - `org`: reports-to graph with validation, cached closures and reporting chains
//! - `analysis`: registry of chi-square bias analyses over the snapshot
//! - `packaging`: anonymized and complete payloads, with an automated privacy audit
//! - `insight`: ranked insights and an optional external narrative
//! - `pipeline`: one call that runs every stage
//!
//! Pure graph and statistics algorithms live in the `talentgraph-algorithms`
//! crate; this crate is the adapter layer around them.
//!
//! ## Example Usage
//!
//! ```rust
//! use talentgraph::employee::{Employee, EmployeeId, JobLevel};
//! use talentgraph::org::OrgGraph;
//!
//! let employees = vec![
//!     Employee::new(1, "Dana Reyes", JobLevel::Executive),
//!     Employee::new(2, "Sam Kim", JobLevel::Director).reports_to(1),
//!     Employee::new(3, "Lee Novak", JobLevel::Manager).reports_to_name("Sam Kim"),
//! ];
//!
//! let graph = OrgGraph::validated(&employees).unwrap();
//! assert_eq!(graph.all_reports(EmployeeId(1)).len(), 2);
//! assert_eq!(
//!     graph.reporting_chain(EmployeeId(3)).unwrap(),
//!     vec![EmployeeId(2), EmployeeId(1)]
//! );
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod employee;
pub mod insight;
pub mod org;
pub mod packaging;
pub mod pipeline;

// Re-export main types for convenience
pub use employee::{
    Employee, EmployeeFlag, EmployeeId, JobLevel, ManagerRef, PopulationGenerator, Rating,
};

pub use org::{
    validate_structure, ManagerResolution, OrgError, OrgGraph, OrgResult, OrgTree, Validation,
    ValidationResult,
};

pub use analysis::{
    AnalysisContext, AnalysisRegistry, AnalysisResult, AnalysisStatus, CategoryDeviation,
    Dimension, ManagerView,
};

pub use packaging::{
    audit_payload, build_anonymized_payload, build_complete_payload, AnonymizedPayload,
    CompletePayload, OrgSummary, PackagingError, PackagingResult,
};

pub use insight::{
    Insight, InsightEngine, InsightError, InsightPriority, InsightReport, InsightResult,
    InsightType, LlmReasoningClient, Narrative, ReasoningOutput, ReasoningProvider,
};

pub use config::{AnalysisThresholds, Config, ConfigError, PrivacyConfig, ReasoningConfig};

pub use pipeline::{CalibrationPipeline, CalibrationReport, PipelineError, PipelineResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
