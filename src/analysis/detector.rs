//! Shared bias detection machinery
//!
//! Contingency tallies, significance testing, effect size, per-category
//! deviation and tri-state classification. Every registered analysis goes
//! through `evaluate` or `evaluate_against_target`, so they all apply the
//! same thresholds.

use super::{AnalysisResult, AnalysisStatus, CategoryDeviation, Dimension};
use crate::config::{AnalysisThresholds, TargetDistribution};
use crate::employee::{Employee, EmployeeId, Rating};
use std::collections::BTreeMap;
use talentgraph_algorithms::{
    chi_square_goodness_of_fit, chi_square_independence, chi_square_survival, cramers_v,
    ContingencyTable,
};
use tracing::debug;

/// Row of a tally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    pub subject: Option<EmployeeId>,
}

impl Category {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            subject: None,
        }
    }
}

/// Category x tier counts. Columns follow `Rating::ALL`.
#[derive(Debug, Clone)]
pub struct CategoryCounts {
    categories: Vec<Category>,
    table: ContingencyTable,
}

impl CategoryCounts {
    /// Tally employees by `key`, skipping those without one.
    /// Rows come out in key order.
    pub fn tally<'e, K, I, F, L>(employees: I, key: F, describe: L) -> Self
    where
        K: Ord,
        I: IntoIterator<Item = &'e Employee>,
        F: Fn(&Employee) -> Option<K>,
        L: Fn(&K) -> Category,
    {
        let mut groups: BTreeMap<K, [usize; 3]> = BTreeMap::new();
        for employee in employees {
            if let Some(k) = key(employee) {
                groups.entry(k).or_insert([0; 3])[employee.tier().index()] += 1;
            }
        }
        Self::from_groups(groups.iter().map(|(k, counts)| (describe(k), *counts)))
    }

    /// Build from pre-grouped tier counts
    pub fn from_groups(groups: impl IntoIterator<Item = (Category, [usize; 3])>) -> Self {
        let (categories, counts): (Vec<Category>, Vec<[usize; 3]>) = groups.into_iter().unzip();
        let row_labels = categories.iter().map(|c| c.label.clone()).collect();
        let column_labels = Rating::ALL.iter().map(|r| r.label().to_string()).collect();

        let mut table = ContingencyTable::new(row_labels, column_labels);
        for (row, tiers) in counts.iter().enumerate() {
            for (column, &n) in tiers.iter().enumerate() {
                table.counts[[row, column]] = n as f64;
            }
        }
        Self { categories, table }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn table(&self) -> &ContingencyTable {
        &self.table
    }

    pub fn sample_size(&self) -> usize {
        self.table.total() as usize
    }

    /// Number of tiers that at least one counted employee holds
    pub fn populated_tiers(&self) -> usize {
        self.table.column_totals().iter().filter(|&&t| t > 0.0).count()
    }

    /// Overall (high, low) tier rates across every counted employee
    pub fn baseline(&self) -> (f64, f64) {
        let total = self.table.total();
        if total <= 0.0 {
            return (0.0, 0.0);
        }
        let columns = self.table.column_totals();
        (
            columns[Rating::High.index()] / total,
            columns[Rating::Low.index()] / total,
        )
    }

    /// Deviation of every category from the given (high, low) baseline
    pub fn deviations(&self, baseline: (f64, f64), thresholds: &AnalysisThresholds) -> Vec<CategoryDeviation> {
        let (baseline_high, baseline_low) = baseline;
        self.categories
            .iter()
            .enumerate()
            .map(|(row, category)| {
                let high = self.table.counts[[row, Rating::High.index()]];
                let low = self.table.counts[[row, Rating::Low.index()]];
                let count: f64 = self.table.counts.row(row).sum();

                let (high_rate, low_rate) = if count > 0.0 {
                    (high / count, low / count)
                } else {
                    (0.0, 0.0)
                };
                let high_deviation = (high_rate - baseline_high) * 100.0;
                let low_deviation = (low_rate - baseline_low) * 100.0;
                let flagged = count as usize >= thresholds.min_category_size
                    && (high_deviation.abs() >= thresholds.deviation_threshold
                        || low_deviation.abs() >= thresholds.deviation_threshold);

                CategoryDeviation {
                    category: category.label.clone(),
                    subject: category.subject,
                    count: count as usize,
                    high_count: high as usize,
                    low_count: low as usize,
                    high_rate,
                    low_rate,
                    baseline_high_rate: baseline_high,
                    baseline_low_rate: baseline_low,
                    high_deviation,
                    low_deviation,
                    flagged,
                }
            })
            .collect()
    }
}

/// Alert needs both significance and a non-negligible effect. A significant
/// result with a negligible effect is only watched.
pub fn classify(p_value: f64, effect_size: f64, thresholds: &AnalysisThresholds) -> AnalysisStatus {
    if p_value < thresholds.alpha && effect_size >= thresholds.min_effect_size {
        AnalysisStatus::Alert
    } else if p_value < thresholds.watch_alpha {
        AnalysisStatus::Watch
    } else {
        AnalysisStatus::Pass
    }
}

/// Chi-square test of independence between category and tier
pub fn evaluate(
    name: &str,
    dimension: Dimension,
    counts: &CategoryCounts,
    thresholds: &AnalysisThresholds,
) -> AnalysisResult {
    let n = counts.sample_size();
    if let Some(reason) = degenerate(n, counts, thresholds) {
        debug!(analysis = name, %reason, "Skipping test");
        return AnalysisResult::insufficient(name, dimension, n, reason);
    }

    let Some(test) = chi_square_independence(counts.table()) else {
        return AnalysisResult::insufficient(name, dimension, n, "contingency table has no degrees of freedom");
    };

    let pruned = counts.table().pruned();
    let effect_size = cramers_v(test.statistic, n as f64, pruned.rows(), pruned.columns());
    let status = classify(test.p_value, effect_size, thresholds);
    let deviations = counts.deviations(counts.baseline(), thresholds);

    debug!(
        analysis = name,
        chi_square = test.statistic,
        p_value = test.p_value,
        effect_size,
        %status,
        "Analysis complete"
    );

    AnalysisResult {
        name: name.to_string(),
        dimension,
        chi_square: test.statistic,
        p_value: test.p_value,
        effect_size,
        degrees_of_freedom: test.degrees_of_freedom,
        sample_size: n,
        status,
        interpretation: interpretation(dimension, status, test.p_value, effect_size, &deviations),
        deviations,
        insufficient_data: None,
    }
}

/// Goodness of fit of every category against a target tier distribution.
///
/// Categories below `min_category_size` are left out of the test but still
/// reported. Statistics and degrees of freedom are summed across the tested
/// categories; the effect size is the pooled statistic normalised like
/// Cramér's V over the three tiers.
pub fn evaluate_against_target(
    name: &str,
    dimension: Dimension,
    counts: &CategoryCounts,
    target: &TargetDistribution,
    thresholds: &AnalysisThresholds,
) -> AnalysisResult {
    let n = counts.sample_size();
    if n == 0 {
        return AnalysisResult::insufficient(name, dimension, 0, "no employees in scope");
    }
    if n < thresholds.min_sample_size {
        return AnalysisResult::insufficient(
            name,
            dimension,
            n,
            format!("{} employees, at least {} required", n, thresholds.min_sample_size),
        );
    }

    let proportions = target.proportions();
    let mut statistic = 0.0;
    let mut degrees_of_freedom = 0;
    let mut tested = 0usize;

    for row in counts.table().counts.rows() {
        if (row.sum() as usize) < thresholds.min_category_size {
            continue;
        }
        let observed = row.to_vec();
        if let Some(fit) = chi_square_goodness_of_fit(&observed, &proportions) {
            statistic += fit.statistic;
            degrees_of_freedom += fit.degrees_of_freedom;
            tested += row.sum() as usize;
        }
    }

    if degrees_of_freedom == 0 {
        return AnalysisResult::insufficient(
            name,
            dimension,
            n,
            format!("no category has at least {} employees", thresholds.min_category_size),
        );
    }

    let p_value = chi_square_survival(statistic, degrees_of_freedom);
    let tiers = Rating::ALL.len();
    let effect_size = cramers_v(statistic, tested as f64, tiers, tiers);
    let status = classify(p_value, effect_size, thresholds);
    let deviations = counts.deviations((target.high, target.low), thresholds);

    debug!(analysis = name, chi_square = statistic, p_value, effect_size, %status, "Analysis complete");

    AnalysisResult {
        name: name.to_string(),
        dimension,
        chi_square: statistic,
        p_value,
        effect_size,
        degrees_of_freedom,
        sample_size: tested,
        status,
        interpretation: interpretation(dimension, status, p_value, effect_size, &deviations),
        deviations,
        insufficient_data: None,
    }
}

fn degenerate(n: usize, counts: &CategoryCounts, thresholds: &AnalysisThresholds) -> Option<String> {
    if n == 0 {
        return Some("no employees in scope".to_string());
    }
    if n < thresholds.min_sample_size {
        return Some(format!(
            "{} employees, at least {} required",
            n, thresholds.min_sample_size
        ));
    }
    if counts.categories().len() < 2 {
        return Some("single category".to_string());
    }
    if counts.populated_tiers() < 2 {
        return Some("single performance tier".to_string());
    }
    None
}

/// One-paragraph reading of a result
pub fn interpretation(
    dimension: Dimension,
    status: AnalysisStatus,
    p_value: f64,
    effect_size: f64,
    deviations: &[CategoryDeviation],
) -> String {
    let mut text = match status {
        AnalysisStatus::Alert => format!(
            "Significant {} bias in performance ratings (p = {:.4}, Cramér's V = {:.3}).",
            dimension, p_value, effect_size
        ),
        AnalysisStatus::Watch => format!(
            "Possible {} pattern worth monitoring (p = {:.4}, Cramér's V = {:.3}).",
            dimension, p_value, effect_size
        ),
        AnalysisStatus::Pass => format!(
            "No significant {} bias detected (p = {:.4}).",
            dimension, p_value
        ),
    };

    let mut flagged: Vec<&CategoryDeviation> = deviations.iter().filter(|d| d.flagged).collect();
    if status != AnalysisStatus::Pass && !flagged.is_empty() {
        flagged.sort_by(|a, b| b.magnitude().total_cmp(&a.magnitude()).then_with(|| a.category.cmp(&b.category)));
        let described: Vec<String> = flagged
            .iter()
            .take(3)
            .map(|d| {
                if d.high_deviation.abs() >= d.low_deviation.abs() {
                    format!("{} ({:+.1}pp high)", d.category, d.high_deviation)
                } else {
                    format!("{} ({:+.1}pp low)", d.category, d.low_deviation)
                }
            })
            .collect();
        text.push_str(&format!(
            " {} of {} categories deviate from baseline: {}.",
            flagged.len(),
            deviations.len(),
            described.join(", ")
        ));
    }
    text
}
