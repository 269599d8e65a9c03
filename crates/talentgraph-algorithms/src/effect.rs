//! Effect sizes for contingency tables

/// Cramér's V: sqrt(chi2 / (n * (min(rows, columns) - 1))).
///
/// Ranges over [0, 1]. Returns 0 for tables too small to carry an effect.
pub fn cramers_v(statistic: f64, sample_size: f64, rows: usize, columns: usize) -> f64 {
    let k = rows.min(columns);
    if k < 2 || sample_size <= 0.0 || statistic <= 0.0 {
        return 0.0;
    }
    (statistic / (sample_size * (k - 1) as f64)).sqrt().min(1.0)
}
