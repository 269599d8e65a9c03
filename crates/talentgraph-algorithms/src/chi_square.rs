//! Chi-square tests
//!
//! Independence and goodness-of-fit tests, with p-values from the
//! regularized upper incomplete gamma function.

use super::contingency::ContingencyTable;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 500;
const EPSILON: f64 = 1e-14;
const FP_MIN: f64 = 1e-300;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Outcome of a chi-square test
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
}

/// Pearson chi-square test of independence.
///
/// Empty rows and columns are dropped first. Returns `None` when fewer than
/// two rows or two columns remain, since the test has zero degrees of
/// freedom.
pub fn chi_square_independence(table: &ContingencyTable) -> Option<ChiSquareResult> {
    let table = table.pruned();
    if table.rows() < 2 || table.columns() < 2 {
        return None;
    }

    let expected = table.expected();
    let statistic: f64 = table
        .counts
        .iter()
        .zip(expected.iter())
        .map(|(&o, &e)| (o - e).powi(2) / e)
        .sum();

    let degrees_of_freedom = (table.rows() - 1) * (table.columns() - 1);
    Some(ChiSquareResult {
        statistic,
        degrees_of_freedom,
        p_value: chi_square_survival(statistic, degrees_of_freedom),
    })
}

/// Pearson goodness-of-fit test of observed counts against target proportions.
///
/// Proportions are normalised to the observed total. Cells whose target
/// proportion is zero are skipped. Returns `None` when there are no
/// observations or fewer than two usable cells.
pub fn chi_square_goodness_of_fit(observed: &[f64], proportions: &[f64]) -> Option<ChiSquareResult> {
    let total: f64 = observed.iter().sum();
    let weight: f64 = proportions.iter().sum();
    if total <= 0.0 || weight <= 0.0 || observed.len() != proportions.len() {
        return None;
    }

    let mut statistic = 0.0;
    let mut cells = 0usize;
    for (&o, &p) in observed.iter().zip(proportions) {
        if p <= 0.0 {
            continue;
        }
        let e = total * p / weight;
        statistic += (o - e).powi(2) / e;
        cells += 1;
    }

    if cells < 2 {
        return None;
    }

    let degrees_of_freedom = cells - 1;
    Some(ChiSquareResult {
        statistic,
        degrees_of_freedom,
        p_value: chi_square_survival(statistic, degrees_of_freedom),
    })
}

/// P(X >= statistic) for X ~ chi-square(df)
pub fn chi_square_survival(statistic: f64, degrees_of_freedom: usize) -> f64 {
    if degrees_of_freedom == 0 || !statistic.is_finite() {
        return if statistic.is_infinite() { 0.0 } else { 1.0 };
    }
    if statistic <= 0.0 {
        return 1.0;
    }
    gamma_q(degrees_of_freedom as f64 / 2.0, statistic / 2.0).clamp(0.0, 1.0)
}

/// Natural log of the gamma function (Lanczos approximation)
fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let mut sum = LANCZOS_COEFFICIENTS[0];
    for (i, &c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized upper incomplete gamma Q(a, x)
fn gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    }
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut delta = sum;
    for _ in 0..MAX_ITERATIONS {
        ap += 1.0;
        delta *= x / ap;
        sum += delta;
        if delta.abs() < sum.abs() * EPSILON {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

// Modified Lentz evaluation
fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FP_MIN;
    let mut d = 1.0 / b;
    let mut h = d;

    for i in 1..=MAX_ITERATIONS {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < FP_MIN {
            d = FP_MIN;
        }
        c = b + an / c;
        if c.abs() < FP_MIN {
            c = FP_MIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}
