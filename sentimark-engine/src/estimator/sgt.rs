//! Simple Good-Turing frequency estimation (Gale & Sampson, 1995).
//!
//! Given the observed counts of one sample, estimate a probability for each
//! observed species plus the total probability `p0` of all unseen species.
//! Low frequencies use the raw Turing estimate `(r+1) · n(r+1) / n(r)` for as
//! long as it differs significantly from the log-linear smoothed estimate;
//! from the first frequency where it does not, the smoothed estimate is used.

use std::collections::BTreeMap;

use tracing::trace;

/// Multiplier on the standard deviation when comparing the Turing and
/// smoothed estimates (95% confidence).
const CONFIDENCE_FACTOR: f64 = 1.96;

/// Slope used when the log-log fit is undefined (fewer than two distinct
/// frequencies). `-1` makes the smoothed estimate equal to `r`.
const DEGENERATE_SLOPE: f64 = -1.0;

/// Reestimated probabilities of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Probability per input count, aligned with the input (0 for count 0)
    pub probs: Vec<f64>,
    /// Total probability reserved for unseen species
    pub p0: f64,
}

/// Run Simple Good-Turing over `counts`.
///
/// Zero counts are allowed and get probability 0. A sample with no
/// observations reserves all of its mass for unseen species (`p0 = 1`).
/// For any non-empty sample `probs.sum() + p0 == 1` up to rounding.
pub fn simple_good_turing(counts: &[u32]) -> Estimate {
    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return Estimate {
            probs: vec![0.0; counts.len()],
            p0: 1.0,
        };
    }

    let mut freq_of_freqs: BTreeMap<u32, u64> = BTreeMap::new();
    for &count in counts.iter().filter(|&&c| c > 0) {
        *freq_of_freqs.entry(count).or_insert(0) += 1;
    }
    let rs: Vec<u32> = freq_of_freqs.keys().copied().collect();
    let ns: Vec<f64> = freq_of_freqs.values().map(|&n| n as f64).collect();

    let n1 = freq_of_freqs.get(&1).copied().unwrap_or(0);
    let p0 = n1 as f64 / total as f64;

    let slope = log_linear_slope(&rs, &ns);
    if slope > -1.0 {
        trace!(slope, "good-turing slope above -1, estimates may be unreliable");
    }
    let smoothed = |r: f64| (r + 1.0) * ((r + 1.0) / r).powf(slope);

    let mut use_smoothed = false;
    let mut r_star: BTreeMap<u32, f64> = BTreeMap::new();
    for (j, &r) in rs.iter().enumerate() {
        let rf = r as f64;
        let y = smoothed(rf);
        if !use_smoothed {
            match freq_of_freqs.get(&(r + 1)) {
                None => use_smoothed = true,
                Some(&next) => {
                    let next = next as f64;
                    let n = ns[j];
                    let x = (rf + 1.0) * next / n;
                    let variance = (rf + 1.0).powi(2) * next / n.powi(2) * (1.0 + next / n);
                    if (x - y).abs() <= CONFIDENCE_FACTOR * variance.sqrt() {
                        use_smoothed = true;
                    } else {
                        r_star.insert(r, x);
                        continue;
                    }
                }
            }
        }
        r_star.insert(r, y);
    }

    let n_prime: f64 = rs.iter().zip(&ns).map(|(r, n)| n * r_star[r]).sum();
    let probs = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                (1.0 - p0) * r_star[&c] / n_prime
            }
        })
        .collect();

    Estimate { probs, p0 }
}

/// Least-squares slope of `log Z(r)` against `log r`.
///
/// `Z(r) = 2 n(r) / (t - q)` averages n(r) over the gap to the neighbouring
/// observed frequencies `q < r < t` (q = 0 for the first, t = 2r - q for
/// the last).
fn log_linear_slope(rs: &[u32], ns: &[f64]) -> f64 {
    if rs.len() < 2 {
        return DEGENERATE_SLOPE;
    }
    let points: Vec<(f64, f64)> = (0..rs.len())
        .map(|j| {
            let r = rs[j] as f64;
            let q = if j == 0 { 0.0 } else { rs[j - 1] as f64 };
            let t = if j + 1 == rs.len() {
                2.0 * r - q
            } else {
                rs[j + 1] as f64
            };
            let z = 2.0 * ns[j] / (t - q);
            (r.ln(), z.ln())
        })
        .collect();

    let len = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / len;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / len;
    let covariance: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let variance: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if variance == 0.0 {
        return DEGENERATE_SLOPE;
    }
    covariance / variance
}
