//! Density estimates backing the comparison plots.

use authorship_core::{AuthorshipError, Result};

/// Number of evaluation points of a KDE curve.
pub const KDE_GRID_POINTS: usize = 200;

/// How many bandwidths the KDE grid extends past the data on each side.
const KDE_CUT: f64 = 3.0;

/// Gaussian kernel density estimate with Scott's bandwidth.
///
/// Returns `(x, density)` pairs on an evenly spaced grid from
/// `min - 3·bw` to `max + 3·bw`.
///
/// # Errors
///
/// `UndefinedStatistic` for fewer than two values or zero variance;
/// `InvalidInput` when the spread of the values overflows `f64`.
pub fn gaussian_kde(values: &[f64], grid_points: usize) -> Result<Vec<(f64, f64)>> {
    let n = values.len();
    if n < 2 {
        return Err(AuthorshipError::UndefinedStatistic(format!(
            "kernel density needs at least 2 values, got {n}"
        )));
    }
    if grid_points < 2 {
        return Err(AuthorshipError::InvalidInput(format!(
            "kernel density grid needs at least 2 points, got {grid_points}"
        )));
    }

    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0)).sqrt();
    if std == 0.0 {
        return Err(AuthorshipError::UndefinedStatistic(
            "kernel density is undefined for zero-variance data".to_string(),
        ));
    }

    // Scott's rule: n^(-1/5) scaled by the sample standard deviation.
    let bw = std * nf.powf(-0.2);
    let (min, max) = min_max(values);
    let lo = min - KDE_CUT * bw;
    let hi = max + KDE_CUT * bw;
    let step = checked_span(lo, hi)? / (grid_points - 1) as f64;
    let norm = 1.0 / (nf * bw * (2.0 * std::f64::consts::PI).sqrt());

    Ok((0..grid_points)
        .map(|i| {
            let x = lo + step * i as f64;
            let density: f64 = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum();
            (x, density * norm)
        })
        .collect())
}

/// Histogram normalised so the bars integrate to one.
///
/// `bins` equal-width bins span the data range; the last bin is closed on the
/// right. A constant sample gets a unit-wide range centred on its value.
///
/// Returns `(edges, densities)` with `edges.len() == bins + 1`, or
/// `InvalidInput` when the data range overflows `f64`.
pub fn histogram_density(values: &[f64], bins: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    if values.is_empty() {
        return Err(AuthorshipError::UndefinedStatistic(
            "histogram of an empty sample".to_string(),
        ));
    }
    if bins == 0 {
        return Err(AuthorshipError::InvalidInput(
            "histogram needs at least one bin".to_string(),
        ));
    }

    let (mut lo, mut hi) = min_max(values);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = checked_span(lo, hi)? / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let n = values.len() as f64;
    let densities = counts.iter().map(|&c| c as f64 / (n * width)).collect();
    Ok((edges, densities))
}

fn checked_span(lo: f64, hi: f64) -> Result<f64> {
    let span = hi - lo;
    if !span.is_finite() {
        return Err(AuthorshipError::InvalidInput(format!(
            "value range [{lo}, {hi}] is too wide to bin"
        )));
    }
    Ok(span)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kde_integrates_to_one() {
        let values = [1.0, 2.0, 2.5, 3.0, 7.0];
        let curve = gaussian_kde(&values, KDE_GRID_POINTS).unwrap();
        assert_eq!(curve.len(), KDE_GRID_POINTS);
        let area: f64 = curve
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        // The grid stops 3 bandwidths out, so a little mass is cut off.
        assert!((area - 1.0).abs() < 0.01, "area = {area}");
    }

    #[test]
    fn test_kde_peaks_near_the_data() {
        let curve = gaussian_kde(&[10.0, 10.5, 11.0, 9.5], 101).unwrap();
        let peak = curve
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        assert!((peak.0 - 10.25).abs() < 0.5);
    }

    #[test]
    fn test_kde_degenerate_inputs() {
        assert!(matches!(
            gaussian_kde(&[1.0], 10),
            Err(AuthorshipError::UndefinedStatistic(_))
        ));
        assert!(matches!(
            gaussian_kde(&[2.0, 2.0, 2.0], 10),
            Err(AuthorshipError::UndefinedStatistic(_))
        ));
    }

    #[test]
    fn test_histogram_is_density_normalised() {
        let values: Vec<f64> = (0..100).map(|i| i as f64 / 10.0).collect();
        let (edges, densities) = histogram_density(&values, 30).unwrap();
        assert_eq!(edges.len(), 31);
        assert_eq!(densities.len(), 30);
        let area: f64 = densities
            .iter()
            .zip(edges.windows(2))
            .map(|(d, e)| d * (e[1] - e[0]))
            .sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_max_lands_in_last_bin() {
        let (_, densities) = histogram_density(&[0.0, 1.0, 2.0], 2).unwrap();
        // bins [0,1) and [1,2]; width 1, n 3
        assert!((densities[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((densities[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_range_wider_than_f64_is_rejected() {
        assert!(matches!(
            histogram_density(&[-1e308, 1e308], 30),
            Err(AuthorshipError::InvalidInput(_))
        ));
        assert!(matches!(
            gaussian_kde(&[-1e308, 1e308], KDE_GRID_POINTS),
            Err(AuthorshipError::InvalidInput(_))
        ));
        // Wide but representable ranges still bin every value.
        let (edges, densities) = histogram_density(&[-1e307, 1e307], 2).unwrap();
        assert!(edges.iter().all(|e| e.is_finite()));
        assert!(densities.iter().all(|d| *d > 0.0));
    }

    #[test]
    fn test_histogram_constant_sample() {
        let (edges, densities) = histogram_density(&[4.0, 4.0], 1).unwrap();
        assert_eq!(edges, vec![3.5, 4.5]);
        assert_eq!(densities, vec![1.0]);
    }
}
