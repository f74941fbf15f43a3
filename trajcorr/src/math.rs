//! Numerical helpers used to analyze correlation functions.

/// Find the first `x` at which `f(x)` crosses `target`, using linear
/// interpolation between the two bracketing points. Returns `None` if `f`
/// never reaches `target`.
pub fn crossing_time(x: &[f64], f: &[f64], target: f64) -> Option<f64> {
    assert_eq!(x.len(), f.len());
    let first = f.first()? - target;
    if first == 0.0 {
        return Some(x[0]);
    }

    for i in 1..f.len() {
        let delta = f[i] - target;
        if delta == 0.0 {
            return Some(x[i]);
        }

        if delta * first < 0.0 {
            let slope = (x[i] - x[i - 1]) / (f[i] - f[i - 1]);
            return Some(x[i - 1] + (target - f[i - 1]) * slope);
        }
    }

    return None;
}

/// Get the time at which `f` decays to `1/e`
pub fn relaxation_time(x: &[f64], f: &[f64]) -> Option<f64> {
    crossing_time(x, f, f64::exp(-1.0))
}

/// Find the position and value of the maximum of `f`, refined by fitting a
/// parabola through the maximum and its two neighbors. Returns `None` when
/// the maximum is on the boundary of the data or the parabola is degenerate.
pub fn parabolic_maximum(x: &[f64], f: &[f64]) -> Option<(f64, f64)> {
    assert_eq!(x.len(), f.len());
    if f.len() < 3 || f.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut i_max = 0;
    for (i, &value) in f.iter().enumerate() {
        if value > f[i_max] {
            i_max = i;
        }
    }

    if i_max == 0 || i_max == f.len() - 1 {
        return None;
    }

    let (x0, x1, x2) = (x[i_max - 1], x[i_max], x[i_max + 1]);
    let (y0, y1, y2) = (f[i_max - 1], f[i_max], f[i_max + 1]);

    let denominator = (x0 - x1) * (x0 - x2) * (x1 - x2);
    if denominator == 0.0 {
        return None;
    }

    let a = (x2 * (y1 - y0) + x1 * (y0 - y2) + x0 * (y2 - y1)) / denominator;
    let b = (x2 * x2 * (y0 - y1) + x1 * x1 * (y2 - y0) + x0 * x0 * (y1 - y2)) / denominator;
    let c = (x1 * x2 * (x1 - x2) * y0 + x2 * x0 * (x2 - x0) * y1 + x0 * x1 * (x0 - x1) * y2) / denominator;

    if a == 0.0 {
        return None;
    }

    let position = -b / (2.0 * a);
    let value = c - b * b / (4.0 * a);
    return Some((position, value));
}

/// Least squares fit of `y = slope * x + intercept`, returning
/// `(slope, intercept)`
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    assert_eq!(x.len(), y.len());
    if x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        covariance += (xi - x_mean) * (yi - y_mean);
        variance += (xi - x_mean) * (xi - x_mean);
    }

    if variance == 0.0 {
        return None;
    }

    let slope = covariance / variance;
    return Some((slope, y_mean - slope * x_mean));
}

/// Integrate `y(x)` with the trapezoidal rule
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len());
    x.windows(2).zip(y.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}
