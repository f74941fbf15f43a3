//! Generators for the default grids of times and wave-vector norms.

/// A `GridGenerator` produces an ordered sequence of `n` values going from
/// `start` to `stop` (both included).
pub trait GridGenerator {
    /// Generate the grid
    fn generate(&self, start: f64, stop: f64, n: usize) -> Vec<f64>;
}

/// Evenly spaced values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearGrid;

impl GridGenerator for LinearGrid {
    fn generate(&self, start: f64, stop: f64, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let delta = (stop - start) / (n - 1) as f64;
                (0..n).map(|i| start + i as f64 * delta).collect()
            }
        }
    }
}

/// Values evenly spaced on a logarithmic scale. If `start` is not positive,
/// the spacing is logarithmic in `x - start + 1`, so that the grid can start
/// at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogarithmicGrid;

impl GridGenerator for LogarithmicGrid {
    fn generate(&self, start: f64, stop: f64, n: usize) -> Vec<f64> {
        match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let last = (n - 1) as f64;
                if start > 0.0 {
                    let ratio = stop / start;
                    (0..n).map(|i| start * f64::powf(ratio, i as f64 / last)).collect()
                } else {
                    let span = stop - start + 1.0;
                    (0..n).map(|i| start + f64::powf(span, i as f64 / last) - 1.0).collect()
                }
            }
        }
    }
}

/// Spacing of a default grid, as selected in the parameters of a correlator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GridSpacing {
    /// Use a `LinearGrid`
    Linear,
    /// Use a `LogarithmicGrid`
    Logarithmic,
}

impl GridGenerator for GridSpacing {
    fn generate(&self, start: f64, stop: f64, n: usize) -> Vec<f64> {
        match self {
            GridSpacing::Linear => LinearGrid.generate(start, stop, n),
            GridSpacing::Logarithmic => LogarithmicGrid.generate(start, stop, n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear() {
        assert_eq!(LinearGrid.generate(0.0, 1.0, 0), Vec::<f64>::new());
        assert_eq!(LinearGrid.generate(2.0, 1.0, 1), vec![2.0]);
        assert_eq!(LinearGrid.generate(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn logarithmic() {
        let grid = LogarithmicGrid.generate(1.0, 1000.0, 4);
        assert_eq!(grid.len(), 4);
        assert_relative_eq!(grid[0], 1.0);
        assert_relative_eq!(grid[1], 10.0, max_relative = 1e-12);
        assert_relative_eq!(grid[2], 100.0, max_relative = 1e-12);
        assert_relative_eq!(grid[3], 1000.0, max_relative = 1e-12);

        let grid = LogarithmicGrid.generate(0.0, 99.0, 3);
        assert_relative_eq!(grid[0], 0.0);
        assert_relative_eq!(grid[1], 9.0, max_relative = 1e-12);
        assert_relative_eq!(grid[2], 99.0, max_relative = 1e-12);
    }

    #[test]
    fn spacing() {
        let spacing: GridSpacing = serde_json::from_str("\"logarithmic\"").unwrap();
        assert_eq!(spacing, GridSpacing::Logarithmic);
        assert_eq!(
            GridSpacing::Linear.generate(0.0, 2.0, 3),
            LinearGrid.generate(0.0, 2.0, 3)
        );
    }
}
