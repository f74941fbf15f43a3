use indexmap::IndexMap;
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Ix1, Ix2};

/// Values of a correlation function on its grid.
///
/// Time correlations have a single axis (time), correlations in Fourier
/// space have either one axis (wave-vector norm) or two axes (wave-vector
/// norm, then time).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CorrelationResult {
    /// Values of the grid along each axis
    pub grid: Vec<Vec<f64>>,
    /// Values of the correlation function, with one dimension per axis of
    /// the grid
    pub value: ArrayD<f64>,
    /// Values before normalization, for observables that normalize their
    /// output
    pub unnormalized: Option<ArrayD<f64>>,
}

impl CorrelationResult {
    /// Create a result with a single axis
    pub fn new_1d(grid: Vec<f64>, value: Array1<f64>, unnormalized: Option<Array1<f64>>) -> CorrelationResult {
        assert_eq!(grid.len(), value.len());
        CorrelationResult {
            grid: vec![grid],
            value: value.into_dyn(),
            unnormalized: unnormalized.map(|v| v.into_dyn()),
        }
    }

    /// Create a result with two axes
    pub fn new_2d(first: Vec<f64>, second: Vec<f64>, value: Array2<f64>, unnormalized: Option<Array2<f64>>) -> CorrelationResult {
        assert_eq!(value.shape(), [first.len(), second.len()]);
        CorrelationResult {
            grid: vec![first, second],
            value: value.into_dyn(),
            unnormalized: unnormalized.map(|v| v.into_dyn()),
        }
    }

    /// Create an empty result with the given number of axes
    pub fn empty(n_axes: usize) -> CorrelationResult {
        CorrelationResult {
            grid: vec![Vec::new(); n_axes],
            value: ArrayD::zeros(vec![0; n_axes]),
            unnormalized: None,
        }
    }

    /// Does this result contain any value?
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get the values of a result with a single axis
    pub fn as_1d(&self) -> Option<ArrayView1<'_, f64>> {
        self.value.view().into_dimensionality::<Ix1>().ok()
    }

    /// Get the values of a result with two axes
    pub fn as_2d(&self) -> Option<ArrayView2<'_, f64>> {
        self.value.view().into_dimensionality::<Ix2>().ok()
    }
}

/// A single quantity extracted from a correlation function
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum AnalysisValue {
    /// A single number
    Scalar(f64),
    /// One value per wave-vector norm, `None` when the value is undefined
    ByWaveVector(Vec<(f64, Option<f64>)>),
}

impl AnalysisValue {
    /// Get the value as a single number, if it is one
    pub fn as_scalar(&self) -> Option<f64> {
        match *self {
            AnalysisValue::Scalar(value) => Some(value),
            AnalysisValue::ByWaveVector(_) => None,
        }
    }

    /// Get the values for each wave-vector norm, if this is what this value
    /// contains
    pub fn as_by_wave_vector(&self) -> Option<&[(f64, Option<f64>)]> {
        match self {
            AnalysisValue::Scalar(_) => None,
            AnalysisValue::ByWaveVector(values) => Some(values),
        }
    }
}

/// Named results of the analysis of a correlation function, in insertion
/// order
pub type Analysis = IndexMap<String, AnalysisValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn dimensions() {
        let result = CorrelationResult::new_1d(vec![0.0, 1.0], array![1.0, 0.5], None);
        assert!(!result.is_empty());
        assert_eq!(result.as_1d().unwrap(), array![1.0, 0.5]);
        assert!(result.as_2d().is_none());

        let result = CorrelationResult::new_2d(vec![1.0], vec![0.0, 1.0], array![[1.0, 0.5]], Some(array![[4.0, 2.0]]));
        assert_eq!(result.as_2d().unwrap(), array![[1.0, 0.5]]);
        assert_eq!(result.unnormalized.unwrap().shape(), [1, 2]);

        let result = CorrelationResult::empty(2);
        assert!(result.is_empty());
        assert_eq!(result.grid.len(), 2);
        assert_eq!(result.as_2d().unwrap(), Array2::<f64>::zeros((0, 0)));
    }

    #[test]
    fn serialization() {
        let result = CorrelationResult::new_1d(vec![0.0], array![1.0], None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["grid"], serde_json::json!([[0.0]]));
        assert!(json["unnormalized"].is_null());

        let value = AnalysisValue::ByWaveVector(vec![(1.0, Some(2.0)), (2.0, None)]);
        assert_eq!(serde_json::to_value(&value).unwrap(), serde_json::json!([[1.0, 2.0], [2.0, null]]));
        assert_eq!(value.as_scalar(), None);
        assert_eq!(AnalysisValue::Scalar(3.0).as_scalar(), Some(3.0));
    }
}
