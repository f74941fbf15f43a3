//! Generic accumulation of time correlation functions over a trajectory.
use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::time_grid::DiscreteTimeGrid;

/// A `PairwiseObservable` computes a scalar from the data of a frame at a
/// later time and the data of a frame at a time origin.
///
/// The data of a frame is an array with one row per particle and one column
/// per dimension. When both arguments come from the same frame, they point to
/// the same memory (see [`same_frame`]).
pub trait PairwiseObservable: Sync {
    /// Evaluate the observable for a pair of frames
    fn evaluate(&self, later: ArrayView2<'_, f64>, origin: ArrayView2<'_, f64>) -> f64;
}

impl<F> PairwiseObservable for F where F: Fn(ArrayView2<'_, f64>, ArrayView2<'_, f64>) -> f64 + Sync {
    fn evaluate(&self, later: ArrayView2<'_, f64>, origin: ArrayView2<'_, f64>) -> f64 {
        self(later, origin)
    }
}

/// Check if two views refer to the data of the very same frame. This is the
/// case at lag 0, where some observables are defined to be exactly zero.
pub fn same_frame(a: ArrayView2<'_, f64>, b: ArrayView2<'_, f64>) -> bool {
    a.as_ptr() == b.as_ptr() && a.shape() == b.shape()
}

/// Averages of an observable as a function of the step difference between
/// two frames
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Step differences, sorted in increasing order
    pub steps: Vec<i64>,
    /// Average of the observable for each step difference
    pub values: Vec<f64>,
    /// Number of pairs of frames contributing to each average
    pub counts: Vec<usize>,
}

impl TimeSeries {
    /// Get the physical times corresponding to the step differences
    pub fn times(&self, timestep: f64) -> Vec<f64> {
        self.steps.iter().map(|&step| step as f64 * timestep).collect()
    }
}

/// Accumulate `observable` over all the pairs of frames defined by `grid`,
/// taking one time origin every `stride` frames.
///
/// For each lag `(offset, lag)` in the grid, the origins are
/// `offset, offset + stride, ...` while `origin + lag` stays in the
/// trajectory. Contributions are grouped by the actual step difference
/// between the two frames, so that irregular trajectories average together
/// only pairs separated by the same time. Lags without any origin do not
/// appear in the output.
#[time_graph::instrument(name = "generalized_correlation")]
pub fn generalized_correlation(
    observable: &dyn PairwiseObservable,
    grid: &DiscreteTimeGrid,
    stride: usize,
    steps: &[i64],
    data: &[Array2<f64>],
) -> TimeSeries {
    assert_eq!(steps.len(), data.len(), "there must be one step per frame");
    let stride = stride.max(1);

    let mut accumulated = BTreeMap::<i64, (f64, usize)>::new();
    for time_lag in grid.lags() {
        if time_lag.lag >= data.len() {
            continue;
        }

        for origin in (time_lag.offset..data.len() - time_lag.lag).step_by(stride) {
            let later = origin + time_lag.lag;
            let difference = steps[later] - steps[origin];
            let value = observable.evaluate(data[later].view(), data[origin].view());

            let entry = accumulated.entry(difference).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let mut series = TimeSeries {
        steps: Vec::with_capacity(accumulated.len()),
        values: Vec::with_capacity(accumulated.len()),
        counts: Vec::with_capacity(accumulated.len()),
    };

    for (difference, (sum, count)) in accumulated {
        series.steps.push(difference);
        series.values.push(sum / count as f64);
        series.counts.push(count);
    }

    return series;
}
