use ndarray::{Array1, ArrayView2};

use super::{CorrelatorBase, ObservableInfo};

use crate::{Error, Origins};
use crate::correlation::{generalized_correlation, same_frame};
use crate::grid::GridSpacing;
use crate::math::parabolic_maximum;
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, AnalysisValue, CorrelationResult};
use crate::time_grid::{DiscreteTimeGrid, TimeTarget};
use crate::trajectory::Trajectory;

/// Key of the time of the maximum in the analysis
pub const T_STAR: &str = "t_star";
/// Key of the value at the maximum in the analysis
pub const A2_STAR: &str = "a2_star";

static INFO: ObservableInfo = ObservableInfo {
    name: "alpha2",
    symbol: "alpha_2(t)",
    short_name: "alpha2",
    long_name: "non-Gaussian parameter",
    phasespace: PhaseSpace::UnfoldedPositions,
    nbodies: 1,
    axes: &["t"],
};

fn serde_default_nsamples() -> usize { 30 }
fn serde_default_norigins() -> Origins { Origins::Count(50) }
fn serde_default_spacing() -> GridSpacing { GridSpacing::Linear }

/// Parameters for the non-Gaussian parameter
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NonGaussianParameterParameters {
    /// Times at which to compute the non-Gaussian parameter. Defaults to
    /// `nsamples` values up to `time_target`.
    #[serde(default)]
    pub tgrid: Option<Vec<f64>>,
    /// Number of samples in the default time grid
    #[serde(default = "serde_default_nsamples")]
    pub nsamples: usize,
    /// Spacing of the default time grid
    #[serde(default = "serde_default_spacing")]
    pub spacing: GridSpacing,
    /// Largest time of the default time grid
    #[serde(default)]
    pub time_target: TimeTarget,
    /// Number of time origins to average over
    #[serde(default = "serde_default_norigins")]
    pub norigins: Origins,
    /// Remove the motion of the center of mass
    #[serde(default)]
    pub fix_cm: bool,
}

/// Non-Gaussian parameter `α2(t) = 3⟨Δr⁴⟩ / (5⟨Δr²⟩²) - 1`, which vanishes
/// for Gaussian distributions of the displacements.
///
/// The analysis contains the time `t_star` and height `a2_star` of the
/// maximum.
#[derive(Debug, Clone)]
pub struct NonGaussianParameter {
    parameters: NonGaussianParameterParameters,
    grid: DiscreteTimeGrid,
    stride: usize,
}

impl NonGaussianParameter {
    /// Create a new non-Gaussian parameter correlator for `trajectory`
    pub fn new(trajectory: &dyn Trajectory, parameters: NonGaussianParameterParameters) -> Result<NonGaussianParameter, Error> {
        let times = super::time_grid(trajectory, parameters.tgrid.as_deref(), parameters.nsamples, &parameters.spacing, 0.0, parameters.time_target)?;
        let grid = DiscreteTimeGrid::from_trajectory(trajectory, &times, parameters.norigins)?;
        let stride = parameters.norigins.stride(trajectory.size());

        return Ok(NonGaussianParameter { parameters, grid, stride });
    }
}

fn non_gaussian(later: ArrayView2<'_, f64>, origin: ArrayView2<'_, f64>) -> f64 {
    if same_frame(later, origin) {
        return 0.0;
    }

    let mut dr2 = 0.0;
    let mut dr4 = 0.0;
    for (x, y) in later.outer_iter().zip(origin.outer_iter()) {
        let squared = (0..3).map(|d| (x[d] - y[d]) * (x[d] - y[d])).sum::<f64>();
        dr2 += squared;
        dr4 += squared * squared;
    }

    let n = later.nrows() as f64;
    let dr2 = dr2 / n;
    let dr4 = dr4 / n;
    if dr2 == 0.0 {
        return 0.0;
    }

    return 3.0 * dr4 / (5.0 * dr2 * dr2) - 1.0;
}

impl CorrelatorBase for NonGaussianParameter {
    fn info(&self) -> &'static ObservableInfo {
        &INFO
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    fn fix_cm(&self) -> bool {
        self.parameters.fix_cm
    }

    #[time_graph::instrument(name = "NonGaussianParameter::compute")]
    fn compute(&self, trajectory: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error> {
        let series = generalized_correlation(
            &non_gaussian,
            &self.grid,
            self.stride,
            trajectory.steps(),
            data.first(),
        );

        return Ok(CorrelationResult::new_1d(
            series.times(trajectory.timestep()),
            Array1::from(series.values),
            None,
        ));
    }

    fn analyze(&self, result: &CorrelationResult) -> Analysis {
        let mut analysis = Analysis::new();
        if let Some(values) = result.as_1d() {
            if let Some((t_star, a2_star)) = parabolic_maximum(&result.grid[0], &values.to_vec()) {
                analysis.insert(T_STAR.into(), AnalysisValue::Scalar(t_star));
                analysis.insert(A2_STAR.into(), AnalysisValue::Scalar(a2_star));
            }
        }
        return analysis;
    }
}
