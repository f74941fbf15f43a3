use ndarray::{Array1, ArrayView2};

use super::{CorrelatorBase, ObservableInfo, DIFFUSION_COEFFICIENT};

use crate::{Error, Origins};
use crate::correlation::generalized_correlation;
use crate::grid::GridSpacing;
use crate::math::{crossing_time, linear_fit};
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, AnalysisValue, CorrelationResult};
use crate::time_grid::{DiscreteTimeGrid, TimeTarget};
use crate::trajectory::Trajectory;

/// Key of the diffusive time in the analysis
pub const DIFFUSIVE_TIME: &str = "diffusive time tau_D";

static INFO: ObservableInfo = ObservableInfo {
    name: "msd",
    symbol: "msd",
    short_name: "dr^2(t)",
    long_name: "mean square displacement",
    phasespace: PhaseSpace::UnfoldedPositions,
    nbodies: 1,
    axes: &["t"],
};

fn serde_default_nsamples() -> usize { 30 }
fn serde_default_norigins() -> Origins { Origins::Count(50) }
fn serde_default_spacing() -> GridSpacing { GridSpacing::Linear }
fn serde_default_sigma() -> f64 { 1.0 }

/// Parameters for the mean square displacement
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MeanSquareDisplacementParameters {
    /// Times at which to compute the mean square displacement. Defaults to
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
    /// Particle size, the diffusive time is the time at which the mean
    /// square displacement reaches `sigma^2`
    #[serde(default = "serde_default_sigma")]
    pub sigma: f64,
}

/// Mean square displacement `⟨|r(t) - r(0)|²⟩` of the particles.
///
/// The analysis contains the diffusion coefficient, from a linear fit over
/// the second half of the time grid, and the diffusive time at which
/// particles moved by `sigma` on average.
#[derive(Debug, Clone)]
pub struct MeanSquareDisplacement {
    parameters: MeanSquareDisplacementParameters,
    grid: DiscreteTimeGrid,
    stride: usize,
}

impl MeanSquareDisplacement {
    /// Create a new mean square displacement correlator for `trajectory`
    pub fn new(trajectory: &dyn Trajectory, parameters: MeanSquareDisplacementParameters) -> Result<MeanSquareDisplacement, Error> {
        if !(parameters.sigma > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "sigma must be positive, got {}", parameters.sigma
            )));
        }

        let times = super::time_grid(trajectory, parameters.tgrid.as_deref(), parameters.nsamples, &parameters.spacing, 0.0, parameters.time_target)?;
        let grid = DiscreteTimeGrid::from_trajectory(trajectory, &times, parameters.norigins)?;
        let stride = parameters.norigins.stride(trajectory.size());

        return Ok(MeanSquareDisplacement { parameters, grid, stride });
    }
}

fn mean_square_displacement(later: ArrayView2<'_, f64>, origin: ArrayView2<'_, f64>) -> f64 {
    let displacement = &later - &origin;
    return displacement.mapv(|x| x * x).sum() / later.nrows() as f64;
}

impl CorrelatorBase for MeanSquareDisplacement {
    fn info(&self) -> &'static ObservableInfo {
        &INFO
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    fn fix_cm(&self) -> bool {
        self.parameters.fix_cm
    }

    #[time_graph::instrument(name = "MeanSquareDisplacement::compute")]
    fn compute(&self, trajectory: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error> {
        let series = generalized_correlation(
            &mean_square_displacement,
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
        let Some(msd) = result.as_1d() else {
            return analysis;
        };
        let times = &result.grid[0];
        let msd = msd.to_vec();

        if let Some(&last) = times.last() {
            let start = times.iter().position(|&t| t >= 0.5 * last).unwrap_or(0);
            if let Some((slope, _)) = linear_fit(&times[start..], &msd[start..]) {
                analysis.insert(DIFFUSION_COEFFICIENT.into(), AnalysisValue::Scalar(slope / 6.0));
            }
        }

        let sigma = self.parameters.sigma;
        if let Some(tau) = crossing_time(times, &msd, sigma * sigma) {
            analysis.insert(DIFFUSIVE_TIME.into(), AnalysisValue::Scalar(tau));
        }

        return analysis;
    }
}
