use ndarray::{Array1, ArrayView2};

use super::{CorrelatorBase, ObservableInfo, DIFFUSION_COEFFICIENT};

use crate::{Error, Origins};
use crate::correlation::generalized_correlation;
use crate::grid::GridSpacing;
use crate::math::trapezoid;
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, AnalysisValue, CorrelationResult};
use crate::time_grid::{DiscreteTimeGrid, TimeTarget};
use crate::trajectory::Trajectory;

static INFO: ObservableInfo = ObservableInfo {
    name: "vacf",
    symbol: "vacf",
    short_name: "Z(t)",
    long_name: "velocity autocorrelation function",
    phasespace: PhaseSpace::Velocities,
    nbodies: 1,
    axes: &["t"],
};

fn serde_default_nsamples() -> usize { 30 }
fn serde_default_norigins() -> Origins { Origins::All }
fn serde_default_spacing() -> GridSpacing { GridSpacing::Linear }

/// Parameters for the velocity autocorrelation function
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VelocityAutocorrelationParameters {
    /// Times at which to compute the correlation. Defaults to `nsamples`
    /// values up to `time_target`.
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
    /// Remove the velocity of the center of mass
    #[serde(default)]
    pub fix_cm: bool,
}

/// Velocity autocorrelation function `⟨v(t)·v(0)⟩`.
///
/// The analysis contains the diffusion coefficient from the Green-Kubo
/// relation, integrating the correlation over the whole time grid.
#[derive(Debug, Clone)]
pub struct VelocityAutocorrelation {
    parameters: VelocityAutocorrelationParameters,
    grid: DiscreteTimeGrid,
    stride: usize,
}

impl VelocityAutocorrelation {
    /// Create a new velocity autocorrelation correlator for `trajectory`
    pub fn new(trajectory: &dyn Trajectory, parameters: VelocityAutocorrelationParameters) -> Result<VelocityAutocorrelation, Error> {
        let times = super::time_grid(trajectory, parameters.tgrid.as_deref(), parameters.nsamples, &parameters.spacing, 0.0, parameters.time_target)?;
        let grid = DiscreteTimeGrid::from_trajectory(trajectory, &times, parameters.norigins)?;
        let stride = parameters.norigins.stride(trajectory.size());

        return Ok(VelocityAutocorrelation { parameters, grid, stride });
    }
}

fn velocity_product(later: ArrayView2<'_, f64>, origin: ArrayView2<'_, f64>) -> f64 {
    (&later * &origin).sum() / later.nrows() as f64
}

impl CorrelatorBase for VelocityAutocorrelation {
    fn info(&self) -> &'static ObservableInfo {
        &INFO
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    fn fix_cm(&self) -> bool {
        self.parameters.fix_cm
    }

    #[time_graph::instrument(name = "VelocityAutocorrelation::compute")]
    fn compute(&self, trajectory: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error> {
        let series = generalized_correlation(
            &velocity_product,
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
            if values.len() > 1 {
                let integral = trapezoid(&result.grid[0], &values.to_vec());
                analysis.insert(DIFFUSION_COEFFICIENT.into(), AnalysisValue::Scalar(integral / 3.0));
            }
        }
        return analysis;
    }
}
