use std::collections::BTreeMap;

use log::{info, warn};
use ndarray::Array2;
use num_complex::Complex64;

use super::{CorrelatorBase, ObservableInfo, RELAXATION_TIMES};

use crate::{Error, Origins};
use crate::fourier::{ExpoSphere, KGridOptions, WaveVectors};
use crate::grid::GridSpacing;
use crate::output::Output;
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, AnalysisValue, CorrelationResult};
use crate::time_grid::{DiscreteTimeGrid, TimeTarget};
use crate::trajectory::Trajectory;

static INFO: ObservableInfo = ObservableInfo {
    name: "fkt",
    symbol: "fkt",
    short_name: "F(k,t)",
    long_name: "intermediate scattering function",
    phasespace: PhaseSpace::Positions,
    nbodies: 2,
    axes: &["k", "t"],
};

fn serde_default_nk() -> usize { 100 }
fn serde_default_dk() -> f64 { 0.1 }
fn serde_default_kmin() -> f64 { 1.0 }
fn serde_default_kmax() -> f64 { 10.0 }
fn serde_default_ksamples() -> usize { 10 }
fn serde_default_tsamples() -> usize { 60 }
fn serde_default_norigins() -> Origins { Origins::All }
fn serde_default_spacing() -> GridSpacing { GridSpacing::Logarithmic }

/// Parameters for the intermediate scattering function
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct IntermediateScatteringParameters {
    /// Norms of the wave-vectors. Defaults to `ksamples` values between
    /// `kmin` and `kmax`.
    #[serde(default)]
    pub kgrid: Option<Vec<f64>>,
    /// Times at which to compute the correlation. Defaults to `tsamples`
    /// values up to `time_target`. Time 0 is always added
    /// to the grid, since it is used for normalization.
    #[serde(default)]
    pub tgrid: Option<Vec<f64>>,
    /// Maximal number of wave-vectors used for each norm
    #[serde(default = "serde_default_nk")]
    pub nk: usize,
    /// Width of the shells of wave-vectors
    #[serde(default = "serde_default_dk")]
    pub dk: f64,
    /// Smallest norm in the default grid
    #[serde(default = "serde_default_kmin")]
    pub kmin: f64,
    /// Largest norm in the default grid
    #[serde(default = "serde_default_kmax")]
    pub kmax: f64,
    /// Number of values in the default grid of norms
    #[serde(default = "serde_default_ksamples")]
    pub ksamples: usize,
    /// Number of values in the default time grid
    #[serde(default = "serde_default_tsamples")]
    pub tsamples: usize,
    /// Spacing of the default time grid
    #[serde(default = "serde_default_spacing")]
    pub spacing: GridSpacing,
    /// Largest time of the default time grid
    #[serde(default)]
    pub time_target: TimeTarget,
    /// Number of time origins to average over
    #[serde(default = "serde_default_norigins")]
    pub norigins: Origins,
    /// Remove the center of mass displacement
    #[serde(default)]
    pub fix_cm: bool,
}

impl IntermediateScatteringParameters {
    fn kgrid_options(&self) -> KGridOptions {
        KGridOptions {
            kgrid: self.kgrid.clone(),
            kmin: self.kmin,
            kmax: self.kmax,
            ksamples: self.ksamples,
            dk: self.dk,
            nk: self.nk,
        }
    }
}

/// Make sure a time grid for a function normalized at `t = 0` starts at 0
pub(super) fn with_time_zero(mut times: Vec<f64>) -> Vec<f64> {
    if times.first() != Some(&0.0) {
        times.insert(0, 0.0);
    }
    return times;
}

/// Coherent intermediate scattering function
/// `F(k, t) = ⟨ρ₀(k, t₀ + t) ρ₁*(k, t₀)⟩`, normalized by its value at
/// `t = 0`.
///
/// Wave-vectors are built from the cell of the first frame. The analysis
/// contains the relaxation time `tau(k)` at which the function decays to
/// `1/e`.
///
/// When using two different filters, the correlation between two different
/// sets of particles is also normalized by its value at `t = 0`, which can be
/// small or negative. The absolute magnitude of such cross correlations
/// should be validated independently.
#[derive(Debug, Clone)]
pub struct IntermediateScattering {
    parameters: IntermediateScatteringParameters,
    wave_vectors: WaveVectors,
    grid: DiscreteTimeGrid,
    stride: usize,
}

impl IntermediateScattering {
    /// Create a new intermediate scattering function correlator for
    /// `trajectory`
    pub fn new(trajectory: &dyn Trajectory, parameters: IntermediateScatteringParameters) -> Result<IntermediateScattering, Error> {
        let options = parameters.kgrid_options();
        options.validate()?;

        let times = super::time_grid(trajectory, parameters.tgrid.as_deref(), parameters.tsamples, &parameters.spacing, 0.0, parameters.time_target)?;
        let grid = DiscreteTimeGrid::from_trajectory(trajectory, &with_time_zero(times), parameters.norigins)?;
        let stride = parameters.norigins.stride(trajectory.size());

        let cell = trajectory.read(0)?.cell();
        let kgrid = options.grid(&cell)?;
        let wave_vectors = options.wave_vectors(&cell, &kgrid)?;

        return Ok(IntermediateScattering { parameters, wave_vectors, grid, stride });
    }

    /// Compute the density `ρ(k)` of each frame in `stream`, for all selected
    /// wave-vectors
    fn densities(&self, stream: &[Array2<f64>]) -> Vec<Vec<Complex64>> {
        let k0 = self.wave_vectors.k0();
        let max_index = self.wave_vectors.max_index();

        let mut densities = Vec::with_capacity(stream.len());
        for positions in stream {
            let expo = ExpoSphere::new(k0, max_index, &[positions.view()]);
            let frame = self.wave_vectors.shells().iter()
                .flat_map(|shell| shell.selected())
                .map(|n| expo.density(0, n))
                .collect();
            densities.push(frame);
        }
        return densities;
    }
}

impl CorrelatorBase for IntermediateScattering {
    fn info(&self) -> &'static ObservableInfo {
        &INFO
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    fn fix_cm(&self) -> bool {
        self.parameters.fix_cm
    }

    #[time_graph::instrument(name = "IntermediateScattering::compute")]
    fn compute(&self, trajectory: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error> {
        if !data.static_cell() {
            warn!("the cell changes along the trajectory, wave-vectors from the first frame will be used");
        }

        if !data.is_shared() {
            warn!("the normalization of cross correlations in F(k,t) is only checked for self correlations");
        }

        let rho_0 = self.densities(data.first());
        let rho_1 = if data.is_shared() {
            None
        } else {
            Some(self.densities(data.second()))
        };
        let rho_1 = rho_1.as_ref().unwrap_or(&rho_0);
        info!("tabulated densities for {} frames", rho_0.len());

        let steps = trajectory.steps();
        let n_frames = rho_0.len();
        let shells = self.wave_vectors.shells();

        let mut accumulated = vec![BTreeMap::<i64, (f64, usize)>::new(); shells.len()];
        let mut start = 0;
        for (shell, accumulated) in shells.iter().zip(&mut accumulated) {
            let n_selected = shell.selection().len();
            for index in start..start + n_selected {
                for time_lag in self.grid.lags() {
                    if time_lag.lag >= n_frames {
                        continue;
                    }

                    for origin in (time_lag.offset..n_frames - time_lag.lag).step_by(self.stride) {
                        let later = origin + time_lag.lag;
                        let difference = steps[later] - steps[origin];
                        let value = (rho_0[later][index] * rho_1[origin][index].conj()).re;

                        let entry = accumulated.entry(difference).or_insert((0.0, 0));
                        entry.0 += value;
                        entry.1 += 1;
                    }
                }
            }
            start += n_selected;
        }

        let differences = accumulated[0].keys().copied().collect::<Vec<_>>();
        let times = differences.iter().map(|&d| d as f64 * trajectory.timestep()).collect::<Vec<_>>();

        let mut unnormalized = Array2::zeros((shells.len(), differences.len()));
        for (i, accumulated) in accumulated.iter().enumerate() {
            for (j, difference) in differences.iter().enumerate() {
                let (sum, count) = accumulated[difference];
                unnormalized[[i, j]] = sum / count as f64;
            }
        }

        let kgrid = self.wave_vectors.grid();
        let mut value = unnormalized.clone();
        for (&k, mut row) in kgrid.iter().zip(value.outer_iter_mut()) {
            let initial = row[0];
            if initial == 0.0 || !initial.is_finite() {
                warn!("F(k,t) at t = 0 is {} for k = {}, this row will not be normalized", initial, k);
                continue;
            }
            row.mapv_inplace(|v| v / initial);
        }

        return Ok(CorrelationResult::new_2d(kgrid, times, value, Some(unnormalized)));
    }

    fn analyze(&self, result: &CorrelationResult) -> Analysis {
        let mut analysis = Analysis::new();
        analysis.insert(RELAXATION_TIMES.into(), AnalysisValue::ByWaveVector(super::relaxation_times(result)));
        return analysis;
    }

    fn write_extra(&self, output: &mut dyn Output, tag: Option<&str>, analysis: &Analysis) -> Result<(), Error> {
        super::write_tau(&INFO, output, tag, analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::{Correlator, Filter};
    use crate::output::MemoryOutput;
    use crate::trajectory::{Frame, SimpleTrajectory, UnitCell};
    use crate::trajectory::test_utils::test_trajectory;

    #[test]
    fn single_particle() {
        let trajectory = test_trajectory("single");
        let mut fkt = Correlator::new(&trajectory, "fkt", r#"{"tgrid": [1.0, 4.0]}"#).unwrap();
        fkt.compute().unwrap();

        let result = fkt.result().unwrap();
        // time 0 was added to the grid
        assert_eq!(result.grid[1], [0.0, 1.0, 4.0]);
        let values = result.as_2d().unwrap();
        for &value in values.column(0) {
            assert_eq!(value, 1.0);
        }
        for &value in values {
            assert_relative_eq!(value, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn relaxation_times() {
        let trajectory = test_trajectory("ballistic");
        let mut fkt = Correlator::new(&trajectory, "fkt", r#"{"kgrid": [3.0, 6.0], "nk": 10}"#).unwrap();
        fkt.set_tag("all");

        let mut output = MemoryOutput::new();
        fkt.run(&mut output).unwrap();

        let taus = fkt.analysis()[RELAXATION_TIMES].as_by_wave_vector().unwrap();
        assert_eq!(taus.len(), fkt.result().unwrap().grid[0].len());

        let table = output.get("fkt.all.tau").unwrap();
        assert!(table.starts_with("# title: relaxation times tau(k) as a function of k\n"));
        assert_eq!(table.lines().count(), 3 + taus.len());
        assert!(output.get("fkt.all").is_some());
    }

    #[test]
    fn distinct_species() {
        let trajectory = test_trajectory("ballistic");
        let mut fkt = Correlator::new(&trajectory, "fkt", r#"{"kgrid": [3.0], "tgrid": [0.0, 0.5]}"#).unwrap();
        fkt.add_filter(Filter::species(1)).unwrap();
        fkt.add_filter(Filter::species(2)).unwrap();
        fkt.compute().unwrap();

        let result = fkt.result().unwrap();
        let unnormalized = result.unnormalized.as_ref().unwrap();
        assert_eq!(unnormalized.shape(), [1, 2]);
        assert_eq!(result.value[[0, 0]], 1.0);
    }

    #[test]
    fn vanishing_cross_correlation() {
        // the shell at 2π/4 only contains (±1, 0, 0) and (0, ±1, 0), and half
        // of these see the two particles in phase while the other half see
        // them in opposition, giving F(k, 0) = 0
        let mut trajectory = SimpleTrajectory::new(1.0).unwrap();
        for step in 0..3 {
            let mut frame = Frame::new(UnitCell::orthorhombic(4.0, 4.0, 6.0));
            frame.add_particle(1, [0.0, 0.0, 0.0]);
            frame.add_particle(2, [2.0, 0.0, 0.0]);
            trajectory.add_frame(step, frame).unwrap();
        }

        let mut fkt = Correlator::new(&trajectory, "fkt", r#"{"kgrid": [1.5707963], "tgrid": [0.0, 1.0]}"#).unwrap();
        fkt.add_filter(Filter::species(1)).unwrap();
        fkt.add_filter(Filter::species(2)).unwrap();
        fkt.compute().unwrap();

        let result = fkt.result().unwrap();
        assert_eq!(result.value.shape(), [1, 2]);
        for &value in &result.value {
            assert!(value.is_finite());
            assert_eq!(value, 0.0);
        }
    }

    #[test]
    fn time_zero() {
        assert_eq!(with_time_zero(vec![1.0, 2.0]), [0.0, 1.0, 2.0]);
        assert_eq!(with_time_zero(vec![0.0, 2.0]), [0.0, 2.0]);
        assert_eq!(with_time_zero(vec![]), [0.0]);
    }
}
