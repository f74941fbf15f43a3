use std::collections::BTreeMap;
use std::ops::Range;

use log::info;
use ndarray::Array2;

use super::{CorrelatorBase, ObservableInfo, RELAXATION_TIMES};
use super::intermediate_scattering::with_time_zero;

use crate::{Error, Origins};
use crate::fourier::{ExpoSphere, KGridOptions, WaveVectors, particle_block_size};
use crate::grid::GridSpacing;
use crate::output::Output;
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, AnalysisValue, CorrelationResult};
use crate::time_grid::{DiscreteTimeGrid, TimeTarget};
use crate::trajectory::Trajectory;

static INFO: ObservableInfo = ObservableInfo {
    name: "fskt",
    symbol: "fskt",
    short_name: "F_s(k,t)",
    long_name: "self intermediate scattering function",
    phasespace: PhaseSpace::UnfoldedPositions,
    nbodies: 1,
    axes: &["k", "t"],
};

/// Implementation used for the inner loops of the calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// Process blocks of particles one after the other
    Serial,
    /// Process blocks of particles in parallel, this requires the `parallel`
    /// feature
    Parallel,
}

fn serde_default_nk() -> usize { 8 }
fn serde_default_dk() -> f64 { 0.1 }
fn serde_default_kmin() -> f64 { 1.0 }
fn serde_default_kmax() -> f64 { 10.0 }
fn serde_default_ksamples() -> usize { 10 }
fn serde_default_tsamples() -> usize { 60 }
fn serde_default_norigins() -> Origins { Origins::All }
fn serde_default_spacing() -> GridSpacing { GridSpacing::Logarithmic }
fn serde_default_lookup_mb() -> f64 { 64.0 }
fn serde_default_kernel() -> Kernel { Kernel::Serial }

/// Parameters for the self intermediate scattering function
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SelfIntermediateScatteringParameters {
    /// Norms of the wave-vectors. Defaults to `ksamples` values between
    /// `kmin` and `kmax`.
    #[serde(default)]
    pub kgrid: Option<Vec<f64>>,
    /// Times at which to compute the correlation. Defaults to 0 followed by
    /// `tsamples` values from one timestep to `time_target`. Time 0 is always
    /// added to the grid, since it is used for normalization.
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
    /// Approximate memory (in megabytes) used to tabulate exponentials
    #[serde(default = "serde_default_lookup_mb")]
    pub lookup_mb: f64,
    /// Implementation of the inner loops
    #[serde(default = "serde_default_kernel")]
    pub kernel: Kernel,
}

impl SelfIntermediateScatteringParameters {
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

/// Sum and number of contributions for each step difference, for each shell
type Accumulator = Vec<BTreeMap<i64, (f64, usize)>>;

/// Self part of the intermediate scattering function
/// `F_s(k, t) = ⟨exp(i k·(r(t₀ + t) - r(t₀)))⟩`, normalized by its value at
/// `t = 0`.
///
/// Exponentials are tabulated for blocks of particles over the whole
/// trajectory, the size of the blocks being controlled by `lookup_mb`. The
/// analysis contains the relaxation time `tau(k)` at which the function
/// decays to `1/e`.
#[derive(Debug, Clone)]
pub struct SelfIntermediateScattering {
    parameters: SelfIntermediateScatteringParameters,
    wave_vectors: WaveVectors,
    grid: DiscreteTimeGrid,
    stride: usize,
}

impl SelfIntermediateScattering {
    /// Create a new self intermediate scattering function correlator for
    /// `trajectory`
    pub fn new(trajectory: &dyn Trajectory, parameters: SelfIntermediateScatteringParameters) -> Result<SelfIntermediateScattering, Error> {
        let options = parameters.kgrid_options();
        options.validate()?;

        if !(parameters.lookup_mb > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "lookup_mb must be positive, got {}", parameters.lookup_mb
            )));
        }

        if parameters.kernel == Kernel::Parallel && !crate::capabilities().parallel {
            return Err(Error::InvalidParameter(
                "the parallel kernel is not available, trajcorr was compiled without the 'parallel' feature".into()
            ));
        }

        let times = super::time_grid(
            trajectory,
            parameters.tgrid.as_deref(),
            parameters.tsamples,
            &parameters.spacing,
            trajectory.timestep(),
            parameters.time_target,
        )?;
        let grid = DiscreteTimeGrid::from_trajectory(trajectory, &with_time_zero(times), parameters.norigins)?;
        let stride = parameters.norigins.stride(trajectory.size());

        let cell = trajectory.read(0)?.cell();
        let kgrid = options.grid(&cell)?;
        let wave_vectors = options.wave_vectors(&cell, &kgrid)?;

        return Ok(SelfIntermediateScattering { parameters, wave_vectors, grid, stride });
    }

    /// Accumulate the contributions of the particles in `particles`
    fn accumulate(&self, steps: &[i64], positions: &[Array2<f64>], particles: Range<usize>) -> Accumulator {
        let expo = ExpoSphere::for_particles(
            self.wave_vectors.k0(),
            self.wave_vectors.max_index(),
            positions,
            particles,
        );
        let n_frames = expo.n_frames();
        let n_particles = expo.n_particles();

        let mut accumulated = vec![BTreeMap::new(); self.wave_vectors.shells().len()];
        for (shell, accumulated) in self.wave_vectors.shells().iter().zip(&mut accumulated) {
            for n in shell.selected() {
                for time_lag in self.grid.lags() {
                    if time_lag.lag >= n_frames {
                        continue;
                    }

                    for origin in (time_lag.offset..n_frames - time_lag.lag).step_by(self.stride) {
                        let later = origin + time_lag.lag;
                        let difference = steps[later] - steps[origin];

                        let mut sum = 0.0;
                        for particle in 0..n_particles {
                            let product = expo.plane_wave(later, particle, n) * expo.plane_wave(origin, particle, n).conj();
                            sum += product.re;
                        }

                        let entry = accumulated.entry(difference).or_insert((0.0, 0));
                        entry.0 += sum;
                        entry.1 += n_particles;
                    }
                }
            }
        }

        return accumulated;
    }

    #[cfg(feature = "parallel")]
    fn accumulate_parallel(&self, steps: &[i64], positions: &[Array2<f64>], blocks: Vec<Range<usize>>) -> Accumulator {
        use rayon::prelude::*;

        let empty = || vec![BTreeMap::new(); self.wave_vectors.shells().len()];
        return blocks.into_par_iter()
            .map(|particles| self.accumulate(steps, positions, particles))
            .reduce(empty, merge);
    }

    #[cfg(not(feature = "parallel"))]
    fn accumulate_parallel(&self, steps: &[i64], positions: &[Array2<f64>], blocks: Vec<Range<usize>>) -> Accumulator {
        // the kernel is checked at construction, but fall back to the serial
        // implementation anyway
        return self.accumulate_serial(steps, positions, blocks);
    }

    fn accumulate_serial(&self, steps: &[i64], positions: &[Array2<f64>], blocks: Vec<Range<usize>>) -> Accumulator {
        let mut accumulated = vec![BTreeMap::new(); self.wave_vectors.shells().len()];
        for particles in blocks {
            accumulated = merge(accumulated, self.accumulate(steps, positions, particles));
        }
        return accumulated;
    }
}

/// Merge the contributions from two accumulators
fn merge(mut first: Accumulator, second: Accumulator) -> Accumulator {
    for (first, second) in first.iter_mut().zip(second) {
        for (difference, (sum, count)) in second {
            let entry = first.entry(difference).or_insert((0.0, 0));
            entry.0 += sum;
            entry.1 += count;
        }
    }
    return first;
}

impl CorrelatorBase for SelfIntermediateScattering {
    fn info(&self) -> &'static ObservableInfo {
        &INFO
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    fn fix_cm(&self) -> bool {
        self.parameters.fix_cm
    }

    #[time_graph::instrument(name = "SelfIntermediateScattering::compute")]
    fn compute(&self, trajectory: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error> {
        let positions = data.first();
        let n_particles = positions.first().map_or(0, |p| p.nrows());

        let block_size = particle_block_size(
            positions.len(),
            n_particles,
            self.wave_vectors.max_index(),
            self.parameters.lookup_mb,
        );
        let blocks = (0..n_particles).step_by(block_size.max(1))
            .map(|start| start..usize::min(start + block_size, n_particles))
            .collect::<Vec<_>>();
        info!("tabulating exponentials for {} blocks of {} particles", blocks.len(), block_size);

        let steps = trajectory.steps();
        let accumulated = match self.parameters.kernel {
            Kernel::Serial => self.accumulate_serial(steps, positions, blocks),
            Kernel::Parallel => self.accumulate_parallel(steps, positions, blocks),
        };

        let differences = accumulated[0].keys().copied().collect::<Vec<_>>();
        let times = differences.iter().map(|&d| d as f64 * trajectory.timestep()).collect::<Vec<_>>();

        let mut value = Array2::zeros((accumulated.len(), differences.len()));
        for (i, accumulated) in accumulated.iter().enumerate() {
            for (j, difference) in differences.iter().enumerate() {
                let (sum, count) = accumulated[difference];
                value[[i, j]] = sum / count as f64;
            }
        }

        for mut row in value.outer_iter_mut() {
            let initial = row[0];
            row.mapv_inplace(|v| v / initial);
        }

        return Ok(CorrelationResult::new_2d(self.wave_vectors.grid(), times, value, None));
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
