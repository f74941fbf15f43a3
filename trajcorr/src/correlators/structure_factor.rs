use std::borrow::Cow;

use log::debug;
use ndarray::Array1;

use super::{CorrelatorBase, ObservableInfo};

use crate::{Error, Origins};
use crate::fourier::{ExpoSphere, KGridOptions, WaveVectors};
use crate::math::parabolic_maximum;
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, AnalysisValue, CorrelationResult};
use crate::trajectory::Trajectory;

/// Key of the position of the main peak in the analysis
pub const PEAK_POSITION: &str = "peak position k_max";
/// Key of the height of the main peak in the analysis
pub const PEAK_HEIGHT: &str = "peak height S(k_max)";

static INFO: ObservableInfo = ObservableInfo {
    name: "sk",
    symbol: "sk",
    short_name: "S(k)",
    long_name: "structure factor",
    phasespace: PhaseSpace::Positions,
    nbodies: 2,
    axes: &["k"],
};

fn serde_default_nk() -> usize { 20 }
fn serde_default_dk() -> f64 { 0.1 }
fn serde_default_kmin() -> f64 { -1.0 }
fn serde_default_kmax() -> f64 { 15.0 }
fn serde_default_ksamples() -> usize { 30 }
fn serde_default_norigins() -> Origins { Origins::All }

/// Parameters for the structure factor
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StructureFactorParameters {
    /// Norms of the wave-vectors. Defaults to `ksamples` values between
    /// `kmin` and `kmax`.
    #[serde(default)]
    pub kgrid: Option<Vec<f64>>,
    /// Maximal number of wave-vectors used for each norm
    #[serde(default = "serde_default_nk")]
    pub nk: usize,
    /// Width of the shells of wave-vectors
    #[serde(default = "serde_default_dk")]
    pub dk: f64,
    /// Smallest norm in the default grid. Non-positive values correspond to
    /// the smallest wave-vector compatible with the cell.
    #[serde(default = "serde_default_kmin")]
    pub kmin: f64,
    /// Largest norm in the default grid
    #[serde(default = "serde_default_kmax")]
    pub kmax: f64,
    /// Number of values in the default grid
    #[serde(default = "serde_default_ksamples")]
    pub ksamples: usize,
    /// Number of frames to average over
    #[serde(default = "serde_default_norigins")]
    pub norigins: Origins,
    /// Remove the center of mass displacement
    #[serde(default)]
    pub fix_cm: bool,
}

impl StructureFactorParameters {
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

/// Static structure factor `S(k) = ⟨ρ₀(k) ρ₁*(k)⟩ / sqrt(N₀ N₁)`.
///
/// Wave-vectors are built from the cell of the first frame. When the cell
/// changes along the trajectory, they are rebuilt for every frame on the
/// same grid of norms. The analysis contains the position and height of the
/// main peak.
#[derive(Debug, Clone)]
pub struct StructureFactor {
    parameters: StructureFactorParameters,
    options: KGridOptions,
    kgrid: Vec<f64>,
    wave_vectors: WaveVectors,
    stride: usize,
}

impl StructureFactor {
    /// Create a new structure factor correlator for `trajectory`
    pub fn new(trajectory: &dyn Trajectory, parameters: StructureFactorParameters) -> Result<StructureFactor, Error> {
        let options = parameters.kgrid_options();
        options.validate()?;

        if trajectory.size() == 0 {
            return Err(Error::Trajectory("the trajectory does not contain any frame".into()));
        }
        let cell = trajectory.read(0)?.cell();
        let kgrid = options.grid(&cell)?;
        let wave_vectors = options.wave_vectors(&cell, &kgrid)?;
        let stride = parameters.norigins.stride(trajectory.size());

        return Ok(StructureFactor { parameters, options, kgrid, wave_vectors, stride });
    }
}

impl CorrelatorBase for StructureFactor {
    fn info(&self) -> &'static ObservableInfo {
        &INFO
    }

    fn parameters(&self) -> String {
        serde_json::to_string(&self.parameters).expect("failed to serialize to JSON")
    }

    fn fix_cm(&self) -> bool {
        self.parameters.fix_cm
    }

    #[time_graph::instrument(name = "StructureFactor::compute")]
    fn compute(&self, _: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error> {
        let static_cell = data.static_cell();
        if !static_cell {
            debug!("the cell changes along the trajectory, wave-vectors will be rebuilt for every frame");
        }

        let mut sums = vec![0.0; self.kgrid.len()];
        let mut counts = vec![0_usize; self.kgrid.len()];
        let mut particles = [0_usize; 2];
        let mut n_frames = 0;

        for frame in (0..data.len()).step_by(self.stride) {
            let wave_vectors = if static_cell {
                Cow::Borrowed(&self.wave_vectors)
            } else {
                Cow::Owned(self.options.wave_vectors(&data.cells()[frame], &self.kgrid)?)
            };

            let k0 = wave_vectors.k0();
            let max_index = wave_vectors.max_index();
            let first = ExpoSphere::new(k0, max_index, &[data.first()[frame].view()]);
            let second = if data.is_shared() {
                None
            } else {
                Some(ExpoSphere::new(k0, max_index, &[data.second()[frame].view()]))
            };

            for shell in wave_vectors.shells() {
                for n in shell.selected() {
                    let rho_0 = first.density(0, n);
                    let rho_1 = second.as_ref().map_or(rho_0, |second| second.density(0, n));
                    sums[shell.grid_index()] += (rho_0 * rho_1.conj()).re;
                    counts[shell.grid_index()] += 1;
                }
            }

            particles[0] += data.first()[frame].nrows();
            particles[1] += data.second()[frame].nrows();
            n_frames += 1;
        }

        let n_average_0 = particles[0] as f64 / n_frames as f64;
        let n_average_1 = particles[1] as f64 / n_frames as f64;
        let normalization = f64::sqrt(n_average_0 * n_average_1);

        let mut kgrid = Vec::new();
        let mut unnormalized = Vec::new();
        for (i, &k) in self.kgrid.iter().enumerate() {
            if counts[i] != 0 {
                kgrid.push(k);
                unnormalized.push(sums[i] / counts[i] as f64);
            }
        }

        let unnormalized = Array1::from(unnormalized);
        let value = &unnormalized / normalization;
        return Ok(CorrelationResult::new_1d(kgrid, value, Some(unnormalized)));
    }

    fn analyze(&self, result: &CorrelationResult) -> Analysis {
        let mut analysis = Analysis::new();
        if let Some(values) = result.as_1d() {
            if let Some((position, height)) = parabolic_maximum(&result.grid[0], &values.to_vec()) {
                analysis.insert(PEAK_POSITION.into(), AnalysisValue::Scalar(position));
                analysis.insert(PEAK_HEIGHT.into(), AnalysisValue::Scalar(height));
            }
        }
        return analysis;
    }
}
