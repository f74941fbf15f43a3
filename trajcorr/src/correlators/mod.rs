use crate::Error;
use crate::output::Output;
use crate::phasespace::{PhaseSpace, PhaseSpaceData};
use crate::result::{Analysis, CorrelationResult};
use crate::time_grid::TimeTarget;
use crate::trajectory::Trajectory;

/// Static description of an observable
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableInfo {
    /// Name used to create the corresponding correlator
    pub name: &'static str,
    /// Symbol of the observable, also used to name output tables
    pub symbol: &'static str,
    /// Short name of the observable
    pub short_name: &'static str,
    /// Long, human readable name of the observable
    pub long_name: &'static str,
    /// Which per-particle property is correlated
    pub phasespace: PhaseSpace,
    /// Number of data streams used by this observable: 1 for self
    /// correlations, 2 for correlations between particles
    pub nbodies: usize,
    /// Names of the axes of the grid
    pub axes: &'static [&'static str],
}

/// The `CorrelatorBase` trait is the interface between the `Correlator` and
/// the implementation of each observable.
///
/// All parameters are resolved when creating the implementation, which then
/// only gets the phase space data read from the trajectory to compute the
/// correlation function.
pub trait CorrelatorBase: Send + Sync {
    /// Get the static description of this observable
    fn info(&self) -> &'static ObservableInfo;

    /// Get the parameters used to create this correlator as a JSON string
    fn parameters(&self) -> String;

    /// Should the center of mass motion be removed from the data?
    fn fix_cm(&self) -> bool {
        false
    }

    /// Compute the correlation function from the `data` extracted from
    /// `trajectory`
    fn compute(&self, trajectory: &dyn Trajectory, data: &PhaseSpaceData) -> Result<CorrelationResult, Error>;

    /// Extract physical quantities from a computed correlation function.
    /// Quantities that can not be computed are not included.
    fn analyze(&self, result: &CorrelationResult) -> Analysis;

    /// Write additional tables besides the main correlation function
    fn write_extra(&self, output: &mut dyn Output, tag: Option<&str>, analysis: &Analysis) -> Result<(), Error> {
        let _ = (output, tag, analysis);
        return Ok(());
    }
}

mod mean_square_displacement;
pub use self::mean_square_displacement::{MeanSquareDisplacement, MeanSquareDisplacementParameters, DIFFUSIVE_TIME};

mod non_gaussian;
pub use self::non_gaussian::{NonGaussianParameter, NonGaussianParameterParameters, T_STAR, A2_STAR};

mod velocity_autocorrelation;
pub use self::velocity_autocorrelation::{VelocityAutocorrelation, VelocityAutocorrelationParameters};

mod structure_factor;
pub use self::structure_factor::{StructureFactor, StructureFactorParameters, PEAK_POSITION, PEAK_HEIGHT};

mod intermediate_scattering;
pub use self::intermediate_scattering::{IntermediateScattering, IntermediateScatteringParameters};

mod self_intermediate_scattering;
pub use self::self_intermediate_scattering::{SelfIntermediateScattering, SelfIntermediateScatteringParameters, Kernel};

/// Resolve the time grid of a correlator: either the explicit `tgrid`, or
/// `nsamples` values from `start` up to the time given by `target`.
fn time_grid(
    trajectory: &dyn Trajectory,
    tgrid: Option<&[f64]>,
    nsamples: usize,
    generator: &dyn crate::grid::GridGenerator,
    start: f64,
    target: TimeTarget,
) -> Result<Vec<f64>, Error> {
    if let Some(tgrid) = tgrid {
        return Ok(tgrid.to_vec());
    }

    if nsamples == 0 {
        return Err(Error::InvalidParameter("the number of time samples must be at least 1".into()));
    }

    let stop = f64::max(start, target.resolve(trajectory)?);
    return Ok(generator.generate(start, stop, nsamples));
}

/// Get the relaxation times (decay to 1/e) at each wave-vector of a result
/// with (k, t) axes
fn relaxation_times(result: &CorrelationResult) -> Vec<(f64, Option<f64>)> {
    let mut taus = Vec::new();
    if let Some(value) = result.as_2d() {
        for (&k, row) in result.grid[0].iter().zip(value.outer_iter()) {
            let row = row.to_vec();
            taus.push((k, crate::math::relaxation_time(&result.grid[1], &row)));
        }
    }
    return taus;
}

/// Write the relaxation times of an intermediate scattering function to the
/// `<symbol>[.<tag>].tau` table
fn write_tau(info: &ObservableInfo, output: &mut dyn Output, tag: Option<&str>, analysis: &Analysis) -> Result<(), Error> {
    if let Some(taus) = analysis.get(RELAXATION_TIMES).and_then(|value| value.as_by_wave_vector()) {
        let name = crate::output::table_name(info.symbol, tag, Some("tau"));
        let mut writer = output.open(&name)?;
        crate::output::write_relaxation_times(&mut *writer, taus)?;
    }
    return Ok(());
}

/// Key of the diffusion coefficient in the analysis of the mean square
/// displacement and the velocity autocorrelation
pub const DIFFUSION_COEFFICIENT: &str = "diffusion coefficient D";

/// Key of the relaxation times in the analysis of intermediate scattering
/// functions
pub const RELAXATION_TIMES: &str = "relaxation times tau";
