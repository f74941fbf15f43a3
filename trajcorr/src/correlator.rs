use std::collections::BTreeMap;

use log::warn;
use once_cell::sync::Lazy;

use crate::{Error, Filter};
use crate::correlators::{CorrelatorBase, ObservableInfo};
use crate::correlators::{MeanSquareDisplacement, MeanSquareDisplacementParameters};
use crate::correlators::{NonGaussianParameter, NonGaussianParameterParameters};
use crate::correlators::{VelocityAutocorrelation, VelocityAutocorrelationParameters};
use crate::correlators::{StructureFactor, StructureFactorParameters};
use crate::correlators::{IntermediateScattering, IntermediateScatteringParameters};
use crate::correlators::{SelfIntermediateScattering, SelfIntermediateScatteringParameters};
use crate::output::{Output, table_name, write_correlation};
use crate::phasespace::read_phase_space;
use crate::result::{Analysis, CorrelationResult};
use crate::trajectory::Trajectory;

/// Lifecycle of a `Correlator`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatorState {
    /// The correlator was created, but nothing was computed yet
    Constructed,
    /// The correlation function was computed
    Computed,
    /// Physical quantities were extracted from the correlation function
    Analyzed,
    /// The results were written to an output
    Written,
}

/// A `Correlator` computes a single correlation function over a trajectory,
/// possibly restricted to a subset of the particles with `Filter`.
///
/// Correlators are created by name, with parameters given as JSON:
///
/// ```
/// # use trajcorr::{Correlator, Filter, SimpleTrajectory, Frame, UnitCell};
/// let mut trajectory = SimpleTrajectory::new(1.0).unwrap();
/// for step in 0..10 {
///     let mut frame = Frame::new(UnitCell::cubic(5.0));
///     frame.add_particle(1, [0.1 * step as f64, 0.0, 0.0]);
///     trajectory.add_frame(step, frame).unwrap();
/// }
///
/// let mut msd = Correlator::new(&trajectory, "msd", r#"{"tgrid": [0.0, 1.0, 2.0]}"#).unwrap();
/// msd.add_filter(Filter::species(1)).unwrap();
/// msd.compute().unwrap();
///
/// let result = msd.result().unwrap();
/// assert_eq!(result.grid[0], [0.0, 1.0, 2.0]);
/// ```
pub struct Correlator<'a> {
    trajectory: &'a dyn Trajectory,
    implementation: Box<dyn CorrelatorBase>,
    filters: Vec<Filter>,
    tag: Option<String>,
    state: CorrelatorState,
    result: Option<CorrelationResult>,
    analysis: Analysis,
}

impl<'a> std::fmt::Debug for Correlator<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("name", &self.name())
            .field("parameters", &self.parameters())
            .field("filters", &self.filters)
            .field("tag", &self.tag)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a> Correlator<'a> {
    /// Create a new correlator with the given `name` and `parameters` for
    /// `trajectory`.
    ///
    /// The `parameters` should be formatted as JSON, and are resolved
    /// against the trajectory (time grid, wave-vectors, ...) immediately.
    ///
    /// # Errors
    ///
    /// This function returns an error if there is no registered correlator
    /// with the given `name`, or if the parameters are invalid for this
    /// correlator and trajectory.
    pub fn new(trajectory: &'a dyn Trajectory, name: &str, parameters: &str) -> Result<Correlator<'a>, Error> {
        let creator = match REGISTERED_CORRELATORS.get(name) {
            Some(creator) => creator,
            None => {
                return Err(Error::InvalidParameter(format!(
                    "unknown correlator with name '{}', available correlators are: {}",
                    name, available_correlators().join(", ")
                )));
            }
        };

        return Ok(Correlator {
            trajectory: trajectory,
            implementation: creator(trajectory, parameters)?,
            filters: Vec::new(),
            tag: None,
            state: CorrelatorState::Constructed,
            result: None,
            analysis: Analysis::new(),
        });
    }

    /// Get the name of this correlator
    pub fn name(&self) -> &'static str {
        self.implementation.info().name
    }

    /// Get the static description of the observable computed by this
    /// correlator
    pub fn info(&self) -> &'static ObservableInfo {
        self.implementation.info()
    }

    /// Get the parameters used by this correlator, including default values,
    /// formatted as JSON
    pub fn parameters(&self) -> String {
        self.implementation.parameters()
    }

    /// Get the tag used to name the output of this correlator
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Set the tag used to name the output of this correlator
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }

    /// Add a filter selecting particles. This is only possible before
    /// computing the correlation.
    pub fn add_filter(&mut self, filter: Filter) -> Result<(), Error> {
        if self.state != CorrelatorState::Constructed {
            return Err(Error::InvalidState(
                "filters must be added before computing the correlation".into()
            ));
        }

        self.filters.push(filter);
        return Ok(());
    }

    /// Get the filters used by this correlator
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Get the current state of this correlator
    pub fn state(&self) -> CorrelatorState {
        self.state
    }

    /// Get the correlation function, if it was computed
    pub fn result(&self) -> Option<&CorrelationResult> {
        self.result.as_ref()
    }

    /// Get the physical quantities extracted by `analyze`. This is empty
    /// before `analyze` is called, and only contains the quantities that
    /// could be computed.
    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Compute the correlation function. This can be called again after a
    /// successful computation, but not after analysis or writing.
    #[time_graph::instrument(name = "Correlator::compute")]
    pub fn compute(&mut self) -> Result<(), Error> {
        match self.state {
            CorrelatorState::Constructed | CorrelatorState::Computed => {}
            state => {
                return Err(Error::InvalidState(format!(
                    "can not compute {} in state {:?}", self.name(), state
                )));
            }
        }

        let info = self.implementation.info();
        let data = read_phase_space(
            self.trajectory,
            info.phasespace,
            info.nbodies,
            &self.filters,
            self.implementation.fix_cm(),
        )?;

        let result = if data.has_empty_selection() {
            let filters = self.filters.iter().map(|f| f.description()).collect::<Vec<_>>();
            warn!(
                "no particle selected by filters [{}] for {}, the result will be empty",
                filters.join(", "), info.name
            );
            CorrelationResult::empty(info.axes.len())
        } else {
            self.implementation.compute(self.trajectory, &data)?
        };

        self.result = Some(result);
        self.analysis = Analysis::new();
        self.state = CorrelatorState::Computed;
        return Ok(());
    }

    /// Extract physical quantities from the correlation function
    pub fn analyze(&mut self) -> Result<(), Error> {
        let result = match (self.state, &self.result) {
            (CorrelatorState::Computed, Some(result)) => result,
            (state, _) => {
                return Err(Error::InvalidState(format!(
                    "can not analyze {} in state {:?}", self.name(), state
                )));
            }
        };

        self.analysis = if result.is_empty() {
            Analysis::new()
        } else {
            self.implementation.analyze(result)
        };
        self.state = CorrelatorState::Analyzed;
        return Ok(());
    }

    /// Write the correlation function, and any additional table, to `output`
    pub fn write(&mut self, output: &mut dyn Output) -> Result<(), Error> {
        let result = match (self.state, &self.result) {
            (CorrelatorState::Computed | CorrelatorState::Analyzed, Some(result)) => result,
            (state, _) => {
                return Err(Error::InvalidState(format!(
                    "can not write {} in state {:?}", self.name(), state
                )));
            }
        };

        let info = self.implementation.info();
        let tag = self.tag.as_deref();
        {
            let mut writer = output.open(&table_name(info.symbol, tag, None))?;
            write_correlation(&mut *writer, info, tag, result, &self.analysis)?;
        }
        self.implementation.write_extra(output, tag, &self.analysis)?;

        self.state = CorrelatorState::Written;
        return Ok(());
    }

    /// Compute, analyze and write the correlation function
    pub fn run(&mut self, output: &mut dyn Output) -> Result<(), Error> {
        self.compute()?;
        self.analyze()?;
        return self.write(output);
    }
}

/// Get the names of all registered correlators
pub fn available_correlators() -> Vec<&'static str> {
    REGISTERED_CORRELATORS.keys().copied().collect()
}

type CorrelatorCreator = fn(&dyn Trajectory, &str) -> Result<Box<dyn CorrelatorBase>, Error>;

macro_rules! add_correlator {
    ($map :expr, $name :literal, $type :ty, $parameters :ty) => (
        $map.insert($name, (|trajectory: &dyn Trajectory, json: &str| {
            let parameters = serde_json::from_str::<$parameters>(json)?;
            Ok(Box::new(<$type>::new(trajectory, parameters)?) as Box<dyn CorrelatorBase>)
        }) as CorrelatorCreator);
    );
}

static REGISTERED_CORRELATORS: Lazy<BTreeMap<&'static str, CorrelatorCreator>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    add_correlator!(map, "msd", MeanSquareDisplacement, MeanSquareDisplacementParameters);
    add_correlator!(map, "alpha2", NonGaussianParameter, NonGaussianParameterParameters);
    add_correlator!(map, "vacf", VelocityAutocorrelation, VelocityAutocorrelationParameters);

    add_correlator!(map, "sk", StructureFactor, StructureFactorParameters);
    add_correlator!(map, "fkt", IntermediateScattering, IntermediateScatteringParameters);
    add_correlator!(map, "fskt", SelfIntermediateScattering, SelfIntermediateScatteringParameters);
    return map;
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryOutput;
    use crate::trajectory::test_utils::test_trajectory;

    #[test]
    fn registry() {
        assert_eq!(available_correlators(), ["alpha2", "fkt", "fskt", "msd", "sk", "vacf"]);

        let trajectory = test_trajectory("ballistic");
        let error = Correlator::new(&trajectory, "gr", "{}").unwrap_err();
        assert!(error.to_string().contains("unknown correlator with name 'gr'"));

        for name in available_correlators() {
            let correlator = Correlator::new(&trajectory, name, r#"{"fix_cm": true}"#).unwrap();
            assert_eq!(correlator.name(), name);
            assert!(correlator.parameters().contains("\"fix_cm\":true"));
        }
    }

    #[test]
    fn state_machine() {
        let trajectory = test_trajectory("ballistic");
        let mut msd = Correlator::new(&trajectory, "msd", r#"{"tgrid": [0.0, 1.0]}"#).unwrap();
        let mut output = MemoryOutput::new();

        assert_eq!(msd.state(), CorrelatorState::Constructed);
        assert!(matches!(msd.analyze(), Err(Error::InvalidState(_))));
        assert!(matches!(msd.write(&mut output), Err(Error::InvalidState(_))));

        msd.compute().unwrap();
        assert_eq!(msd.state(), CorrelatorState::Computed);
        // computing again is fine
        msd.compute().unwrap();
        assert!(matches!(msd.add_filter(Filter::species(1)), Err(Error::InvalidState(_))));

        msd.analyze().unwrap();
        assert_eq!(msd.state(), CorrelatorState::Analyzed);
        assert!(matches!(msd.analyze(), Err(Error::InvalidState(_))));
        assert!(matches!(msd.compute(), Err(Error::InvalidState(_))));

        msd.write(&mut output).unwrap();
        assert_eq!(msd.state(), CorrelatorState::Written);
        assert!(matches!(msd.write(&mut output), Err(Error::InvalidState(_))));
        assert!(output.get("msd").is_some());
    }

    #[test]
    fn write_without_analysis() {
        let trajectory = test_trajectory("ballistic");
        let mut vacf = Correlator::new(&trajectory, "vacf", r#"{"tgrid": [0.0, 1.0]}"#).unwrap();
        vacf.set_tag("test");
        vacf.compute().unwrap();

        let mut output = MemoryOutput::new();
        vacf.write(&mut output).unwrap();

        let table = output.get("vacf.test").unwrap();
        let lines = table.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "# title: velocity autocorrelation function Z(t)");
        assert_eq!(lines[1], "# columns: t, vacf");
        assert_eq!(lines[2], "# tag: test");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn empty_selection() {
        let trajectory = test_trajectory("ballistic");
        let mut msd = Correlator::new(&trajectory, "msd", r#"{"tgrid": [0.0, 1.0]}"#).unwrap();
        msd.add_filter(Filter::species(42)).unwrap();
        msd.compute().unwrap();
        assert!(msd.result().unwrap().is_empty());

        msd.analyze().unwrap();
        assert!(msd.analysis().is_empty());
    }
}
