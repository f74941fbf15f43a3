use indexmap::IndexMap;
use log::info;

use crate::{Correlator, Error, Filter};
use crate::output::Output;
use crate::trajectory::Trajectory;

/// Decomposition of a correlation function into contributions from each
/// pair of species.
///
/// For species `[A, B]`, this computes the correlation for the pairs
/// `(A, A)`, `(A, B)` and `(B, B)`, each with its own `Correlator` tagged
/// with `"A-B"`. Self-pairs use a single species filter, other pairs use one
/// filter per species. One-body correlators then select the intersection of
/// both filters, while two-body correlators correlate particles of the first
/// species with particles of the second species.
///
/// The correlators are created by `compute`, and dropped once their results
/// have been written, so the same decomposition can be computed again.
pub struct Partial<'a> {
    trajectory: &'a dyn Trajectory,
    name: String,
    parameters: String,
    species: Vec<i32>,
    correlators: IndexMap<(i32, i32), Correlator<'a>>,
}

impl<'a> std::fmt::Debug for Partial<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partial")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("species", &self.species)
            .field("correlators", &self.correlators)
            .finish_non_exhaustive()
    }
}

impl<'a> Partial<'a> {
    /// Create a partial decomposition of the correlator with the given
    /// `name` and `parameters`, using all the species present in the first
    /// frame of the trajectory
    pub fn new(trajectory: &'a dyn Trajectory, name: &str, parameters: &str) -> Result<Partial<'a>, Error> {
        if trajectory.size() == 0 {
            return Err(Error::Trajectory("the trajectory does not contain any frame".into()));
        }

        let frame = trajectory.read(0)?;
        let mut species = frame.species().to_vec();
        species.sort_unstable();
        species.dedup();

        return Partial::with_species(trajectory, name, parameters, &species);
    }

    /// Create a partial decomposition of the correlator with the given
    /// `name` and `parameters`, for the given list of `species`. Pairs
    /// follow the order of this list.
    pub fn with_species(trajectory: &'a dyn Trajectory, name: &str, parameters: &str, species: &[i32]) -> Result<Partial<'a>, Error> {
        if species.is_empty() {
            return Err(Error::InvalidParameter("the list of species can not be empty".into()));
        }

        for (i, a) in species.iter().enumerate() {
            if species[i + 1..].contains(a) {
                return Err(Error::InvalidParameter(format!(
                    "species {} is repeated in the list of species", a
                )));
            }
        }

        // report unknown names and invalid parameters right away
        Correlator::new(trajectory, name, parameters)?;

        return Ok(Partial {
            trajectory: trajectory,
            name: name.into(),
            parameters: parameters.into(),
            species: species.to_vec(),
            correlators: IndexMap::new(),
        });
    }

    /// Get the name of the underlying correlators
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the species used in this decomposition
    pub fn species(&self) -> &[i32] {
        &self.species
    }

    /// Get all pairs of species, in order
    pub fn pairs(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.species.iter().enumerate().flat_map(move |(i, &a)| {
            self.species[i..].iter().map(move |&b| (a, b))
        })
    }

    /// Get the correlator for a given pair of species. This is only
    /// available between `compute` and `write`.
    pub fn get(&self, pair: (i32, i32)) -> Option<&Correlator<'a>> {
        self.correlators.get(&pair)
    }

    /// Iterate over all pairs and the corresponding correlators. This is
    /// empty before `compute` and after `write`.
    pub fn iter(&self) -> impl Iterator<Item = (&(i32, i32), &Correlator<'a>)> + '_ {
        self.correlators.iter()
    }

    /// Create one correlator for each pair of species, with the
    /// corresponding filters
    fn create_correlators(&self) -> Result<IndexMap<(i32, i32), Correlator<'a>>, Error> {
        let mut correlators = IndexMap::new();
        for (a, b) in self.pairs() {
            let mut correlator = Correlator::new(self.trajectory, &self.name, &self.parameters)?;
            correlator.add_filter(Filter::species(a))?;
            if b != a {
                correlator.add_filter(Filter::species(b))?;
            }
            correlator.set_tag(format!("{}-{}", a, b));
            correlators.insert((a, b), correlator);
        }
        return Ok(correlators);
    }

    /// Compute the correlation for all pairs, starting from new correlators.
    /// With the `parallel` feature, different pairs are computed in parallel.
    #[time_graph::instrument(name = "Partial::compute")]
    pub fn compute(&mut self) -> Result<(), Error> {
        self.correlators = self.create_correlators()?;
        info!("computing {} for {} pairs of species", self.name, self.correlators.len());

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            let correlators = self.correlators.values_mut().collect::<Vec<_>>();
            return correlators.into_par_iter().try_for_each(|correlator| correlator.compute());
        }

        #[cfg(not(feature = "parallel"))]
        {
            for correlator in self.correlators.values_mut() {
                correlator.compute()?;
            }
            return Ok(());
        }
    }

    fn check_computed(&self, action: &str) -> Result<(), Error> {
        if self.correlators.is_empty() {
            return Err(Error::InvalidState(format!(
                "can not {} the partial {} before computing it", action, self.name
            )));
        }
        return Ok(());
    }

    /// Analyze the correlation for all pairs
    pub fn analyze(&mut self) -> Result<(), Error> {
        self.check_computed("analyze")?;
        for correlator in self.correlators.values_mut() {
            correlator.analyze()?;
        }
        return Ok(());
    }

    /// Write the correlation for all pairs to `output`, and release the
    /// correlators
    pub fn write(&mut self, output: &mut dyn Output) -> Result<(), Error> {
        self.check_computed("write")?;
        for correlator in self.correlators.values_mut() {
            correlator.write(output)?;
        }
        self.correlators.clear();
        return Ok(());
    }

    /// Compute, analyze and write the correlation for all pairs
    pub fn run(&mut self, output: &mut dyn Output) -> Result<(), Error> {
        self.compute()?;
        self.analyze()?;
        return self.write(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::PhaseSpace;
    use crate::output::MemoryOutput;
    use crate::phasespace::read_phase_space;
    use crate::trajectory::test_utils::test_trajectory;

    #[test]
    fn pairs() {
        let trajectory = test_trajectory("ballistic");
        let mut partial = Partial::new(&trajectory, "msd", r#"{"tgrid": [0.0, 1.0]}"#).unwrap();

        assert_eq!(partial.name(), "msd");
        assert_eq!(partial.species(), [1, 2]);
        assert_eq!(partial.pairs().collect::<Vec<_>>(), [(1, 1), (1, 2), (2, 2)]);
        assert!(partial.get((1, 1)).is_none());

        partial.compute().unwrap();
        assert_eq!(partial.iter().map(|(&pair, _)| pair).collect::<Vec<_>>(), [(1, 1), (1, 2), (2, 2)]);

        let same = partial.get((1, 1)).unwrap();
        assert_eq!(same.filters().len(), 1);
        assert_eq!(same.tag(), Some("1-1"));

        let different = partial.get((1, 2)).unwrap();
        assert_eq!(different.filters().len(), 2);
        assert_eq!(different.filters()[0].description(), "species == 1");
        assert_eq!(different.filters()[1].description(), "species == 2");
        assert_eq!(different.tag(), Some("1-2"));

        assert!(partial.get((2, 1)).is_none());
    }

    #[test]
    fn selected_particles() {
        // the "lattice" trajectory contains 14 particles of species 1 and 13
        // particles of species 2
        let trajectory = test_trajectory("lattice");
        let mut partial = Partial::new(&trajectory, "fkt", r#"{"kgrid": [2.0944]}"#).unwrap();
        partial.compute().unwrap();

        let same = partial.get((1, 1)).unwrap();
        let data = read_phase_space(&trajectory, PhaseSpace::Positions, 2, same.filters(), false).unwrap();
        assert!(data.is_shared());
        assert_eq!(data.len(), trajectory.size());
        for positions in data.first() {
            assert_eq!(positions.nrows(), 14);
        }

        let different = partial.get((1, 2)).unwrap();
        let data = read_phase_space(&trajectory, PhaseSpace::Positions, 2, different.filters(), false).unwrap();
        assert!(!data.is_shared());
        for (first, second) in data.first().iter().zip(data.second()) {
            assert_eq!(first.nrows(), 14);
            assert_eq!(second.nrows(), 13);
        }
    }

    #[test]
    fn species_order() {
        let trajectory = test_trajectory("ballistic");
        let partial = Partial::with_species(&trajectory, "msd", "{}", &[2, 1]).unwrap();
        assert_eq!(partial.pairs().collect::<Vec<_>>(), [(2, 2), (2, 1), (1, 1)]);

        assert!(Partial::with_species(&trajectory, "msd", "{}", &[1, 2, 1]).is_err());
        assert!(Partial::with_species(&trajectory, "msd", "{}", &[]).is_err());
        assert!(Partial::with_species(&trajectory, "unknown", "{}", &[1]).is_err());
        assert!(Partial::with_species(&trajectory, "msd", r#"{"unknown": 3}"#, &[1]).is_err());
    }

    #[test]
    fn run() {
        let trajectory = test_trajectory("ballistic");
        let mut partial = Partial::new(&trajectory, "msd", r#"{"tgrid": [0.0, 1.0]}"#).unwrap();

        partial.compute().unwrap();
        partial.analyze().unwrap();

        // one-body correlators use the intersection of the filters, so no
        // particle is selected for different species
        assert!(partial.get((1, 2)).unwrap().result().unwrap().is_empty());
        for pair in [(1, 1), (2, 2)] {
            let result = partial.get(pair).unwrap().result().unwrap();
            let values = result.as_1d().unwrap();
            assert_relative_eq!(values[1], 1.0, epsilon = 1e-10);
        }

        let mut output = MemoryOutput::new();
        partial.write(&mut output).unwrap();
        assert_eq!(output.names().collect::<Vec<_>>(), ["msd.1-1", "msd.1-2", "msd.2-2"]);

        // correlators are released after writing
        assert!(partial.get((1, 1)).is_none());
        assert!(matches!(partial.analyze(), Err(Error::InvalidState(_))));
        assert!(matches!(partial.write(&mut output), Err(Error::InvalidState(_))));
    }

    #[test]
    fn run_twice() {
        let trajectory = test_trajectory("ballistic");
        let mut partial = Partial::new(&trajectory, "vacf", r#"{"tgrid": [0.0, 1.0]}"#).unwrap();

        let mut first = MemoryOutput::new();
        partial.run(&mut first).unwrap();

        let mut second = MemoryOutput::new();
        partial.compute().unwrap();
        partial.analyze().unwrap();
        partial.write(&mut second).unwrap();

        assert_eq!(first.names().collect::<Vec<_>>(), second.names().collect::<Vec<_>>());
        for name in first.names() {
            assert_eq!(first.get(name), second.get(name));
        }
    }
}
