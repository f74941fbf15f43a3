//! Extraction of per-frame particle data from a trajectory, with particle
//! filtering and center of mass removal.
use std::sync::Arc;

use ndarray::Array2;

use crate::Error;
use crate::trajectory::{Frame, Trajectory, UnitCell};

/// Per-particle property correlated by an observable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSpace {
    /// Positions folded inside the unit cell
    Positions,
    /// Positions with periodic boundary conditions undone
    UnfoldedPositions,
    /// Velocities
    Velocities,
}

impl PhaseSpace {
    /// Short name of this phase space, as used in output files
    pub fn name(&self) -> &'static str {
        match self {
            PhaseSpace::Positions => "pos",
            PhaseSpace::UnfoldedPositions => "pos-unf",
            PhaseSpace::Velocities => "vel",
        }
    }
}

/// A `Filter` selects particles in a frame. Filters are used to restrict
/// correlation functions to a subset of the particles, typically to a
/// single species.
#[derive(Clone)]
pub struct Filter {
    description: String,
    predicate: Arc<dyn Fn(&Frame, usize) -> bool + Send + Sync>,
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter").field("description", &self.description).finish_non_exhaustive()
    }
}

impl Filter {
    /// Create a filter from an arbitrary predicate, called with a frame and
    /// the index of a particle in this frame
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Filter
        where F: Fn(&Frame, usize) -> bool + Send + Sync + 'static
    {
        Filter {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Create a filter selecting the particles with the given species
    pub fn species(species: i32) -> Filter {
        Filter::new(
            format!("species == {}", species),
            move |frame, i| frame.species()[i] == species,
        )
    }

    /// Get a human readable description of this filter
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Check if the particle `i` in `frame` is selected by this filter
    pub fn matches(&self, frame: &Frame, i: usize) -> bool {
        (self.predicate)(frame, i)
    }
}

/// Data extracted from all the frames of a trajectory.
///
/// One-body observables use a single data stream. Two-body observables use
/// two streams, which are the same unless two different filters are set.
#[derive(Debug, Clone)]
pub struct PhaseSpaceData {
    cells: Vec<UnitCell>,
    first: Vec<Array2<f64>>,
    second: Option<Vec<Array2<f64>>>,
}

impl PhaseSpaceData {
    /// Create a new set of data, with only one stream if `second` is `None`
    pub fn new(cells: Vec<UnitCell>, first: Vec<Array2<f64>>, second: Option<Vec<Array2<f64>>>) -> PhaseSpaceData {
        assert_eq!(cells.len(), first.len());
        if let Some(second) = &second {
            assert_eq!(cells.len(), second.len());
        }
        PhaseSpaceData { cells, first, second }
    }

    /// Get the number of frames
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Is there no frame at all?
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get the unit cell of every frame
    pub fn cells(&self) -> &[UnitCell] {
        &self.cells
    }

    /// Get the first data stream, as an array of shape `(particles, 3)` per
    /// frame
    pub fn first(&self) -> &[Array2<f64>] {
        &self.first
    }

    /// Get the second data stream, which is the first one if only one stream
    /// was extracted
    pub fn second(&self) -> &[Array2<f64>] {
        self.second.as_deref().unwrap_or(&self.first)
    }

    /// Are both data streams the same?
    pub fn is_shared(&self) -> bool {
        self.second.is_none()
    }

    /// Check if no particle was selected in all frames of at least one of
    /// the streams
    pub fn has_empty_selection(&self) -> bool {
        let empty = |stream: &[Array2<f64>]| stream.iter().all(|data| data.nrows() == 0);
        return empty(&self.first) || empty(self.second());
    }

    /// Check if the cell is the same in all frames
    pub fn static_cell(&self) -> bool {
        self.cells.windows(2).all(|w| w[0] == w[1])
    }
}

/// Read the `phasespace` data of all frames in `trajectory`.
///
/// For one-body observables (`nbodies == 1`), all filters apply to the single
/// stream of data and the number of selected particles must stay constant.
/// For two-body observables, the first filter applies to the first stream and
/// the second filter to the second stream.
#[time_graph::instrument(name = "read_phase_space")]
pub(crate) fn read_phase_space(
    trajectory: &dyn Trajectory,
    phasespace: PhaseSpace,
    nbodies: usize,
    filters: &[Filter],
    fix_cm: bool,
) -> Result<PhaseSpaceData, Error> {
    let (first_filters, second_filters) = match (nbodies, filters.len()) {
        (1, _) => (filters, None),
        (2, 0 | 1) => (filters, None),
        (2, 2) => (&filters[..1], Some(&filters[1..])),
        _ => {
            return Err(Error::InvalidParameter(format!(
                "can not use {} filters with a {}-body correlation", filters.len(), nbodies
            )));
        }
    };

    let size = trajectory.size();
    let mut cells = Vec::with_capacity(size);
    let mut first = Vec::with_capacity(size);
    let mut second = second_filters.map(|_| Vec::with_capacity(size));

    let mut unfolder = Unfolder::default();
    for index in 0..size {
        let frame = trajectory.read(index)?;

        let mut field = match phasespace {
            PhaseSpace::Positions => frame.positions().to_vec(),
            PhaseSpace::UnfoldedPositions => match frame.unfolded_positions() {
                Some(unfolded) => unfolded.to_vec(),
                None => unfolder.unfold(&frame)?,
            },
            PhaseSpace::Velocities => match frame.velocities() {
                Some(velocities) => velocities.to_vec(),
                None => {
                    return Err(Error::Trajectory(format!(
                        "velocities are not available in frame {}", index
                    )));
                }
            },
        };

        if fix_cm {
            remove_mean(&mut field);
        }

        first.push(select(&frame, &field, first_filters));
        if let (Some(second), Some(filters)) = (&mut second, second_filters) {
            second.push(select(&frame, &field, filters));
        }
        cells.push(frame.cell());
    }

    if nbodies == 1 {
        if let Some(reference) = first.first() {
            let count = reference.nrows();
            if let Some(index) = first.iter().position(|data| data.nrows() != count) {
                return Err(Error::Trajectory(format!(
                    "the number of selected particles changes from {} to {} in frame {}, \
                    this is not supported by {}-body correlations",
                    count, first[index].nrows(), index, nbodies
                )));
            }
        }
    }

    return Ok(PhaseSpaceData::new(cells, first, second));
}

/// Keep the rows of `field` for particles matching all the `filters`
fn select(frame: &Frame, field: &[[f64; 3]], filters: &[Filter]) -> Array2<f64> {
    let selected = (0..field.len())
        .filter(|&i| filters.iter().all(|filter| filter.matches(frame, i)))
        .collect::<Vec<_>>();

    let mut data = Array2::zeros((selected.len(), 3));
    for (row, &i) in selected.iter().enumerate() {
        for d in 0..3 {
            data[[row, d]] = field[i][d];
        }
    }
    return data;
}

/// Subtract the (unweighted) average over all particles from `field`
fn remove_mean(field: &mut [[f64; 3]]) {
    if field.is_empty() {
        return;
    }

    let mut mean = [0.0; 3];
    for value in field.iter() {
        for d in 0..3 {
            mean[d] += value[d];
        }
    }
    let n = field.len() as f64;
    for d in 0..3 {
        mean[d] /= n;
    }

    for value in field.iter_mut() {
        for d in 0..3 {
            value[d] -= mean[d];
        }
    }
}

/// Reconstruct unfolded positions from consecutive folded frames, assuming
/// no particle moves more than half a cell between two frames.
#[derive(Default)]
struct Unfolder {
    previous: Option<(Vec<[f64; 3]>, Vec<[f64; 3]>)>,
}

impl Unfolder {
    fn unfold(&mut self, frame: &Frame) -> Result<Vec<[f64; 3]>, Error> {
        let positions = frame.positions();
        let unfolded = match &self.previous {
            None => positions.to_vec(),
            Some((folded, unfolded)) => {
                if folded.len() != positions.len() {
                    return Err(Error::Trajectory(
                        "can not unfold positions when the number of particles changes".into()
                    ));
                }

                let cell = frame.cell();
                positions.iter().zip(folded).zip(unfolded)
                    .map(|((current, previous), previous_unfolded)| {
                        let mut delta = [
                            current[0] - previous[0],
                            current[1] - previous[1],
                            current[2] - previous[2],
                        ];
                        cell.vector_image(&mut delta);
                        [
                            previous_unfolded[0] + delta[0],
                            previous_unfolded[1] + delta[1],
                            previous_unfolded[2] + delta[2],
                        ]
                    })
                    .collect()
            }
        };

        self.previous = Some((positions.to_vec(), unfolded.clone()));
        return Ok(unfolded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::trajectory::SimpleTrajectory;
    use crate::trajectory::test_utils::test_trajectory;

    #[test]
    fn filters() {
        let trajectory = test_trajectory("ballistic");
        let species = [Filter::species(1)];

        let data = read_phase_space(&trajectory, PhaseSpace::Positions, 1, &species, false).unwrap();
        assert_eq!(data.len(), 20);
        assert_eq!(data.first()[0].nrows(), 2);
        assert!(data.is_shared());

        let both = [Filter::species(1), Filter::species(2)];
        let data = read_phase_space(&trajectory, PhaseSpace::Positions, 2, &both, false).unwrap();
        assert!(!data.is_shared());
        assert_eq!(data.first()[0].nrows(), 2);
        assert_eq!(data.second()[0].nrows(), 2);
        assert_eq!(data.second()[0][[0, 0]], 4.0);

        // one-body correlations use the intersection of all filters
        let data = read_phase_space(&trajectory, PhaseSpace::Positions, 1, &both, false).unwrap();
        assert!(data.has_empty_selection());

        let three = [Filter::species(1), Filter::species(2), Filter::species(3)];
        assert!(read_phase_space(&trajectory, PhaseSpace::Positions, 2, &three, false).is_err());

        assert_eq!(Filter::species(2).description(), "species == 2");
    }

    #[test]
    fn velocities() {
        let trajectory = test_trajectory("ballistic");
        let data = read_phase_space(&trajectory, PhaseSpace::Velocities, 1, &[], false).unwrap();
        assert_eq!(data.first()[3][[3, 1]], 0.8);

        let trajectory = test_trajectory("lattice");
        assert!(read_phase_space(&trajectory, PhaseSpace::Velocities, 1, &[], false).is_err());
    }

    #[test]
    fn fix_cm() {
        let trajectory = test_trajectory("ballistic");
        let data = read_phase_space(&trajectory, PhaseSpace::Velocities, 1, &[], true).unwrap();
        for d in 0..3 {
            assert_relative_eq!(data.first()[0].column(d).sum(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn unfolding() {
        let expected = test_trajectory("ballistic");
        let expected = read_phase_space(&expected, PhaseSpace::UnfoldedPositions, 1, &[], false).unwrap();

        // same trajectory, without unfolded positions
        let ballistic = test_trajectory("ballistic");
        let mut trajectory = SimpleTrajectory::new(ballistic.timestep()).unwrap();
        for (i, &step) in ballistic.steps().iter().enumerate() {
            let original = ballistic.read(i).unwrap();
            let mut frame = Frame::new(original.cell());
            for (&species, &position) in original.species().iter().zip(original.positions()) {
                frame.add_particle(species, position);
            }
            trajectory.add_frame(step, frame).unwrap();
        }

        let data = read_phase_space(&trajectory, PhaseSpace::UnfoldedPositions, 1, &[], false).unwrap();
        for (actual, expected) in data.first().iter().zip(expected.first()) {
            assert_relative_eq!(actual, expected, epsilon = 1e-12);
        }
    }
}
