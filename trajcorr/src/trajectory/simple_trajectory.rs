use std::sync::Arc;

use crate::Error;

use super::{Frame, Trajectory, guess_block_size};

type SpeciesMap = Arc<dyn Fn(i32) -> i32 + Send + Sync>;

/// A simple implementation of `Trajectory` keeping all frames in memory, to
/// use when no other is available
#[derive(Clone)]
pub struct SimpleTrajectory {
    frames: Vec<Frame>,
    steps: Vec<i64>,
    timestep: f64,
    block_size: Option<usize>,
    species_map: Option<SpeciesMap>,
}

impl std::fmt::Debug for SimpleTrajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleTrajectory")
            .field("frames", &self.frames.len())
            .field("steps", &self.steps)
            .field("timestep", &self.timestep)
            .field("block_size", &self.block_size)
            .field("species_map", &self.species_map.is_some())
            .finish()
    }
}

impl SimpleTrajectory {
    /// Create a new empty trajectory, where a single simulation step
    /// corresponds to `timestep` units of time.
    pub fn new(timestep: f64) -> Result<SimpleTrajectory, Error> {
        if !(timestep > 0.0 && timestep.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "timestep must be positive, got {}", timestep
            )));
        }

        return Ok(SimpleTrajectory {
            frames: Vec::new(),
            steps: Vec::new(),
            timestep: timestep,
            block_size: None,
            species_map: None,
        });
    }

    /// Add a frame at the given simulation `step`, which must be larger than
    /// the step of all frames already in this trajectory.
    pub fn add_frame(&mut self, step: i64, frame: Frame) -> Result<(), Error> {
        if let Some(&last) = self.steps.last() {
            if step <= last {
                return Err(Error::InvalidParameter(format!(
                    "steps must be strictly increasing, got {} after {}", step, last
                )));
            }
        }

        self.steps.push(step);
        self.frames.push(frame);
        Ok(())
    }

    /// Declare that the step sequence repeats itself every `block_size`
    /// frames. Without this, the block size is inferred from the steps.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), Error> {
        if block_size == 0 {
            return Err(Error::InvalidParameter("block size must be positive".into()));
        }
        self.block_size = Some(block_size);
        Ok(())
    }

    /// Register a function used to relabel the species of all particles when
    /// reading frames, for example to merge species or map them to a
    /// different layout.
    pub fn register_species_map(&mut self, map: impl Fn(i32) -> i32 + Send + Sync + 'static) {
        self.species_map = Some(Arc::new(map));
    }
}

impl Trajectory for SimpleTrajectory {
    fn size(&self) -> usize {
        self.frames.len()
    }

    fn steps(&self) -> &[i64] {
        &self.steps
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn block_size(&self) -> usize {
        match self.block_size {
            Some(block_size) => block_size,
            None => guess_block_size(&self.steps),
        }
    }

    fn read(&self, index: usize) -> Result<Frame, Error> {
        let frame = self.frames.get(index).ok_or_else(|| Error::Trajectory(format!(
            "frame index {} is out of bounds for a trajectory with {} frames",
            index, self.frames.len()
        )))?;

        let mut frame = frame.clone();
        if let Some(ref map) = self.species_map {
            for species in frame.species_mut() {
                *species = map(*species);
            }
        }

        return Ok(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::UnitCell;

    fn frame(species: &[i32]) -> Frame {
        let mut frame = Frame::new(UnitCell::cubic(5.0));
        for (i, &species) in species.iter().enumerate() {
            frame.add_particle(species, [i as f64, 0.0, 0.0]);
        }
        frame
    }

    #[test]
    fn add_frames() {
        let mut trajectory = SimpleTrajectory::new(0.5).unwrap();
        trajectory.add_frame(0, frame(&[1, 2])).unwrap();
        trajectory.add_frame(4, frame(&[1, 2])).unwrap();
        assert!(trajectory.add_frame(4, frame(&[1, 2])).is_err());
        trajectory.add_frame(10, frame(&[1, 2])).unwrap();

        assert_eq!(trajectory.size(), 3);
        assert_eq!(trajectory.steps(), &[0, 4, 10]);
        assert_eq!(trajectory.block_size(), 1);
        assert_eq!(trajectory.total_time(), 5.0);

        assert!(trajectory.read(3).is_err());
        assert_eq!(trajectory.read(1).unwrap().positions()[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn species_map() {
        let mut trajectory = SimpleTrajectory::new(1.0).unwrap();
        trajectory.add_frame(0, frame(&[1, 2, 3])).unwrap();
        trajectory.register_species_map(|species| if species == 3 { 2 } else { species });

        assert_eq!(trajectory.read(0).unwrap().species(), &[1, 2, 2]);
    }

    #[test]
    fn invalid_timestep() {
        for timestep in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let error = SimpleTrajectory::new(timestep).unwrap_err();
            assert!(matches!(error, Error::InvalidParameter(_)));
        }
    }

    #[test]
    fn block_size() {
        let mut trajectory = SimpleTrajectory::new(1.0).unwrap();
        assert!(trajectory.set_block_size(0).is_err());
        trajectory.set_block_size(4).unwrap();
        assert_eq!(trajectory.block_size(), 4);
    }

    #[test]
    fn inferred_block_size() {
        let mut trajectory = SimpleTrajectory::new(1.0).unwrap();
        assert_eq!(trajectory.block_size(), 1);

        for block in 0..3 {
            for delta in [0, 1, 2, 4, 8] {
                trajectory.add_frame(16 * block + delta, frame(&[1])).unwrap();
            }
        }
        assert_eq!(trajectory.block_size(), 5);

        // an explicit block size takes precedence
        trajectory.set_block_size(1).unwrap();
        assert_eq!(trajectory.block_size(), 1);
    }
}
