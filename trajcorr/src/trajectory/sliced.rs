use log::warn;

use crate::Error;

use super::{Frame, Trajectory};

/// A view on a subset of the frames of another trajectory.
///
/// The subset is defined by fractions of the trajectory length, so that
/// `Sliced::new(&trajectory, 0.5, 1.0, 1)` only contains the second half of
/// `trajectory`. For block-periodic trajectories, both ends are moved back to
/// the beginning of their block so that the slice keeps the periodicity.
pub struct Sliced<'a> {
    trajectory: &'a dyn Trajectory,
    indexes: Vec<usize>,
    steps: Vec<i64>,
    block_size: usize,
}

impl<'a> Sliced<'a> {
    /// Create a new slice of `trajectory` going from `first` to `last` (as
    /// fractions of the trajectory length), keeping one frame every `skip`.
    pub fn new(trajectory: &'a dyn Trajectory, first: f64, last: f64, skip: usize) -> Result<Sliced<'a>, Error> {
        if !(0.0..=1.0).contains(&first) || !(0.0..=1.0).contains(&last) || first >= last {
            return Err(Error::InvalidParameter(format!(
                "invalid trajectory slice from {} to {}, expected 0 <= first < last <= 1",
                first, last
            )));
        }

        if skip == 0 {
            return Err(Error::InvalidParameter("slice skip must be positive".into()));
        }

        let size = trajectory.size();
        let mut start = (first * size as f64).floor() as usize;
        let mut stop = (last * size as f64).floor() as usize;

        let mut block_size = trajectory.block_size();
        if block_size > 1 {
            start = (start / block_size) * block_size;
            stop = (stop / block_size) * block_size;

            if block_size % skip == 0 {
                block_size /= skip;
            } else {
                warn!(
                    "skipping {} frames breaks the periodicity of blocks of {} frames",
                    skip, block_size
                );
                block_size = 1;
            }
        }

        if stop <= start {
            return Err(Error::InvalidParameter(format!(
                "trajectory slice from {} to {} does not contain any frame", first, last
            )));
        }

        let indexes = (start..stop).step_by(skip).collect::<Vec<_>>();
        let steps = indexes.iter().map(|&i| trajectory.steps()[i]).collect();

        return Ok(Sliced {
            trajectory,
            indexes,
            steps,
            block_size,
        });
    }
}

impl<'a> Trajectory for Sliced<'a> {
    fn size(&self) -> usize {
        self.indexes.len()
    }

    fn steps(&self) -> &[i64] {
        &self.steps
    }

    fn timestep(&self) -> f64 {
        self.trajectory.timestep()
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read(&self, index: usize) -> Result<Frame, Error> {
        let index = *self.indexes.get(index).ok_or_else(|| Error::Trajectory(format!(
            "frame index {} is out of bounds for a sliced trajectory with {} frames",
            index, self.indexes.len()
        )))?;
        return self.trajectory.read(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::test_utils::test_trajectory;

    #[test]
    fn fractional_slice() {
        let trajectory = test_trajectory("ballistic");
        assert_eq!(trajectory.size(), 20);

        let sliced = Sliced::new(&trajectory, 0.5, 1.0, 1).unwrap();
        assert_eq!(sliced.size(), 10);
        assert_eq!(sliced.steps()[0], trajectory.steps()[10]);
        assert_eq!(sliced.read(0).unwrap(), trajectory.read(10).unwrap());
        assert!(sliced.read(10).is_err());

        let sliced = Sliced::new(&trajectory, 0.0, 1.0, 3).unwrap();
        assert_eq!(sliced.size(), 7);
        assert_eq!(sliced.steps()[1], trajectory.steps()[3]);

        assert!(Sliced::new(&trajectory, 0.5, 0.5, 1).is_err());
        assert!(Sliced::new(&trajectory, 0.0, 1.5, 1).is_err());
        assert!(Sliced::new(&trajectory, 0.0, 1.0, 0).is_err());
    }

    #[test]
    fn block_aligned_slice() {
        let trajectory = test_trajectory("logarithmic");
        assert_eq!(trajectory.block_size(), 6);

        let sliced = Sliced::new(&trajectory, 0.3, 0.9, 1).unwrap();
        // 0.3 * 24 = 7 -> 6, 0.9 * 24 = 21 -> 18
        assert_eq!(sliced.size(), 12);
        assert_eq!(sliced.steps()[0], trajectory.steps()[6]);
        assert_eq!(sliced.block_size(), 6);

        let sliced = Sliced::new(&trajectory, 0.0, 1.0, 2).unwrap();
        assert_eq!(sliced.block_size(), 3);

        let sliced = Sliced::new(&trajectory, 0.0, 1.0, 4).unwrap();
        assert_eq!(sliced.block_size(), 1);
    }
}
