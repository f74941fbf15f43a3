use crate::Error;

mod cell;
pub use self::cell::{UnitCell, CellShape};

mod frame;
pub use self::frame::Frame;

mod blocks;
pub use self::blocks::{check_block_size, guess_block_size};

mod simple_trajectory;
pub use self::simple_trajectory::SimpleTrajectory;

mod sliced;
pub use self::sliced::Sliced;

#[cfg(test)]
pub(crate) mod test_utils;

/// A `Trajectory` gives read-only access to an ordered sequence of frames,
/// each associated with an integer simulation step.
///
/// Implementations are typically backed by a file reader; `SimpleTrajectory`
/// keeps all frames in memory.
pub trait Trajectory: Send + Sync {
    /// Get the number of frames in this trajectory
    fn size(&self) -> usize;

    /// Get the simulation step of each frame. The returned slice must have
    /// length `self.size()` and be strictly increasing, but the steps do not
    /// have to be evenly spaced.
    fn steps(&self) -> &[i64];

    /// Get the physical time corresponding to a single simulation step
    fn timestep(&self) -> f64;

    /// Get the number of frames after which the step sequence repeats
    /// itself, for trajectories sampled with a periodic non-uniform scheme.
    /// Evenly spaced trajectories have a block size of 1.
    fn block_size(&self) -> usize {
        1
    }

    /// Read the frame at the given `index`
    fn read(&self, index: usize) -> Result<Frame, Error>;

    /// Get the physical time spanned by this trajectory
    fn total_time(&self) -> f64 {
        match (self.steps().first(), self.steps().last()) {
            (Some(first), Some(last)) => self.timestep() * (last - first) as f64,
            _ => 0.0,
        }
    }
}
