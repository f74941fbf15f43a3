//! Trajectories are often sampled non-uniformly but periodically, for example
//! with logarithmically spaced frames restarted every `block_size` frames.
//! This module checks and infers this periodicity from the step sequence.
use crate::Error;

/// Check that `steps` is made of repetitions of the same block of
/// `block_size` frames: every block must have the same steps relative to its
/// first frame, and consecutive blocks must start at a constant interval. A
/// trailing incomplete block must match the beginning of the first one.
pub fn check_block_size(steps: &[i64], block_size: usize) -> Result<(), Error> {
    if block_size == 0 {
        return Err(Error::InvalidParameter("block size must be positive".into()));
    }

    if steps.len() < block_size {
        return Err(Error::Trajectory(format!(
            "the trajectory has {} frames, which is less than a single block of {} frames",
            steps.len(), block_size
        )));
    }

    let first = &steps[..block_size];
    let reference: Vec<i64> = first.iter().map(|&step| step - first[0]).collect();

    let mut period = None;
    let mut previous_start = first[0];
    for (block_i, block) in steps.chunks(block_size).enumerate().skip(1) {
        for (i, &step) in block.iter().enumerate() {
            if step - block[0] != reference[i] {
                return Err(Error::Trajectory(format!(
                    "frame {} of block {} does not match the first block",
                    i, block_i
                )));
            }
        }

        let current_period = block[0] - previous_start;
        match period {
            None => period = Some(current_period),
            Some(period) if period != current_period => {
                return Err(Error::Trajectory(format!(
                    "block {} starts {} steps after the previous one instead of {}",
                    block_i, current_period, period
                )));
            }
            Some(_) => {}
        }
        previous_start = block[0];
    }

    return Ok(());
}

/// Find the smallest block size compatible with the given `steps`. If the
/// steps do not repeat at least once, there is no periodicity to use and this
/// returns 1.
pub fn guess_block_size(steps: &[i64]) -> usize {
    for block_size in 1..=(steps.len() / 2) {
        if check_block_size(steps, block_size).is_ok() {
            return block_size;
        }
    }
    return 1;
}
