#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use trajcorr::{Frame, SimpleTrajectory, UnitCell};

pub const BOX_SIZE: f64 = 8.0;

/// Random walk of particles with the given `species` in a cubic box, with
/// one frame for each step in `steps`. The displacements between successive
/// steps are uniform in `[-0.1, 0.1]` along each axis.
pub fn random_walk(species: &[i32], steps: &[i64], timestep: f64) -> SimpleTrajectory {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let cell = UnitCell::cubic(BOX_SIZE);

    let mut positions = species.iter()
        .map(|_| [
            rng.gen_range(0.0..BOX_SIZE),
            rng.gen_range(0.0..BOX_SIZE),
            rng.gen_range(0.0..BOX_SIZE),
        ])
        .collect::<Vec<_>>();

    let mut trajectory = SimpleTrajectory::new(timestep).unwrap();
    let mut previous = steps.first().copied().unwrap_or(0);
    for &step in steps {
        for position in &mut positions {
            for _ in previous..step {
                for x in position.iter_mut() {
                    *x += rng.gen_range(-0.1..0.1);
                }
            }
        }
        previous = step;

        let mut frame = Frame::new(cell);
        for (&species, position) in species.iter().zip(&positions) {
            let folded = [
                position[0].rem_euclid(BOX_SIZE),
                position[1].rem_euclid(BOX_SIZE),
                position[2].rem_euclid(BOX_SIZE),
            ];
            frame.add_particle(species, folded);
        }
        frame.set_unfolded_positions(positions.clone()).unwrap();
        trajectory.add_frame(step, frame).unwrap();
    }

    return trajectory;
}

/// Random walk with evenly spaced steps `0..n_frames`
pub fn linear_walk(species: &[i32], n_frames: i64) -> SimpleTrajectory {
    let steps = (0..n_frames).collect::<Vec<_>>();
    return random_walk(species, &steps, 0.01);
}

/// Random walk sampled on blocks of logarithmically spaced steps
/// `0, 1, 2, 4, ..., 2^(block_size - 2)`
pub fn logarithmic_walk(species: &[i32], n_blocks: i64, block_size: usize) -> SimpleTrajectory {
    let period = 1_i64 << (block_size - 1);
    let mut steps = Vec::new();
    for block in 0..n_blocks {
        steps.push(block * period);
        for i in 0..(block_size - 1) {
            steps.push(block * period + (1 << i));
        }
    }

    let mut trajectory = random_walk(species, &steps, 0.01);
    trajectory.set_block_size(block_size).unwrap();
    return trajectory;
}

/// Alternating species 1 and 2 for `n` particles
pub fn binary_mixture(n: usize) -> Vec<i32> {
    (0..n).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect()
}
