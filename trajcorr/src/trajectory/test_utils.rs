use super::{Frame, SimpleTrajectory, UnitCell};

pub fn test_trajectory(name: &str) -> SimpleTrajectory {
    match name {
        "ballistic" => get_ballistic(),
        "logarithmic" => get_logarithmic(),
        "single" => get_single(),
        "lattice" => get_lattice(),
        _ => panic!("unknown test trajectory {}", name)
    }
}

/// Velocities with unit norm, so that the mean square displacement is `t^2`
/// and the velocity autocorrelation is 1.
const VELOCITIES: [[f64; 3]; 4] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.6, 0.8, 0.0],
];

const INITIAL: [[f64; 3]; 4] = [
    [1.0, 1.0, 1.0],
    [9.0, 2.0, 3.0],
    [4.0, 6.0, 8.5],
    [2.5, 7.5, 5.0],
];

fn ballistic_frame(cell: UnitCell, species: &[i32], time: f64) -> Frame {
    let lengths = cell.lengths();
    let mut frame = Frame::new(cell);
    let mut unfolded = Vec::new();
    for ((&species, initial), velocity) in species.iter().zip(&INITIAL).zip(&VELOCITIES) {
        let mut position = [0.0; 3];
        let mut folded = [0.0; 3];
        for i in 0..3 {
            position[i] = initial[i] + velocity[i] * time;
            folded[i] = position[i] - f64::floor(position[i] / lengths[i]) * lengths[i];
        }
        frame.add_particle(species, folded);
        unfolded.push(position);
    }

    frame.set_unfolded_positions(unfolded).expect("wrong number of positions");
    frame.set_velocities(VELOCITIES[..species.len()].to_vec()).expect("wrong number of velocities");
    return frame;
}

/// Four particles moving in straight lines at unit speed, two of species 1
/// and two of species 2, sampled every step for 20 steps.
fn get_ballistic() -> SimpleTrajectory {
    let cell = UnitCell::cubic(10.0);
    let mut trajectory = SimpleTrajectory::new(0.1).expect("invalid timestep");
    for step in 0..20 {
        let frame = ballistic_frame(cell, &[1, 1, 2, 2], step as f64 * 0.1);
        trajectory.add_frame(step, frame).expect("invalid step");
    }
    return trajectory;
}

/// Same motion as "ballistic", sampled on logarithmically spaced steps
/// repeating in 4 blocks of 6 frames.
fn get_logarithmic() -> SimpleTrajectory {
    let cell = UnitCell::cubic(10.0);
    let mut trajectory = SimpleTrajectory::new(0.01).expect("invalid timestep");
    for block in 0..4 {
        for delta in [0, 1, 2, 4, 8, 16] {
            let step = 32 * block + delta;
            let frame = ballistic_frame(cell, &[1, 1, 2, 2], step as f64 * 0.01);
            trajectory.add_frame(step, frame).expect("invalid step");
        }
    }
    trajectory.set_block_size(6).expect("invalid block size");
    return trajectory;
}

/// A single particle sitting at the origin
fn get_single() -> SimpleTrajectory {
    let mut trajectory = SimpleTrajectory::new(1.0).expect("invalid timestep");
    for step in 0..10 {
        let mut frame = Frame::new(UnitCell::cubic(5.0));
        frame.add_particle(1, [0.0, 0.0, 0.0]);
        trajectory.add_frame(step, frame).expect("invalid step");
    }
    return trajectory;
}

/// A static simple cubic lattice of 27 particles with lattice spacing 1.0 in
/// a cubic cell of side 3.0, with species alternating between 1 and 2.
fn get_lattice() -> SimpleTrajectory {
    let mut trajectory = SimpleTrajectory::new(1.0).expect("invalid timestep");
    for step in 0..5 {
        let mut frame = Frame::new(UnitCell::cubic(3.0));
        let mut i = 0;
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    let species = if i % 2 == 0 { 1 } else { 2 };
                    frame.add_particle(species, [x as f64, y as f64, z as f64]);
                    i += 1;
                }
            }
        }
        trajectory.add_frame(step, frame).expect("invalid step");
    }
    return trajectory;
}
