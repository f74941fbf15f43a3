//! Tabulation of the plane waves `exp(i k·x)` on the reciprocal lattice, by
//! recurrence on the powers of `exp(i k0 x)` along each axis. Particles can
//! be split in blocks so the table fits in a given amount of memory.
use std::ops::Range;

use ndarray::{s, Array2, Array4, ArrayView2, ArrayView4};
use num_complex::Complex64;

/// Tabulated values of `exp(i n k0[axis] x[axis])` for a set of particles in
/// a set of frames, with `n` going from 0 to `max_index` included.
///
/// Plane waves `exp(i k·x)` for a wave-vector `k = n ⊙ k0` are products of
/// three tabulated factors. Negative `n` are obtained from the complex
/// conjugate of the positive ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpoSphere {
    /// Shape `(frames, particles, 3, max_index + 1)`
    table: Array4<Complex64>,
}

impl ExpoSphere {
    /// Tabulate the exponentials for the given `positions`, with one array
    /// of shape `(particles, 3)` per frame. All frames must contain the same
    /// number of particles.
    #[time_graph::instrument(name = "ExpoSphere::new")]
    pub fn new(k0: [f64; 3], max_index: usize, positions: &[ArrayView2<'_, f64>]) -> ExpoSphere {
        let n_particles = positions.first().map_or(0, |p| p.nrows());
        let mut table = Array4::from_elem(
            (positions.len(), n_particles, 3, max_index + 1),
            Complex64::new(1.0, 0.0),
        );

        for (frame, frame_positions) in positions.iter().enumerate() {
            assert_eq!(frame_positions.nrows(), n_particles, "all frames must have the same number of particles");
            for (particle, position) in frame_positions.outer_iter().enumerate() {
                for axis in 0..3 {
                    let first = Complex64::cis(k0[axis] * position[axis]);
                    let mut values = table.slice_mut(s![frame, particle, axis, ..]);
                    for n in 1..=max_index {
                        values[n] = values[n - 1] * first;
                    }
                }
            }
        }

        return ExpoSphere { table };
    }

    /// Tabulate the exponentials for the particles in the `particles` range
    /// of every frame in `data`
    pub fn for_particles(k0: [f64; 3], max_index: usize, data: &[Array2<f64>], particles: Range<usize>) -> ExpoSphere {
        let views = data.iter()
            .map(|frame| frame.slice(s![particles.clone(), ..]))
            .collect::<Vec<_>>();
        return ExpoSphere::new(k0, max_index, &views);
    }

    /// Get the number of tabulated frames
    pub fn n_frames(&self) -> usize {
        self.table.shape()[0]
    }

    /// Get the number of tabulated particles
    pub fn n_particles(&self) -> usize {
        self.table.shape()[1]
    }

    /// Get the largest tabulated index
    pub fn max_index(&self) -> usize {
        self.table.shape()[3] - 1
    }

    /// Get the full table of exponentials
    pub fn table(&self) -> ArrayView4<'_, Complex64> {
        self.table.view()
    }

    /// Get `exp(i n k0[axis] x[axis])` for the given particle in the given
    /// frame
    #[inline]
    pub fn factor(&self, frame: usize, particle: usize, axis: usize, n: i32) -> Complex64 {
        let value = self.table[[frame, particle, axis, n.unsigned_abs() as usize]];
        if n < 0 {
            value.conj()
        } else {
            value
        }
    }

    /// Get the plane wave `exp(i k·x)` for the wave-vector `k = n ⊙ k0`
    #[inline]
    pub fn plane_wave(&self, frame: usize, particle: usize, n: [i32; 3]) -> Complex64 {
        self.factor(frame, particle, 0, n[0])
            * self.factor(frame, particle, 1, n[1])
            * self.factor(frame, particle, 2, n[2])
    }

    /// Get the (unnormalized) density `ρ(k) = Σ exp(i k·x)` of all the
    /// tabulated particles in the given frame
    pub fn density(&self, frame: usize, n: [i32; 3]) -> Complex64 {
        (0..self.n_particles())
            .map(|particle| self.plane_wave(frame, particle, n))
            .sum()
    }
}

/// Get the number of particles to tabulate together so that the table of
/// exponentials for `n_frames` frames uses around `lookup_mb` megabytes.
pub fn particle_block_size(n_frames: usize, n_particles: usize, max_index: usize, lookup_mb: f64) -> usize {
    if n_particles == 0 {
        return 0;
    }

    let positions_size = (n_frames * n_particles * 3) as f64;
    let target_size = lookup_mb * 1e6 / 16.0;
    let n_blocks = usize::max(1, (positions_size * (max_index + 1) as f64 / target_size) as usize);

    return (n_particles / n_blocks).clamp(1, n_particles);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn positions() -> Vec<Array2<f64>> {
        vec![
            array![[0.1, 0.2, 0.3], [1.5, -2.0, 0.7], [3.2, 4.1, -0.4]],
            array![[0.3, 0.1, 0.2], [1.2, -1.0, 0.9], [2.7, 4.5, -0.1]],
        ]
    }

    #[test]
    fn plane_waves() {
        let k0 = [0.5, 1.0, 2.0];
        let data = positions();
        let expo = ExpoSphere::for_particles(k0, 3, &data, 0..3);
        assert_eq!(expo.n_frames(), 2);
        assert_eq!(expo.n_particles(), 3);
        assert_eq!(expo.max_index(), 3);

        let n = [2, -1, 3];
        for frame in 0..2 {
            for particle in 0..3 {
                let x = data[frame].row(particle);
                let phase = n[0] as f64 * k0[0] * x[0] + n[1] as f64 * k0[1] * x[1] + n[2] as f64 * k0[2] * x[2];
                let expected = Complex64::cis(phase);
                let actual = expo.plane_wave(frame, particle, n);
                assert_relative_eq!(actual.re, expected.re, epsilon = 1e-12);
                assert_relative_eq!(actual.im, expected.im, epsilon = 1e-12);
            }
        }

        assert_eq!(expo.factor(0, 0, 0, 0), Complex64::new(1.0, 0.0));
        assert_eq!(expo.factor(1, 2, 1, -2), expo.factor(1, 2, 1, 2).conj());

        let density = expo.density(1, n);
        let expected = (0..3).map(|p| expo.plane_wave(1, p, n)).sum::<Complex64>();
        assert_eq!(density, expected);
    }

    #[test]
    fn blocked_tabulation() {
        let k0 = [0.5, 1.0, 2.0];
        let data = positions();
        let full = ExpoSphere::for_particles(k0, 4, &data, 0..3);

        for block_size in [1, 2] {
            let mut start = 0;
            while start < 3 {
                let stop = usize::min(start + block_size, 3);
                let block = ExpoSphere::for_particles(k0, 4, &data, start..stop);
                assert_eq!(block.table(), full.table().slice(s![.., start..stop, .., ..]));
                start = stop;
            }
        }
    }

    #[test]
    fn block_size() {
        // everything fits in memory
        assert_eq!(particle_block_size(10, 100, 10, 64.0), 100);
        // 100 * 1000 * 3 * 11 = 3.3e6 values, 0.5e6 per block -> 6 blocks
        assert_eq!(particle_block_size(100, 1000, 10, 8.0), 166);
        // blocks contain at least one particle
        assert_eq!(particle_block_size(1000, 10, 100, 1e-3), 1);
        assert_eq!(particle_block_size(10, 0, 10, 64.0), 0);
    }
}
