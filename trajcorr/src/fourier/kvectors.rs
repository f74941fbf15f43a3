//! Generate the wave-vectors compatible with the periodic boundary conditions
//! of an orthorhombic cell, grouped in shells of similar norm.
//!
//! Every wave-vector is `k = n ⊙ k0`, where `n` is a triplet of integers and
//! `k0 = 2π / L` is the spacing of the reciprocal lattice along each axis.
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::Error;
use crate::grid::{GridGenerator, LinearGrid};
use crate::trajectory::UnitCell;

/// Seed used for the random selection of wave-vectors, so that different
/// correlators (e.g. the different pairs of a partial correlation) use the
/// same wave-vectors.
const SELECTION_SEED: u64 = 1;

/// All the wave-vectors with a norm close to a given value
#[derive(Debug, Clone, PartialEq)]
pub struct KShell {
    /// index of the shell in the requested grid
    grid_index: usize,
    /// requested norm for this shell
    k: f64,
    /// integer coordinates of the wave-vectors in this shell, sorted
    vectors: Vec<[i32; 3]>,
    /// indexes of the selected wave-vectors in `vectors`, sorted
    selection: Vec<usize>,
}

impl KShell {
    /// Get the norm of the wave-vectors in this shell, as requested in the
    /// wave-vectors grid
    pub fn k(&self) -> f64 {
        self.k
    }

    /// Get the position of this shell in the requested grid
    pub fn grid_index(&self) -> usize {
        self.grid_index
    }

    /// Get all the wave-vectors in this shell
    pub fn vectors(&self) -> &[[i32; 3]] {
        &self.vectors
    }

    /// Get the indexes of the selected wave-vectors
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// Iterate over the selected wave-vectors
    pub fn selected(&self) -> impl Iterator<Item = [i32; 3]> + '_ {
        self.selection.iter().map(|&i| self.vectors[i])
    }
}

/// Wave-vectors of a cell, binned in shells around the values of a grid of
/// norms
#[derive(Debug, Clone, PartialEq)]
pub struct WaveVectors {
    k0: [f64; 3],
    dk: f64,
    kmax: f64,
    shells: Vec<KShell>,
}

impl WaveVectors {
    /// Find all wave-vectors of `cell` with a norm within `dk` of one of the
    /// values in `kgrid`. Each wave-vector goes in the shell with the closest
    /// norm, and shells without any wave-vector are removed.
    ///
    /// All vectors are selected initially, use [`WaveVectors::select`] to
    /// reduce their number.
    #[time_graph::instrument(name = "WaveVectors::new")]
    pub fn new(cell: &UnitCell, kgrid: &[f64], dk: f64) -> Result<WaveVectors, Error> {
        let k0 = reciprocal_spacing(cell)?;

        if !(dk > 0.0 && dk.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "dk must be a positive number, got {}", dk
            )));
        }

        if kgrid.iter().any(|k| !k.is_finite() || *k < 0.0) {
            return Err(Error::InvalidParameter(
                "values in the wave-vectors grid must be positive".into()
            ));
        }

        let Some(kgrid_max) = kgrid.iter().copied().reduce(f64::max) else {
            return Err(Error::InvalidParameter("the wave-vectors grid can not be empty".into()));
        };
        let kmax = kgrid_max + dk;

        let mut vectors = vec![Vec::new(); kgrid.len()];
        let n_max = [
            1 + (kmax / k0[0]) as i32,
            1 + (kmax / k0[1]) as i32,
            1 + (kmax / k0[2]) as i32,
        ];
        for nx in -n_max[0]..=n_max[0] {
            for ny in -n_max[1]..=n_max[1] {
                for nz in -n_max[2]..=n_max[2] {
                    if nx == 0 && ny == 0 && nz == 0 {
                        continue;
                    }

                    let norm = f64::sqrt(
                        (nx as f64 * k0[0]).powi(2) + (ny as f64 * k0[1]).powi(2) + (nz as f64 * k0[2]).powi(2)
                    );
                    if norm > kmax {
                        continue;
                    }

                    let mut closest: Option<(usize, f64)> = None;
                    for (i, &k) in kgrid.iter().enumerate() {
                        let distance = (norm - k).abs();
                        if distance < dk && closest.map_or(true, |(_, d)| distance < d) {
                            closest = Some((i, distance));
                        }
                    }

                    if let Some((i, _)) = closest {
                        vectors[i].push([nx, ny, nz]);
                    }
                }
            }
        }

        let shells = vectors.into_iter()
            .zip(kgrid)
            .enumerate()
            .filter(|(_, (vectors, _))| !vectors.is_empty())
            .map(|(grid_index, (vectors, &k))| KShell {
                grid_index,
                k,
                selection: (0..vectors.len()).collect(),
                vectors,
            })
            .collect::<Vec<_>>();

        if shells.is_empty() {
            let kmin = kgrid.iter().copied().fold(f64::INFINITY, f64::min);
            return Err(Error::InvalidParameter(format!(
                "could not find any wave-vector with kmin={}, kmax={} and dk={}, try increasing dk",
                kmin, kgrid_max, dk
            )));
        }

        if shells.len() != kgrid.len() {
            debug!("{} empty shells removed from the wave-vectors grid", kgrid.len() - shells.len());
        }

        return Ok(WaveVectors {
            k0,
            dk,
            kmax,
            shells,
        });
    }

    /// Keep at most `nk` wave-vectors in each shell, chosen randomly with a
    /// fixed seed.
    pub fn select(&mut self, nk: usize) {
        let mut rng = StdRng::seed_from_u64(SELECTION_SEED);
        for shell in &mut self.shells {
            if shell.vectors.len() <= nk {
                shell.selection = (0..shell.vectors.len()).collect();
            } else {
                let mut selection = rand::seq::index::sample(&mut rng, shell.vectors.len(), nk).into_vec();
                selection.sort_unstable();
                shell.selection = selection;
            }
        }

        info!(
            "using {} wave-vectors in {} shells",
            self.shells.iter().map(|s| s.selection.len()).sum::<usize>(),
            self.shells.len()
        );
    }

    /// Get the spacing of the reciprocal lattice along each axis
    pub fn k0(&self) -> [f64; 3] {
        self.k0
    }

    /// Get the width of the shells
    pub fn dk(&self) -> f64 {
        self.dk
    }

    /// Get the largest norm a wave-vector can have
    pub fn kmax(&self) -> f64 {
        self.kmax
    }

    /// Get the non-empty shells
    pub fn shells(&self) -> &[KShell] {
        &self.shells
    }

    /// Get the norm of all non-empty shells
    pub fn grid(&self) -> Vec<f64> {
        self.shells.iter().map(|shell| shell.k).collect()
    }

    /// Get the largest integer coordinate of wave-vectors, `1 + kmax / k0`
    /// along the axis with the smallest spacing. Tabulated exponentials must
    /// contain at least this many values.
    pub fn max_index(&self) -> usize {
        let k0_min = self.k0.iter().copied().fold(f64::INFINITY, f64::min);
        return 1 + (self.kmax / k0_min) as usize;
    }
}

/// Get the reciprocal lattice spacing for `cell`, or an error for infinite
/// cells
pub fn reciprocal_spacing(cell: &UnitCell) -> Result<[f64; 3], Error> {
    cell.reciprocal_spacing().ok_or_else(|| Error::InvalidParameter(
        "correlations in Fourier space require a periodic cell".into()
    ))
}

/// Default grid of wave-vectors norms: `ksamples` values between `kmin` and
/// `kmax`, starting at the smallest reciprocal lattice spacing if `kmin` is
/// not positive.
pub fn default_kgrid(cell: &UnitCell, kmin: f64, kmax: f64, ksamples: usize) -> Result<Vec<f64>, Error> {
    let start = if kmin > 0.0 {
        kmin
    } else {
        let k0 = reciprocal_spacing(cell)?;
        k0.iter().copied().fold(f64::INFINITY, f64::min)
    };

    if kmax < start {
        return Err(Error::InvalidParameter(format!(
            "kmax ({}) must be larger than the smallest wave-vector ({})", kmax, start
        )));
    }

    return Ok(LinearGrid.generate(start, kmax, ksamples));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn shells() {
        // k0 = 1 along all axis
        let cell = UnitCell::cubic(2.0 * PI);
        let kvectors = WaveVectors::new(&cell, &[1.0, 2f64.sqrt(), 3.0], 0.1).unwrap();

        assert_eq!(kvectors.grid(), [1.0, 2f64.sqrt(), 3.0]);
        let shells = kvectors.shells();
        assert_eq!(shells[0].vectors().len(), 6);
        assert_eq!(shells[1].vectors().len(), 12);
        // (±3, 0, 0) and (±2, ±2, ±1) permutations
        assert_eq!(shells[2].vectors().len(), 6 + 24);
        assert_eq!(shells[0].selection(), [0, 1, 2, 3, 4, 5]);

        for shell in shells {
            for n in shell.vectors() {
                let norm = f64::sqrt((n[0] * n[0] + n[1] * n[1] + n[2] * n[2]) as f64);
                assert!((norm - shell.k()).abs() < 0.1);
            }
        }

        assert_relative_eq!(kvectors.kmax(), 3.1);
        assert_eq!(kvectors.max_index(), 4);
    }

    #[test]
    fn empty_shells() {
        let cell = UnitCell::cubic(2.0 * PI);
        // nothing between 1.1 and 1.3
        let kvectors = WaveVectors::new(&cell, &[1.0, 1.2, 2f64.sqrt()], 0.1).unwrap();
        assert_eq!(kvectors.grid(), [1.0, 2f64.sqrt()]);
        assert_eq!(kvectors.shells()[1].grid_index(), 2);

        let error = WaveVectors::new(&cell, &[1.2], 0.1).unwrap_err();
        assert!(error.to_string().contains("could not find any wave-vector"));

        assert!(WaveVectors::new(&UnitCell::infinite(), &[1.0], 0.1).is_err());
        assert!(WaveVectors::new(&cell, &[1.0], 0.0).is_err());
        assert!(WaveVectors::new(&cell, &[], 0.1).is_err());
    }

    #[test]
    fn closest_shell() {
        let cell = UnitCell::cubic(2.0 * PI);
        // vectors with norm 1 are within dk of both values, but closer to 0.9
        let kvectors = WaveVectors::new(&cell, &[0.9, 1.15], 0.3).unwrap();
        assert_eq!(kvectors.shells()[0].vectors().len(), 6);
        // the second shell gets the vectors with norm sqrt(2)
        assert_eq!(kvectors.shells()[1].vectors().len(), 12);
    }

    #[test]
    fn selection() {
        let cell = UnitCell::cubic(2.0 * PI);
        let mut kvectors = WaveVectors::new(&cell, &[1.0, 3.0], 0.1).unwrap();
        kvectors.select(4);

        for shell in kvectors.shells() {
            assert_eq!(shell.selection().len(), 4);
            assert!(shell.selection().windows(2).all(|w| w[0] < w[1]));
            assert_eq!(shell.selected().count(), 4);
        }

        // the selection is reproducible
        let mut other = WaveVectors::new(&cell, &[1.0, 3.0], 0.1).unwrap();
        other.select(4);
        assert_eq!(kvectors, other);

        kvectors.select(100);
        assert_eq!(kvectors.shells()[0].selection().len(), 6);
    }

    #[test]
    fn default_grid() {
        let cell = UnitCell::cubic(2.0 * PI);
        assert_eq!(default_kgrid(&cell, -1.0, 5.0, 5).unwrap(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(default_kgrid(&cell, 2.0, 4.0, 3).unwrap(), [2.0, 3.0, 4.0]);
        assert!(default_kgrid(&UnitCell::infinite(), -1.0, 5.0, 5).is_err());
        assert!(default_kgrid(&UnitCell::infinite(), 1.0, 5.0, 5).is_ok());
    }
}
