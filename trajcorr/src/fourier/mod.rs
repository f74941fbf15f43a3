//! Building blocks for correlation functions in Fourier space: wave-vectors
//! on the reciprocal lattice of the cell and tabulated plane waves.

mod kvectors;
pub use self::kvectors::{WaveVectors, KShell, default_kgrid, reciprocal_spacing};

mod expo;
pub use self::expo::{ExpoSphere, particle_block_size};

use crate::Error;
use crate::trajectory::UnitCell;

/// Options controlling which wave-vectors are used by a correlator
#[derive(Debug, Clone, PartialEq)]
pub struct KGridOptions {
    /// Explicit grid of wave-vectors norms. If `None`, a linear grid is
    /// built from `kmin`, `kmax` and `ksamples`.
    pub kgrid: Option<Vec<f64>>,
    /// Smallest norm in the default grid, a non-positive value meaning the
    /// smallest reciprocal lattice spacing
    pub kmin: f64,
    /// Largest norm in the default grid
    pub kmax: f64,
    /// Number of values in the default grid
    pub ksamples: usize,
    /// Width of the shells
    pub dk: f64,
    /// Maximal number of wave-vectors per shell
    pub nk: usize,
}

impl KGridOptions {
    /// Get the grid of wave-vectors norms for the given cell
    pub fn grid(&self, cell: &UnitCell) -> Result<Vec<f64>, Error> {
        match &self.kgrid {
            Some(kgrid) => Ok(kgrid.clone()),
            None => default_kgrid(cell, self.kmin, self.kmax, self.ksamples),
        }
    }

    /// Build the shells of wave-vectors for `cell` on the given grid, and
    /// select up to `nk` wave-vectors in each shell
    pub fn wave_vectors(&self, cell: &UnitCell, kgrid: &[f64]) -> Result<WaveVectors, Error> {
        let mut wave_vectors = WaveVectors::new(cell, kgrid, self.dk)?;
        wave_vectors.select(self.nk);
        return Ok(wave_vectors);
    }

    /// Check the options that do not depend on the cell
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.dk > 0.0 && self.dk.is_finite()) {
            return Err(Error::InvalidParameter(format!("dk must be positive, got {}", self.dk)));
        }

        if self.nk == 0 {
            return Err(Error::InvalidParameter("nk must be at least 1".into()));
        }

        if self.kgrid.is_none() && self.ksamples == 0 {
            return Err(Error::InvalidParameter("ksamples must be at least 1".into()));
        }

        return Ok(());
    }
}
