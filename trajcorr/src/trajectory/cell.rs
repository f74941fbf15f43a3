//! The `UnitCell` type represents the enclosing box of a simulated system, with
//! some type of periodic condition.
use std::f64;

/// The shape of a cell determine how we will be able to compute the periodic
/// boundaries condition.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum CellShape {
    /// Infinite unit cell, with no boundaries
    Infinite,
    /// Orthorhombic unit cell, with cuboid shape
    Orthorhombic,
}

/// An `UnitCell` defines the system physical boundaries.
///
/// Wave-vectors are built on the reciprocal lattice of the cell, one spacing
/// `2π / L` per axis, which is why only cuboid cells are supported.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct UnitCell {
    /// Side lengths of the cell
    lengths: [f64; 3],
    /// Unit cell shape
    shape: CellShape,
}

impl UnitCell {
    /// Create an infinite unit cell
    pub fn infinite() -> UnitCell {
        UnitCell {
            lengths: [0.0; 3],
            shape: CellShape::Infinite,
        }
    }

    /// Create an orthorhombic unit cell, with side lengths `a, b, c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> UnitCell {
        assert!(a > 0.0 && b > 0.0 && c > 0.0, "Cell lengths must be positive");
        UnitCell {
            lengths: [a, b, c],
            shape: CellShape::Orthorhombic,
        }
    }

    /// Create a cubic unit cell, with side lengths `length, length, length`.
    pub fn cubic(length: f64) -> UnitCell {
        UnitCell::orthorhombic(length, length, length)
    }

    /// Get the cell shape
    pub fn shape(&self) -> CellShape {
        self.shape
    }

    /// Check if this unit cell is infinite, *i.e.* if it does not have
    /// periodic boundary conditions.
    pub fn is_infinite(&self) -> bool {
        self.shape() == CellShape::Infinite
    }

    /// Get the side lengths of the cell
    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    /// Get the spacing `2π / L` of the reciprocal lattice along each axis, or
    /// `None` for infinite cells.
    pub fn reciprocal_spacing(&self) -> Option<[f64; 3]> {
        match self.shape {
            CellShape::Infinite => None,
            CellShape::Orthorhombic => {
                let two_pi = 2.0 * f64::consts::PI;
                Some([
                    two_pi / self.lengths[0],
                    two_pi / self.lengths[1],
                    two_pi / self.lengths[2],
                ])
            }
        }
    }

    /// Find the image of a vector in the unit cell, obeying the periodic
    /// boundary conditions. For a cubic cell of side length `L`, this produce a
    /// vector with all components in `[-L/2, L/2)`.
    pub fn vector_image(&self, vector: &mut [f64; 3]) {
        match self.shape {
            CellShape::Infinite => (),
            CellShape::Orthorhombic => {
                for (x, &length) in vector.iter_mut().zip(&self.lengths) {
                    *x -= f64::round(*x / length) * length;
                }
            }
        }
    }
}
