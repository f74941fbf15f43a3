use crate::Error;

use super::UnitCell;

/// A single configuration of the particles in a trajectory
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    cell: UnitCell,
    species: Vec<i32>,
    positions: Vec<[f64; 3]>,
    unfolded_positions: Option<Vec<[f64; 3]>>,
    velocities: Option<Vec<[f64; 3]>>,
}

impl Frame {
    /// Create a new frame without particles and with the given unit cell
    pub fn new(cell: UnitCell) -> Frame {
        Frame {
            cell: cell,
            species: Vec::new(),
            positions: Vec::new(),
            unfolded_positions: None,
            velocities: None,
        }
    }

    /// Add a particle with the given species and position to this frame.
    ///
    /// Any unfolded positions or velocities previously set are discarded,
    /// since they would no longer match the number of particles.
    pub fn add_particle(&mut self, species: i32, position: [f64; 3]) {
        self.species.push(species);
        self.positions.push(position);
        self.unfolded_positions = None;
        self.velocities = None;
    }

    /// Set the positions of all particles with periodic boundary conditions
    /// undone.
    pub fn set_unfolded_positions(&mut self, unfolded: Vec<[f64; 3]>) -> Result<(), Error> {
        if unfolded.len() != self.size() {
            return Err(Error::InvalidParameter(format!(
                "expected {} unfolded positions, got {}", self.size(), unfolded.len()
            )));
        }
        self.unfolded_positions = Some(unfolded);
        Ok(())
    }

    /// Set the velocities of all particles
    pub fn set_velocities(&mut self, velocities: Vec<[f64; 3]>) -> Result<(), Error> {
        if velocities.len() != self.size() {
            return Err(Error::InvalidParameter(format!(
                "expected {} velocities, got {}", self.size(), velocities.len()
            )));
        }
        self.velocities = Some(velocities);
        Ok(())
    }

    /// Get the unit cell of this frame
    pub fn cell(&self) -> UnitCell {
        self.cell
    }

    /// Get the number of particles in this frame
    pub fn size(&self) -> usize {
        self.species.len()
    }

    /// Get the species of all particles
    pub fn species(&self) -> &[i32] {
        &self.species
    }

    pub(crate) fn species_mut(&mut self) -> &mut [i32] {
        &mut self.species
    }

    /// Get the (possibly folded) positions of all particles
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Get the unfolded positions of all particles, if available
    pub fn unfolded_positions(&self) -> Option<&[[f64; 3]]> {
        self.unfolded_positions.as_deref()
    }

    /// Get the velocities of all particles, if available
    pub fn velocities(&self) -> Option<&[[f64; 3]]> {
        self.velocities.as_deref()
    }
}
