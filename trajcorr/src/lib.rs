#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::default_trait_access)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Time and wave-vector correlation functions computed over particle
//! trajectories: mean square displacement, non-Gaussian parameter, velocity
//! autocorrelation, structure factor and (self) intermediate scattering
//! functions.

mod errors;
pub use self::errors::Error;

pub mod trajectory;
pub use self::trajectory::{Trajectory, SimpleTrajectory, Sliced, Frame, UnitCell, CellShape};

pub mod grid;
pub use self::grid::{GridGenerator, GridSpacing, LinearGrid, LogarithmicGrid};

mod origins;
pub use self::origins::Origins;

pub mod time_grid;
pub use self::time_grid::{DiscreteTimeGrid, TimeLag, TimeTarget};

pub mod correlation;
pub use self::correlation::{PairwiseObservable, TimeSeries, generalized_correlation};

mod phasespace;
pub use self::phasespace::{PhaseSpace, PhaseSpaceData, Filter};

pub mod fourier;

pub(crate) mod math;

mod result;
pub use self::result::{CorrelationResult, Analysis, AnalysisValue};

pub mod output;
pub use self::output::{Output, MemoryOutput, FileOutput};

pub mod correlators;

mod correlator;
pub use self::correlator::{Correlator, CorrelatorState, available_correlators};

mod partial;
pub use self::partial::Partial;

/// Optional features available in this build of the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Is the parallel kernel for the self intermediate scattering function
    /// (and parallel partial decompositions) available?
    pub parallel: bool,
}

/// Get the optional features available in this build of the library
pub const fn capabilities() -> Capabilities {
    Capabilities {
        parallel: cfg!(feature = "parallel"),
    }
}
