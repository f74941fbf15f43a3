//! Discretization of a grid of physical times on the frames of a trajectory.
//!
//! Frames are not necessarily evenly spaced in time, so a requested time lag
//! `t` is mapped onto the closest step difference `steps[b] - steps[a]`
//! actually present in the trajectory. For block-periodic trajectories, a
//! given step difference may only be realizable when starting from specific
//! frames inside a block, which is why each lag comes with an offset.
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::{Error, Origins};
use crate::math::crossing_time;
use crate::phasespace::{PhaseSpace, read_phase_space};
use crate::trajectory::{Trajectory, check_block_size};

/// A realizable time lag: starting from any origin frame `offset + n * block`,
/// the frame `lag` positions later is separated by the requested time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLag {
    /// Index of the first origin frame to use for this lag
    pub offset: usize,
    /// Difference of frame indexes corresponding to this lag
    pub lag: usize,
}

/// Discretized version of a grid of physical times
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteTimeGrid {
    lags: Vec<TimeLag>,
}

impl DiscreteTimeGrid {
    /// Discretize the requested physical `times` on a trajectory with the
    /// given `steps`, `timestep` and `block_size`.
    ///
    /// Requested times closer to the same realizable step difference are
    /// merged, and the resulting lags are sorted by increasing step
    /// difference. If `use_offsets` is false, all offsets are set to 0.
    pub fn new(
        steps: &[i64],
        timestep: f64,
        block_size: usize,
        times: &[f64],
        use_offsets: bool,
    ) -> Result<DiscreteTimeGrid, Error> {
        if steps.len() < 2 {
            return Err(Error::Trajectory(format!(
                "time correlations require at least 2 frames, the trajectory has {}",
                steps.len()
            )));
        }

        if !(timestep > 0.0 && timestep.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "timestep must be positive, got {}", timestep
            )));
        }

        if times.is_empty() {
            return Err(Error::InvalidParameter("the time grid can not be empty".into()));
        }

        for &time in times {
            if !time.is_finite() || time < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "times in the time grid must be positive, got {}", time
                )));
            }
        }

        for window in times.windows(2) {
            if window[1] < window[0] {
                return Err(Error::InvalidParameter(format!(
                    "the time grid must be sorted in increasing order, got {} after {}",
                    window[1], window[0]
                )));
            }
        }

        // all step differences achievable from the first frames of a block,
        // keeping the smallest offset for each of them
        let mut achievable = BTreeMap::new();
        for offset in 0..usize::min(block_size.max(1), steps.len()) {
            for i in offset..steps.len() {
                achievable.entry(steps[i] - steps[offset]).or_insert(TimeLag {
                    offset: offset,
                    lag: i - offset,
                });
            }
        }

        let targets = times.iter()
            .map(|&time| (time / timestep).round() as i64)
            .collect::<BTreeSet<_>>();

        let mut matched = BTreeSet::new();
        for &target in &targets {
            let below = achievable.range(..=target).next_back().map(|(&diff, _)| diff);
            let above = achievable.range(target..).next().map(|(&diff, _)| diff);
            let closest = match (below, above) {
                (Some(below), Some(above)) => {
                    if (target - below) <= (above - target) { below } else { above }
                }
                (Some(diff), None) | (None, Some(diff)) => diff,
                (None, None) => unreachable!("there is always a zero step difference"),
            };

            if closest != target {
                debug!("requested step difference {} is approximated by {}", target, closest);
            }
            matched.insert(closest);
        }

        let lags = matched.into_iter()
            .map(|diff| {
                let mut lag = achievable[&diff];
                if !use_offsets {
                    lag.offset = 0;
                }
                lag
            })
            .collect();

        return Ok(DiscreteTimeGrid { lags });
    }

    /// Discretize `times` on the given `trajectory`, disabling offsets when
    /// using a single time origin.
    ///
    /// If the trajectory steps are not periodic with the declared block size,
    /// a warning is emitted and the discretization proceeds anyway, possibly
    /// giving a grid different from the requested one.
    pub fn from_trajectory(trajectory: &dyn Trajectory, times: &[f64], origins: Origins) -> Result<DiscreteTimeGrid, Error> {
        let block_size = trajectory.block_size();
        if block_size > 1 {
            if let Err(e) = check_block_size(trajectory.steps(), block_size) {
                warn!("issue with trajectory blocks, the time grid may not correspond to the requested one ({})", e);
            }
        }

        return DiscreteTimeGrid::new(
            trajectory.steps(),
            trajectory.timestep(),
            block_size,
            times,
            origins.use_offsets(),
        );
    }

    /// Get the list of lags in this grid
    pub fn lags(&self) -> &[TimeLag] {
        &self.lags
    }

    /// Get the number of lags in this grid
    pub fn len(&self) -> usize {
        self.lags.len()
    }

    /// Is this grid empty?
    pub fn is_empty(&self) -> bool {
        self.lags.is_empty()
    }
}

/// Largest time of the default time grid of a correlator
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeTarget {
    /// Fraction of the trajectory duration
    Fraction(f64),
    /// Physical time, limited to the trajectory duration
    Time(f64),
    /// Time at which the root mean square displacement of all particles,
    /// measured from the first frame, reaches this value
    Rmsd(f64),
}

impl Default for TimeTarget {
    fn default() -> TimeTarget {
        TimeTarget::Fraction(0.75)
    }
}

impl TimeTarget {
    /// Get the physical time corresponding to this target in `trajectory`
    pub fn resolve(&self, trajectory: &dyn Trajectory) -> Result<f64, Error> {
        let (name, value) = match *self {
            TimeTarget::Fraction(value) => ("fraction", value),
            TimeTarget::Time(value) => ("time", value),
            TimeTarget::Rmsd(value) => ("rmsd", value),
        };

        if !(value > 0.0 && value.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "{} time target must be positive, got {}", name, value
            )));
        }

        let total_time = trajectory.total_time();
        let time = match *self {
            TimeTarget::Fraction(fraction) => fraction * total_time,
            TimeTarget::Time(time) => f64::min(time, total_time),
            TimeTarget::Rmsd(rmsd) => {
                match time_when_msd_is(trajectory, rmsd * rmsd)? {
                    Some(time) => time,
                    None => {
                        warn!(
                            "the root mean square displacement never reaches {}, using the full trajectory",
                            rmsd
                        );
                        total_time
                    }
                }
            }
        };

        return Ok(time);
    }
}

/// Find the time at which the mean square displacement of all particles
/// from their position in the first frame reaches `target`, interpolating
/// between frames.
fn time_when_msd_is(trajectory: &dyn Trajectory, target: f64) -> Result<Option<f64>, Error> {
    let data = read_phase_space(trajectory, PhaseSpace::UnfoldedPositions, 1, &[], false)?;
    let positions = data.first();
    let (first, first_step) = match (positions.first(), trajectory.steps().first()) {
        (Some(first), Some(&step)) => (first, step),
        _ => return Ok(None),
    };

    if first.nrows() == 0 {
        return Ok(None);
    }

    let times = trajectory.steps().iter()
        .map(|&step| (step - first_step) as f64 * trajectory.timestep())
        .collect::<Vec<_>>();

    let msd = positions.iter()
        .map(|frame| {
            let displacement = frame - first;
            displacement.mapv(|x| x * x).sum() / first.nrows() as f64
        })
        .collect::<Vec<_>>();

    return Ok(crossing_time(&times, &msd, target));
}
