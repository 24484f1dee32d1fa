use ascgrid::{OutOfBounds, C};
use thiserror::Error;

/// Ways a line-of-sight calculation can end without striking the
/// surface. All variants are expected, recoverable outcomes the caller
/// branches on.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SightError {
    /// The observer stands outside the height grid footprint. Raised
    /// before any surface sampling.
    #[error("start position ({easting}, {northing}) is outside the height grid")]
    StartOutOfBounds { easting: C, northing: C },

    /// The marching ray left the grid extent before striking anything.
    #[error("sight ray left the height grid: {0}")]
    SurfaceOutOfBounds(#[from] OutOfBounds),

    /// The ray exceeded the scan limit without striking the surface:
    /// the observer is looking at open sky or past the horizon.
    #[error("no intersection within {scan_limit} world units")]
    NoIntersection { scan_limit: C },

    /// The configured step size cannot drive the march.
    #[error("step size {0} is not positive and finite")]
    StepSize(C),

    /// Marching to the scan limit would exceed the iteration budget.
    #[error("scanning {scan_limit} world units at step size {step_size} exceeds {max_steps} iterations")]
    Budget {
        scan_limit: C,
        step_size: C,
        max_steps: u64,
    },

    /// The cancellation flag was raised mid-march.
    #[error("line of sight calculation cancelled")]
    Cancelled,
}
