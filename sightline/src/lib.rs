//! Line-of-sight ground intersection over gridded elevation models.
//!
//! Given an observer position, compass bearing, tilt and height above
//! ground, [`LineOfSight`] marches a sight ray across a borrowed
//! [`ascgrid::HeightGrid`] and reports the first cell whose sampled
//! elevation reaches the ray, or a [`SightError`] describing why no
//! such cell exists.

mod error;
mod los;

pub use crate::{
    error::SightError,
    los::{line_of_sight, Intersection, LineOfSight, MARCH_BUDGET, STEP_SIZE, VIEW_DISTANCE},
};
