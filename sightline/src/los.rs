use crate::SightError;
use ascgrid::{HeightGrid, C};
use geo::geometry::Coord;
use log::debug;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

/// Default scan limit, in world units.
pub const VIEW_DISTANCE: C = 1000.0;

/// Default march increment, in world units.
pub const STEP_SIZE: C = 0.1;

/// Upper bound on march iterations, guarding against pathological
/// step sizes.
pub const MARCH_BUDGET: u64 = 10_000_000;

/// First surface point struck by an observer's line of sight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Horizontal distance from the observer to the target.
    pub distance: C,

    /// World elevation of the observer's eye.
    pub eye_height: C,

    /// World position of the struck cell's sample point.
    pub target: Coord<C>,

    /// Sampled surface elevation at the target.
    pub surface_height: C,
}

impl fmt::Display for Intersection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "distance: {}, eye height: {}, intersect point: {},{}, intersect height: {}",
            self.distance, self.eye_height, self.target.x, self.target.y, self.surface_height
        )
    }
}

/// Line-of-sight ground intersection engine.
///
/// Holds an observer pose over a borrowed [`HeightGrid`] and caches the
/// result of the last successful [`calculate`](Self::calculate) call.
/// Every setter clears the cache, so a reused engine never returns a
/// stale result. Setters and `calculate` mutate the engine in place and
/// must be serialized by the caller; the grid itself is read-only and
/// freely shared between engines.
///
/// For one-off queries see [`line_of_sight`].
pub struct LineOfSight<'a> {
    /// Surface model the ray marches over.
    grid: &'a HeightGrid,

    /// Observer easting/northing in world coordinates.
    position: Coord<C>,

    /// Compass bearing in degrees, 0 = north, clockwise.
    bearing: C,

    /// Degrees from horizontal; negative angles point at the ground.
    tilt: C,

    /// Observer eye height above the surface, in world units.
    observer_height: C,

    /// March increment, in world units.
    step_size: C,

    /// Scan limit, in world units.
    max_scan: C,

    /// Cooperative cancellation flag, polled once per march step.
    cancel: Option<Arc<AtomicBool>>,

    /// Cached result of the last successful calculation.
    result: Option<Intersection>,
}

impl<'a> LineOfSight<'a> {
    /// Returns an engine for the given observer pose, with the default
    /// step size and scan limit.
    pub fn new(
        grid: &'a HeightGrid,
        position: Coord<C>,
        bearing: C,
        tilt: C,
        observer_height: C,
    ) -> Self {
        Self {
            grid,
            position,
            bearing,
            tilt,
            observer_height,
            step_size: STEP_SIZE,
            max_scan: VIEW_DISTANCE,
            cancel: None,
            result: None,
        }
    }

    /// Marches the sight ray outward and returns the first cell whose
    /// sampled elevation reaches it.
    ///
    /// Returns the cached result unchanged when nothing has changed
    /// since the last successful call. The march's starting distance
    /// equals the observer height rather than zero, so intersections
    /// nearer than that are never reported.
    pub fn calculate(&mut self) -> Result<Intersection, SightError> {
        if let Some(hit) = self.result {
            return Ok(hit);
        }

        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(SightError::StepSize(self.step_size));
        }
        #[allow(clippy::cast_precision_loss)]
        if (self.max_scan - self.observer_height) / self.step_size > MARCH_BUDGET as C {
            return Err(SightError::Budget {
                scan_limit: self.max_scan,
                step_size: self.step_size,
                max_steps: MARCH_BUDGET,
            });
        }

        if !self.grid.contains(self.position) {
            return Err(SightError::StartOutOfBounds {
                easting: self.position.x,
                northing: self.position.y,
            });
        }

        let now = Instant::now();
        let theta = grid_angle(self.bearing);
        let slope = self.tilt.to_radians().tan();
        // Sampled once; the march never re-reads the ground under the
        // observer.
        let eye_height = self.observer_height + self.sample(self.position)?;

        let mut steps = 0u64;
        let mut distance = self.observer_height;
        while distance < self.max_scan {
            if self.cancelled() {
                return Err(SightError::Cancelled);
            }

            let displaced = Coord {
                x: self.position.x + theta.cos() * distance,
                y: self.position.y + theta.sin() * distance,
            };
            let vision_height = distance * slope + eye_height;
            let surface_height = self.sample(displaced)?;

            if vision_height <= surface_height {
                let hit = Intersection {
                    distance,
                    eye_height,
                    target: displaced,
                    surface_height,
                };
                self.result = Some(hit);
                debug!("hit; steps: {steps}, runtime: {:?}", now.elapsed());
                return Ok(hit);
            }

            distance += self.step_size;
            steps += 1;
        }

        debug!("exhausted; steps: {steps}, runtime: {:?}", now.elapsed());
        Err(SightError::NoIntersection {
            scan_limit: self.max_scan,
        })
    }

    /// Points the engine at a different surface model.
    pub fn set_height_grid(&mut self, grid: &'a HeightGrid) {
        self.grid = grid;
        self.result = None;
    }

    pub fn set_position(&mut self, position: Coord<C>) {
        self.position = position;
        self.result = None;
    }

    pub fn set_bearing(&mut self, bearing: C) {
        self.bearing = bearing;
        self.result = None;
    }

    /// Tilt in degrees from horizontal; negative values point at the
    /// ground.
    pub fn set_tilt(&mut self, tilt: C) {
        self.tilt = tilt;
        self.result = None;
    }

    pub fn set_observer_height(&mut self, observer_height: C) {
        self.observer_height = observer_height;
        self.result = None;
    }

    pub fn set_step_size(&mut self, step_size: C) {
        self.step_size = step_size;
        self.result = None;
    }

    pub fn set_max_scan(&mut self, max_scan: C) {
        self.max_scan = max_scan;
        self.result = None;
    }

    pub fn step_size(&self) -> C {
        self.step_size
    }

    pub fn max_scan(&self) -> C {
        self.max_scan
    }

    /// Installs a flag that aborts an in-flight march when raised.
    ///
    /// Does not touch the cached result; the flag has no influence on
    /// computed values.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = Some(flag);
    }
}

/// Private API.
impl LineOfSight<'_> {
    /// Nearest-cell surface sample at `coord`.
    fn sample(&self, coord: Coord<C>) -> Result<C, SightError> {
        Ok(self.grid.height_at(coord)?)
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Converts a compass bearing (degrees, 0 = north, clockwise) to a
/// grid-frame angle in radians, compensating for rows being stored
/// north to south.
fn grid_angle(bearing: C) -> C {
    (360.0 - (bearing - 90.0)).to_radians()
}

/// One-off line-of-sight calculation with the default step size and
/// scan limit.
pub fn line_of_sight(
    grid: &HeightGrid,
    position: Coord<C>,
    bearing: C,
    tilt: C,
    observer_height: C,
) -> Result<Intersection, SightError> {
    LineOfSight::new(grid, position, bearing, tilt, observer_height).calculate()
}

#[cfg(test)]
mod tests {
    use super::{line_of_sight, Coord, Intersection, LineOfSight, C};
    use crate::SightError;
    use ascgrid::{Axis, GridParams, HeightGrid};
    use assert_approx_eq::assert_approx_eq;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    /// A `size`-cell-square grid of one-unit cells at the world origin,
    /// uniformly at `elevation`.
    fn flat_grid(size: usize, elevation: C) -> HeightGrid {
        let params = GridParams::new(1.0, size, size, 0.0, 0.0, -9999.0).unwrap();
        HeightGrid::new(params, vec![elevation; size * size]).unwrap()
    }

    fn center_observer(grid: &HeightGrid) -> LineOfSight<'_> {
        LineOfSight::new(grid, Coord { x: 100.0, y: 100.0 }, 0.0, -1.0, 1.5)
    }

    /// 500x500 one-unit grid shaped like a surveyed field: a 45.0
    /// plain with the observer's own cell raised to 47.93426.
    fn field_grid() -> HeightGrid {
        let params = GridParams::new(1.0, 500, 500, 265_000.0, 289_000.0, -9999.0).unwrap();
        let mut samples = vec![45.0; 500 * 500];
        samples[385 * 500 + 365] = 47.934_26;
        HeightGrid::new(params, samples).unwrap()
    }

    #[test]
    fn test_field_scenario() {
        let grid = field_grid();
        let mut los = LineOfSight::new(
            &grid,
            Coord {
                x: 265_365.0,
                y: 289_115.0,
            },
            0.0,
            -1.0,
            1.5,
        );
        let hit = los.calculate().unwrap();
        assert_approx_eq!(hit.eye_height, 49.434_26, 1e-9);
        assert_approx_eq!(hit.distance, 254.1, 0.05);
        assert_approx_eq!(hit.target.x, 265_365.0, 0.05);
        assert_approx_eq!(hit.target.y, 289_369.1, 0.05);
        assert_eq!(hit.surface_height, 45.0);
    }

    #[test]
    fn test_flat_surface_closed_form() {
        let grid = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);
        let hit = los.calculate().unwrap();
        // On a uniform plain the intersection distance collapses to
        // h / cos(90° + t), within one step.
        let tilt: C = -1.0;
        let expected = 1.5 / ((90.0 + tilt).to_radians()).cos();
        assert!((hit.distance - expected).abs() <= los.step_size());
        assert_eq!(hit.surface_height, 45.0);
        assert_eq!(hit.eye_height, 46.5);
    }

    #[test]
    fn test_repeat_calls_return_identical_results() {
        let grid = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);
        let first = los.calculate().unwrap();
        let second = los.calculate().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_setter_clears_the_cache() {
        let grid = flat_grid(200, 45.0);
        let other = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);

        // Each setter re-applies the value already in place; the cache
        // must drop regardless.
        los.calculate().unwrap();
        assert!(los.result.is_some());
        los.set_height_grid(&other);
        assert!(los.result.is_none());

        los.calculate().unwrap();
        los.set_position(Coord { x: 100.0, y: 100.0 });
        assert!(los.result.is_none());

        los.calculate().unwrap();
        los.set_bearing(0.0);
        assert!(los.result.is_none());

        los.calculate().unwrap();
        los.set_tilt(-1.0);
        assert!(los.result.is_none());

        los.calculate().unwrap();
        los.set_observer_height(1.5);
        assert!(los.result.is_none());

        los.calculate().unwrap();
        los.set_step_size(0.1);
        assert!(los.result.is_none());

        los.calculate().unwrap();
        los.set_max_scan(1000.0);
        assert!(los.result.is_none());
    }

    #[test]
    fn test_recompute_after_mutation_matches_fresh_engine() {
        let grid = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);
        let shallow = los.calculate().unwrap();
        los.set_tilt(-10.0);
        let steep = los.calculate().unwrap();
        assert!(steep.distance < shallow.distance);
        los.set_tilt(-1.0);
        assert_eq!(los.calculate().unwrap(), shallow);
    }

    #[test]
    fn test_eye_height_invariant_across_bearing_and_tilt() {
        let grid = flat_grid(200, 45.0);
        for (bearing, tilt) in [(0.0, -1.0), (90.0, -2.0), (180.0, -45.0), (270.0, -89.0)] {
            let mut los =
                LineOfSight::new(&grid, Coord { x: 100.0, y: 100.0 }, bearing, tilt, 1.5);
            assert_eq!(los.calculate().unwrap().eye_height, 46.5);
        }
    }

    #[test]
    fn test_steeper_tilt_never_lengthens_distance() {
        let grid = flat_grid(200, 45.0);
        let mut last = C::INFINITY;
        for i in 0..5 {
            let tilt = -1.0 - 5.0 * C::from(i);
            let mut los = LineOfSight::new(&grid, Coord { x: 100.0, y: 100.0 }, 0.0, tilt, 1.5);
            let hit = los.calculate().unwrap();
            assert!(hit.distance <= last);
            last = hit.distance;
        }
    }

    #[test]
    fn test_start_out_of_bounds_precedes_sampling() {
        let grid = flat_grid(10, 45.0);
        let mut los = LineOfSight::new(&grid, Coord { x: -5.0, y: -5.0 }, 0.0, -1.0, 1.5);
        // An out-of-bounds *sample* surfaces as SurfaceOutOfBounds, so
        // StartOutOfBounds here proves no sampling happened first.
        assert!(matches!(
            los.calculate(),
            Err(SightError::StartOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_march_leaving_the_grid_reports_axis() {
        let grid = flat_grid(50, 45.0);
        // Two units south of the north edge, looking north and barely
        // down: the ray walks off the grid long before intersecting.
        let mut los = LineOfSight::new(&grid, Coord { x: 25.0, y: 48.0 }, 0.0, -1.0, 1.5);
        match los.calculate() {
            Err(SightError::SurfaceOutOfBounds(oob)) => {
                assert_eq!(oob.axis, Axis::Y);
                assert!(oob.index < 0);
            }
            other => panic!("expected SurfaceOutOfBounds, got {other:?}"),
        }
    }

    #[test]
    fn test_upward_tilt_finds_no_intersection() {
        let grid = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);
        los.set_tilt(1.0);
        los.set_max_scan(50.0);
        assert_eq!(
            los.calculate(),
            Err(SightError::NoIntersection { scan_limit: 50.0 })
        );
    }

    #[test]
    fn test_unusable_step_sizes() {
        let grid = flat_grid(200, 45.0);
        for bad in [0.0, -0.5, C::NAN, C::INFINITY] {
            let mut los = center_observer(&grid);
            los.set_step_size(bad);
            assert!(matches!(los.calculate(), Err(SightError::StepSize(_))));
        }
    }

    #[test]
    fn test_tiny_step_size_exceeds_budget() {
        let grid = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);
        los.set_step_size(1e-9);
        assert!(matches!(los.calculate(), Err(SightError::Budget { .. })));
    }

    #[test]
    fn test_cancellation_flag_aborts_and_clears() {
        let grid = flat_grid(200, 45.0);
        let mut los = center_observer(&grid);
        let flag = Arc::new(AtomicBool::new(true));
        los.set_cancel_flag(Arc::clone(&flag));
        assert_eq!(los.calculate(), Err(SightError::Cancelled));
        flag.store(false, Ordering::Relaxed);
        assert!(los.calculate().is_ok());
    }

    #[test]
    fn test_march_starts_at_observer_height() {
        let grid = flat_grid(200, 45.0);
        // Looking almost straight down still reports the starting
        // distance, never anything nearer.
        let mut los = LineOfSight::new(&grid, Coord { x: 100.0, y: 100.0 }, 0.0, -89.0, 5.0);
        let hit = los.calculate().unwrap();
        assert_eq!(hit.distance, 5.0);
    }

    #[test]
    fn test_one_shot_matches_engine() {
        let grid = flat_grid(200, 45.0);
        let mut engine = center_observer(&grid);
        let one_shot =
            line_of_sight(&grid, Coord { x: 100.0, y: 100.0 }, 0.0, -1.0, 1.5).unwrap();
        assert_eq!(one_shot, engine.calculate().unwrap());
    }

    #[test]
    fn test_intersection_display() {
        let hit = Intersection {
            distance: 8.1,
            eye_height: 49.5,
            target: Coord {
                x: 265_365.0,
                y: 289_123.0,
            },
            surface_height: 45.0,
        };
        assert_eq!(
            hit.to_string(),
            "distance: 8.1, eye height: 49.5, intersect point: 265365,289123, intersect height: 45"
        );
    }
}
