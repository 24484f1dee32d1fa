//! Esri ASCII grid (`.asc`) elevation models.
//!
//! A [`HeightGrid`] owns a rectangular block of elevation samples read
//! from the six-line-header ASCII exchange format and answers
//! bounds-checked height lookups for world coordinates. Lookups sample
//! the nearest cell; there is no interpolation within cells.

mod error;
mod reader;

pub use crate::error::{AscGridError, Axis, OutOfBounds};
use geo::geometry::Coord;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    sync::OnceLock,
};

/// Base floating point type used for all coordinates and samples.
///
/// This could be a generic parameter, but the grids this crate is fed
/// are small enough that `f32` storage savings never matter, and a
/// fixed scalar keeps the API simple.
pub type C = f64;

/// Immutable description of a rectangular height grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridParams {
    /// World units covered by one cell edge.
    cell_size: C,

    /// Number of sample columns.
    cols: usize,

    /// Number of sample rows.
    rows: usize,

    /// Easting of the grid's lower-left corner.
    x_corner: C,

    /// Northing of the grid's lower-left corner.
    y_corner: C,

    /// Sentinel elevation marking missing samples.
    no_data: C,
}

impl GridParams {
    /// Validates and builds grid parameters.
    ///
    /// `cell_size` must be positive and finite; `cols` and `rows` must
    /// be non-zero.
    pub fn new(
        cell_size: C,
        cols: usize,
        rows: usize,
        x_corner: C,
        y_corner: C,
        no_data: C,
    ) -> Result<Self, AscGridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(AscGridError::Params("cell size must be positive and finite"));
        }
        if cols == 0 || rows == 0 {
            return Err(AscGridError::Params("column and row counts must be non-zero"));
        }
        Ok(Self {
            cell_size,
            cols,
            rows,
            x_corner,
            y_corner,
            no_data,
        })
    }

    pub fn cell_size(&self) -> C {
        self.cell_size
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn x_corner(&self) -> C {
        self.x_corner
    }

    pub fn y_corner(&self) -> C {
        self.y_corner
    }

    pub fn no_data(&self) -> C {
        self.no_data
    }
}

/// A read-only surface model: grid parameters plus `cols × rows`
/// elevation samples.
///
/// Row 0 is the northernmost stored line. The sample store's outer
/// dimension is sized by the *column* count and the inner by the *row*
/// count — an axis quirk inherited from the exchange layout, preserved
/// by [`cell_height`](Self::cell_height) and only observable on
/// non-square grids.
#[derive(Debug)]
pub struct HeightGrid {
    params: GridParams,

    /// Elevation samples in file order, northernmost line first.
    samples: Box<[C]>,

    /// Lazily computed (min, max) over samples that are not `no_data`.
    extremes: OnceLock<(C, C)>,
}

impl HeightGrid {
    /// Builds a grid from already-parsed parameters and samples.
    ///
    /// `samples` is consumed in file order (northernmost line first)
    /// and must hold exactly `cols * rows` values.
    pub fn new(params: GridParams, samples: Vec<C>) -> Result<Self, AscGridError> {
        if samples.len() != params.cols() * params.rows() {
            return Err(AscGridError::Params("sample count must equal cols * rows"));
        }
        Ok(Self {
            params,
            samples: samples.into_boxed_slice(),
            extremes: OnceLock::new(),
        })
    }

    /// Returns a grid parsed from the ASCII file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AscGridError> {
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Returns a grid parsed from an ASCII-format stream.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, AscGridError> {
        crate::reader::read_grid(reader)
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Returns the number of samples in this grid.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns the cell column index containing `easting`.
    pub fn x_cell(&self, easting: C) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let cell = ((easting - self.params.x_corner) / self.params.cell_size).floor() as i64;
        cell
    }

    /// Returns the cell row index containing `northing`.
    ///
    /// Indexing is reversed: row 0 holds the northernmost samples while
    /// world northing grows northward.
    pub fn y_cell(&self, northing: C) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let cell = ((northing - self.params.y_corner) / self.params.cell_size).ceil() as i64;
        self.params.rows as i64 - cell
    }

    /// Returns the sample at column `x`, row `y`.
    ///
    /// `y` is checked against the column count and `x` against the row
    /// count: the store's outer dimension is sized by `cols` and the
    /// inner by `rows`, a quirk kept from the exchange layout.
    pub fn cell_height(&self, x: i64, y: i64) -> Result<C, OutOfBounds> {
        if y < 0 || y >= self.params.cols as i64 {
            return Err(OutOfBounds {
                axis: Axis::Y,
                index: y,
            });
        }
        if x < 0 || x >= self.params.rows as i64 {
            return Err(OutOfBounds {
                axis: Axis::X,
                index: x,
            });
        }
        #[allow(clippy::cast_sign_loss)]
        let index = y as usize * self.params.rows + x as usize;
        Ok(self.samples[index])
    }

    /// Returns the sampled elevation at the given world coordinates.
    pub fn height_at(&self, coord: Coord<C>) -> Result<C, OutOfBounds> {
        self.cell_height(self.x_cell(coord.x), self.y_cell(coord.y))
    }

    /// Returns whether both cell indices for `coord` fall within the
    /// grid extents.
    pub fn contains(&self, coord: Coord<C>) -> bool {
        self.height_at(coord).is_ok()
    }

    /// Returns the lowest elevation sample that is not `no_data`.
    pub fn min_elevation(&self) -> C {
        self.extremes().0
    }

    /// Returns the highest elevation sample that is not `no_data`.
    pub fn max_elevation(&self) -> C {
        self.extremes().1
    }

    /// Returns an iterator over this grid's samples.
    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        (0..self.samples.len()).map(|index| Sample { grid: self, index })
    }
}

/// Private API.
impl HeightGrid {
    fn extremes(&self) -> (C, C) {
        *self.extremes.get_or_init(|| {
            let no_data = self.params.no_data;
            let mut min = C::INFINITY;
            let mut max = C::NEG_INFINITY;
            for &sample in &self.samples[..] {
                if sample == no_data {
                    continue;
                }
                min = min.min(sample);
                max = max.max(sample);
            }
            if min > max {
                // Every sample is no_data.
                (no_data, no_data)
            } else {
                (min, max)
            }
        })
    }
}

/// One elevation sample of a [`HeightGrid`].
pub struct Sample<'a> {
    /// The parent grid this sample belongs to.
    grid: &'a HeightGrid,

    /// Index into the parent's sample store.
    index: usize,
}

impl Sample<'_> {
    pub fn elevation(&self) -> C {
        self.grid.samples[self.index]
    }

    /// Returns this sample's (column, row) cell indices.
    pub fn cell(&self) -> (i64, i64) {
        let stride = self.grid.params.rows;
        #[allow(clippy::cast_possible_wrap)]
        let cell = ((self.index % stride) as i64, (self.index / stride) as i64);
        cell
    }

    /// Returns the world coordinates of this sample's cell lower-left
    /// corner.
    pub fn coord(&self) -> Coord<C> {
        let params = &self.grid.params;
        let (x, y) = self.cell();
        #[allow(clippy::cast_precision_loss)]
        let coord = Coord {
            x: params.x_corner + x as C * params.cell_size,
            y: params.y_corner + (params.rows as i64 - 1 - y) as C * params.cell_size,
        };
        coord
    }
}
