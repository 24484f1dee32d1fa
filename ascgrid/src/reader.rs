//! Esri ASCII grid parsing.
//!
//! The exchange format is a six-line labelled header (column count, row
//! count, lower-left easting and northing, cell size, no-data sentinel)
//! followed by `rows` lines of `cols` whitespace-separated elevation
//! values, northernmost line first.

use crate::{error::AscGridError, GridParams, HeightGrid, C};
use std::io::BufRead;

/// Expected header labels, in file order. Matched case-insensitively.
const HEADER_LABELS: [&str; 6] = [
    "ncols",
    "nrows",
    "xllcorner",
    "yllcorner",
    "cellsize",
    "NODATA_value",
];

pub(crate) fn read_grid<R: BufRead>(reader: R) -> Result<HeightGrid, AscGridError> {
    let mut lines = reader.lines();

    let mut header = [0.0 as C; 6];
    for (line_no, (slot, label)) in header.iter_mut().zip(HEADER_LABELS).enumerate() {
        let mk_err = || AscGridError::Header {
            line: line_no + 1,
            expected: label,
        };
        let line = lines.next().transpose()?.ok_or_else(mk_err)?;
        *slot = parse_header_value(&line, label).ok_or_else(mk_err)?;
    }

    let [cols, rows, x_corner, y_corner, cell_size, no_data] = header;
    if cols.fract() != 0.0 || rows.fract() != 0.0 || cols < 1.0 || rows < 1.0 {
        return Err(AscGridError::Params("ncols and nrows must be positive integers"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (cols, rows) = (cols as usize, rows as usize);
    let params = GridParams::new(cell_size, cols, rows, x_corner, y_corner, no_data)?;

    let mut samples = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        let line = lines.next().transpose()?.ok_or(AscGridError::Truncated {
            expected: rows,
            got: row,
        })?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != cols {
            return Err(AscGridError::Dimensions {
                row,
                expected: cols,
                got: tokens.len(),
            });
        }
        for (col, token) in tokens.iter().enumerate() {
            let value = token
                .parse::<C>()
                .map_err(|_| AscGridError::Value { row, col })?;
            samples.push(value);
        }
    }

    HeightGrid::new(params, samples)
}

/// Extracts the value from a `label value` header line, or `None` if
/// the label does not match.
fn parse_header_value(line: &str, label: &str) -> Option<C> {
    let mut parts = line.split_whitespace();
    let found = parts.next()?;
    if !found.eq_ignore_ascii_case(label) {
        return None;
    }
    let value = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(value)
}
