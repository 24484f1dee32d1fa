use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand};
use geo::geometry::Coord;
use std::{path::PathBuf, str::FromStr};

/// Estimate the ground point first struck by an observer's line of
/// sight over an ASCII grid elevation model.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Path to the Esri ASCII grid file.
    #[arg(short, long)]
    pub grid: PathBuf,

    /// Observer "easting,northing" in world coordinates.
    #[arg(short, long)]
    pub position: EastNorth,

    /// Compass bearing in degrees, 0 = north, clockwise.
    #[arg(short, long)]
    pub bearing: f64,

    /// Tilt in degrees from horizontal; negative points at the ground.
    #[arg(short, long, allow_hyphen_values = true)]
    pub tilt: f64,

    /// Observer height above the surface, in world units.
    #[arg(long, default_value_t = 1.5)]
    pub height: f64,

    /// March increment, in world units.
    #[arg(long, default_value_t = sightline::STEP_SIZE)]
    pub step: f64,

    /// Scan limit, in world units.
    #[arg(long, default_value_t = sightline::VIEW_DISTANCE)]
    pub max_scan: f64,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Debug, Copy)]
pub struct EastNorth(pub Coord<f64>);

impl FromStr for EastNorth {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (easting, northing) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid easting,northing"))?;
        let x = f64::from_str(easting.trim())?;
        let y = f64::from_str(northing.trim())?;
        Ok(Self(Coord { x, y }))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print a human-readable report to stdout.
    Report,

    /// Print the result as JSON to stdout.
    Json,
}
