mod options;

use anyhow::{Context, Error as AnyError};
use ascgrid::HeightGrid;
use clap::Parser;
use log::debug;
use options::{Cli, Command as CliCmd};
use serde::Serialize;
use sightline::{Intersection, LineOfSight};

fn main() -> Result<(), AnyError> {
    env_logger::init();

    let Cli {
        grid,
        position,
        bearing,
        tilt,
        height,
        step,
        max_scan,
        cmd,
    } = Cli::parse();

    let grid = HeightGrid::load(&grid).with_context(|| format!("loading {}", grid.display()))?;
    debug!(
        "grid: {}x{} cells of {}, elevation {}..{}",
        grid.params().cols(),
        grid.params().rows(),
        grid.params().cell_size(),
        grid.min_elevation(),
        grid.max_elevation()
    );

    let mut engine = LineOfSight::new(&grid, position.0, bearing, tilt, height);
    engine.set_step_size(step);
    engine.set_max_scan(max_scan);
    let hit = engine.calculate()?;

    match cmd {
        CliCmd::Report => println!("{hit}"),
        CliCmd::Json => print_json(&hit)?,
    }
    Ok(())
}

fn print_json(hit: &Intersection) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonHit {
        distance: f64,
        eye_height: f64,
        target: [f64; 2],
        surface_height: f64,
    }

    let json = serde_json::to_string(&JsonHit {
        distance: hit.distance,
        eye_height: hit.eye_height,
        target: [hit.target.x, hit.target.y],
        surface_height: hit.surface_height,
    })?;
    println!("{json}");
    Ok(())
}
