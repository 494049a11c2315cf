//! Headless tour of both tessel crates.
//!
//! Usage: `tessel-studio [-v|--verbose] [METHOD] [GRID]`
//!
//! Solves a `GRID × GRID` Poisson problem with `METHOD` (default `Profile`),
//! then drives the graphics adapters through a full lifecycle on the GPU if
//! one is available, or on the recording device otherwise.

mod offscreen;
mod problems;
mod scene;

use anyhow::{Context, Result};
use tessel_gfx::device::{GpuInit, GraphicsDevice, RecordingDevice, WgpuDevice};
use tessel_gfx::logging::{init_logging, LoggingConfig};
use tessel_solve::{DVector, LinearSolver, Method, ProfileReport};

use scene::Scene;

const DEFAULT_GRID: usize = 16;

/// Command line, after flags are split from positional arguments.
#[derive(Debug, PartialEq)]
struct Args {
    verbose: bool,
    method: Method,
    grid: usize,
}

fn parse_args(raw: impl IntoIterator<Item = String>) -> Result<Args> {
    let (flags, positional): (Vec<String>, Vec<String>) =
        raw.into_iter().partition(|a| a.starts_with('-'));

    let mut verbose = false;
    for flag in &flags {
        match flag.as_str() {
            "-v" | "--verbose" => verbose = true,
            other => anyhow::bail!("unknown flag `{other}`"),
        }
    }

    let mut positional = positional.into_iter();
    let method = match positional.next() {
        Some(name) => name.parse::<Method>()?,
        None => Method::Profile,
    };
    let grid = match positional.next() {
        Some(n) => n.parse::<usize>().with_context(|| format!("invalid grid size `{n}`"))?,
        None => DEFAULT_GRID,
    };
    Ok(Args { verbose, method, grid })
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging(if args.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    });

    run_solver(args.method, args.grid)?;
    run_graphics()?;
    Ok(())
}

fn run_solver(method: Method, grid: usize) -> Result<()> {
    let a = problems::poisson_2d(grid).context("assembling Poisson matrix")?;
    let b = DVector::from_element(a.nrows(), 1.0);
    log::info!("poisson {grid}x{grid}: n = {}, nnz = {}", a.nrows(), a.nnz());

    let solver = LinearSolver::new(method);
    if method == Method::Profile {
        let report = solver.profile(&a, &b)?;
        print_profile(&report);
    } else {
        let solution = solver.solve_with_stats(&a, &b)?;
        let stats = &solution.stats;
        println!(
            "  {:<22} residual {:.2e}  {:?}",
            stats.method, stats.residual, stats.elapsed
        );
    }
    Ok(())
}

fn print_profile(report: &ProfileReport) {
    println!();
    println!(
        "  {:<22} {:>10} {:>12} {:>12} {:>12}",
        "method", "iters", "residual", "deviation", "time"
    );
    for entry in &report.entries {
        match &entry.outcome {
            Ok(stats) => println!(
                "  {:<22} {:>10} {:>12.2e} {:>12} {:>12}",
                entry.method,
                stats.iterations.map_or_else(|| "-".to_owned(), |n| n.to_string()),
                stats.residual,
                entry
                    .max_deviation
                    .map_or_else(|| "-".to_owned(), |d| format!("{d:.2e}")),
                format!("{:?}", stats.elapsed),
            ),
            Err(err) => println!("  {:<22} failed: {err}", entry.method),
        }
    }
    println!();
}

fn run_graphics() -> Result<()> {
    match WgpuDevice::new_blocking(GpuInit::default()) {
        Ok(mut gpu) => {
            let mut scene = lifecycle(&mut gpu)?;
            scene.render(&mut gpu)?;
            let entry = scene
                .pixel_entry_point()
                .context("pixel shader not loaded")?;
            offscreen::draw(&mut gpu, &entry)?;
            scene.shutdown(&mut gpu);
        }
        Err(err) => {
            log::warn!("no GPU available ({err:#}); using the recording device");
            let mut device = RecordingDevice::new();
            let mut scene = lifecycle(&mut device)?;
            scene.render(&mut device)?;
            log::info!("recorded draw: {:?}", device.draw());
            scene.shutdown(&mut device);
            log::info!("{} device calls recorded", device.calls().len());
        }
    }
    Ok(())
}

/// Builds the scene and walks it through resize and device-lost recovery.
fn lifecycle(device: &mut dyn GraphicsDevice) -> Result<Scene> {
    let mut scene = Scene::new(device).context("building scene")?;
    scene.render(device)?;
    scene.resize(device)?;
    scene.recover(device).context("recovering from device loss")?;
    Ok(scene)
}
