//! sectionalize - cut large flat meshes into grid sections
//!
//! Reads an OBJ file or a TOML scene manifest and writes the `.sctx` section
//! JSON plus the section meshes.

use anyhow::Result;
use clap::Parser;
use sectionalizer_cli::{run, Args};
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let outcome = run(&args)?;
    let report = &outcome.report;
    info!(
        "{}: {} sections on a {}x{} grid of {}x{}",
        report.base_name,
        report.section_count,
        report.grid.cell_count.0,
        report.grid.cell_count.1,
        report.grid.cell_size.x,
        report.grid.cell_size.y,
    );
    if let Some((section, material, count)) = &report.max_vertices {
        info!("Largest buffer: {count} vertices ({section}, {material})");
    }
    Ok(())
}
