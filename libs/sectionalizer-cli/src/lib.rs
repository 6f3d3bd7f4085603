//! # Sectionalizer CLI
//!
//! Argument parsing and the command flow behind the `sectionalize` binary:
//!
//! 1. load the scene from an OBJ file or a TOML manifest
//! 2. merge command-line overrides into the manifest settings
//! 3. run the sectionalizer, writing `<base>.sctx` into the asset directory
//! 4. write kept sections to `<base>_SECT.obj` beside the input

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use config::constants::{ASSETS_SUBDIR, SECT_SUFFIX};
use plane_sectionalizer::manifest::load_scene;
use plane_sectionalizer::scene::Scene;
use plane_sectionalizer::settings::{ModifierSettings, NumberOrSize, OutputMode, Rounding, SectionalizerSettings};
use plane_sectionalizer::{JsonStatus, RunReport};
use serde::de::{DeserializeOwned, IntoDeserializer};
use tile_mesh::io::{write_obj_file, ObjObject};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "sectionalize")]
#[command(about = "Cut a large flat mesh into grid sections and export them as .sctx JSON")]
#[command(version)]
pub struct Args {
    /// Scene manifest (.toml) or OBJ file
    pub input: PathBuf,

    /// Project root; the JSON goes to <root>/android/assets/bdx when it exists
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Cell count per axis, e.g. 4x4 (selects by-number mode)
    #[arg(long, value_parser = parse_pair::<u32>, conflicts_with = "size")]
    pub number: Option<(u32, u32)>,

    /// Cell size per axis, e.g. 16x16 (selects by-size mode)
    #[arg(long, value_parser = parse_pair::<f64>)]
    pub size: Option<(f64, f64)>,

    /// Parity of by-size cell counts: auto, even or odd
    #[arg(long, value_parser = parse_choice::<Rounding>)]
    pub rounding: Option<Rounding>,

    /// Ignore modifier stacks
    #[arg(long)]
    pub no_modifiers: bool,

    /// Modifier visibility to evaluate: preview or render
    #[arg(long, value_parser = parse_choice::<ModifierSettings>)]
    pub modifiers: Option<ModifierSettings>,

    /// Simplify the mesh before cutting
    #[arg(long)]
    pub decimate: bool,

    /// Planar dissolve angle limit in degrees
    #[arg(long)]
    pub angle_limit: Option<f64>,

    /// Fraction of triangles kept by edge collapse
    #[arg(long)]
    pub collapse_ratio: Option<f64>,

    /// What to produce: json_only, sections_only or json_and_sections
    #[arg(long, value_parser = parse_choice::<OutputMode>)]
    pub output: Option<OutputMode>,

    /// Round exported floats to this many decimals
    #[arg(long, value_name = "DIGITS")]
    pub approximate: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses `AxB` (or `A,B`) into a pair.
fn parse_pair<T: std::str::FromStr>(s: &str) -> std::result::Result<(T, T), String> {
    let (a, b) = s
        .split_once(['x', 'X', ','])
        .ok_or_else(|| format!("expected two values like 4x4, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|_| format!("invalid number '{}' in '{s}'", v.trim()))
    };
    Ok((parse(a)?, parse(b)?))
}

/// Parses a settings enum by its manifest spelling.
fn parse_choice<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> = s.into_deserializer();
    T::deserialize(deserializer).map_err(|e| e.to_string())
}

impl Args {
    /// Applies the command-line options on top of `settings`.
    pub fn apply_overrides(&self, settings: &mut SectionalizerSettings) {
        if let Some(number) = self.number {
            settings.number_or_size = NumberOrSize::ByNumber;
            settings.number = number;
        }
        if let Some(size) = self.size {
            settings.number_or_size = NumberOrSize::BySize;
            settings.size = size;
        }
        if let Some(rounding) = self.rounding {
            settings.rounding = rounding;
        }
        if self.no_modifiers {
            settings.apply_modifiers = false;
        }
        if let Some(modifiers) = self.modifiers {
            settings.modifier_settings = modifiers;
        }
        if self.decimate {
            settings.decimate = true;
        }
        if let Some(degrees) = self.angle_limit {
            settings.decimate_angle_limit = degrees.to_radians();
        }
        if let Some(ratio) = self.collapse_ratio {
            settings.decimate_collapse_ratio = ratio;
        }
        if let Some(output) = self.output {
            settings.output = output;
        }
        if let Some(digits) = self.approximate {
            settings.approximate = true;
            settings.approx_digits = digits;
        }
    }
}

/// Directory holding the input file.
fn input_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<root>/android/assets/bdx` when it exists, otherwise the input's
/// directory.
pub fn resolve_assets_root(project_root: Option<&Path>, input: &Path) -> PathBuf {
    if let Some(root) = project_root {
        let assets = ASSETS_SUBDIR.iter().fold(root.to_path_buf(), |p, part| p.join(part));
        if assets.is_dir() {
            return assets;
        }
    }
    let fallback = input_dir(input);
    warn!(
        "no project asset directory found; writing next to the input in {}",
        fallback.display()
    );
    fallback
}

/// Writes the kept sections, in world space, to one OBJ file.
fn write_sections(scene: &Scene, report: &RunReport, path: &Path) -> Result<()> {
    let objects: Vec<ObjObject> = report
        .sections
        .iter()
        .filter_map(|&id| scene.get(id))
        .map(|o| ObjObject::new(o.name.clone(), o.world_mesh()))
        .collect();
    write_obj_file(path, &objects).with_context(|| format!("failed to write {}", path.display()))
}

/// Result of one command run.
#[derive(Debug)]
pub struct Outcome {
    pub report: RunReport,
    /// OBJ file with the kept sections, if any were kept.
    pub sections_file: Option<PathBuf>,
}

/// Runs the full command.
pub fn run(args: &Args) -> Result<Outcome> {
    let loaded = load_scene(&args.input)
        .with_context(|| format!("failed to load scene from {}", args.input.display()))?;
    let mut settings = loaded.settings.unwrap_or_default();
    args.apply_overrides(&mut settings);

    let assets_root = resolve_assets_root(args.project_root.as_deref(), &args.input);
    let mut scene = loaded.scene;
    let report = plane_sectionalizer::run(&mut scene, &loaded.selection, &settings, &assets_root)
        .context("sectionalizing failed")?;

    match &report.json {
        JsonStatus::Written(path) => info!("Wrote {}", path.display()),
        JsonStatus::Rejected(err) => warn!("JSON export skipped: {err}"),
        JsonStatus::NotRequested => {}
    }

    let sections_file = if report.sections.is_empty() {
        None
    } else {
        let path = input_dir(&args.input).join(format!("{}{SECT_SUFFIX}.obj", report.base_name));
        write_sections(&scene, &report, &path)?;
        info!("Wrote {} sections to {}", report.sections.len(), path.display());
        Some(path)
    };

    Ok(Outcome { report, sections_file })
}
