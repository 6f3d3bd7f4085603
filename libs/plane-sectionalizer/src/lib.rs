//! # Plane Sectionalizer
//!
//! Cuts large flat meshes into a grid of tiles and exports per-tile vertex
//! buffers for the game engine.
//!
//! ## Architecture
//!
//! ```text
//! manifest / OBJ ─► Scene ─► Sectionalizer (grid + pipeline) ─► sections
//!                                                            └─► extract ─► .sctx JSON
//! ```
//!
//! - [`grid`]: cell count, size and origin offset
//! - [`pipeline`]: bake, multisect, classify and merge
//! - [`extract`] / [`export`]: per-material vertex buffers and the JSON file
//! - [`scene`]: objects, transforms, modifiers and scoped temporaries
//!
//! ## Usage
//!
//! ```rust
//! use glam::DVec2;
//! use plane_sectionalizer::scene::{Object, Scene};
//! use plane_sectionalizer::settings::{OutputMode, SectionalizerSettings};
//! use tile_mesh::primitives::create_grid;
//!
//! let mut scene = Scene::new();
//! let plane = scene.add(Object::new("Plane", create_grid(DVec2::splat(32.0), (1, 1)).unwrap()));
//! let settings = SectionalizerSettings {
//!     output: OutputMode::SectionsOnly,
//!     ..Default::default()
//! };
//!
//! let report = plane_sectionalizer::run(&mut scene, &[plane], &settings, std::path::Path::new(".")).unwrap();
//! assert_eq!(report.sections.len(), 4);
//! ```

pub mod error;
pub mod export;
pub mod extract;
pub mod grid;
pub mod manifest;
pub mod pipeline;
pub mod profiler;
pub mod scene;
pub mod settings;

use std::path::{Path, PathBuf};

use config::constants::SECTIONS_EXTENSION;

pub use error::{Result, SectionalizeError};
pub use grid::GridSpec;
pub use pipeline::{Sectionalizer, Sectioned, Stage, StagePlan};
pub use settings::SectionalizerSettings;

use crate::export::export_sections;
use crate::extract::{extract_sections, max_vertex_count};
use crate::profiler::Profiler;
use crate::scene::{ObjectId, Scene};

/// What happened to the JSON file.
#[derive(Debug)]
pub enum JsonStatus {
    Written(PathBuf),
    /// The output mode writes no JSON.
    NotRequested,
    /// The vertex budget was exceeded; nothing was written.
    Rejected(SectionalizeError),
}

/// Outcome of [`run`].
#[derive(Debug)]
pub struct RunReport {
    /// Name of the first selected object.
    pub base_name: String,
    /// Sections left in the scene; empty in json-only mode.
    pub sections: Vec<ObjectId>,
    /// Sections produced, kept or not.
    pub section_count: usize,
    pub grid: GridSpec,
    pub json: JsonStatus,
    /// Largest per-material vertex count as (section, material, count).
    pub max_vertices: Option<(String, String, usize)>,
}

/// Sectionalizes `selection` and writes `<assets_root>/<base>.sctx` when the
/// output mode asks for JSON.
///
/// A budget overflow is reported in [`RunReport::json`], not as an error. In
/// json-only mode the sections are removed from the scene afterwards, also
/// when the export was rejected or failed.
///
/// # Errors
///
/// Precondition, pipeline and I/O errors.
pub fn run(
    scene: &mut Scene,
    selection: &[ObjectId],
    settings: &SectionalizerSettings,
    assets_root: &Path,
) -> Result<RunReport> {
    let sectionalizer = Sectionalizer::new(scene, selection, settings)?;
    let base_name = sectionalizer.base_name().to_string();
    let Sectioned { sections, grid } = sectionalizer.run()?;

    let mut max_vertices = None;
    let json = if settings.output.writes_json() {
        let profiler = Profiler::new();
        profiler.log("Extracting section data");
        let exported = extract_sections(scene, &sections, settings.rounding_digits()).and_then(|extracted| {
            max_vertices = max_vertex_count(&extracted).map(|(s, m, c)| (s.to_string(), m.to_string(), c));
            profiler.log("Exporting json file");
            let path = assets_root.join(format!("{base_name}.{SECTIONS_EXTENSION}"));
            match export_sections(&path, &extracted, &grid) {
                Ok(()) => Ok(JsonStatus::Written(path)),
                Err(err @ SectionalizeError::VertexBudgetExceeded { .. }) => Ok(JsonStatus::Rejected(err)),
                Err(err) => Err(err),
            }
        });
        Some(exported)
    } else {
        None
    };

    let section_count = sections.len();
    let sections = if settings.output.keeps_sections() {
        sections
    } else {
        for &id in &sections {
            scene.remove(id);
        }
        Vec::new()
    };

    let json = match json {
        Some(result) => result?,
        None => JsonStatus::NotRequested,
    };

    Ok(RunReport {
        base_name,
        sections,
        section_count,
        grid,
        json,
        max_vertices,
    })
}
