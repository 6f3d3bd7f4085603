//! # Sectionalizer Pipeline
//!
//! Cuts the selected objects into one section per grid cell.
//!
//! ## Flow
//!
//! ```text
//! selection ─► bake + join ─► working copy (grid-local)
//!           ─► loose parts ─► multisect ─► pieces ─► cells ─► sections
//! ```
//!
//! [`Sectionalizer::new`] checks every precondition and computes the baked
//! mesh and the grid without touching the scene. [`Sectionalizer::run`] then
//! executes the [`StagePlan`]. Temporaries live in a [`TempScope`] and are
//! removed on every exit path; only the sections stay in the scene.
//!
//! Working coordinates are grid-local: the working copy is shifted by the grid
//! origin offset, sections are centred on their cell, and the offset is added
//! back at the end.

mod stage;


use std::collections::BTreeMap;
use std::mem;

use config::constants::{
    approx_zero, format_id, MIN_ID_WIDTH, PART_SUFFIX, SECT_SUFFIX, TEMP_SUFFIX, WELD_DISTANCE,
};
use glam::DVec3;
use tile_mesh::ops::{
    beautify_fill, bisect_plane, calc_split_normals, collapse_edges, dissolve_planar,
    remove_doubles, separate_loose, set_custom_normals_from_vertices, split_edges,
    transfer_normals_with, triangulate, Axis, Plane,
};
use tile_mesh::{Mesh, SpatialIndex};
use tracing::debug;

pub use stage::{Stage, StagePlan};

use crate::error::{Result, SectionalizeError};
use crate::grid::GridSpec;
use crate::profiler::Profiler;
use crate::scene::{Object, ObjectId, Scene, TempScope, Transform};
use crate::settings::SectionalizerSettings;

/// Beautify accepts any pair of faces.
const BEAUTIFY_ANGLE_LIMIT: f64 = std::f64::consts::PI;

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct Sectioned {
    /// Sections in id order.
    pub sections: Vec<ObjectId>,
    pub grid: GridSpec,
}

/// A prepared sectionalizer run.
pub struct Sectionalizer<'a> {
    scene: &'a mut Scene,
    settings: &'a SectionalizerSettings,
    base_name: String,
    baked: Mesh,
    grid: GridSpec,
    plan: StagePlan,
    profiler: Profiler,
}

impl<'a> Sectionalizer<'a> {
    /// Validates the inputs and prepares the run.
    ///
    /// The first selected object names the sections.
    ///
    /// # Errors
    ///
    /// Precondition errors only; the scene is never modified here.
    pub fn new(
        scene: &'a mut Scene,
        selection: &[ObjectId],
        settings: &'a SectionalizerSettings,
    ) -> Result<Self> {
        let profiler = Profiler::new();
        settings.validate()?;

        let first = *selection.first().ok_or(SectionalizeError::NoActiveObject)?;
        let mut baked = Mesh::new();
        for &id in selection {
            let object = scene
                .get(id)
                .ok_or_else(|| SectionalizeError::ObjectNotFound(id.to_string()))?;
            if object.mesh.face_count() == 0 {
                return Err(SectionalizeError::NoMeshData(object.name.clone()));
            }
            let evaluated = object.evaluated_mesh(settings.apply_modifiers, settings.modifier_settings);
            baked.merge(&evaluated);
        }
        let base_name = scene.get(first).map(|o| o.name.clone()).unwrap_or_default();

        let dimensions = baked.dimensions().truncate();
        let center = baked.median_center().truncate();
        let grid = GridSpec::new(settings, dimensions)?.with_origin(center);
        let (min, max) = baked.bounding_box();
        let origin = grid.origin_offset;
        let grid = grid.fit_bounds(min.truncate() - origin, max.truncate() - origin);

        debug!(
            base = %base_name,
            cells = ?grid.cell_count,
            size = ?grid.cell_size,
            offset = ?grid.origin_offset,
            "grid prepared"
        );

        Ok(Self {
            scene,
            settings,
            base_name,
            baked,
            grid,
            plan: StagePlan::from_settings(settings),
            profiler,
        })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    /// Replaces the stage plan.
    pub fn with_plan(mut self, plan: StagePlan) -> Self {
        self.plan = plan;
        self
    }

    /// Runs every enabled stage.
    ///
    /// # Errors
    ///
    /// Any error of a stage other than a skipped bisect. Temporaries are
    /// removed before returning.
    pub fn run(self) -> Result<Sectioned> {
        let Sectionalizer {
            scene,
            settings,
            base_name,
            baked,
            grid,
            plan,
            profiler,
        } = self;

        let mut run = Run {
            scope: TempScope::new(scene),
            settings,
            grid: &grid,
            base_name: &base_name,
            baked: Some(baked),
            current: Vec::new(),
            cells: BTreeMap::new(),
            sections: Vec::new(),
        };
        for stage in plan.enabled() {
            profiler.log(stage.label());
            run.execute(stage)?;
        }
        let sections = run.finish();
        profiler.log("Sectionalizing done");

        Ok(Sectioned { sections, grid })
    }
}

// =============================================================================
// RUN STATE
// =============================================================================

/// A temporary object together with the object its normals come from.
#[derive(Debug, Clone, Copy)]
struct Piece {
    id: ObjectId,
    source: ObjectId,
}

struct Run<'s, 'a> {
    scope: TempScope<'s>,
    settings: &'a SectionalizerSettings,
    grid: &'a GridSpec,
    base_name: &'a str,
    baked: Option<Mesh>,
    /// Output of the latest geometry stage.
    current: Vec<Piece>,
    /// Pieces per cell index.
    cells: BTreeMap<usize, Vec<ObjectId>>,
    sections: Vec<ObjectId>,
}

impl Run<'_, '_> {
    fn execute(&mut self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Bake => self.bake(),
            Stage::Simplify => self.simplify(),
            Stage::Separate => self.separate(),
            Stage::Multisect => self.multisect(),
            Stage::Reseparate => self.reseparate(),
            Stage::FixNormals => self.fix_normals(),
            Stage::Classify => self.classify(),
            Stage::Merge => self.merge(),
            Stage::FinalNormals => self.final_normals(),
            Stage::Reposition => self.reposition(),
            Stage::Cleanup => {
                let removed = self.scope.clear();
                debug!(removed, "temporaries removed");
                Ok(())
            }
        }
    }

    /// Ends the run; dropping the scope removes what is left.
    fn finish(self) -> Vec<ObjectId> {
        self.sections
    }

    fn object(&self, id: ObjectId) -> Result<&Object> {
        self.scope
            .get(id)
            .ok_or_else(|| SectionalizeError::ObjectNotFound(id.to_string()))
    }

    fn mesh_mut(&mut self, id: ObjectId) -> Result<&mut Mesh> {
        self.scope
            .get_mut(id)
            .map(|o| &mut o.mesh)
            .ok_or_else(|| SectionalizeError::ObjectNotFound(id.to_string()))
    }

    fn temp_name(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.base_name)
    }

    fn add_temps(&mut self, meshes: Vec<Mesh>, suffix: &str) -> Vec<ObjectId> {
        let name = self.temp_name(suffix);
        meshes
            .into_iter()
            .map(|mesh| self.scope.add_temp(Object::new(name.clone(), mesh)))
            .collect()
    }

    // =========================================================================
    // STAGES
    // =========================================================================

    fn bake(&mut self) -> Result<()> {
        let Some(mut mesh) = self.baked.take() else {
            return Ok(());
        };
        mesh.translate(-self.grid.origin_offset.extend(0.0));
        let name = self.temp_name(TEMP_SUFFIX);
        let id = self.scope.add_temp(Object::new(name, mesh));
        self.current = vec![Piece { id, source: id }];
        Ok(())
    }

    fn simplify(&mut self) -> Result<()> {
        let angle = self.settings.decimate_angle_limit;
        let ratio = self.settings.decimate_collapse_ratio;
        for piece in self.current.clone() {
            let mesh = self.mesh_mut(piece.id)?;
            let before = mesh.face_count();

            triangulate(mesh);
            beautify_fill(mesh, BEAUTIFY_ANGLE_LIMIT);
            let dissolved = dissolve_planar(mesh, angle);
            triangulate(mesh);
            beautify_fill(mesh, BEAUTIFY_ANGLE_LIMIT);
            let collapsed = collapse_edges(mesh, ratio);
            triangulate(mesh);
            beautify_fill(mesh, BEAUTIFY_ANGLE_LIMIT);
            calc_split_normals(mesh);

            debug!(before, after = mesh.face_count(), dissolved, collapsed, "simplified");
        }
        Ok(())
    }

    /// Loose parts become their own normal sources.
    fn separate(&mut self) -> Result<()> {
        let mut parts = Vec::new();
        for piece in mem::take(&mut self.current) {
            let meshes = separate_loose(&self.object(piece.id)?.mesh);
            let ids = self.add_temps(meshes, TEMP_SUFFIX);
            parts.extend(ids.into_iter().map(|id| Piece { id, source: id }));
        }
        debug!(parts = parts.len(), "separated loose parts");
        self.current = parts;
        Ok(())
    }

    fn multisect(&mut self) -> Result<()> {
        let planes: Vec<Plane> = [Axis::X, Axis::Y]
            .into_iter()
            .flat_map(|axis| {
                self.grid
                    .cut_positions(axis)
                    .into_iter()
                    .map(move |offset| Plane::axis_aligned(axis, offset))
            })
            .collect();

        let mut cut = Vec::with_capacity(self.current.len());
        for piece in mem::take(&mut self.current) {
            let mut mesh = self.object(piece.id)?.mesh.clone();
            let mut cuts = 0usize;
            for plane in &planes {
                match bisect_plane(&mut mesh, plane) {
                    Ok(edges) => {
                        split_edges(&mut mesh, &edges);
                        cuts += 1;
                    }
                    Err(err) => debug!(normal = ?plane.normal(), w = plane.w(), "bisect skipped: {err}"),
                }
            }
            debug!(part = %piece.source, cuts, "multisected");
            let name = self.temp_name(PART_SUFFIX);
            let id = self.scope.add_temp(Object::new(name, mesh));
            cut.push(Piece {
                id,
                source: piece.source,
            });
        }
        self.current = cut;
        Ok(())
    }

    /// Cut objects are replaced by their pieces.
    fn reseparate(&mut self) -> Result<()> {
        let mut pieces = Vec::new();
        for piece in mem::take(&mut self.current) {
            let meshes = separate_loose(&self.object(piece.id)?.mesh);
            let ids = self.add_temps(meshes, PART_SUFFIX);
            pieces.extend(ids.into_iter().map(|id| Piece {
                id,
                source: piece.source,
            }));
            if piece.id != piece.source {
                self.scope.remove(piece.id);
            }
        }
        debug!(pieces = pieces.len(), "separated sections");
        self.current = pieces;
        Ok(())
    }

    fn fix_normals(&mut self) -> Result<()> {
        // Pieces of one source are contiguous; index each source once.
        let mut source: Option<(ObjectId, Mesh, SpatialIndex)> = None;
        for piece in self.current.clone() {
            if source.as_ref().map(|(id, ..)| *id) != Some(piece.source) {
                let mesh = self.object(piece.source)?.mesh.clone();
                let index = SpatialIndex::from_mesh(&mesh);
                source = Some((piece.source, mesh, index));
            }
            let Some((_, source_mesh, index)) = source.as_ref() else {
                continue;
            };

            let mesh = self.mesh_mut(piece.id)?;
            remove_doubles(mesh, WELD_DISTANCE);
            triangulate(mesh);
            set_custom_normals_from_vertices(mesh);
            transfer_normals_with(mesh, source_mesh, index, 1.0);
        }
        Ok(())
    }

    fn classify(&mut self) -> Result<()> {
        for piece in mem::take(&mut self.current) {
            let object = self.object(piece.id)?;
            let center = object.mesh.median_center() + object.transform.location;
            match self.grid.find_cell(center.truncate()) {
                Some(cell) => self.cells.entry(cell).or_default().push(piece.id),
                None => {
                    debug!(piece = %piece.id, ?center, "piece outside every cell, dropped");
                    self.scope.remove(piece.id);
                }
            }
        }
        Ok(())
    }

    fn merge(&mut self) -> Result<()> {
        let centers = self.grid.cell_centers();
        let width = self.grid.cell_id_width().max(MIN_ID_WIDTH);

        for (cell, members) in mem::take(&mut self.cells) {
            let Some(center) = centers.get(cell).map(|c| c.extend(0.0)) else {
                continue;
            };
            let mut joined = Mesh::new();
            let mut joined_count = 0usize;
            for id in members {
                let object = self.object(id)?;
                if object.mesh.face_count() == 0 {
                    continue;
                }
                joined.merge(&object.world_mesh());
                joined_count += 1;
            }
            if joined_count == 0 {
                debug!(cell, "cell has no faces, skipped");
                continue;
            }

            joined.translate(-center);
            let name = format!(
                "{}{SECT_SUFFIX}.{}",
                self.base_name,
                format_id(self.sections.len(), width)
            );
            let object = Object::new(name, joined).with_transform(Transform::from_location(center));
            let id = self.scope.add_persistent(object);
            debug!(cell, section = %id, parts = joined_count, "section created");
            self.sections.push(id);
        }
        Ok(())
    }

    fn final_normals(&mut self) -> Result<()> {
        for id in self.sections.clone() {
            calc_split_normals(self.mesh_mut(id)?);
        }
        Ok(())
    }

    fn reposition(&mut self) -> Result<()> {
        let offset: DVec3 = self.grid.origin_offset.extend(0.0);
        if approx_zero(offset.length()) {
            return Ok(());
        }
        for id in self.sections.clone() {
            if let Some(object) = self.scope.get_mut(id) {
                object.transform.location += offset;
            }
        }
        Ok(())
    }
}
