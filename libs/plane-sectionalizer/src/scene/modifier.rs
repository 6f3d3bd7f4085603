//! # Modifier Stack
//!
//! Non-destructive mesh modifiers evaluated in stack order when an object is
//! baked. Each entry is visible in preview, render, or both.
//!
//! In a scene manifest:
//!
//! ```toml
//! [[objects.modifiers]]
//! type = "mirror"
//! axis = "x"
//!
//! [[objects.modifiers]]
//! type = "array"
//! count = 3
//! offset = [16.0, 0.0, 0.0]
//! show_render = false
//! ```

use config::constants::WELD_DISTANCE;
use glam::{DAffine3, DVec3};
use serde::{Deserialize, Serialize};
use tile_mesh::ops::{remove_doubles, triangulate, Axis};
use tile_mesh::Mesh;

use crate::settings::ModifierSettings;

/// A mesh modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Modifier {
    /// Adds a copy mirrored across the object's local `axis` plane and welds
    /// the seam.
    Mirror { axis: Axis },
    /// Repeats the mesh `count` times, each copy shifted by `offset`.
    Array { count: u32, offset: [f64; 3] },
    /// Splits every polygon into triangles.
    Triangulate,
}

fn visible() -> bool {
    true
}

/// A modifier with its visibility flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierEntry {
    #[serde(flatten)]
    pub modifier: Modifier,
    #[serde(default = "visible")]
    pub show_viewport: bool,
    #[serde(default = "visible")]
    pub show_render: bool,
}

impl ModifierEntry {
    /// Entry visible in both preview and render.
    pub fn new(modifier: Modifier) -> Self {
        Self {
            modifier,
            show_viewport: true,
            show_render: true,
        }
    }

    /// True when the entry applies under `settings`.
    pub fn is_enabled(&self, settings: ModifierSettings) -> bool {
        match settings {
            ModifierSettings::Preview => self.show_viewport,
            ModifierSettings::Render => self.show_render,
        }
    }
}

impl Modifier {
    /// Applies the modifier in place.
    pub fn apply(&self, mesh: &mut Mesh) {
        match *self {
            Modifier::Mirror { axis } => {
                let mut scale = DVec3::ONE;
                scale[axis.index()] = -1.0;
                let mut mirrored = mesh.clone();
                mirrored.transform(&DAffine3::from_scale(scale));
                mesh.merge(&mirrored);
                remove_doubles(mesh, WELD_DISTANCE);
            }
            Modifier::Array { count, offset } => {
                let base = mesh.clone();
                let step = DVec3::from_array(offset);
                for i in 1..count {
                    let mut copy = base.clone();
                    copy.translate(step * i as f64);
                    mesh.merge(&copy);
                }
            }
            Modifier::Triangulate => {
                triangulate(mesh);
            }
        }
    }
}

/// Evaluates `modifiers` on a copy of `mesh`, skipping entries hidden under
/// `settings`.
pub fn evaluate_stack(mesh: &Mesh, modifiers: &[ModifierEntry], settings: ModifierSettings) -> Mesh {
    let mut result = mesh.clone();
    for entry in modifiers.iter().filter(|m| m.is_enabled(settings)) {
        entry.modifier.apply(&mut result);
    }
    result
}
