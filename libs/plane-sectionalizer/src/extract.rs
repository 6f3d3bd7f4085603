//! # Vertex Extractor
//!
//! Flattens a finished section into one float buffer per material. Every
//! triangle corner becomes eight floats:
//!
//! ```text
//! px py pz  nx ny nz  u v'      (v' = 1 - v)
//! ```
//!
//! Quads contribute two triangles and larger polygons a fan. Materials are
//! emitted in slot order; a mesh without slots uses the default material.

use config::constants::{DEFAULT_MATERIAL, FLOATS_PER_VERTEX};
use glam::DVec3;
use tile_mesh::Mesh;
use tracing::debug;

use crate::error::{Result, SectionalizeError};
use crate::scene::{ObjectId, Scene};

/// Rounds `value` to `digits` decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Per-material vertex buffers of one section.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSection {
    pub name: String,
    /// Section location in world space.
    pub position: DVec3,
    /// Material name and its interleaved vertex floats, in slot order.
    pub materials: Vec<(String, Vec<f64>)>,
}

impl ExtractedSection {
    /// Vertex count of each material buffer.
    pub fn vertex_counts(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.materials
            .iter()
            .map(|(name, floats)| (name.as_str(), floats.len() / FLOATS_PER_VERTEX))
    }

    /// Largest per-material vertex count, with its material. Ties go to the
    /// earlier slot.
    pub fn max_vertex_count(&self) -> Option<(&str, usize)> {
        first_max(self.vertex_counts(), |&(_, count)| count)
    }
}

/// Extracts the buffers of one section mesh.
///
/// Faces whose material index has no slot are grouped under the default
/// material so no geometry is lost. With `digits` set every buffer float is
/// rounded; the position is kept exact.
pub fn extract_section(name: &str, mesh: &Mesh, position: DVec3, digits: Option<u32>) -> ExtractedSection {
    let slots = mesh.materials().len();
    let default_slot = mesh
        .materials()
        .iter()
        .position(|m| m == DEFAULT_MATERIAL)
        .unwrap_or(slots);

    let mut names: Vec<String> = mesh.materials().to_vec();
    names.push(DEFAULT_MATERIAL.to_string());
    let mut buffers: Vec<Vec<f64>> = vec![Vec::new(); slots + 1];

    for face in mesh.faces() {
        let slot = match face.material as usize {
            m if m < slots => m,
            _ => default_slot,
        };
        let buffer = &mut buffers[slot];
        for tri in face.fan() {
            for i in tri {
                let corner = &face.corners[i];
                let p = mesh.vertex(corner.vertex);
                let n = corner.normal;
                buffer.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z, corner.uv.x, 1.0 - corner.uv.y]);
            }
        }
    }

    if let Some(digits) = digits {
        for value in buffers.iter_mut().flatten() {
            *value = round_to(*value, digits);
        }
    }

    let materials = names
        .into_iter()
        .zip(buffers)
        .filter(|(_, floats)| !floats.is_empty())
        .collect();

    ExtractedSection {
        name: name.to_string(),
        position,
        materials,
    }
}

/// Extracts every section object of `scene`, positioned at its location.
pub fn extract_sections(scene: &Scene, ids: &[ObjectId], digits: Option<u32>) -> Result<Vec<ExtractedSection>> {
    ids.iter()
        .map(|&id| {
            let object = scene
                .get(id)
                .ok_or_else(|| SectionalizeError::ObjectNotFound(id.to_string()))?;
            let section = extract_section(&object.name, &object.mesh, object.transform.location, digits);
            for (material, count) in section.vertex_counts() {
                debug!(section = %section.name, material, vertices = count, "extracted");
            }
            Ok(section)
        })
        .collect()
}

/// Largest per-material vertex count over all sections, with the section and
/// material it occurs in. Ties go to the earlier section.
pub fn max_vertex_count(sections: &[ExtractedSection]) -> Option<(&str, &str, usize)> {
    let all = sections
        .iter()
        .filter_map(|s| s.max_vertex_count().map(|(m, c)| (s.name.as_str(), m, c)));
    first_max(all, |&(_, _, count)| count)
}

fn first_max<T: Copy>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> usize) -> Option<T> {
    let mut best: Option<T> = None;
    for item in items {
        if best.as_ref().map_or(true, |b| key(&item) > key(b)) {
            best = Some(item);
        }
    }
    best
}
